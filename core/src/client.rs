//! Request builders and the shared executor for the notification service.
//!
//! # Design
//! `NotificationClient` holds only the base address and a `Transport`, and
//! carries no mutable state between calls. Each operation is split the same
//! way: a `build_*` method produces an `HttpRequest` without touching the
//! network, and the operation method hands that request to `send`, the single
//! executor that runs the exchange, decodes the reply and normalizes failures.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::{EmailProfile, RecipientIdentity};

/// Blocking client for the notification service.
///
/// Cheap to share: every call builds its own request and the client is
/// `Sync` whenever the transport is.
#[derive(Debug, Clone)]
pub struct NotificationClient<T = UreqTransport> {
    base_url: String,
    transport: T,
}

impl NotificationClient<UreqTransport> {
    /// Client over the default `ureq` transport.
    ///
    /// Fails with `ApiError::Configuration` when `endpoint` is absent or blank.
    pub fn new(endpoint: Option<&str>) -> Result<Self, ApiError> {
        Self::with_transport(endpoint, UreqTransport::default())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(config.endpoint.as_deref(), UreqTransport::new(config.timeout()))
    }
}

impl<T: Transport> NotificationClient<T> {
    pub fn with_transport(endpoint: Option<&str>, transport: T) -> Result<Self, ApiError> {
        let base_url = endpoint
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or(ApiError::Configuration)?;
        Ok(Self {
            base_url: base_url.to_string(),
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_batch_notify<B: Serialize + ?Sized>(&self, batch: &B) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/notification/batch", batch)
    }

    pub fn build_publish<B: Serialize + ?Sized>(&self, payload: &B) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/provider/pubsub/channel", payload)
    }

    pub fn build_register_email(&self, recipient_id: &str, address: &str) -> Result<HttpRequest, ApiError> {
        let profile = EmailProfile {
            address: address.to_string(),
        };
        self.json_request(HttpMethod::Post, &email_profile_path(recipient_id), &profile)
    }

    pub fn build_unregister_email(&self, recipient_id: &str) -> HttpRequest {
        self.empty_request(HttpMethod::Delete, &email_profile_path(recipient_id))
    }

    pub fn build_send_email_to_recipient<B: Serialize + ?Sized>(&self, payload: &B) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/provider/email/recipient", payload)
    }

    pub fn build_send_email_to_address<B: Serialize + ?Sized>(&self, payload: &B) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/provider/email/address", payload)
    }

    pub fn build_send_batch_emails<B: Serialize + ?Sized>(&self, batch: &B) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/provider/email/recipient/batch", batch)
    }

    pub fn build_update_recipient(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<HttpRequest, ApiError> {
        let identity = RecipientIdentity {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        self.json_request(HttpMethod::Post, "/recipients", &identity)
    }

    pub fn build_register_push_device(
        &self,
        recipient_id: &str,
        device_id: &str,
        token: &str,
        platform: &str,
        app: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut body = Map::new();
        body.insert("deviceId".to_string(), Value::from(device_id));
        body.insert("token".to_string(), Value::from(token));
        body.insert("platform".to_string(), Value::from(platform));
        insert_app(&mut body, app);
        self.json_request(
            HttpMethod::Post,
            &format!("/recipients/{recipient_id}/profiles/push/register"),
            &body,
        )
    }

    pub fn build_unregister_push_device(
        &self,
        recipient_id: &str,
        device_id: &str,
        app: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut body = Map::new();
        body.insert("deviceId".to_string(), Value::from(device_id));
        insert_app(&mut body, app);
        self.json_request(
            HttpMethod::Post,
            &format!("/recipients/{recipient_id}/profiles/push/unregister"),
            &body,
        )
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn batch_notify<B: Serialize + ?Sized>(&self, batch: &B) -> Result<Value, ApiError> {
        self.send(self.build_batch_notify(batch)?)
    }

    pub fn publish<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Value, ApiError> {
        self.send(self.build_publish(payload)?)
    }

    pub fn register_email(&self, recipient_id: &str, address: &str) -> Result<Value, ApiError> {
        self.send(self.build_register_email(recipient_id, address)?)
    }

    pub fn unregister_email(&self, recipient_id: &str) -> Result<Value, ApiError> {
        self.send(self.build_unregister_email(recipient_id))
    }

    pub fn send_email_to_recipient<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Value, ApiError> {
        self.send(self.build_send_email_to_recipient(payload)?)
    }

    pub fn send_email_to_address<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Value, ApiError> {
        self.send(self.build_send_email_to_address(payload)?)
    }

    pub fn send_batch_emails<B: Serialize + ?Sized>(&self, batch: &B) -> Result<Value, ApiError> {
        self.send(self.build_send_batch_emails(batch)?)
    }

    pub fn update_recipient(&self, id: &str, first_name: &str, last_name: &str) -> Result<Value, ApiError> {
        self.send(self.build_update_recipient(id, first_name, last_name)?)
    }

    pub fn register_push_device(
        &self,
        recipient_id: &str,
        device_id: &str,
        token: &str,
        platform: &str,
        app: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.send(self.build_register_push_device(recipient_id, device_id, token, platform, app)?)
    }

    pub fn unregister_push_device(
        &self,
        recipient_id: &str,
        device_id: &str,
        app: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.send(self.build_unregister_push_device(recipient_id, device_id, app)?)
    }

    // -----------------------------------------------------------------------
    // Executor
    // -----------------------------------------------------------------------

    /// Run one exchange and decode the reply.
    ///
    /// Exactly one call into the transport; failures are never retried.
    pub fn send(&self, request: HttpRequest) -> Result<Value, ApiError> {
        debug!(method = request.method.as_str(), url = %request.path, "sending notification request");

        match self.transport.execute(&request) {
            Ok(response) => {
                debug!(status = response.status, url = %request.path, "notification request succeeded");
                parse_response(&response)
            }
            Err(err) => {
                let err = ApiError::from_transport(err);
                match err.status() {
                    Some(status) => warn!(status, url = %request.path, "notification service rejected request"),
                    None => error!(url = %request.path, error = %err, "notification request failed"),
                }
                Err(err)
            }
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.base_url)
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        suffix: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(ApiError::Serialization)?;
        Ok(HttpRequest {
            method,
            path: self.path(suffix),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    fn empty_request(&self, method: HttpMethod, suffix: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.path(suffix),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Decode a successful reply. An empty body decodes to `Value::Null`.
pub fn parse_response(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(ApiError::Deserialization)
}

fn email_profile_path(recipient_id: &str) -> String {
    format!("/recipients/{recipient_id}/profiles/email")
}

/// `app` is omitted entirely unless it is present and non-empty.
fn insert_app(body: &mut Map<String, Value>, app: Option<&str>) {
    if let Some(app) = app.filter(|app| !app.is_empty()) {
        body.insert("app".to_string(), Value::from(app));
    }
}
