//! HTTP request/response types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. `NotificationClient` builds an
//! `HttpRequest`, hands it to a `Transport`, and interprets the outcome. The
//! transport is the only part that touches the network, so tests can swap in
//! an in-memory implementation and production code uses `UreqTransport`.
//!
//! A transport reports failures in two classes. `TransportError::Status`
//! means a response arrived but its status was 4xx/5xx; it carries both sides
//! of the exchange. `TransportError::Unclassified` covers everything else and
//! carries only the underlying cause.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is the absolute URL: the client's base address followed by the
/// operation suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data. The body is fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service answered with a 4xx/5xx status.
    #[error("{} {} responded with status {}", .request.method.as_str(), .request.path, .response.status)]
    Status {
        request: Box<HttpRequest>,
        response: Box<HttpResponse>,
    },

    /// No usable response: connection refused, timeout, unreadable body, or
    /// a non-success status outside the 4xx/5xx range.
    #[error("{message}")]
    Unclassified {
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl TransportError {
    /// Classify a received response. Returns `None` for statuses that are not
    /// 4xx/5xx.
    pub fn status(request: &HttpRequest, response: HttpResponse) -> Option<Self> {
        if (400..600).contains(&response.status) {
            Some(TransportError::Status {
                request: Box::new(request.clone()),
                response: Box::new(response),
            })
        } else {
            None
        }
    }

    pub fn unclassified<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        TransportError::Unclassified {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// Executes one HTTP exchange.
///
/// Implementations return `Ok` only for 2xx responses, `TransportError::Status`
/// for 4xx/5xx responses, and `TransportError::Unclassified` otherwise. They
/// must not retry.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        // Status codes are classified here rather than by ureq, which would
        // discard the response headers and body.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Delete => {
                with_headers(self.agent.delete(&request.path), &request.headers).call()
            }
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(&request.path), &request.headers);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| {
            TransportError::unclassified(format!("{} {} failed", request.method.as_str(), request.path), e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        // Read as bytes so a non-UTF-8 error body still yields a diagnostic.
        let bytes = response.body_mut().read_to_vec().map_err(|e| {
            TransportError::unclassified(format!("reading response body from {} failed", request.path), e)
        })?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        let response = HttpResponse { status, headers, body };
        if response.is_success() {
            return Ok(response);
        }
        match TransportError::status(request, response) {
            Some(err) => Err(err),
            None => Err(TransportError::unclassified(
                format!("{} {} returned an unexpected status", request.method.as_str(), request.path),
                format!("status {status}"),
            )),
        }
    }
}

fn with_headers<B>(builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |builder, (name, value)| builder.header(name.as_str(), value.as_str()))
}
