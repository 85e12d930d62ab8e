//! Error types for the notification client.
//!
//! # Design
//! Only a 4xx/5xx reply carries enough information to explain itself, so only
//! that case becomes `ServiceCall`, whose message is a JSON `Diagnostic`
//! describing both sides of the exchange. Connection failures, timeouts and
//! other transport faults become `Transport` with a fixed message. Both keep
//! the `TransportError` as their source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse, TransportError};

/// Message carried by every diagnostic.
pub const SERVICE_CALL_MESSAGE: &str = "notification service call failed";

/// Errors returned by `NotificationClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client was constructed without a base address.
    #[error("notification service endpoint is not configured")]
    Configuration,

    /// The service replied with a 4xx/5xx status. `diagnostic` is the
    /// serialized `Diagnostic` for the exchange.
    #[error("{diagnostic}")]
    ServiceCall {
        diagnostic: String,
        #[source]
        source: TransportError,
    },

    /// The request never produced a usable response.
    #[error("notification service request failed")]
    Transport {
        #[source]
        source: TransportError,
    },

    /// A request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A successful response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl ApiError {
    /// Normalize a transport failure.
    pub(crate) fn from_transport(err: TransportError) -> Self {
        let diagnostic = match &err {
            TransportError::Status { request, response } => {
                serde_json::to_string(&Diagnostic::new(request, response)).ok()
            }
            TransportError::Unclassified { .. } => None,
        };
        match diagnostic {
            Some(diagnostic) => ApiError::ServiceCall { diagnostic, source: err },
            None => ApiError::Transport { source: err },
        }
    }

    /// Parse the structured diagnostic of a `ServiceCall` error.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self {
            ApiError::ServiceCall { diagnostic, .. } => serde_json::from_str(diagnostic).ok(),
            _ => None,
        }
    }

    /// Status code of the failed reply, for `ServiceCall` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServiceCall {
                source: TransportError::Status { response, .. },
                ..
            } => Some(response.status),
            _ => None,
        }
    }
}

/// Both sides of a failed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub request: RequestDetail,
    pub response: ResponseDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetail {
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDetail {
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    pub status: u16,
}

impl Diagnostic {
    pub fn new(request: &HttpRequest, response: &HttpResponse) -> Self {
        Self {
            message: SERVICE_CALL_MESSAGE.to_string(),
            request: RequestDetail {
                headers: group_headers(&request.headers),
                body: request.body.clone(),
            },
            response: ResponseDetail {
                headers: group_headers(&response.headers),
                body: response.body.clone(),
                status: response.status,
            },
        }
    }
}

/// Repeated header names collect their values in arrival order.
fn group_headers(headers: &[(String, String)]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        grouped.entry(name.clone()).or_default().push(value.clone());
    }
    grouped
}
