//! Blocking client for a remote HTTP notification service.
//!
//! # Overview
//! Dispatches email sends, push-device registration, batch notifications,
//! pub/sub publication and recipient profile updates to the service, and
//! turns every outcome into either a decoded JSON value or an `ApiError`.
//!
//! # Design
//! - `NotificationClient` holds only the base address and a `Transport`.
//! - Each operation has a pure `build_*` method producing an `HttpRequest`
//!   and an executing method that runs it through the shared `send`.
//! - The `Transport` trait is the I/O seam. `UreqTransport` is the default;
//!   tests substitute in-memory transports.
//! - A 4xx/5xx reply becomes `ApiError::ServiceCall` with a JSON diagnostic
//!   of the whole exchange; any other transport fault becomes
//!   `ApiError::Transport` with a fixed message.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::{parse_response, NotificationClient};
pub use config::ClientConfig;
pub use error::{ApiError, Diagnostic, RequestDetail, ResponseDetail};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use types::{EmailProfile, RecipientIdentity};
