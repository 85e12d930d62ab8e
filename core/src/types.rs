//! Request bodies with a fixed shape.
//!
//! Operations whose payload is supplied by the caller (batch notify, pub/sub,
//! the email sends) accept any `Serialize` value and pass it through as-is;
//! only the bodies the client assembles itself are typed here.

use serde::{Deserialize, Serialize};

/// Body of the register-email-profile call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailProfile {
    pub address: String,
}

/// Body of the update-recipient call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}
