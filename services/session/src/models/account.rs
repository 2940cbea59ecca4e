//! Account request payloads (reset, activation)

use serde::{Deserialize, Serialize};

/// Payload for endpoints keyed only by email (password or email reset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Password reset confirmation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password: String,
    pub re_new_password: String,
}

/// Email reset confirmation payload
///
/// The account email is the login identifier, so this is what the API calls
/// a username reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_email: String,
    pub re_new_email: String,
}

/// Account activation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountActivation {
    pub uid: String,
    pub token: String,
}
