use serde::{Deserialize, Serialize};

use super::repo_types::Message;

/// Request body for `POST /api/sign-up`.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Uniform JSON envelope returned by the user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    /// Filled by the message-settings and inbox endpoints; sign-up leaves
    /// both unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_accepting_messages: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            is_accepting_messages: None,
            messages: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            is_accepting_messages: None,
            messages: None,
        }
    }
}
