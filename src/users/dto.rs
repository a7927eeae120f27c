use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::chats::dto::ChatSummary;

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login. The username field accepts an email too.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for asking a password-recovery mail.
#[derive(Debug, Deserialize)]
pub struct RecoveryRequest {
    pub email: String,
}

/// Request body for completing a password recovery.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// Query parameters of the resend-confirmation endpoint. Both are
/// required; absence of either is a not-found, independent of the user.
#[derive(Debug, Deserialize)]
pub struct ResendQuery {
    pub redirect_to: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
pub struct PrivacyUpdateRequest {
    pub show_username: bool,
    pub show_email: bool,
    pub show_date_joined: bool,
}

/// Privacy-filtered profile fields: the real value or "Hidden".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicInfo {
    pub username: String,
    pub email: String,
    pub date_joined: String,
}

/// Public profile page payload.
#[derive(Debug, Serialize)]
pub struct ProfileDetails {
    pub id: i64,
    pub avatar: String,
    pub info: PublicInfo,
    pub chats: Vec<ChatSummary>,
}

/// The authenticated profile as returned by /me.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub email_confirmed: bool,
    pub date_joined: OffsetDateTime,
}

/// Plain success message, mirroring the original's flash messages.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_info_serialization() {
        let info = PublicInfo {
            username: "temp2".into(),
            email: "Hidden".into(),
            date_joined: "Hidden".into(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("temp2"));
        assert!(json.contains("Hidden"));
    }
}
