use rand::Rng;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};

use crate::error::{AppError, AppResult};

pub const TOKEN_LENGTH: usize = 140;
pub const TOKEN_TTL: Duration = Duration::hours(1);

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random token value: each character drawn from the lowercase
/// alphanumeric alphabet, letters independently upper-cased.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let c = ALPHABET[rng.gen_range(0..ALPHABET.len())] as char;
            if c.is_ascii_alphabetic() && rng.gen_bool(0.5) {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// Which table a token value is resolved against. The two kinds carry
/// different user messaging for miss and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordRecovery,
}

impl TokenKind {
    fn missing_message(self) -> &'static str {
        match self {
            TokenKind::EmailVerification => {
                "Invalid token. Make sure your token is valid and not deleted."
            }
            TokenKind::PasswordRecovery => "Token doesn't exist.",
        }
    }

    fn expired_message(self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "EmailVerification expired.",
            TokenKind::PasswordRecovery => "Token expired.",
        }
    }
}

/// A stored verification or recovery token. Row existence is the state:
/// unconfirmed profile / recovery in progress.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub profile_id: i64,
    pub token: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl TokenRow {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

/// Value and validity window for a token about to be written. Used both
/// for the initial issue and for refresh; the value is re-generated and
/// the window restarted every time.
#[derive(Debug, Clone)]
pub struct FreshToken {
    pub value: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

pub fn issue() -> FreshToken {
    let created_at = OffsetDateTime::now_utc();
    FreshToken {
        value: generate_token(TOKEN_LENGTH),
        created_at,
        expires_at: created_at + TOKEN_TTL,
    }
}

/// Resolve a lookup result into a consumable token. A miss and an
/// expired hit are distinct conditions; an expired row is left in place
/// so the profile can refresh it.
pub fn check(row: Option<TokenRow>, kind: TokenKind, now: OffsetDateTime) -> AppResult<TokenRow> {
    let row = row.ok_or_else(|| AppError::NotFound(kind.missing_message().into()))?;
    if row.is_expired(now) {
        return Err(AppError::Expired(kind.expired_message().into()));
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_expiring_at(expires_at: OffsetDateTime) -> TokenRow {
        TokenRow {
            profile_id: 1,
            token: generate_token(TOKEN_LENGTH),
            created_at: expires_at - TOKEN_TTL,
            expires_at,
        }
    }

    #[test]
    fn generated_token_shape() {
        let token = generate_token(TOKEN_LENGTH);
        assert_eq!(token.len(), 140);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn issue_restarts_value_and_window() {
        let first = issue();
        let second = issue();
        assert_ne!(first.value, second.value);
        assert_eq!(first.expires_at - first.created_at, TOKEN_TTL);
        assert_eq!(second.expires_at - second.created_at, TOKEN_TTL);
    }

    #[test]
    fn fresh_token_is_not_expired() {
        let fresh = issue();
        let row = TokenRow {
            profile_id: 1,
            token: fresh.value,
            created_at: fresh.created_at,
            expires_at: fresh.expires_at,
        };
        assert!(!row.is_expired(OffsetDateTime::now_utc()));
        assert!(row.is_expired(row.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn check_distinguishes_miss_and_expiry() {
        let now = OffsetDateTime::now_utc();

        let missing = check(None, TokenKind::EmailVerification, now).unwrap_err();
        assert_eq!(
            missing.to_string(),
            "Invalid token. Make sure your token is valid and not deleted."
        );

        let expired = check(
            Some(row_expiring_at(now - Duration::minutes(5))),
            TokenKind::EmailVerification,
            now,
        )
        .unwrap_err();
        assert_eq!(expired.to_string(), "EmailVerification expired.");

        let valid = check(
            Some(row_expiring_at(now + Duration::minutes(5))),
            TokenKind::EmailVerification,
            now,
        );
        assert!(valid.is_ok());
    }

    #[test]
    fn recovery_kind_messages() {
        let now = OffsetDateTime::now_utc();

        let missing = check(None, TokenKind::PasswordRecovery, now).unwrap_err();
        assert_eq!(missing.to_string(), "Token doesn't exist.");

        let expired = check(
            Some(row_expiring_at(now - Duration::hours(2))),
            TokenKind::PasswordRecovery,
            now,
        )
        .unwrap_err();
        assert_eq!(expired.to_string(), "Token expired.");
    }
}
