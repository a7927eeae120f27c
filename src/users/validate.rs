use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, AppResult};

pub const USERNAME_MAX_LENGTH: usize = 45;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w-]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() || username.len() > USERNAME_MAX_LENGTH || !USERNAME_RE.is_match(username)
    {
        return Err(AppError::Validation(
            "Enter valid username. This value may contain only letters, \
             numbers, and -/_ characters."
                .into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation("Enter a valid email address.".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "This password is too short. It must contain at least 8 characters.".into(),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "This password is entirely numeric.".into(),
        ));
    }
    Ok(())
}

/// Message for a failed profile lookup; worded per identifier shape.
pub fn no_such_user_message(query: &str) -> String {
    if query.contains('@') {
        "User with this email doesn't exist.".into()
    } else {
        "User with this username doesn't exist.".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_pattern() {
        assert!(validate_username("temp2").is_ok());
        assert!(validate_username("user_name-1").is_ok());
        assert!(validate_username("ti*#(@").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(46)).is_err());
        assert!(validate_username(&"a".repeat(45)).is_ok());
    }

    #[test]
    fn email_pattern() {
        assert!(validate_email("temp2@mail.com").is_ok());
        assert!(validate_email("sp@com").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two words@mail.com").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("hardpwd123").is_ok());
        let short = validate_password("pwd123").unwrap_err();
        assert_eq!(
            short.to_string(),
            "This password is too short. It must contain at least 8 characters."
        );
        let numeric = validate_password("12345678901").unwrap_err();
        assert_eq!(numeric.to_string(), "This password is entirely numeric.");
    }

    #[test]
    fn lookup_miss_wording_follows_identifier() {
        assert_eq!(
            no_such_user_message("temp2"),
            "User with this username doesn't exist."
        );
        assert_eq!(
            no_such_user_message("temp2@mail.com"),
            "User with this email doesn't exist."
        );
    }
}
