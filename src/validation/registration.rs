use crate::core::error::AuthError;
use crate::models::api::RegisterRequest;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const EMAIL_MAX: usize = 254;

/// Registration input after validation and normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub username: String,
    pub email: String,
}

/// Emails are compared trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_registration(
    req: &RegisterRequest,
    min_password_length: usize,
) -> Result<ValidatedRegistration, AuthError> {
    let username = validate_username(&req.username)?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password, min_password_length)?;

    Ok(ValidatedRegistration { username, email })
}

fn validate_username(raw: &str) -> Result<String, AuthError> {
    let username = raw.trim();
    let len = username.chars().count();

    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AuthError::Validation(format!(
            "username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AuthError::Validation(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }

    Ok(username.to_string())
}

fn validate_email(raw: &str) -> Result<String, AuthError> {
    let email = normalize_email(raw);

    if email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return Err(AuthError::Validation("email address is not valid".to_string()));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(AuthError::Validation("email address is not valid".to_string()));
    }

    Ok(email)
}

fn validate_password(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.chars().count() < min_length {
        return Err(AuthError::Validation(format!(
            "password must be at least {} characters",
            min_length
        )));
    }
    Ok(())
}
