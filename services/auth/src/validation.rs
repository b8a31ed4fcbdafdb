//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// 3 to 32 letters, digits or underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let matches = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(username));

    if !matches {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let matches = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email));

    if !matches {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// 8 to 128 characters with at least one letter and one digit
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();
    if length < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if length > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err("Password must contain at least one letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

/// Lowercase username candidate derived from an email's local part
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut name: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(24)
        .collect::<String>()
        .to_ascii_lowercase();
    while name.len() < 3 {
        name.push('_');
    }
    name
}
