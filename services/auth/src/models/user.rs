//! Account payloads

use serde::Deserialize;

/// Local sign-up payload
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login with either the username or the email
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub username_or_email: String,
    pub password: String,
}

/// Query string Google appends to the callback URL
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_accepts_username_or_email_keys() {
        let by_name: LoginRequest =
            serde_json::from_str(r#"{"username":"ada","password":"pw"}"#).unwrap();
        let by_mail: LoginRequest =
            serde_json::from_str(r#"{"email":"ada@example.com","password":"pw"}"#).unwrap();
        assert_eq!(by_name.username_or_email, "ada");
        assert_eq!(by_mail.username_or_email, "ada@example.com");
    }
}
