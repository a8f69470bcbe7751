//! Authentication models for AgriConnect

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Access/refresh pair issued by `POST /api/token/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Snapshot of the tokens currently held by the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Login request body
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Refresh request body
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh response. The backend may or may not rotate the refresh token.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Full registration profile sent to `POST /api/signup/`
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct SignupProfile {
    #[validate(length(min = 1, max = 150, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(email(message = "email address is invalid"))]
    pub email: String,
    #[validate(length(max = 15, message = "phone number is too long"))]
    pub phone: String,
    #[validate(length(max = 255, message = "location is too long"))]
    pub location: String,
    pub is_farmer: bool,
    pub is_buyer: bool,
}

/// Signup response; tokens are present only when the backend auto-logs-in
#[derive(Debug, Default, Deserialize)]
pub struct SignupResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl SignupResponse {
    pub fn into_token_pair(self) -> Option<TokenPair> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair { access, refresh }),
            _ => None,
        }
    }
}

/// What a successful signup did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    /// Tokens came back and the session is now authenticated
    Authenticated,
    /// Account created; the user still has to log in
    Registered,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SignupProfile {
        SignupProfile {
            username: "farmer_john".to_string(),
            password: "s3cret".to_string(),
            email: "john@farm.example".to_string(),
            phone: "+254700000000".to_string(),
            location: "Nakuru".to_string(),
            is_farmer: true,
            is_buyer: false,
        }
    }

    #[test]
    fn test_signup_profile_validation() {
        assert!(profile().validate().is_ok());

        let mut bad_email = profile();
        bad_email.email = "not-an-email".to_string();
        assert!(bad_email.validate().is_err());

        let mut no_username = profile();
        no_username.username.clear();
        assert!(no_username.validate().is_err());

        let mut long_phone = profile();
        long_phone.phone = "0".repeat(16);
        assert!(long_phone.validate().is_err());
    }

    #[test]
    fn test_signup_profile_wire_format() {
        let body = serde_json::to_value(profile()).unwrap();
        assert_eq!(body["is_farmer"], true);
        assert_eq!(body["is_buyer"], false);
        assert_eq!(body["phone"], "+254700000000");
    }

    #[test]
    fn test_signup_response_token_pair() {
        let with_tokens: SignupResponse =
            serde_json::from_str(r#"{"access":"a1","refresh":"r1","username":"x"}"#).unwrap();
        assert_eq!(
            with_tokens.into_token_pair(),
            Some(TokenPair {
                access: "a1".to_string(),
                refresh: "r1".to_string()
            })
        );

        let without: SignupResponse =
            serde_json::from_str(r#"{"username":"x","email":"x@y.z"}"#).unwrap();
        assert!(without.into_token_pair().is_none());

        let half: SignupResponse = serde_json::from_str(r#"{"access":"a1"}"#).unwrap();
        assert!(half.into_token_pair().is_none());
    }

    #[test]
    fn test_refresh_response_rotation_optional() {
        let plain: RefreshResponse = serde_json::from_str(r#"{"access":"a2"}"#).unwrap();
        assert_eq!(plain.access, "a2");
        assert!(plain.refresh.is_none());

        let rotated: RefreshResponse =
            serde_json::from_str(r#"{"access":"a2","refresh":"r2"}"#).unwrap();
        assert_eq!(rotated.refresh.as_deref(), Some("r2"));
    }
}
