use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Stored user account. The password is only ever held as an Argon2 PHC string.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Credentials body shared by signup and login
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Minimal user descriptor returned to the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCheckResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

impl AuthCheckResponse {
    pub fn authenticated(user: UserResponse) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User {
            id: 3,
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$...".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "user");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_auth_check_response_omits_user_when_anonymous() {
        let json = serde_json::to_value(AuthCheckResponse::anonymous()).unwrap();
        assert_eq!(json, serde_json::json!({ "authenticated": false }));
    }

    #[test]
    fn test_signup_response_uses_camel_case() {
        let json = serde_json::to_value(SignupResponse {
            message: "User created successfully".to_string(),
            user_id: 9,
        })
        .unwrap();
        assert_eq!(json["userId"], 9);
    }
}
