use serde::{Deserialize, Serialize};

/// Account entry for the simple authentication backend.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub name: String,
    /// PHC-formatted argon2 hash.
    pub password_hash: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub roles: Vec<String>,
}
