//! Simple authentication - users, password hashes and groups from a JSON file
//!
//! A successful login issues a signed session token, returned in the body and as
//! an HttpOnly cookie. The token carries the user's groups; the identity source
//! turns them back into roles on each request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::jwt::{extract_token, session_cookie_header, JwtConfig};
use crate::models::user::{AuthResponse, LoginRequest, UserAccount};
use crate::utils::verify_password;

use super::strategy::{AuthenticationStrategy, IdentitySink, IdentitySource, SessionFlow};

pub struct SimpleStrategy {
    backend: Arc<SimpleBackend>,
}

struct SimpleBackend {
    users: HashMap<String, UserAccount>,
    jwt: JwtConfig,
}

impl SimpleStrategy {
    pub fn new(users: Vec<UserAccount>, jwt: JwtConfig) -> Result<Self, AppError> {
        let mut by_name = HashMap::with_capacity(users.len());
        for user in users {
            if user.name.trim().is_empty() {
                return Err(AppError::configuration("user entry without a name"));
            }
            if by_name.contains_key(&user.name) {
                return Err(AppError::configuration(format!("duplicate user '{}'", user.name)));
            }
            by_name.insert(user.name.clone(), user);
        }

        Ok(Self {
            backend: Arc::new(SimpleBackend { users: by_name, jwt }),
        })
    }

    pub fn from_file(path: &Path, jwt: JwtConfig) -> Result<Self, AppError> {
        let raw = std::fs::read(path)
            .map_err(|err| AppError::configuration(format!("failed to read {}: {err}", path.display())))?;
        let users: Vec<UserAccount> = serde_json::from_slice(&raw)
            .map_err(|err| AppError::configuration(format!("invalid users file {}: {err}", path.display())))?;
        Self::new(users, jwt)
    }
}

impl AuthenticationStrategy for SimpleStrategy {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn has_authorization(&self) -> bool {
        true
    }

    fn configure_session_flow(&self, flow: &mut SessionFlow) {
        let backend = self.backend.clone();
        let login_path = flow.login_path().to_string();
        flow.route(
            &login_path,
            post(move |State(state): State<AppState>, headers: HeaderMap, Json(payload): Json<LoginRequest>| {
                let backend = backend.clone();
                async move { backend.login(&state, &headers, payload) }
            }),
        );
    }

    fn configure_identity_source(&self, identity: &mut IdentitySink) {
        identity.install(Arc::new(JwtIdentity {
            jwt: self.backend.jwt.clone(),
        }));
    }
}

impl SimpleBackend {
    fn login(&self, state: &AppState, headers: &HeaderMap, payload: LoginRequest) -> AppResult<Response> {
        let Some(user) = self.users.get(&payload.username) else {
            state.session.on_failure(Some(&payload.username), "unknown user", headers);
            return Err(AppError::unauthorized("invalid credentials"));
        };

        if !verify_password(&payload.password, &user.password_hash)? {
            state.session.on_failure(Some(&user.name), "bad credentials", headers);
            return Err(AppError::unauthorized("invalid credentials"));
        }

        let token = self.jwt.encode(&user.name, &user.groups)?;
        state.session.on_success(&user.name, headers);

        let principal = Principal::new(user.name.clone()).with_groups(&user.groups);
        let body = AuthResponse {
            token: token.clone(),
            username: user.name.clone(),
            roles: principal.roles.iter().map(|r| r.to_string()).collect(),
        };
        let cookie = session_cookie_header(&token, self.jwt.session_max_age_secs());

        Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
    }
}

/// Resolves principals from session tokens issued at login.
pub struct JwtIdentity {
    jwt: JwtConfig,
}

impl JwtIdentity {
    pub fn new(jwt: JwtConfig) -> Self {
        Self { jwt }
    }
}

impl IdentitySource for JwtIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = extract_token(headers)?;
        match self.jwt.decode(&token) {
            Ok(claims) => Some(Principal::new(claims.sub).with_groups(&claims.groups)),
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                None
            }
        }
    }
}
