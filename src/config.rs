use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LOGOUT_PATH: &str = "/logout";
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

/// Which authentication backend governs the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// No login, no authorization rules.
    None,
    /// Users and their groups come from `USERS_FILE`.
    Simple,
}

impl AuthKind {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_lowercase().as_str() {
            "none" => Ok(AuthKind::None),
            "" | "simple" => Ok(AuthKind::Simple),
            other => Err(AppError::configuration(format!("unknown AUTH_MODE '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub auth: AuthKind,
    pub admin_roles: Vec<String>,
    pub login_path: String,
    pub logout_path: String,
    pub apps_file: PathBuf,
    pub users_file: Option<PathBuf>,
    pub registry_poll: Duration,
    pub port: u16,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth = AuthKind::parse(&lookup("AUTH_MODE").unwrap_or_default())?;

        let admin_roles = match lookup("ADMIN_ROLES") {
            Some(raw) => split_list(&raw),
            None => vec![DEFAULT_ADMIN_ROLE.to_string()],
        };

        let login_path = path_or_default(lookup("LOGIN_PATH"), DEFAULT_LOGIN_PATH, "LOGIN_PATH")?;
        let logout_path = path_or_default(lookup("LOGOUT_PATH"), DEFAULT_LOGOUT_PATH, "LOGOUT_PATH")?;

        let apps_file = lookup("APPS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("apps.json"));
        let users_file = lookup("USERS_FILE").map(PathBuf::from);

        let poll_secs = lookup("REGISTRY_POLL_SECS")
            .map(|val| val.parse::<u64>())
            .unwrap_or(Ok(5))
            .map_err(|_| AppError::configuration("REGISTRY_POLL_SECS must be a valid integer"))?;

        let port = lookup("APP_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8000);

        Ok(Self {
            auth,
            admin_roles,
            login_path,
            logout_path,
            apps_file,
            users_file,
            registry_poll: Duration::from_secs(poll_secs.max(1)),
            port,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn path_or_default(value: Option<String>, default: &str, key: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default.to_string()),
        Some(path) if path.starts_with('/') => Ok(path),
        Some(path) => Err(AppError::configuration(format!("{key} must start with '/', got '{path}'"))),
    }
}
