use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Serialize, Serializer};

use super::roles::{normalize, RoleSet};
use crate::errors::AppError;
use crate::models::application::Application;

/// Path matcher for an [`AccessRule`]. Only a single trailing wildcard is supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// `/app/calc` matches `/app/calc` and `/app/calc/`.
    Exact(String),
    /// `/signin/**` matches `/signin` and everything under it.
    Prefix(String),
    /// `/**`
    Any,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let trimmed = pattern
            .strip_suffix("/**")
            .or_else(|| pattern.strip_suffix("/*"));

        match trimmed {
            Some("") => PathPattern::Any,
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.trim_end_matches('/').to_string()),
        }
    }

    /// `path` is expected to be normalized with [`normalize_path`].
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(exact) => path.trim_end_matches('/') == exact,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(p) if p.is_empty() => f.write_str("/"),
            PathPattern::Exact(p) => f.write_str(p),
            PathPattern::Prefix(p) => write!(f, "{p}/**"),
            PathPattern::Any => f.write_str("/**"),
        }
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Percent-decodes the request path and collapses repeated slashes, so rules see the
/// same segments the router hands to `Path` extractors. `/app/%63alc` and
/// `//app//calc` both become `/app/calc`.
pub fn normalize_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut out = String::with_capacity(decoded.len() + 1);
    if !decoded.starts_with('/') {
        out.push('/');
    }
    let mut prev_slash = false;
    for ch in decoded.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessRule {
    pub pattern: PathPattern,
    /// Any-of. Empty means any authenticated principal.
    pub required_roles: RoleSet,
    pub public: bool,
}

impl AccessRule {
    pub fn public(pattern: &str) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            required_roles: RoleSet::new(),
            public: true,
        }
    }

    pub fn authenticated(pattern: &str) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            required_roles: RoleSet::new(),
            public: false,
        }
    }

    pub fn any_role(pattern: &str, roles: RoleSet) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            required_roles: roles,
            public: false,
        }
    }
}

pub const ADMIN_PATH: &str = "/admin";
pub const APP_PATH_PREFIX: &str = "/app/";

/// Paths that never require a principal, besides the configured login and logout paths.
pub const PUBLIC_ENTRY_POINTS: &[&str] = &["/signup", "/signin/**", "/css/**", "/webjars/**", "/api/health"];

pub fn app_path(name: &str) -> String {
    format!("{APP_PATH_PREFIX}{name}")
}

/// Builds the ordered rule list consulted by [`super::decide`].
#[derive(Debug, Clone)]
pub struct AuthorizationRuleBuilder {
    login_path: String,
    logout_path: String,
}

impl AuthorizationRuleBuilder {
    pub fn new(login_path: impl Into<String>, logout_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            logout_path: logout_path.into(),
        }
    }

    /// Rule order is evaluation order: first match wins. Applications are visited in
    /// registry order, so a later app whose path collides with an earlier rule never wins.
    /// `strategy_filters` go after the admin rule and before the authenticated catch-all.
    pub fn build(
        &self,
        apps: &[Application],
        admin_roles: &RoleSet,
        strategy_filters: &[AccessRule],
    ) -> Result<Vec<AccessRule>, AppError> {
        if admin_roles.is_empty() {
            return Err(AppError::configuration(
                "admin roles must not be empty while authorization is enforced",
            ));
        }

        let mut rules =
            Vec::with_capacity(apps.len() + PUBLIC_ENTRY_POINTS.len() + strategy_filters.len() + 4);

        rules.push(AccessRule::public(&self.login_path));
        rules.push(AccessRule::public(&self.logout_path));
        rules.extend(PUBLIC_ENTRY_POINTS.iter().map(|p| AccessRule::public(p)));

        for app in apps {
            if app.name.trim().is_empty() {
                return Err(AppError::configuration("application entry without a name"));
            }
            if !app.is_restricted() {
                continue;
            }
            let roles = normalize(app.groups.as_deref().unwrap_or_default());
            if roles.is_empty() {
                continue;
            }
            rules.push(AccessRule::any_role(&app_path(&app.name), roles));
        }

        rules.push(AccessRule::any_role(ADMIN_PATH, admin_roles.clone()));
        rules.extend(strategy_filters.iter().cloned());
        rules.push(AccessRule::authenticated("/**"));

        Ok(rules)
    }
}
