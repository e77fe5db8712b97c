//! Authorization module - path rules and request gate
//!
//! This module turns the application registry and the administrator roles into an
//! ordered list of path rules, and evaluates each request against it:
//! - Public entry points (login, logout, signup, external sign-in, static assets)
//! - Per-application group restrictions (opt-in, any-of)
//! - Administrator-only admin path
//! - Authenticated catch-all

mod decision;
pub mod middleware;
mod principal;
mod roles;
mod rules;
mod snapshot;

pub use decision::{decide, AuthorizationMode, Decision, DenyReason};
pub use middleware::{ActiveRules, CurrentPrincipal};
pub use principal::Principal;
pub use roles::{normalize, Role, RoleResolver, RoleSet};
pub use rules::{
    app_path, normalize_path, AccessRule, AuthorizationRuleBuilder, PathPattern, ADMIN_PATH,
    PUBLIC_ENTRY_POINTS,
};
pub use snapshot::{run_rebuild_worker, RuleSnapshot, RuleStore};
