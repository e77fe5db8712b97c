use serde::Serialize;

use super::principal::Principal;
use super::rules::AccessRule;

/// Whether path rules are evaluated at all for this request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationMode {
    Enforced,
    Disabled,
}

impl AuthorizationMode {
    pub fn from_capability(has_authorization: bool) -> Self {
        if has_authorization {
            AuthorizationMode::Enforced
        } else {
            AuthorizationMode::Disabled
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No principal; the caller should be sent to the login entry point.
    Unauthenticated,
    /// Principal present but holds none of the required roles.
    Forbidden,
    /// No rule matched the path.
    NoMatchingRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluates `path` against `rules` in order. The first matching rule decides.
///
/// Evaluation per matching rule:
/// 1. public -> allow
/// 2. no principal -> deny (unauthenticated)
/// 3. no required roles -> allow
/// 4. principal holds any required role -> allow, else deny (forbidden)
///
/// `path` must already be normalized. Absence of a match is a deny.
pub fn decide(
    mode: AuthorizationMode,
    rules: &[AccessRule],
    path: &str,
    principal: Option<&Principal>,
) -> Decision {
    if mode == AuthorizationMode::Disabled {
        return Decision::Allow;
    }

    let Some(rule) = rules.iter().find(|rule| rule.pattern.matches(path)) else {
        tracing::warn!(path = %path, "no access rule matched; denying");
        return Decision::Deny(DenyReason::NoMatchingRule);
    };

    if rule.public {
        return Decision::Allow;
    }

    let Some(principal) = principal else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    if rule.required_roles.is_empty() || principal.has_any_role(&rule.required_roles) {
        return Decision::Allow;
    }

    tracing::debug!(
        user = %principal.username,
        path = %path,
        pattern = %rule.pattern,
        "missing required role"
    );
    Decision::Deny(DenyReason::Forbidden)
}
