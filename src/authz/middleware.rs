use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::decision::{Decision, DenyReason};
use super::principal::Principal;
use super::rules::normalize_path;
use super::snapshot::RuleSnapshot;
use crate::app::AppState;
use crate::errors::AppError;

/// Gate applied in front of every route.
///
/// The rule snapshot is loaded once and stored in the request extensions together
/// with the resolved principal, so handlers see the same rules the gate used.
pub async fn enforce(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = normalize_path(req.uri().path());
    let snapshot = state.rules.load();
    let principal = state.identity.resolve(req.headers());

    match snapshot.evaluate(&path, principal.as_ref()) {
        Decision::Allow => {
            req.extensions_mut().insert(CurrentPrincipal(principal));
            req.extensions_mut().insert(ActiveRules(snapshot));
            next.run(req).await
        }
        Decision::Deny(DenyReason::Unauthenticated) => {
            tracing::debug!(path = %path, "unauthenticated; redirecting to login");
            Redirect::to(state.session.login_path()).into_response()
        }
        Decision::Deny(DenyReason::Forbidden) => {
            AppError::forbidden(format!("insufficient role for {path}")).into_response()
        }
        Decision::Deny(DenyReason::NoMatchingRule) => {
            AppError::forbidden(format!("no access rule for {path}")).into_response()
        }
    }
}

/// Principal of the current request, `None` for anonymous callers.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentPrincipal>()
            .cloned()
            .unwrap_or(CurrentPrincipal(None)))
    }
}

/// Rule snapshot the gate evaluated for this request.
#[derive(Debug, Clone)]
pub struct ActiveRules(pub Arc<RuleSnapshot>);

#[async_trait]
impl FromRequestParts<AppState> for ActiveRules {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ActiveRules>()
            .cloned()
            .unwrap_or_else(|| ActiveRules(state.rules.load())))
    }
}
