use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::authz::Principal;
use crate::events::{publish_auth_event, AuthEventKind, EventBus, RequestContext};
use crate::jwt::clear_session_cookie_header;

/// Publishes authentication outcomes and performs logout.
#[derive(Clone)]
pub struct SessionLifecycleHandler {
    event_bus: EventBus,
    login_path: String,
}

impl SessionLifecycleHandler {
    pub fn new(event_bus: EventBus, login_path: impl Into<String>) -> Self {
        Self {
            event_bus,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn on_success(&self, username: &str, headers: &HeaderMap) {
        publish_auth_event(
            &self.event_bus,
            AuthEventKind::Success,
            Some(username),
            None,
            Some(RequestContext::from_headers(headers)),
        );
    }

    pub fn on_failure(&self, username: Option<&str>, reason: impl Into<String>, headers: &HeaderMap) {
        publish_auth_event(
            &self.event_bus,
            AuthEventKind::Failure,
            username,
            Some(reason.into()),
            Some(RequestContext::from_headers(headers)),
        );
    }

    /// Clears the session cookie and sends the caller to the login entry point.
    /// Works for anonymous callers too.
    pub fn logout(&self, principal: Option<&Principal>, headers: &HeaderMap) -> Response {
        if let Some(principal) = principal {
            publish_auth_event(
                &self.event_bus,
                AuthEventKind::Logout,
                Some(&principal.username),
                None,
                Some(RequestContext::from_headers(headers)),
            );
        }

        (
            StatusCode::SEE_OTHER,
            [
                (header::LOCATION, self.login_path.clone()),
                (header::SET_COOKIE, clear_session_cookie_header()),
            ],
        )
            .into_response()
    }
}
