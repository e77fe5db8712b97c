use super::strategy::{AuthenticationStrategy, IdentitySink, SessionFlow};

/// No login and no path rules; every request is let through.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneStrategy;

impl AuthenticationStrategy for NoneStrategy {
    fn name(&self) -> &'static str {
        "none"
    }

    fn has_authorization(&self) -> bool {
        false
    }

    fn configure_session_flow(&self, _flow: &mut SessionFlow) {}

    fn configure_identity_source(&self, _identity: &mut IdentitySink) {}
}
