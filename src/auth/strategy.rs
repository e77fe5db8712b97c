use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::MethodRouter;
use axum::Router;

use crate::app::AppState;
use crate::authz::{AccessRule, AuthorizationMode, Principal};
use crate::config::{AuthKind, GatewayConfig};
use crate::errors::AppError;
use crate::jwt::JwtConfig;

use super::none::NoneStrategy;
use super::simple::SimpleStrategy;

/// Resolves the caller of a request. `None` means anonymous.
pub trait IdentitySource: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Identity source that never yields a principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentitySource for AnonymousIdentity {
    fn resolve(&self, _headers: &HeaderMap) -> Option<Principal> {
        None
    }
}

/// Receives the identity source a strategy wants installed.
#[derive(Default)]
pub struct IdentitySink {
    source: Option<Arc<dyn IdentitySource>>,
}

impl IdentitySink {
    pub fn install(&mut self, source: Arc<dyn IdentitySource>) {
        self.source = Some(source);
    }

    fn into_source(self) -> Arc<dyn IdentitySource> {
        self.source.unwrap_or_else(|| Arc::new(AnonymousIdentity))
    }
}

/// Receives login/logout wiring and extra request filters from a strategy.
///
/// Filters are appended after the core rules, so they can never take precedence
/// over an application or admin rule.
pub struct SessionFlow {
    login_path: String,
    logout_path: String,
    routes: Router<AppState>,
    filters: Vec<AccessRule>,
}

impl SessionFlow {
    pub fn new(login_path: impl Into<String>, logout_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            logout_path: logout_path.into(),
            routes: Router::new(),
            filters: Vec::new(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn logout_path(&self) -> &str {
        &self.logout_path
    }

    pub fn route(&mut self, path: &str, method_router: MethodRouter<AppState>) {
        let routes = std::mem::take(&mut self.routes);
        self.routes = routes.route(path, method_router);
    }

    pub fn filter(&mut self, rule: AccessRule) {
        self.filters.push(rule);
    }
}

/// Capability interface implemented by each authentication backend.
pub trait AuthenticationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// When false, path rules are not built and every request passes except
    /// for the strategy's own filters.
    fn has_authorization(&self) -> bool;

    fn configure_session_flow(&self, flow: &mut SessionFlow);

    fn configure_identity_source(&self, identity: &mut IdentitySink);
}

/// Everything a strategy contributed during one configuration cycle.
pub struct StrategyWiring {
    pub mode: AuthorizationMode,
    pub routes: Router<AppState>,
    pub filters: Vec<AccessRule>,
    pub identity: Arc<dyn IdentitySource>,
}

/// Invokes the strategy exactly once and collects its contributions.
pub fn wire_strategy(strategy: &dyn AuthenticationStrategy, login_path: &str, logout_path: &str) -> StrategyWiring {
    let mode = AuthorizationMode::from_capability(strategy.has_authorization());

    let mut flow = SessionFlow::new(login_path, logout_path);
    strategy.configure_session_flow(&mut flow);

    let mut identity = IdentitySink::default();
    strategy.configure_identity_source(&mut identity);

    tracing::info!(
        strategy = strategy.name(),
        mode = ?mode,
        filters = flow.filters.len(),
        "authentication strategy configured"
    );

    StrategyWiring {
        mode,
        routes: flow.routes,
        filters: flow.filters,
        identity: identity.into_source(),
    }
}

/// Picks the strategy named by `AUTH_MODE`. Selected once at startup.
pub fn select_strategy(config: &GatewayConfig) -> Result<Arc<dyn AuthenticationStrategy>, AppError> {
    match config.auth {
        AuthKind::None => Ok(Arc::new(NoneStrategy)),
        AuthKind::Simple => {
            let users_file = config
                .users_file
                .as_ref()
                .ok_or_else(|| AppError::configuration("USERS_FILE not set for simple authentication"))?;
            let jwt = JwtConfig::from_env()?;
            Ok(Arc::new(SimpleStrategy::from_file(users_file, jwt)?))
        }
    }
}
