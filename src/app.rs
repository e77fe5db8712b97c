use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{wire_strategy, AuthenticationStrategy, IdentitySource, SessionLifecycleHandler};
use crate::authz::{middleware, AuthorizationMode, AuthorizationRuleBuilder, RoleResolver, RuleStore, ADMIN_PATH};
use crate::config::GatewayConfig;
use crate::errors::AppError;
use crate::events::EventBus;
use crate::registry::AppRegistry;
use crate::routes::{admin, apps, health, index, session};

#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleStore>,
    pub identity: Arc<dyn IdentitySource>,
    pub session: SessionLifecycleHandler,
    pub registry: Arc<dyn AppRegistry>,
}

/// Router plus the rule store the background rebuild worker must keep fresh.
pub struct Gateway {
    pub router: Router,
    pub rules: Arc<RuleStore>,
}

/// Wires the strategy, builds the first rule snapshot and mounts the routes.
///
/// Fails when the registry cannot be read or the first snapshot cannot be built;
/// the gateway refuses to start without a valid rule set.
pub async fn create_app(
    config: &GatewayConfig,
    registry: Arc<dyn AppRegistry>,
    strategy: Arc<dyn AuthenticationStrategy>,
    event_bus: EventBus,
) -> Result<Gateway, AppError> {
    let wiring = wire_strategy(strategy.as_ref(), &config.login_path, &config.logout_path);

    let apps = registry.snapshot().await?;
    let store = Arc::new(RuleStore::initialize(
        AuthorizationRuleBuilder::new(config.login_path.clone(), config.logout_path.clone()),
        RoleResolver::new(&config.admin_roles),
        wiring.mode,
        wiring.filters,
        apps,
    )?);

    let state = AppState {
        rules: store.clone(),
        identity: wiring.identity,
        session: SessionLifecycleHandler::new(event_bus, config.login_path.clone()),
        registry,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let mut core_routes = Router::new()
        .route("/", get(index::index))
        .route("/app/:name", get(apps::open_app))
        .route(ADMIN_PATH, get(admin::overview))
        .route("/api/health", get(health::health));

    if wiring.mode == AuthorizationMode::Enforced {
        core_routes = core_routes.route(
            &config.logout_path,
            get(session::logout).post(session::logout),
        );
    }

    // Strategy routes are merged after the core routes.
    let router = core_routes
        .merge(wiring.routes)
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::enforce))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(Gateway { router, rules: store })
}
