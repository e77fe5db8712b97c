use std::sync::Arc;

use tokio::sync::watch;

use app_gate::auth::select_strategy;
use app_gate::authz::run_rebuild_worker;
use app_gate::config::GatewayConfig;
use app_gate::events::{init_event_bus, start_auth_event_listener};
use app_gate::registry::{poll_registry, AppRegistry, FileAppRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = GatewayConfig::from_env()?;
    let strategy = select_strategy(&config)?;
    let registry: Arc<dyn AppRegistry> = Arc::new(FileAppRegistry::new(config.apps_file.clone()));

    let (event_bus, event_rx) = init_event_bus();
    tokio::spawn(start_auth_event_listener(event_rx));

    let gateway = app_gate::create_app(&config, registry.clone(), strategy, event_bus).await?;

    // Seed the channel with what the first snapshot was built from so the poller
    // only publishes real changes.
    let (registry_tx, registry_rx) = watch::channel(Arc::new(gateway.rules.load().apps.clone()));
    tokio::spawn(run_rebuild_worker(gateway.rules.clone(), registry_rx));
    tokio::spawn(poll_registry(registry, config.registry_poll, registry_tx));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, gateway.router.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
