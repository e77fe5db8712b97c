#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;
use tokio::sync::broadcast;

use app_gate::auth::simple::SimpleStrategy;
use app_gate::auth::AuthenticationStrategy;
use app_gate::config::GatewayConfig;
use app_gate::events::init_event_bus;
use app_gate::jwt::JwtConfig;
use app_gate::models::application::Application;
use app_gate::models::user::UserAccount;
use app_gate::registry::StaticAppRegistry;
use app_gate::utils::hash_password;
use app_gate::{create_app, Gateway};

pub const SECRET: &str = "test-secret";

pub struct TestGateway {
    pub gateway: Gateway,
    pub registry: Arc<StaticAppRegistry>,
    pub events: broadcast::Receiver<Value>,
}

pub fn jwt() -> JwtConfig {
    JwtConfig::new(SECRET, 1).expect("jwt config")
}

pub fn scenario_apps() -> Vec<Application> {
    vec![
        Application::new("calc", vec!["analyst".to_string()]),
        Application::new("public-app", Vec::new()),
    ]
}

pub fn config() -> Result<GatewayConfig> {
    Ok(GatewayConfig::from_lookup(|key| match key {
        "ADMIN_ROLES" => Some("ADMIN".to_string()),
        _ => None,
    })?)
}

pub fn simple_strategy() -> Result<Arc<dyn AuthenticationStrategy>> {
    let users = vec![
        UserAccount {
            name: "ann".to_string(),
            password_hash: hash_password("analyst-pass")?,
            groups: vec!["analyst".to_string()],
        },
        UserAccount {
            name: "root".to_string(),
            password_hash: hash_password("admin-pass")?,
            groups: vec!["admin".to_string()],
        },
    ];
    Ok(Arc::new(SimpleStrategy::new(users, jwt())?))
}

pub async fn start(apps: Vec<Application>, strategy: Arc<dyn AuthenticationStrategy>) -> Result<TestGateway> {
    let registry = Arc::new(StaticAppRegistry::new(apps));
    let (bus, events) = init_event_bus();
    let gateway = create_app(&config()?, registry.clone(), strategy, bus).await?;
    Ok(TestGateway {
        gateway,
        registry,
        events,
    })
}

pub fn bearer(username: &str, groups: &[&str]) -> String {
    let groups: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
    let token = jwt().encode(username, &groups).expect("token");
    format!("Bearer {token}")
}

pub fn get(uri: &str, auth: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    Ok(builder.body(Body::empty())?)
}

pub async fn json_body(resp: Response) -> Result<Value> {
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
