use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor: Option<String>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: impl Into<String>, actor: Option<String>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            actor,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

/// Request context attached to authentication events (IP, User-Agent)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Extract context from Axum request headers
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthEventKind {
    Success,
    Failure,
    Logout,
}

impl AuthEventKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            AuthEventKind::Success => "auth.success",
            AuthEventKind::Failure => "auth.failure",
            AuthEventKind::Logout => "auth.logout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEventPayload {
    pub kind: AuthEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
}

/// Fire and forget: a full or receiver-less bus must never fail the request.
pub fn publish_auth_event(
    event_bus: &EventBus,
    kind: AuthEventKind,
    username: Option<&str>,
    reason: Option<String>,
    context: Option<RequestContext>,
) {
    let event = DomainEvent::new(
        kind.event_name(),
        username.map(String::from),
        AuthEventPayload { kind, reason, context },
    );

    let _ = event_bus.send(serde_json::to_value(event).unwrap_or_default());
}

pub async fn start_auth_event_listener(mut rx: broadcast::Receiver<Value>) {
    tracing::info!("Auth event listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "auth event listener lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let name = event.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
        let actor = event.get("actor").and_then(|v| v.as_str()).unwrap_or("-");
        let ip = event
            .get("payload")
            .and_then(|p| p.get("context"))
            .and_then(|c| c.get("ip"))
            .and_then(|v| v.as_str())
            .unwrap_or("-");

        match name {
            "auth.failure" => {
                let reason = event
                    .get("payload")
                    .and_then(|p| p.get("reason"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                tracing::warn!(user = %actor, ip = %ip, reason = %reason, "authentication failed");
            }
            "auth.success" => tracing::info!(user = %actor, ip = %ip, "authentication succeeded"),
            "auth.logout" => tracing::info!(user = %actor, ip = %ip, "user logged out"),
            _ => tracing::debug!(event = %name, "unhandled event"),
        }
    }
    tracing::info!("Auth event listener stopped");
}
