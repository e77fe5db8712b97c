//! Application registry - source of hosted application definitions
//!
//! The registry itself is an external collaborator. This module only defines the
//! seam ([`AppRegistry`]), a JSON file backed implementation, and the poller that
//! publishes changed snapshots to the rule rebuild worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::errors::AppError;
use crate::models::application::Application;

pub type AppSnapshot = Arc<Vec<Application>>;

#[async_trait]
pub trait AppRegistry: Send + Sync {
    /// Current applications in registry iteration order.
    async fn snapshot(&self) -> Result<Vec<Application>, AppError>;
}

/// Reads a JSON array of applications from disk on every snapshot.
#[derive(Debug, Clone)]
pub struct FileAppRegistry {
    path: PathBuf,
}

impl FileAppRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AppRegistry for FileAppRegistry {
    async fn snapshot(&self) -> Result<Vec<Application>, AppError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|err| AppError::registry(format!("failed to read {}: {err}", self.path.display())))?;

        parse_apps(&raw)
            .map_err(|err| AppError::registry(format!("invalid registry file {}: {err}", self.path.display())))
    }
}

pub fn parse_apps(raw: &[u8]) -> Result<Vec<Application>, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Fixed in-memory registry, swapped wholesale with [`StaticAppRegistry::replace`].
#[derive(Debug, Default)]
pub struct StaticAppRegistry {
    apps: std::sync::RwLock<Vec<Application>>,
}

impl StaticAppRegistry {
    pub fn new(apps: Vec<Application>) -> Self {
        Self {
            apps: std::sync::RwLock::new(apps),
        }
    }

    pub fn replace(&self, apps: Vec<Application>) {
        let mut guard = self.apps.write().unwrap_or_else(|e| e.into_inner());
        *guard = apps;
    }
}

#[async_trait]
impl AppRegistry for StaticAppRegistry {
    async fn snapshot(&self) -> Result<Vec<Application>, AppError> {
        Ok(self.apps.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

/// Polls `registry` and publishes a new snapshot only when its content changed.
///
/// Publishing through a `watch` channel means bursts of changes collapse into the
/// latest value before the rebuild worker wakes.
pub async fn poll_registry(
    registry: Arc<dyn AppRegistry>,
    interval: Duration,
    tx: watch::Sender<AppSnapshot>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let apps = match registry.snapshot().await {
            Ok(apps) => apps,
            Err(err) => {
                tracing::warn!(error = %err, "registry poll failed; keeping current rules");
                continue;
            }
        };

        let changed = tx.send_if_modified(|current| {
            if current.as_slice() == apps.as_slice() {
                false
            } else {
                *current = Arc::new(apps);
                true
            }
        });

        if changed {
            tracing::info!("application registry changed");
        }

        if tx.is_closed() {
            tracing::info!("rebuild worker gone; registry poller stopping");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn file_registry_preserves_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"zeta","groups":["a"]}},{{"name":"alpha"}}]"#
        )
        .unwrap();

        let registry = FileAppRegistry::new(file.path());
        let apps = registry.snapshot().await.unwrap();
        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn file_registry_reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = FileAppRegistry::new(file.path()).snapshot().await.unwrap_err();
        assert!(matches!(err, AppError::Registry(_)));
    }

    #[tokio::test]
    async fn poller_publishes_only_changes() {
        let registry = Arc::new(StaticAppRegistry::new(vec![Application::new("a", vec![])]));
        let (tx, mut rx) = watch::channel(Arc::new(vec![Application::new("a", vec![])]));

        let handle = tokio::spawn(poll_registry(
            registry.clone(),
            Duration::from_millis(10),
            tx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!rx.has_changed().unwrap());

        registry.replace(vec![Application::new("b", vec!["g".into()])]);
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow().first().map(|a| a.name.clone()), Some("b".to_string()));

        handle.abort();
    }
}
