use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::decision::{decide, AuthorizationMode, Decision};
use super::principal::Principal;
use super::roles::RoleResolver;
use super::rules::{AccessRule, AuthorizationRuleBuilder};
use crate::errors::AppError;
use crate::models::application::Application;
use crate::registry::AppSnapshot;

/// Immutable, fully built rule set valid at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSnapshot {
    pub version: u64,
    pub mode: AuthorizationMode,
    /// When enforced, strategy filters sit just before the authenticated catch-all.
    /// When disabled, only strategy filters.
    pub rules: Vec<AccessRule>,
    pub apps: Vec<Application>,
    pub built_at: DateTime<Utc>,
}

impl RuleSnapshot {
    pub fn evaluate(&self, path: &str, principal: Option<&Principal>) -> Decision {
        match self.mode {
            AuthorizationMode::Enforced => decide(self.mode, &self.rules, path, principal),
            AuthorizationMode::Disabled => {
                if self.rules.iter().any(|r| r.pattern.matches(path)) {
                    decide(AuthorizationMode::Enforced, &self.rules, path, principal)
                } else {
                    decide(self.mode, &self.rules, path, principal)
                }
            }
        }
    }
}

/// Holds the current [`RuleSnapshot`] for lock-free reads.
///
/// Readers call [`RuleStore::load`] once per request and keep the `Arc` they got.
/// Rebuilds are serialized and publish with a single pointer swap, so a reader
/// sees either the previous or the next rule set and never a partial one.
pub struct RuleStore {
    current: ArcSwap<RuleSnapshot>,
    rebuild_lock: Mutex<()>,
    builder: AuthorizationRuleBuilder,
    resolver: RoleResolver,
    mode: AuthorizationMode,
    strategy_filters: Vec<AccessRule>,
}

impl RuleStore {
    /// Builds the first snapshot. Failure here means the gateway must not start.
    pub fn initialize(
        builder: AuthorizationRuleBuilder,
        resolver: RoleResolver,
        mode: AuthorizationMode,
        strategy_filters: Vec<AccessRule>,
        apps: Vec<Application>,
    ) -> Result<Self, AppError> {
        let first = build_snapshot(&builder, &resolver, mode, &strategy_filters, apps, 1)?;
        tracing::info!(version = first.version, rules = first.rules.len(), mode = ?mode, "rule snapshot built");

        Ok(Self {
            current: ArcSwap::from_pointee(first),
            rebuild_lock: Mutex::new(()),
            builder,
            resolver,
            mode,
            strategy_filters,
        })
    }

    pub fn load(&self) -> Arc<RuleSnapshot> {
        self.current.load_full()
    }

    /// On error the previous snapshot stays published.
    pub fn rebuild(&self, apps: Vec<Application>) -> Result<Arc<RuleSnapshot>, AppError> {
        let _guard = self.rebuild_lock.lock().unwrap_or_else(|e| e.into_inner());

        let version = self.current.load().version + 1;
        let next = match build_snapshot(&self.builder, &self.resolver, self.mode, &self.strategy_filters, apps, version) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    kept_version = version - 1,
                    "rule rebuild failed; keeping previous snapshot"
                );
                return Err(err);
            }
        };

        self.current.store(next.clone());
        tracing::info!(version = next.version, rules = next.rules.len(), "rule snapshot swapped");
        Ok(next)
    }
}

fn build_snapshot(
    builder: &AuthorizationRuleBuilder,
    resolver: &RoleResolver,
    mode: AuthorizationMode,
    strategy_filters: &[AccessRule],
    apps: Vec<Application>,
    version: u64,
) -> Result<RuleSnapshot, AppError> {
    // Rules, the index and `/app/:name` all read names from here.
    let apps: Vec<Application> = apps.into_iter().map(Application::normalized).collect();

    let rules = match mode {
        AuthorizationMode::Enforced => builder.build(&apps, resolver.admin_roles(), strategy_filters)?,
        AuthorizationMode::Disabled => strategy_filters.to_vec(),
    };

    Ok(RuleSnapshot {
        version,
        mode,
        rules,
        apps,
        built_at: Utc::now(),
    })
}

/// Rebuilds the store each time a new registry snapshot is published.
///
/// Only the latest published snapshot is built, so triggers arriving during a
/// rebuild are coalesced.
pub async fn run_rebuild_worker(store: Arc<RuleStore>, mut rx: watch::Receiver<AppSnapshot>) {
    tracing::info!("rule rebuild worker started");
    while rx.changed().await.is_ok() {
        let apps = rx.borrow_and_update().to_vec();
        let worker_store = store.clone();
        let result = tokio::task::spawn_blocking(move || worker_store.rebuild(apps)).await;
        if let Err(err) = result {
            tracing::error!(error = %err, "rule rebuild task panicked");
        }
    }
    tracing::info!("rule rebuild worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::decision::DenyReason;

    fn store(mode: AuthorizationMode, apps: Vec<Application>) -> RuleStore {
        RuleStore::initialize(
            AuthorizationRuleBuilder::new("/login", "/logout"),
            RoleResolver::new(["admin"]),
            mode,
            Vec::new(),
            apps,
        )
        .unwrap()
    }

    #[test]
    fn initialize_fails_without_admin_roles_when_enforced() {
        let err = RuleStore::initialize(
            AuthorizationRuleBuilder::new("/login", "/logout"),
            RoleResolver::new(Vec::<String>::new()),
            AuthorizationMode::Enforced,
            Vec::new(),
            Vec::new(),
        )
        .err()
        .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn disabled_mode_skips_admin_validation() {
        let store = RuleStore::initialize(
            AuthorizationRuleBuilder::new("/login", "/logout"),
            RoleResolver::new(Vec::<String>::new()),
            AuthorizationMode::Disabled,
            Vec::new(),
            Vec::new(),
        )
        .unwrap();
        assert!(store.load().evaluate("/admin", None).is_allowed());
    }

    #[test]
    fn rebuild_swaps_in_new_rules() {
        let store = store(AuthorizationMode::Enforced, vec![Application::new("calc", vec![])]);
        let user = Principal::new("u");
        let before = store.load();
        assert!(before.evaluate("/app/calc", Some(&user)).is_allowed());

        store
            .rebuild(vec![Application::new("calc", vec!["analyst".into()])])
            .unwrap();

        let after = store.load();
        assert_eq!(after.version, before.version + 1);
        assert_eq!(after.evaluate("/app/calc", Some(&user)), Decision::Deny(DenyReason::Forbidden));
        // the captured snapshot is unaffected
        assert!(before.evaluate("/app/calc", Some(&user)).is_allowed());
    }

    #[test]
    fn failed_rebuild_keeps_previous_snapshot() {
        let store = store(AuthorizationMode::Enforced, vec![Application::new("calc", vec!["a".into()])]);
        let bad = Application {
            name: String::new(),
            groups: Some(vec!["x".into()]),
            display_name: None,
            description: None,
        };
        assert!(store.rebuild(vec![bad]).is_err());
        assert_eq!(store.load().version, 1);
        assert_eq!(store.load().apps[0].name, "calc");
    }

    #[test]
    fn strategy_filters_apply_when_disabled() {
        let store = RuleStore::initialize(
            AuthorizationRuleBuilder::new("/login", "/logout"),
            RoleResolver::new(["admin"]),
            AuthorizationMode::Disabled,
            vec![AccessRule::authenticated("/private/**")],
            Vec::new(),
        )
        .unwrap();
        let snapshot = store.load();
        assert_eq!(
            snapshot.evaluate("/private/x", None),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert!(snapshot.evaluate("/app/anything", None).is_allowed());
    }

    #[test]
    fn strategy_filters_apply_when_enforced() {
        let store = RuleStore::initialize(
            AuthorizationRuleBuilder::new("/login", "/logout"),
            RoleResolver::new(["admin"]),
            AuthorizationMode::Enforced,
            vec![AccessRule::any_role("/private/**", crate::authz::roles::normalize(["ops"]))],
            Vec::new(),
        )
        .unwrap();
        let snapshot = store.load();

        let user = Principal::new("u");
        let ops = Principal::new("o").with_groups(["ops"]);
        assert_eq!(
            snapshot.evaluate("/private/x", Some(&user)),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert!(snapshot.evaluate("/private/x", Some(&ops)).is_allowed());
        assert!(snapshot.evaluate("/elsewhere", Some(&user)).is_allowed());
    }

    #[test]
    fn app_names_are_trimmed_once_for_rules_and_listing() {
        let store = store(AuthorizationMode::Enforced, vec![Application::new(" calc ", vec!["analyst".into()])]);
        let snapshot = store.load();

        assert_eq!(snapshot.apps[0].name, "calc");
        assert_eq!(
            snapshot.evaluate("/app/calc", Some(&Principal::new("bob"))),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(store(AuthorizationMode::Enforced, Vec::new()));
        let restricted: Vec<Application> = (0..50)
            .map(|i| Application::new(format!("app{i}"), vec!["g".into()]))
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = store.load();
                        let app_rules = snap.rules.iter().filter(|r| !r.required_roles.is_empty()).count();
                        // admin rule plus either zero or all fifty app rules
                        assert!(app_rules == 1 || app_rules == 51, "torn snapshot: {app_rules}");
                    }
                })
            })
            .collect();

        for i in 0..20 {
            let apps = if i % 2 == 0 { restricted.clone() } else { Vec::new() };
            store.rebuild(apps).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[tokio::test]
    async fn worker_rebuilds_on_published_snapshot() {
        let store = Arc::new(store(AuthorizationMode::Enforced, Vec::new()));
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let handle = tokio::spawn(run_rebuild_worker(store.clone(), rx));

        tx.send(Arc::new(vec![Application::new("calc", vec!["g".into()])])).unwrap();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        while store.load().version < 2 {
            assert!(tokio::time::Instant::now() < deadline, "worker never rebuilt");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(store.load().apps.len(), 1);

        drop(tx);
        handle.await.unwrap();
    }
}
