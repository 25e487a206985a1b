//! Event dispatch around a [`CachePolicyEngine`].
//!
//! [`WorkerHost`] plays the runtime's part: it forwards lifecycle, fetch and
//! message events to the engine and applies the transitions the engine asks
//! for (`skip waiting`, `claim clients`) to the [`Registration`].

pub mod registration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::Error;
use crate::cache::CacheStorage;
use crate::engine::{ActivateReport, CachePolicyEngine, ControlCommand, InstallReport, ReprovisionReport, Routed};
use crate::network::Network;
use crate::request::FetchRequest;

pub use registration::{Registration, Waiting};

/// Outcome of an activation attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Activation {
    /// The waiting generation took over.
    Activated {
        report: ActivateReport,
        replaced: Option<String>,
        claimed: usize,
        reprovision: Option<ReprovisionReport>,
    },
    /// Old-generation contexts are still open and skip waiting was not requested.
    Waiting { controlled_by_active: usize },
    /// Nothing is installed and waiting.
    Idle,
    /// Activation was attempted as a consequence of another event and failed.
    /// The generation stays waiting; a later activation retries.
    Failed { reason: String },
}

/// Result of delivering a control message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    pub recognized: bool,
    pub activation: Option<Activation>,
}

/// Result of an install event, including any immediate handover.
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub report: InstallReport,
    pub activation: Activation,
}

/// Point-in-time view of the registration.
#[derive(Debug, Clone, Serialize)]
pub struct HostStatus {
    pub engine_version: String,
    pub registration: Registration,
}

/// Runtime host for one engine generation.
pub struct WorkerHost<S, N> {
    engine: CachePolicyEngine<S, N>,
    registration: Mutex<Registration>,
}

impl<S: CacheStorage, N: Network> WorkerHost<S, N> {
    pub fn new(engine: CachePolicyEngine<S, N>) -> Self {
        Self::with_registration(engine, Registration::new())
    }

    /// Host a new generation over an existing registration (e.g. one where
    /// an older version is still active).
    pub fn with_registration(engine: CachePolicyEngine<S, N>, registration: Registration) -> Self {
        Self { engine, registration: Mutex::new(registration) }
    }

    pub fn engine(&self) -> &CachePolicyEngine<S, N> {
        &self.engine
    }

    pub async fn status(&self) -> HostStatus {
        HostStatus {
            engine_version: self.engine.version().to_string(),
            registration: self.registration.lock().await.clone(),
        }
    }

    /// Install event: provision, record the generation as waiting, then try
    /// to hand over.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let report = self.engine.install().await?;
        self.registration
            .lock()
            .await
            .installed(self.engine.version(), report.skip_waiting);

        let activation = self.activate_after_event().await;
        Ok(InstallOutcome { report, activation })
    }

    /// Activate event, if the waiting generation is allowed to take over.
    ///
    /// On failure the generation stays waiting, so a later call retries.
    pub async fn activate(&self) -> Result<Activation, Error> {
        let (report, replaced, claimed) = {
            let mut registration = self.registration.lock().await;

            match registration.waiting() {
                None => return Ok(Activation::Idle),
                Some(waiting) if waiting.version != self.engine.version() => {
                    return Err(Error::NotInstalled(format!(
                        "waiting generation {} is not hosted here ({})",
                        waiting.version,
                        self.engine.version()
                    )));
                }
                Some(_) => {}
            }
            if !registration.ready_to_activate() {
                let controlled_by_active = registration.controlled_by_active();
                tracing::debug!(controlled_by_active, "activation deferred until old contexts close");
                return Ok(Activation::Waiting { controlled_by_active });
            }

            let report = self.engine.activate().await?;
            let replaced = registration.promote();
            let claimed = if report.claim_clients { registration.claim() } else { 0 };
            tracing::info!(version = %report.version, ?replaced, claimed, "generation took control");
            (report, replaced, claimed)
        };

        let reprovision = self.engine.reprovision().await;
        Ok(Activation::Activated { report, replaced, claimed, reprovision })
    }

    /// Activation triggered by install, a message or a closing context. Its
    /// failure belongs to the activation, not to the triggering event.
    async fn activate_after_event(&self) -> Activation {
        match self.activate().await {
            Ok(activation) => activation,
            Err(e) => {
                tracing::warn!(version = %self.engine.version(), error = %e, "activation failed, generation stays waiting");
                Activation::Failed { reason: e.to_string() }
            }
        }
    }

    /// Message event from a controlled context.
    pub async fn message(&self, message: &serde_json::Value) -> Result<MessageOutcome, Error> {
        match self.engine.handle_message(message) {
            Some(ControlCommand::SkipWaiting) => {
                let pending = self.registration.lock().await.skip_waiting();
                let activation = if pending { Some(self.activate_after_event().await) } else { None };
                Ok(MessageOutcome { recognized: true, activation })
            }
            None => Ok(MessageOutcome { recognized: false, activation: None }),
        }
    }

    pub async fn open_context(&self, id: &str) {
        self.registration.lock().await.open_context(id);
    }

    /// Close a context; the last old-generation context closing lets a
    /// waiting generation activate.
    pub async fn close_context(&self, id: &str) -> Result<Option<Activation>, Error> {
        let closed = self.registration.lock().await.close_context(id);
        if !closed {
            return Err(Error::InvalidInput(format!("unknown context: {id}")));
        }
        match self.activate_after_event().await {
            Activation::Idle => Ok(None),
            activation => Ok(Some(activation)),
        }
    }

    /// Fetch event. Requests from contexts this generation does not control
    /// (or with no context, before activation) are not intercepted.
    pub async fn fetch(&self, context: Option<&str>, request: &FetchRequest) -> Result<Routed, Error> {
        let controlled = {
            let registration = self.registration.lock().await;
            let version = self.engine.version();
            match context {
                Some(id) => registration.controller_of(id) == Some(version),
                None => registration.active() == Some(version),
            }
        };

        if !controlled {
            tracing::debug!(url = %request.url, context, "request from uncontrolled context");
            return Ok(Routed::Passthrough);
        }
        self.engine.handle_fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;
    use crate::cache::CacheDb;
    use crate::engine::{EngineConfig, ServedFrom};
    use crate::testing::{CountingStorage, StubNetwork};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use url::Url;

    const ORIGIN: &str = "https://app.example.com";

    async fn host(
        version: &str, skip_waiting_on_install: bool, registration: Registration,
    ) -> WorkerHost<CacheDb, StubNetwork> {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        host_with(version, skip_waiting_on_install, registration, store).0
    }

    fn host_with<S: CacheStorage>(
        version: &str, skip_waiting_on_install: bool, registration: Registration, store: Arc<S>,
    ) -> (WorkerHost<S, StubNetwork>, Arc<StubNetwork>) {
        let app = AppConfig {
            origin: ORIGIN.into(),
            version: version.into(),
            skip_waiting_on_install,
            ..Default::default()
        };
        let network = Arc::new(StubNetwork::new());
        network.serve_ok(&format!("{ORIGIN}/"), "root");
        network.serve_ok(&format!("{ORIGIN}/index.html"), "shell");
        network.serve_ok(&format!("{ORIGIN}/manifest.json"), "{}");
        let engine = CachePolicyEngine::new(EngineConfig::from_app(&app).unwrap(), store, Arc::clone(&network));
        (WorkerHost::with_registration(engine, registration), network)
    }

    /// Storage holding a stale "v1" store that cannot be deleted.
    async fn undeletable_v1() -> Arc<CountingStorage> {
        let storage = Arc::new(CountingStorage::new().await);
        storage.inner.open("v1").await.unwrap();
        storage.fail_deletes.store(true, Ordering::SeqCst);
        storage
    }

    /// v1 active and controlling "tab-1".
    fn old_generation() -> Registration {
        let mut reg = Registration::new();
        reg.installed("v1", true);
        reg.promote();
        reg.open_context("tab-1");
        reg
    }

    fn page(path: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(&format!("{ORIGIN}{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_first_install_activates_and_claims() {
        let host = host("v1", true, Registration::new()).await;
        host.open_context("tab-1").await;

        let outcome = host.install().await.unwrap();

        assert!(matches!(outcome.activation, Activation::Activated { claimed: 1, .. }));
        let status = host.status().await;
        assert_eq!(status.registration.active(), Some("v1"));
        assert_eq!(status.registration.controller_of("tab-1"), Some("v1"));
    }

    #[tokio::test]
    async fn test_install_without_skip_waits_for_old_contexts() {
        let host = host("v2", false, old_generation()).await;

        let outcome = host.install().await.unwrap();

        assert!(matches!(outcome.activation, Activation::Waiting { controlled_by_active: 1 }));
        assert_eq!(host.status().await.registration.active(), Some("v1"));
    }

    #[tokio::test]
    async fn test_skip_waiting_message_takes_over_immediately() {
        let host = host("v2", false, old_generation()).await;
        host.install().await.unwrap();

        let outcome = host.message(&json!({"type": "SKIP_WAITING"})).await.unwrap();

        assert!(outcome.recognized);
        assert!(matches!(outcome.activation, Some(Activation::Activated { .. })));
        let status = host.status().await;
        assert_eq!(status.registration.active(), Some("v2"));
        assert_eq!(status.registration.controller_of("tab-1"), Some("v2"));
    }

    #[tokio::test]
    async fn test_closing_last_old_context_activates() {
        let host = host("v2", false, old_generation()).await;
        host.install().await.unwrap();

        let activation = host.close_context("tab-1").await.unwrap();

        assert!(matches!(activation, Some(Activation::Activated { .. })));
        assert_eq!(host.status().await.registration.active(), Some("v2"));
    }

    #[tokio::test]
    async fn test_unknown_message_is_ignored() {
        let host = host("v2", false, old_generation()).await;
        host.install().await.unwrap();

        let outcome = host.message(&json!({"type": "REFRESH"})).await.unwrap();

        assert!(!outcome.recognized);
        assert_eq!(host.status().await.registration.active(), Some("v1"));
    }

    #[tokio::test]
    async fn test_activate_with_nothing_waiting() {
        let host = host("v1", true, Registration::new()).await;
        assert!(matches!(host.activate().await.unwrap(), Activation::Idle));
    }

    #[tokio::test]
    async fn test_fetch_from_old_generation_context_passes_through() {
        let host = host("v2", false, old_generation()).await;
        host.install().await.unwrap();

        let routed = host.fetch(Some("tab-1"), &page("/index.html")).await.unwrap();
        assert!(matches!(routed, Routed::Passthrough));
    }

    #[tokio::test]
    async fn test_fetch_after_activation_is_routed() {
        let host = host("v1", true, Registration::new()).await;
        host.install().await.unwrap();
        host.open_context("tab-1").await;

        let routed = host.fetch(Some("tab-1"), &page("/index.html")).await.unwrap();
        match routed {
            Routed::Respond(served) => assert_eq!(served.source, ServedFrom::Cache),
            Routed::Passthrough => panic!("expected the engine to answer"),
        }
    }

    #[tokio::test]
    async fn test_install_reports_failed_activation() {
        let storage = undeletable_v1().await;
        let (host, _) = host_with("v2", true, Registration::new(), Arc::clone(&storage));

        let outcome = host.install().await.unwrap();

        assert_eq!(outcome.report.cached.len(), 3);
        match &outcome.activation {
            Activation::Failed { reason } => assert!(reason.starts_with("ACTIVATION_FAILED")),
            other => panic!("expected failed activation, got {other:?}"),
        }
        let status = host.status().await;
        assert_eq!(status.registration.active(), None);
        assert_eq!(status.registration.waiting().map(|w| w.version.as_str()), Some("v2"));

        storage.fail_deletes.store(false, Ordering::SeqCst);
        assert!(matches!(host.activate().await.unwrap(), Activation::Activated { .. }));
        assert_eq!(storage.keys().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_explicit_activate_still_fails() {
        let storage = undeletable_v1().await;
        let (host, _) = host_with("v2", false, old_generation(), storage);
        host.install().await.unwrap();
        host.close_context("tab-1").await.unwrap();

        assert!(matches!(host.activate().await, Err(Error::ActivationFailed(_))));
    }

    #[tokio::test]
    async fn test_message_and_close_report_failed_activation() {
        let storage = undeletable_v1().await;
        let (host, _) = host_with("v2", false, old_generation(), storage);
        host.install().await.unwrap();

        let outcome = host.message(&json!({"type": "SKIP_WAITING"})).await.unwrap();
        assert!(matches!(outcome.activation, Some(Activation::Failed { .. })));

        let closed = host.close_context("tab-1").await.unwrap();
        assert!(matches!(closed, Some(Activation::Failed { .. })));
        assert_eq!(host.status().await.registration.active(), Some("v1"));
    }

    #[tokio::test]
    async fn test_takeover_reprovisions_missing_entries() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let (host, network) = host_with("v2", false, old_generation(), Arc::clone(&store));
        network.set_offline(true);
        host.install().await.unwrap();
        network.set_offline(false);

        let activation = host.close_context("tab-1").await.unwrap();

        match activation {
            Some(Activation::Activated { reprovision: Some(report), .. }) => {
                assert_eq!(report.reprovisioned.len(), 3);
            }
            other => panic!("expected takeover with reprovision, got {other:?}"),
        }
        assert_eq!(store.entry_keys("v2").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_close_unknown_context() {
        let host = host("v1", true, Registration::new()).await;
        assert!(matches!(host.close_context("nope").await, Err(Error::InvalidInput(_))));
    }
}
