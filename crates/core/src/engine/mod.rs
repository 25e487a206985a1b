//! The cache policy engine.
//!
//! One method per event the runtime dispatches:
//!
//! - [`CachePolicyEngine::install`]: provision the current store from the manifest
//! - [`CachePolicyEngine::activate`]: reap every store but the current one
//! - [`CachePolicyEngine::reprovision`]: refetch manifest entries the store is missing
//! - [`CachePolicyEngine::handle_fetch`]: route an intercepted request
//! - [`CachePolicyEngine::handle_message`]: accept a control command
//!
//! The engine never applies lifecycle transitions itself; it reports them
//! (`skip_waiting`, `claim_clients`) and the host acts on them.

pub mod control;
pub mod route;

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

use crate::Error;
use crate::cache::CacheStorage;
use crate::config::AppConfig;
use crate::location::{parse_origin, request_key, resolve};
use crate::network::Network;
use crate::request::FetchRequest;
use crate::response::ResponseSnapshot;

pub use control::ControlCommand;
pub use route::{HostRules, RouteClass};

/// Build-time inputs of one generation, resolved against the origin.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub version: String,
    pub origin: Url,
    pub manifest: Vec<Url>,
    pub fallback_document: Url,
    pub rules: HostRules,
    pub skip_waiting_on_install: bool,
    pub reprovision_on_activate: bool,
}

impl EngineConfig {
    /// Resolve an [`AppConfig`] into engine inputs.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin)?;
        let manifest = config
            .manifest
            .iter()
            .map(|entry| resolve(entry, &origin))
            .collect::<Result<Vec<_>, _>>()?;
        let fallback_document = resolve(&config.fallback_document, &origin)?;

        Ok(Self {
            version: config.version.clone(),
            manifest,
            fallback_document,
            rules: HostRules::new(&config.bypass_hosts, &config.network_first_hosts),
            skip_waiting_on_install: config.skip_waiting_on_install,
            reprovision_on_activate: config.reprovision_on_activate,
            origin,
        })
    }
}

/// A manifest entry that could not be provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of [`CachePolicyEngine::install`].
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub version: String,
    pub cached: Vec<String>,
    pub failed: Vec<ProvisionFailure>,
    /// The host should let this generation take over without waiting.
    pub skip_waiting: bool,
}

/// Outcome of [`CachePolicyEngine::activate`].
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub version: String,
    pub deleted: Vec<String>,
    /// The host should take control of every open context now.
    pub claim_clients: bool,
}

/// Outcome of [`CachePolicyEngine::reprovision`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReprovisionReport {
    pub reprovisioned: Vec<String>,
    pub failed: Vec<ProvisionFailure>,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Network,
    Cache,
    Fallback,
}

/// A response chosen by the engine for an intercepted request.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ServedFrom,
    pub route: RouteClass,
}

/// Result of routing one request.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Not intercepted; the runtime performs its normal network fetch.
    Passthrough,
    Respond(Served),
}

/// Caching policy for one generation over injected store and network ports.
pub struct CachePolicyEngine<S, N> {
    config: Arc<EngineConfig>,
    store: Arc<S>,
    network: Arc<N>,
    writes: Mutex<JoinSet<()>>,
}

impl<S: CacheStorage, N: Network> CachePolicyEngine<S, N> {
    pub fn new(config: EngineConfig, store: Arc<S>, network: Arc<N>) -> Self {
        Self { config: Arc::new(config), store, network, writes: Mutex::new(JoinSet::new()) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn network(&self) -> &Arc<N> {
        &self.network
    }

    /// Provision the current store with every manifest entry.
    ///
    /// Individual entries may fail without failing the install; they are
    /// logged and listed in the report. Only failing to open the store is fatal.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let version = self.config.version.clone();
        tracing::info!(version = %version, entries = self.config.manifest.len(), "caching app shell");

        self.store.open(&version).await?;
        let (cached, failed) = self.provision(&self.config.manifest).await;

        if !failed.is_empty() {
            tracing::warn!(version = %version, failed = failed.len(), "some files failed to cache");
        }

        Ok(InstallReport { version, cached, failed, skip_waiting: self.config.skip_waiting_on_install })
    }

    /// Delete every store other than the current one.
    ///
    /// All deletions settle before this returns. A failed deletion fails the
    /// activation; calling it again retries the cleanup.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let version = self.config.version.clone();
        let names = self
            .store
            .keys()
            .await
            .map_err(|e| Error::ActivationFailed(format!("listing stores: {e}")))?;

        let stale: Vec<String> = names.into_iter().filter(|name| *name != version).collect();
        try_join_all(stale.iter().map(|name| async move {
            tracing::info!(store = %name, "deleting old cache");
            self.store
                .delete(name)
                .await
                .map_err(|e| Error::ActivationFailed(format!("deleting {name}: {e}")))
        }))
        .await?;

        tracing::info!(version = %version, deleted = stale.len(), "activated");

        Ok(ActivateReport { version, deleted: stale, claim_clients: true })
    }

    /// Retry manifest entries missing from the current store, typically the
    /// ones that failed during install. `None` when disabled by configuration.
    ///
    /// Failures are reported, never fatal. Runs after takeover so request
    /// handling is not held up by the refetch.
    pub async fn reprovision(&self) -> Option<ReprovisionReport> {
        if !self.config.reprovision_on_activate {
            return None;
        }
        let (reprovisioned, failed) = self.reprovision_missing().await;
        Some(ReprovisionReport { reprovisioned, failed })
    }

    /// Route one intercepted request.
    ///
    /// `Err` means the request fails observably for the requester; it is
    /// never turned into an empty response.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<Routed, Error> {
        let route = self.config.rules.classify(&request.url);
        tracing::debug!(url = %request.url, ?route, "routing request");

        match route {
            RouteClass::Bypass => Ok(Routed::Passthrough),
            RouteClass::NetworkFirst => self.network_first(request).await.map(Routed::Respond),
            RouteClass::CacheFirst => self.cache_first(request).await.map(Routed::Respond),
        }
    }

    /// Interpret a message posted by a controlled context.
    pub fn handle_message(&self, message: &serde_json::Value) -> Option<ControlCommand> {
        let command = ControlCommand::parse(message);
        match command {
            Some(ControlCommand::SkipWaiting) => tracing::info!(version = %self.config.version, "skip waiting requested"),
            None => tracing::debug!(%message, "ignoring unrecognized message"),
        }
        command
    }

    /// Wait until every background store write has finished.
    pub async fn wait_for_writes(&self) {
        let mut pending = std::mem::take(&mut *self.writes.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background store write task failed");
            }
        }
    }

    async fn network_first(&self, request: &FetchRequest) -> Result<Served, Error> {
        let route = RouteClass::NetworkFirst;
        match self.network.fetch(request).await {
            Ok(response) => {
                if request.is_cacheable_method() {
                    self.store_in_background(request_key(&request.url), response.clone()).await;
                }
                Ok(Served { response, source: ServedFrom::Network, route })
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "network failed, trying store");
                match self.lookup(request).await {
                    Some(response) => Ok(Served { response, source: ServedFrom::Cache, route }),
                    None => Err(Error::NoCachedResponse(format!("{}: {err}", request.url))),
                }
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> Result<Served, Error> {
        let route = RouteClass::CacheFirst;
        if let Some(response) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(Served { response, source: ServedFrom::Cache, route });
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if request.is_cacheable_method() && response.is_plain_success() {
                    self.store_in_background(request_key(&request.url), response.clone()).await;
                }
                Ok(Served { response, source: ServedFrom::Network, route })
            }
            Err(err) if request.is_navigation() => {
                let fallback = &self.config.fallback_document;
                tracing::debug!(url = %request.url, %fallback, error = %err, "offline navigation, serving fallback");
                match self.lookup_key(&request_key(fallback)).await {
                    Some(response) => Ok(Served { response, source: ServedFrom::Fallback, route }),
                    None => Err(Error::NoCachedResponse(format!("{}: {err}; fallback {fallback} not stored", request.url))),
                }
            }
            Err(err) => Err(Error::NoCachedResponse(format!("{}: {err}", request.url))),
        }
    }

    async fn lookup(&self, request: &FetchRequest) -> Option<ResponseSnapshot> {
        if !request.is_cacheable_method() {
            return None;
        }
        self.lookup_key(&request_key(&request.url)).await
    }

    /// Store read failures read as misses.
    async fn lookup_key(&self, key: &str) -> Option<ResponseSnapshot> {
        match self.store.match_entry(&self.config.version, key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key, error = %e, "store lookup failed, treating as miss");
                None
            }
        }
    }

    /// Persist a copy without delaying the response.
    async fn store_in_background(&self, key: String, response: ResponseSnapshot) {
        let store = Arc::clone(&self.store);
        let version = self.config.version.clone();

        let mut writes = self.writes.lock().await;
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            if let Err(e) = store.put(&version, &key, &response).await {
                tracing::warn!(key = %key, error = %e, "background store write failed");
            }
        });
    }

    async fn provision(&self, urls: &[Url]) -> (Vec<String>, Vec<ProvisionFailure>) {
        let results = join_all(urls.iter().map(|url| async move { (url, self.provision_entry(url).await) })).await;

        let mut cached = Vec::new();
        let mut failed = Vec::new();
        for (url, result) in results {
            match result {
                Ok(()) => cached.push(url.to_string()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to cache manifest entry");
                    failed.push(ProvisionFailure { url: url.to_string(), reason: e.to_string() });
                }
            }
        }
        (cached, failed)
    }

    async fn provision_entry(&self, url: &Url) -> Result<(), Error> {
        let request = FetchRequest::get(url.clone());
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("status {} for {url}", response.status)));
        }
        self.store.put(&self.config.version, &request_key(url), &response).await
    }

    async fn reprovision_missing(&self) -> (Vec<String>, Vec<ProvisionFailure>) {
        let present = match self.store.entry_keys(&self.config.version).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "could not list current store, skipping reprovision");
                return Default::default();
            }
        };

        let missing: Vec<Url> = self
            .config
            .manifest
            .iter()
            .filter(|url| !present.contains(&request_key(url)))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Default::default();
        }

        tracing::info!(missing = missing.len(), "retrying manifest entries missing from store");
        self.provision(&missing).await
    }
}
