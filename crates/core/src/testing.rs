//! Test doubles for the engine ports.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::Error;
use crate::cache::{CacheDb, CacheStorage};
use crate::network::Network;
use crate::request::FetchRequest;
use crate::response::ResponseSnapshot;

/// Scripted network: serves registered responses, 404s the rest, and can be
/// switched offline.
#[derive(Default)]
pub struct StubNetwork {
    responses: Mutex<HashMap<String, ResponseSnapshot>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, response: ResponseSnapshot) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn serve_ok(&self, url: &str, body: &str) {
        self.serve(url, ResponseSnapshot::ok(url, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {url}")));
        }

        let found = self.responses.lock().unwrap().get(&url).cloned();
        Ok(found.unwrap_or_else(|| ResponseSnapshot::ok(url, "").with_status(404, "Not Found")))
    }
}

/// Wraps [`CacheDb`], counting entry reads/writes. Deletes, entry reads and
/// entry writes can each be made to fail.
pub struct CountingStorage {
    pub inner: CacheDb,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_deletes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_puts: AtomicBool,
}

impl CountingStorage {
    pub async fn new() -> Self {
        Self {
            inner: CacheDb::open_in_memory().await.unwrap(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_deletes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_puts: AtomicBool::new(false),
        }
    }

    pub fn touches(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        self.inner.open(store).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, store: &str) -> Result<bool, Error> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            tracing::debug!(store, "refusing delete");
            return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
        }
        self.inner.delete(store).await
    }

    async fn match_entry(&self, store: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
        }
        self.inner.match_entry(store, key).await
    }

    async fn put(&self, store: &str, key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
        }
        self.inner.put(store, key, response).await
    }

    async fn entry_keys(&self, store: &str) -> Result<Vec<String>, Error> {
        self.inner.entry_keys(store).await
    }
}
