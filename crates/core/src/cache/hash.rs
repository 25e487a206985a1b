//! Entry key and body digest generation.

use sha2::{Digest, Sha256};

/// Compute the primary key of a cache entry within a named store.
pub fn compute_entry_key(store: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(store.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// SHA-256 of a response body, hex encoded.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
