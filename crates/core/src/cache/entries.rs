//! SQLite implementation of [`CacheStorage`].

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::{body_digest, compute_entry_key};
use super::storage::CacheStorage;
use crate::Error;
use crate::response::{ResponseKind, ResponseSnapshot};

/// Raw row as read from `entries`, before validation.
struct EntryRow {
    status: u16,
    status_text: String,
    kind: String,
    final_url: String,
    headers_json: String,
    body: Vec<u8>,
    body_sha256: String,
}

impl EntryRow {
    fn decode(self) -> Result<ResponseSnapshot, Error> {
        let kind = ResponseKind::parse(&self.kind)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown response kind {:?}", self.kind)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        if body_digest(&self.body) != self.body_sha256 {
            return Err(Error::CorruptEntry("body digest mismatch".to_string()));
        }

        Ok(ResponseSnapshot {
            url: self.final_url,
            status: self.status,
            status_text: self.status_text,
            kind,
            headers,
            body: Bytes::from(self.body),
        })
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let store = store.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO stores (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![store, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, store: &str) -> Result<bool, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![store])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn match_entry(&self, store: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let key_hash = compute_entry_key(store, key);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, kind, final_url, headers_json, body, body_sha256
                     FROM entries WHERE key_hash = ?1",
                    params![key_hash],
                    |row| {
                        Ok(EntryRow {
                            status: row.get(0)?,
                            status_text: row.get(1)?,
                            kind: row.get(2)?,
                            final_url: row.get(3)?,
                            headers_json: row.get(4)?,
                            body: row.get(5)?,
                            body_sha256: row.get(6)?,
                        })
                    },
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        match row.decode() {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                tracing::warn!(store, key, error = %e, "ignoring unreadable cache entry");
                Ok(None)
            }
        }
    }

    async fn put(&self, store: &str, key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;
        let key_hash = compute_entry_key(store, key);
        let store = store.to_string();
        let key = key.to_string();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO stores (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![&store, &now],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                        key_hash, store, url, method, status, status_text, kind,
                        final_url, headers_json, body, body_sha256, stored_at
                    ) VALUES (?1, ?2, ?3, 'GET', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        status = excluded.status,
                        status_text = excluded.status_text,
                        kind = excluded.kind,
                        final_url = excluded.final_url,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        body_sha256 = excluded.body_sha256,
                        stored_at = excluded.stored_at",
                    params![
                        &key_hash,
                        &store,
                        &key,
                        response.status,
                        &response.status_text,
                        response.kind.as_str(),
                        &response.url,
                        &headers_json,
                        &response.body[..],
                        body_digest(&response.body),
                        &now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_keys(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY rowid")?;
                let keys = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
