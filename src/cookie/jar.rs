//! In-memory, host-scoped cookie jar.
//!
//! # Key spaces
//!
//! The jar is filled and read by the transport with the *raw* request host
//! ([`CookieJar::save_from_response`], [`CookieJar::load_for_request`]), while
//! callers query it with a normalized [`DomainKey`]
//! ([`CookieJar::get_cookies`]). For `www.`-prefixed hosts the two differ:
//! cookies saved under `www.example.com` are not found by
//! `get_cookies("https://www.example.com")`, which looks up `example.com`.
//! This asymmetry is kept as observed behaviour.
//!
//! # Thread Safety
//!
//! Every operation runs under one jar-wide lock, so the replace-or-insert
//! sequence is atomic with respect to concurrent readers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::domain::DomainKey;
use crate::error::Result;

use super::CookieRecord;

// ============================================================================
// Types
// ============================================================================

/// Cookie lists keyed by host.
type CookieStore = FxHashMap<String, Vec<CookieRecord>>;

// ============================================================================
// CookieSink
// ============================================================================

/// Durable destination for accepted cookies.
///
/// Receives every record accepted by [`CookieJar::save_from_response`],
/// after the jar lock has been released.
pub trait CookieSink: Send + Sync {
    /// Persists the `Set-Cookie` value `set_cookie` for `uri`.
    fn persist(&self, uri: &str, set_cookie: &str);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl CookieSink for DiscardSink {
    fn persist(&self, _uri: &str, _set_cookie: &str) {}
}

// ============================================================================
// CookieJar
// ============================================================================

/// Host-scoped cookie store shared between the transport and the caller.
pub struct CookieJar {
    /// Records by host.
    store: Mutex<CookieStore>,
    /// Persistence collaborator.
    sink: Arc<dyn CookieSink>,
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("hosts", &self.store.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// Creates an empty jar that persists nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(DiscardSink))
    }

    /// Creates an empty jar forwarding accepted cookies to `sink`.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn CookieSink>) -> Self {
        Self {
            store: Mutex::new(CookieStore::default()),
            sink,
        }
    }

    /// Returns the records stored for the exact request `host`.
    ///
    /// `host` is not normalized. Unknown hosts yield an empty list.
    #[must_use]
    pub fn load_for_request(&self, host: &str) -> Vec<CookieRecord> {
        let records = self.store.lock().get(host).cloned().unwrap_or_default();
        trace!(host, count = records.len(), "Loaded cookies for request");
        records
    }

    /// Stores `records` under the exact request `host`.
    ///
    /// A record replaces any stored record with the same `(name, path)`.
    pub fn save_from_response(&self, host: &str, records: impl IntoIterator<Item = CookieRecord>) {
        let accepted: Vec<CookieRecord> = {
            let mut store = self.store.lock();
            let list = store.entry(host.to_string()).or_default();

            records
                .into_iter()
                .map(|record| {
                    list.retain(|stored| !stored.same_identity(&record));
                    list.push(record.clone());
                    record
                })
                .collect()
        };

        debug!(host, count = accepted.len(), "Saved cookies from response");

        for record in &accepted {
            self.sink.persist(&record.uri(), &record.raw);
        }
    }

    /// Returns a `name -> value` view of the cookies for a domain or URL.
    ///
    /// The input is normalized to a [`DomainKey`] first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedUrl`] if the input has no host.
    pub fn get_cookies(&self, domain_or_url: &str) -> Result<FxHashMap<String, String>> {
        let key = DomainKey::parse(domain_or_url)?;
        let store = self.store.lock();

        Ok(store
            .get(key.as_str())
            .map(|records| {
                records
                    .iter()
                    .map(|r| (r.name.clone(), r.value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Removes every record named `name`, across all hosts.
    pub fn remove_cookie_by_name(&self, name: &str) {
        let mut store = self.store.lock();
        let mut removed = 0usize;

        for list in store.values_mut() {
            let before = list.len();
            list.retain(|record| record.name != name);
            removed += before - list.len();
        }
        store.retain(|_, list| !list.is_empty());

        debug!(name, removed, "Removed cookies by name");
    }

    /// Removes all records.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Returns the total number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().values().map(Vec::len).sum()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
