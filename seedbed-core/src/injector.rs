//! Seeding operations over a [`FrontierStore`].
//!
//! Every operation is insert-if-absent: an existing record is never replaced,
//! and "already present" is reported as `Ok(false)`, not as an error.

use crate::config::InjectorConfig;
use crate::data::SqliteStore;
use crate::error::{Result, SeedError};
use crate::key::to_key;
use crate::record::{Document, FrontierRecord, Metadata, OverrideReport, SeedDefaults};
use crate::store::{Field, FrontierStore};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// What [`Injector::inject_with_report`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    AlreadyPresent,
    Inserted(OverrideReport),
}

impl SeedOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, SeedOutcome::Inserted(_))
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct Injector<S: FrontierStore> {
    store: S,
    config: InjectorConfig,
}

impl Injector<SqliteStore> {
    /// Open the SQLite frontier at `path`. Fails with [`SeedError::Setup`]
    /// when the database cannot be opened or initialised.
    pub fn open_sqlite(path: &Path, config: InjectorConfig) -> Result<Self> {
        let store = SqliteStore::open(path)?;
        Ok(Self::new(store, config))
    }
}

impl<S: FrontierStore> Injector<S> {
    pub fn new(store: S, config: InjectorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Whether the frontier holds a record for `url`.
    pub fn has_url(&self, url: &str) -> Result<bool> {
        let key = to_key(url)?;
        self.has_key(&key)
    }

    fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(key, &[Field::Status])?.is_some())
    }

    /// The full stored record for `url`, if any.
    pub fn get(&self, url: &str) -> Result<Option<FrontierRecord>> {
        let key = to_key(url)?;
        self.store.get(&key, &[])
    }

    /// Add `url` as an unfetched seed unless it is already stored.
    pub fn inject(&self, url: &str, metadata: &Metadata) -> Result<bool> {
        Ok(self.inject_with_report(url, metadata)?.is_inserted())
    }

    /// Like [`inject`](Self::inject), also reporting how the reserved
    /// score and fetch interval keys were handled.
    pub fn inject_with_report(&self, url: &str, metadata: &Metadata) -> Result<SeedOutcome> {
        let key = to_key(url)?;
        self.seed_key(&key, url, metadata)
    }

    fn seed_defaults(&self) -> SeedDefaults<'_> {
        SeedDefaults {
            score: self.config.default_score,
            fetch_interval_secs: self.config.default_fetch_interval_secs,
            keys: &self.config.override_keys,
        }
    }

    fn seed_key(&self, key: &str, url: &str, metadata: &Metadata) -> Result<SeedOutcome> {
        if self.has_key(key)? {
            debug!("URL {} already stored, not injecting", url);
            return Ok(SeedOutcome::AlreadyPresent);
        }

        let (record, report) =
            FrontierRecord::seed(url, metadata, self.seed_defaults(), now_millis());
        if !self.store.put_if_absent(key, &record)? {
            debug!("URL {} was stored concurrently, not injecting", url);
            return Ok(SeedOutcome::AlreadyPresent);
        }
        self.store.flush()?;

        info!(
            "Injected {} (score {}, interval {}s)",
            url, record.score, record.fetch_interval_secs
        );
        Ok(SeedOutcome::Inserted(report))
    }

    /// Store `from` as a permanent redirect to `to` and seed `to`.
    ///
    /// Returns `false` without touching `to` when `from` is already stored.
    /// Otherwise returns `true`, whether or not `to` was already present.
    pub fn add_redirect(&self, from: &str, to: &str, metadata: &Metadata) -> Result<bool> {
        self.add_redirect_chain(&[from, to], metadata)
    }

    /// Store every hop of `urls[0] -> urls[1] -> ... -> urls[n]` as a
    /// redirect and seed the last URL.
    ///
    /// The walk stops at the first hop whose source is already stored, and
    /// at the first hop pointing back to a URL earlier in the chain. The
    /// result tells whether the first URL was newly written. When the first
    /// URL is already stored the rest of the chain is not looked at;
    /// otherwise all URLs are validated before anything is written.
    pub fn add_redirect_chain(&self, urls: &[&str], metadata: &Metadata) -> Result<bool> {
        match urls {
            [] => return Ok(false),
            [url] => return self.inject(url, metadata),
            _ => {}
        }

        let hops = urls.len() - 1;
        if hops > self.config.max_redirect_hops {
            return Err(SeedError::RedirectLimit {
                hops,
                max: self.config.max_redirect_hops,
            });
        }
        let source_key = to_key(urls[0])?;
        if self.has_key(&source_key)? {
            debug!("Redirect source {} already stored, skipping", urls[0]);
            return Ok(false);
        }
        let mut keys = Vec::with_capacity(urls.len());
        keys.push(source_key);
        for url in &urls[1..] {
            keys.push(to_key(url)?);
        }

        let mut visited: HashSet<&str> = HashSet::with_capacity(urls.len());
        for hop in 0..hops {
            let (from, from_key) = (urls[hop], keys[hop].as_str());
            let (to, target_key) = (urls[hop + 1], keys[hop + 1].as_str());
            visited.insert(from_key);

            if hop > 0 && self.has_key(from_key)? {
                debug!("Redirect source {} already stored, chain ends here", from);
                self.store.flush()?;
                return Ok(true);
            }

            let record = FrontierRecord::redirect(to, now_millis());
            if !self.store.put_if_absent(from_key, &record)? {
                if hop == 0 {
                    return Ok(false);
                }
                self.store.flush()?;
                return Ok(true);
            }
            info!("Stored redirect {} -> {}", from, to);

            if visited.contains(target_key) {
                warn!("Redirect cycle at {} -> {}, not seeding target", from, to);
                self.store.flush()?;
                return Ok(true);
            }
        }

        let target = urls[hops];
        let outcome = self.seed_key(&keys[hops], target, metadata)?;
        if !outcome.is_inserted() {
            // seed_key only flushes after its own write
            self.store.flush()?;
        }
        Ok(true)
    }

    /// Store a document fetched elsewhere as an already fetched record.
    ///
    /// Metadata is copied as is; the reserved override keys have no effect
    /// here. Headers, the previous fetch time and the protocol status are not
    /// recorded yet.
    pub fn write_document(
        &self,
        document: &Document,
        metadata: &Metadata,
        batch_id: &str,
    ) -> Result<bool> {
        let key = to_key(&document.url)?;
        if self.has_key(&key)? {
            debug!("Document {} already stored, not writing", document.url);
            return Ok(false);
        }

        let record = FrontierRecord::fetched(document, metadata, batch_id, now_millis());
        if !self.store.put_if_absent(&key, &record)? {
            return Ok(false);
        }
        self.store.flush()?;

        info!("Wrote document {} for batch {}", document.url, batch_id);
        Ok(true)
    }
}
