//! The key-value contract the injector writes through, and an in-memory adapter.

use crate::error::Result;
use crate::record::FrontierRecord;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// A projectable field of a [`FrontierRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Status,
    Score,
    FetchInterval,
    FetchTime,
    Metadata,
    Markers,
    Outlinks,
    ReprUrl,
    ProtocolStatus,
    Content,
    ContentType,
    BaseUrl,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Status,
        Field::Score,
        Field::FetchInterval,
        Field::FetchTime,
        Field::Metadata,
        Field::Markers,
        Field::Outlinks,
        Field::ReprUrl,
        Field::ProtocolStatus,
        Field::Content,
        Field::ContentType,
        Field::BaseUrl,
    ];

    /// Column name used by the SQLite adapter.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Status => "status",
            Field::Score => "score",
            Field::FetchInterval => "fetch_interval",
            Field::FetchTime => "fetch_time",
            Field::Metadata => "metadata",
            Field::Markers => "markers",
            Field::Outlinks => "outlinks",
            Field::ReprUrl => "repr_url",
            Field::ProtocolStatus => "protocol_status",
            Field::Content => "content",
            Field::ContentType => "content_type",
            Field::BaseUrl => "base_url",
        }
    }
}

/// Keep only `fields` of `record`; everything else is reset to its default.
/// An empty field list keeps the whole record.
pub fn project(record: &FrontierRecord, fields: &[Field]) -> FrontierRecord {
    if fields.is_empty() {
        return record.clone();
    }
    let mut out = FrontierRecord::default();
    for field in fields {
        match field {
            Field::Status => out.status = record.status,
            Field::Score => out.score = record.score,
            Field::FetchInterval => out.fetch_interval_secs = record.fetch_interval_secs,
            Field::FetchTime => out.fetch_time_millis = record.fetch_time_millis,
            Field::Metadata => out.metadata = record.metadata.clone(),
            Field::Markers => out.markers = record.markers.clone(),
            Field::Outlinks => out.outlinks = record.outlinks.clone(),
            Field::ReprUrl => out.repr_url = record.repr_url.clone(),
            Field::ProtocolStatus => out.protocol_status = record.protocol_status.clone(),
            Field::Content => out.content = record.content.clone(),
            Field::ContentType => out.content_type = record.content_type.clone(),
            Field::BaseUrl => out.base_url = record.base_url.clone(),
        }
    }
    out
}

/// Storage for frontier records keyed by [`to_key`](crate::key::to_key).
///
/// Methods take `&self`; adapters synchronise internally so one handle can be
/// shared between injectors.
pub trait FrontierStore {
    /// Whether a record exists for `key`. A missing key is `Ok(false)`.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Fetch the record for `key`, projected onto `fields`.
    fn get(&self, key: &str, fields: &[Field]) -> Result<Option<FrontierRecord>>;

    /// Unconditional upsert. May stay buffered until [`flush`](Self::flush).
    fn put(&self, key: &str, record: &FrontierRecord) -> Result<()>;

    /// Write `record` unless `key` is present; returns whether it was written.
    ///
    /// The default is check-then-put and is not atomic: two writers can both
    /// see the key as absent and the later put wins. Adapters that can do a
    /// conditional insert should override this.
    fn put_if_absent(&self, key: &str, record: &FrontierRecord) -> Result<bool> {
        if self.exists(key)? {
            return Ok(false);
        }
        self.put(key, record)?;
        Ok(true)
    }

    /// Make buffered writes durable and visible.
    fn flush(&self) -> Result<()>;

    /// All keys in key order.
    fn keys(&self) -> Result<Vec<String>>;

    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    committed: BTreeMap<String, FrontierRecord>,
    pending: BTreeMap<String, FrontierRecord>,
}

impl MemoryState {
    fn lookup(&self, key: &str) -> Option<&FrontierRecord> {
        self.pending.get(key).or_else(|| self.committed.get(key))
    }
}

/// In-process store with a write buffer. Buffered writes are visible to
/// reads immediately and are committed by [`flush`](FrontierStore::flush).
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records that have been flushed.
    pub fn committed_len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .committed
            .len()
    }

    /// Number of records written but not yet flushed.
    pub fn pending_len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

impl FrontierStore for MemoryStore {
    fn exists(&self, key: &str) -> Result<bool> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.lookup(key).is_some())
    }

    fn get(&self, key: &str, fields: &[Field]) -> Result<Option<FrontierRecord>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.lookup(key).map(|record| project(record, fields)))
    }

    fn put(&self, key: &str, record: &FrontierRecord) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.pending.insert(key.to_string(), record.clone());
        Ok(())
    }

    fn put_if_absent(&self, key: &str, record: &FrontierRecord) -> Result<bool> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.lookup(key).is_some() {
            return Ok(false);
        }
        state.pending.insert(key.to_string(), record.clone());
        Ok(true)
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let pending = std::mem::take(&mut state.pending);
        state.committed.extend(pending);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = state
            .committed
            .keys()
            .chain(state.pending.keys().filter(|k| !state.committed.contains_key(*k)))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
