use crate::config::OverrideKeys;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Marker key holding the link distance from the seed set.
pub const DISTANCE_MARKER: &str = "dist";
/// Marker key set on records created by the injector.
pub const INJECT_MARKER: &str = "_injmrk_";
/// Marker key set on pre-fetched documents, valued with the batch id.
pub const FETCH_MARKER: &str = "_ftcmrk_";
/// Marker key set on redirect placeholders.
pub const REDIRECT_DISCOVERED_MARKER: &str = "___rdrdsc__";
/// Value written for boolean markers.
pub const YES: &str = "y";

/// Caller-supplied metadata, copied into records as UTF-8 bytes.
pub type Metadata = HashMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlStatus {
    #[default]
    Unfetched,
    Fetched,
    Gone,
    RedirectTemporary,
    RedirectPermanent,
    Retry,
    NotModified,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Unfetched => "unfetched",
            CrawlStatus::Fetched => "fetched",
            CrawlStatus::Gone => "gone",
            CrawlStatus::RedirectTemporary => "redir_temp",
            CrawlStatus::RedirectPermanent => "redir_perm",
            CrawlStatus::Retry => "retry",
            CrawlStatus::NotModified => "notmodified",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unfetched" => Some(CrawlStatus::Unfetched),
            "fetched" => Some(CrawlStatus::Fetched),
            "gone" => Some(CrawlStatus::Gone),
            "redir_temp" => Some(CrawlStatus::RedirectTemporary),
            "redir_perm" => Some(CrawlStatus::RedirectPermanent),
            "retry" => Some(CrawlStatus::Retry),
            "notmodified" => Some(CrawlStatus::NotModified),
            _ => None,
        }
    }

    /// Numeric code understood by downstream crawl stages.
    pub fn code(&self) -> u8 {
        match self {
            CrawlStatus::Unfetched => 0x01,
            CrawlStatus::Fetched => 0x02,
            CrawlStatus::Gone => 0x03,
            CrawlStatus::RedirectTemporary => 0x04,
            CrawlStatus::RedirectPermanent => 0x05,
            CrawlStatus::Retry => 0x22,
            CrawlStatus::NotModified => 0x26,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(CrawlStatus::Unfetched),
            0x02 => Some(CrawlStatus::Fetched),
            0x03 => Some(CrawlStatus::Gone),
            0x04 => Some(CrawlStatus::RedirectTemporary),
            0x05 => Some(CrawlStatus::RedirectPermanent),
            0x22 => Some(CrawlStatus::Retry),
            0x26 => Some(CrawlStatus::NotModified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolStatusCode {
    Success,
    Failed,
    Moved,
    TempMoved,
    NotFound,
}

impl ProtocolStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolStatusCode::Success => "success",
            ProtocolStatusCode::Failed => "failed",
            ProtocolStatusCode::Moved => "moved",
            ProtocolStatusCode::TempMoved => "temp_moved",
            ProtocolStatusCode::NotFound => "notfound",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStatus {
    pub code: ProtocolStatusCode,
    pub args: Vec<String>,
}

impl ProtocolStatus {
    pub fn moved(target: &str) -> Self {
        Self {
            code: ProtocolStatusCode::Moved,
            args: vec![target.to_string()],
        }
    }
}

/// One frontier entry. Fields that a variant does not use keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrontierRecord {
    pub status: CrawlStatus,
    pub score: f32,
    pub fetch_interval_secs: i32,
    pub fetch_time_millis: i64,
    pub metadata: BTreeMap<String, Vec<u8>>,
    pub markers: BTreeMap<String, String>,
    pub outlinks: BTreeMap<String, String>,
    pub repr_url: Option<String>,
    pub protocol_status: Option<ProtocolStatus>,
    pub content: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub base_url: Option<String>,
}

/// Result of reading one reserved metadata key.
#[derive(Debug, Clone, PartialEq)]
pub enum Override<T> {
    NotRequested,
    Applied(T),
    /// The value did not parse; the previous value was kept.
    Ignored { raw: String },
}

impl<T> Override<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Override::Applied(_))
    }
}

/// Which reserved keys a seed's metadata used, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideReport {
    pub score: Override<f32>,
    pub interval: Override<i32>,
}

/// Inputs for a seed record before metadata overrides.
#[derive(Debug, Clone, Copy)]
pub struct SeedDefaults<'a> {
    pub score: f32,
    pub fetch_interval_secs: i32,
    pub keys: &'a OverrideKeys,
}

/// A document fetched outside the crawler, stored as already fetched.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub url: String,
    pub content: Option<Vec<u8>>,
    pub content_type: Option<String>,
    /// Protocol headers. Accepted but not written to the record yet.
    pub headers: HashMap<String, String>,
}

impl Document {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.content = Some(content);
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl FrontierRecord {
    /// Build an unfetched seed. Reserved keys in `metadata` override the
    /// defaults; every entry, reserved or not, is also copied verbatim.
    pub fn seed(
        url: &str,
        metadata: &Metadata,
        defaults: SeedDefaults<'_>,
        now_millis: i64,
    ) -> (Self, OverrideReport) {
        let mut record = FrontierRecord {
            status: CrawlStatus::Unfetched,
            score: defaults.score,
            fetch_interval_secs: defaults.fetch_interval_secs,
            fetch_time_millis: now_millis,
            ..Default::default()
        };
        let mut report = OverrideReport {
            score: Override::NotRequested,
            interval: Override::NotRequested,
        };

        for (key, value) in metadata {
            if *key == defaults.keys.score {
                match value.trim().parse::<f32>() {
                    Ok(score) if score.is_finite() => {
                        record.score = score;
                        report.score = Override::Applied(score);
                    }
                    _ => {
                        debug!("Got illegal score value '{}' for URL '{}', ignoring", value, url);
                        report.score = Override::Ignored { raw: value.clone() };
                    }
                }
            } else if *key == defaults.keys.fetch_interval {
                match value.parse::<i32>() {
                    Ok(interval) => {
                        record.fetch_interval_secs = interval;
                        report.interval = Override::Applied(interval);
                    }
                    Err(_) => {
                        debug!(
                            "Got illegal fetch interval value '{}' for URL '{}', ignoring",
                            value, url
                        );
                        report.interval = Override::Ignored { raw: value.clone() };
                    }
                }
            }
            record
                .metadata
                .insert(key.clone(), value.as_bytes().to_vec());
        }

        record.mark_distance_zero();
        record.markers.insert(INJECT_MARKER.to_string(), YES.to_string());
        (record, report)
    }

    /// Build the permanent-redirect placeholder for a URL moving to `target`.
    pub fn redirect(target: &str, now_millis: i64) -> Self {
        let mut record = FrontierRecord {
            status: CrawlStatus::RedirectPermanent,
            fetch_time_millis: now_millis,
            repr_url: Some(target.to_string()),
            protocol_status: Some(ProtocolStatus::moved(target)),
            ..Default::default()
        };
        record.outlinks.insert(target.to_string(), String::new());
        record
            .markers
            .insert(REDIRECT_DISCOVERED_MARKER.to_string(), YES.to_string());
        record
    }

    /// Build a fetched record from a pre-fetched document. Headers, previous
    /// fetch time and protocol status are left unset.
    pub fn fetched(
        document: &Document,
        metadata: &Metadata,
        batch_id: &str,
        now_millis: i64,
    ) -> Self {
        let mut record = FrontierRecord {
            status: CrawlStatus::Fetched,
            fetch_time_millis: now_millis,
            ..Default::default()
        };

        if let Some(content) = &document.content {
            record.content = Some(content.clone());
            record.content_type = document.content_type.clone();
            record.base_url = Some(document.url.clone());
        }

        record.metadata = metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.as_bytes().to_vec()))
            .collect();
        record.mark_distance_zero();
        record
            .markers
            .insert(FETCH_MARKER.to_string(), batch_id.to_string());
        record
    }

    fn mark_distance_zero(&mut self) {
        self.markers
            .insert(DISTANCE_MARKER.to_string(), "0".to_string());
    }

    /// The single redirect target, if this is a redirect placeholder.
    pub fn redirect_target(&self) -> Option<&str> {
        if self.status != CrawlStatus::RedirectPermanent {
            return None;
        }
        self.outlinks.keys().next().map(String::as_str)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> OverrideKeys {
        OverrideKeys::default()
    }

    fn defaults(keys: &OverrideKeys) -> SeedDefaults<'_> {
        SeedDefaults {
            score: 1.0,
            fetch_interval_secs: 2_592_000,
            keys,
        }
    }

    #[test]
    fn seed_uses_defaults_without_metadata() {
        let keys = keys();
        let (record, report) =
            FrontierRecord::seed("http://a.com/", &HashMap::new(), defaults(&keys), 42);

        assert_eq!(record.status, CrawlStatus::Unfetched);
        assert_eq!(record.score, 1.0);
        assert_eq!(record.fetch_interval_secs, 2_592_000);
        assert_eq!(record.fetch_time_millis, 42);
        assert_eq!(record.markers.get(DISTANCE_MARKER).map(String::as_str), Some("0"));
        assert_eq!(record.markers.get(INJECT_MARKER).map(String::as_str), Some(YES));
        assert_eq!(report.score, Override::NotRequested);
        assert_eq!(report.interval, Override::NotRequested);
    }

    #[test]
    fn seed_applies_reserved_keys_and_copies_them() {
        let keys = keys();
        let metadata = HashMap::from([
            ("nutch.score".to_string(), "3.5".to_string()),
            ("nutch.fetchInterval".to_string(), "86400".to_string()),
            ("source".to_string(), "twitter".to_string()),
        ]);
        let (record, report) =
            FrontierRecord::seed("http://a.com/", &metadata, defaults(&keys), 0);

        assert_eq!(record.score, 3.5);
        assert_eq!(record.fetch_interval_secs, 86400);
        assert_eq!(report.score, Override::Applied(3.5));
        assert_eq!(report.interval, Override::Applied(86400));
        assert_eq!(record.metadata.len(), 3);
        assert_eq!(record.metadata_str("nutch.score"), Some("3.5"));
        assert_eq!(record.metadata_str("source"), Some("twitter"));
    }

    #[test]
    fn seed_ignores_malformed_overrides() {
        let keys = keys();
        let metadata = HashMap::from([
            ("nutch.score".to_string(), "not-a-number".to_string()),
            ("nutch.fetchInterval".to_string(), "1.5".to_string()),
        ]);
        let (record, report) =
            FrontierRecord::seed("http://a.com/", &metadata, defaults(&keys), 0);

        assert_eq!(record.score, 1.0);
        assert_eq!(record.fetch_interval_secs, 2_592_000);
        assert!(matches!(report.score, Override::Ignored { ref raw } if raw == "not-a-number"));
        assert!(!report.interval.is_applied());
        assert_eq!(record.metadata_str("nutch.score"), Some("not-a-number"));
    }

    #[test]
    fn seed_ignores_non_finite_score_and_padded_interval() {
        let keys = keys();
        let metadata = HashMap::from([
            ("nutch.score".to_string(), "inf".to_string()),
            ("nutch.fetchInterval".to_string(), " 86400".to_string()),
        ]);
        let (record, report) =
            FrontierRecord::seed("http://a.com/", &metadata, defaults(&keys), 0);

        assert_eq!(record.score, 1.0);
        assert_eq!(record.fetch_interval_secs, 2_592_000);
        assert_eq!(report.score, Override::Ignored { raw: "inf".to_string() });
        assert_eq!(report.interval, Override::Ignored { raw: " 86400".to_string() });
    }

    #[test]
    fn redirect_points_at_target() {
        let record = FrontierRecord::redirect("http://www.l3s.de/", 7);

        assert_eq!(record.status, CrawlStatus::RedirectPermanent);
        assert_eq!(record.outlinks.len(), 1);
        assert_eq!(record.outlinks.get("http://www.l3s.de/").map(String::as_str), Some(""));
        assert_eq!(record.redirect_target(), Some("http://www.l3s.de/"));
        assert_eq!(record.repr_url.as_deref(), Some("http://www.l3s.de/"));
        assert_eq!(
            record.protocol_status,
            Some(ProtocolStatus {
                code: ProtocolStatusCode::Moved,
                args: vec!["http://www.l3s.de/".to_string()],
            })
        );
        assert!(record.markers.contains_key(REDIRECT_DISCOVERED_MARKER));
        assert!(!record.markers.contains_key(INJECT_MARKER));
    }

    #[test]
    fn fetched_sets_base_url_only_with_content() {
        let metadata = HashMap::from([("nutch.score".to_string(), "9".to_string())]);
        let doc = Document::new("http://a.com/page")
            .with_content(b"<html></html>".to_vec(), "text/html")
            .with_header("Server", "nginx");
        let record = FrontierRecord::fetched(&doc, &metadata, "batch-1", 5);

        assert_eq!(record.status, CrawlStatus::Fetched);
        assert_eq!(record.base_url.as_deref(), Some("http://a.com/page"));
        assert_eq!(record.content_type.as_deref(), Some("text/html"));
        assert_eq!(record.score, 0.0);
        assert_eq!(record.metadata_str("nutch.score"), Some("9"));
        assert_eq!(record.markers.get(FETCH_MARKER).map(String::as_str), Some("batch-1"));
        assert!(record.protocol_status.is_none());

        let empty =
            FrontierRecord::fetched(&Document::new("http://a.com/"), &HashMap::new(), "b", 5);
        assert!(empty.content.is_none());
        assert!(empty.base_url.is_none());
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            CrawlStatus::Unfetched,
            CrawlStatus::Fetched,
            CrawlStatus::RedirectPermanent,
            CrawlStatus::NotModified,
        ] {
            assert_eq!(CrawlStatus::from_code(status.code()), Some(status));
            assert_eq!(CrawlStatus::from_name(status.as_str()), Some(status));
        }
        assert_eq!(CrawlStatus::from_code(0x7f), None);
    }
}
