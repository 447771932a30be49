// Seeding behaviour against both store adapters

use seedbed_core::injector::Injector;
use seedbed_core::key::to_key;
use seedbed_core::record::{CrawlStatus, Document, Metadata, FETCH_MARKER, REDIRECT_DISCOVERED_MARKER};
use seedbed_core::store::{FrontierStore, MemoryStore};
use seedbed_core::{InjectorConfig, OverrideKeys, SeedError, SqliteStore};
use tempfile::TempDir;

const SHORT_URL: &str = "http://t.co/ZNyOoEwAwN";
const URL: &str = "http://www.l3s.de/";

fn memory_injector() -> Injector<MemoryStore> {
    Injector::new(MemoryStore::new(), InjectorConfig::default())
}

fn sqlite_injector() -> (TempDir, Injector<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let injector =
        Injector::open_sqlite(&temp_dir.path().join("frontier.db"), InjectorConfig::default())
            .unwrap();
    (temp_dir, injector)
}

fn meta(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Shared scenarios
// ============================================================================

fn check_inject_then_has_url<S: FrontierStore>(injector: &Injector<S>) {
    assert!(!injector.has_url(URL).unwrap());
    assert!(injector.inject(URL, &Metadata::new()).unwrap());
    assert!(injector.has_url(URL).unwrap());
}

fn check_redirect_after_inject_is_noop<S: FrontierStore>(injector: &Injector<S>) {
    assert!(injector.inject(SHORT_URL, &Metadata::new()).unwrap());
    assert!(injector.has_url(SHORT_URL).unwrap());

    assert!(!injector.add_redirect(SHORT_URL, URL, &Metadata::new()).unwrap());
    assert!(!injector.has_url(URL).unwrap());
}

fn check_redirect_seeds_both<S: FrontierStore>(injector: &Injector<S>) {
    assert!(injector.add_redirect(SHORT_URL, URL, &Metadata::new()).unwrap());
    assert!(injector.has_url(SHORT_URL).unwrap());
    assert!(injector.has_url(URL).unwrap());

    let redirect = injector.get(SHORT_URL).unwrap().unwrap();
    assert_eq!(redirect.status, CrawlStatus::RedirectPermanent);
    assert_eq!(redirect.outlinks.keys().collect::<Vec<_>>(), vec![URL]);
    assert_eq!(redirect.repr_url.as_deref(), Some(URL));
    assert!(redirect.markers.contains_key(REDIRECT_DISCOVERED_MARKER));

    let target = injector.get(URL).unwrap().unwrap();
    assert_eq!(target.status, CrawlStatus::Unfetched);
}

#[test]
fn test_inject_then_has_url() {
    check_inject_then_has_url(&memory_injector());
    let (_dir, injector) = sqlite_injector();
    check_inject_then_has_url(&injector);
}

#[test]
fn test_redirect_after_inject_is_noop() {
    check_redirect_after_inject_is_noop(&memory_injector());
    let (_dir, injector) = sqlite_injector();
    check_redirect_after_inject_is_noop(&injector);
}

#[test]
fn test_redirect_seeds_both() {
    check_redirect_seeds_both(&memory_injector());
    let (_dir, injector) = sqlite_injector();
    check_redirect_seeds_both(&injector);
}

// ============================================================================
// Metadata overrides
// ============================================================================

#[test]
fn test_score_and_interval_overrides() {
    let (_dir, injector) = sqlite_injector();
    let metadata = meta(&[("nutch.score", "3.5"), ("nutch.fetchInterval", "86400")]);
    assert!(injector.inject(URL, &metadata).unwrap());

    let record = injector.get(URL).unwrap().unwrap();
    assert_eq!(record.score, 3.5);
    assert_eq!(record.fetch_interval_secs, 86400);
    assert_eq!(record.metadata_str("nutch.fetchInterval"), Some("86400"));
}

#[test]
fn test_malformed_score_falls_back_to_default() {
    let injector = memory_injector();
    assert!(injector.inject(URL, &meta(&[("nutch.score", "not-a-number")])).unwrap());

    let record = injector.get(URL).unwrap().unwrap();
    assert_eq!(record.score, 1.0);
}

fn check_non_finite_score_is_ignored<S: FrontierStore>(injector: &Injector<S>) {
    for (i, raw) in ["NaN", "inf", "-inf"].iter().enumerate() {
        let url = format!("http://host{}.example.com/", i);
        assert!(injector.inject(&url, &meta(&[("nutch.score", *raw)])).unwrap());
        assert!(injector.has_url(&url).unwrap());

        let record = injector.get(&url).unwrap().unwrap();
        assert_eq!(record.score, 1.0);
        assert_eq!(record.metadata_str("nutch.score"), Some(*raw));
    }
}

#[test]
fn test_non_finite_score_is_ignored() {
    check_non_finite_score_is_ignored(&memory_injector());
    let (_dir, injector) = sqlite_injector();
    check_non_finite_score_is_ignored(&injector);
}

#[test]
fn test_configured_defaults_and_keys() {
    let config = InjectorConfig::default()
        .with_default_score(0.25)
        .with_default_fetch_interval(3600)
        .with_override_keys(OverrideKeys {
            score: "priority".to_string(),
            fetch_interval: "every".to_string(),
        });
    let injector = Injector::new(MemoryStore::new(), config);

    injector.inject("http://a.com/", &Metadata::new()).unwrap();
    let record = injector.get("http://a.com/").unwrap().unwrap();
    assert_eq!(record.score, 0.25);
    assert_eq!(record.fetch_interval_secs, 3600);

    injector
        .inject("http://b.com/", &meta(&[("priority", "7"), ("nutch.score", "9")]))
        .unwrap();
    let record = injector.get("http://b.com/").unwrap().unwrap();
    assert_eq!(record.score, 7.0);
}

// ============================================================================
// Redirect chains
// ============================================================================

#[test]
fn test_chain_of_two_redirect_calls() {
    let injector = memory_injector();
    let (a, b, c) = ("http://a.com/", "http://b.com/", "http://c.com/");

    assert!(injector.add_redirect(a, b, &Metadata::new()).unwrap());
    // b is now a seed, so it cannot become a redirect any more
    assert!(!injector.add_redirect(b, c, &Metadata::new()).unwrap());

    assert_eq!(injector.store().len().unwrap(), 2);
    assert!(!injector.has_url(c).unwrap());
}

#[test]
fn test_chain_writes_every_hop() {
    let (_dir, injector) = sqlite_injector();
    let chain = ["http://a.com/", "http://b.com/", "http://c.com/"];

    assert!(injector.add_redirect_chain(&chain, &Metadata::new()).unwrap());
    assert_eq!(injector.store().len().unwrap(), 3);

    let a = injector.get(chain[0]).unwrap().unwrap();
    let b = injector.get(chain[1]).unwrap().unwrap();
    let c = injector.get(chain[2]).unwrap().unwrap();
    assert_eq!(a.redirect_target(), Some(chain[1]));
    assert_eq!(b.redirect_target(), Some(chain[2]));
    assert_eq!(c.status, CrawlStatus::Unfetched);
}

#[test]
fn test_cyclic_chain_terminates() {
    let injector = memory_injector();
    let chain = ["http://a.com/", "http://b.com/", "http://a.com/"];

    assert!(injector.add_redirect_chain(&chain, &Metadata::new()).unwrap());
    assert_eq!(injector.store().len().unwrap(), 2);
    assert_eq!(injector.store().pending_len(), 0);

    let a = injector.get(chain[0]).unwrap().unwrap();
    assert_eq!(a.status, CrawlStatus::RedirectPermanent);
}

#[test]
fn test_chain_stops_at_stored_hop() {
    let injector = memory_injector();
    injector.inject("http://b.com/", &Metadata::new()).unwrap();
    let chain = ["http://a.com/", "http://b.com/", "http://c.com/"];

    assert!(injector.add_redirect_chain(&chain, &Metadata::new()).unwrap());
    assert!(!injector.has_url("http://c.com/").unwrap());
    assert_eq!(
        injector.get("http://b.com/").unwrap().unwrap().status,
        CrawlStatus::Unfetched
    );
    assert_eq!(injector.store().pending_len(), 0);
}

#[test]
fn test_redirect_from_stored_url_ignores_invalid_target() {
    let (_dir, injector) = sqlite_injector();
    assert!(injector.inject("http://t.co/x", &Metadata::new()).unwrap());

    assert!(!injector
        .add_redirect("http://t.co/x", "not a url", &Metadata::new())
        .unwrap());
    assert_eq!(injector.store().len().unwrap(), 1);
}

#[test]
fn test_single_hop_limit_allows_plain_redirect() {
    let config = InjectorConfig::from_json(r#"{"max_redirect_hops": 1}"#).unwrap();
    let injector = Injector::new(MemoryStore::new(), config);

    assert!(injector.add_redirect(SHORT_URL, URL, &Metadata::new()).unwrap());
    assert!(injector.has_url(URL).unwrap());
}

#[test]
fn test_single_url_chain_is_inject() {
    let injector = memory_injector();
    assert!(injector.add_redirect_chain(&[URL], &Metadata::new()).unwrap());
    assert!(!injector.add_redirect_chain(&[], &Metadata::new()).unwrap());
    assert_eq!(injector.get(URL).unwrap().unwrap().status, CrawlStatus::Unfetched);
}

// ============================================================================
// Documents and errors
// ============================================================================

#[test]
fn test_write_document() {
    let (_dir, injector) = sqlite_injector();
    let doc = Document::new(URL)
        .with_content(b"<html/>".to_vec(), "text/html")
        .with_header("Content-Length", "7");
    let metadata = meta(&[("nutch.score", "5")]);

    assert!(injector.write_document(&doc, &metadata, "1700000000-1").unwrap());
    assert!(!injector.inject(URL, &Metadata::new()).unwrap());

    let record = injector.get(URL).unwrap().unwrap();
    assert_eq!(record.status, CrawlStatus::Fetched);
    assert_eq!(record.base_url.as_deref(), Some(URL));
    assert_eq!(record.score, 0.0);
    assert_eq!(record.metadata_str("nutch.score"), Some("5"));
    assert_eq!(
        record.markers.get(FETCH_MARKER).map(String::as_str),
        Some("1700000000-1")
    );
}

#[test]
fn test_invalid_url_is_reported() {
    let injector = memory_injector();
    for result in [
        injector.has_url("not a url"),
        injector.inject("not a url", &Metadata::new()),
        injector.write_document(&Document::new("not a url"), &Metadata::new(), "b"),
    ] {
        assert!(matches!(result, Err(SeedError::InvalidUrl { .. })));
    }
}

#[test]
fn test_keys_are_deterministic() {
    assert_eq!(to_key(URL).unwrap(), to_key(URL).unwrap());
    let injector = memory_injector();
    injector.inject(URL, &Metadata::new()).unwrap();
    assert_eq!(injector.store().keys().unwrap(), vec![to_key(URL).unwrap()]);
}
