//! Seed lists: one URL per line, followed by optional tab separated
//! `key=value` metadata, e.g. `http://www.l3s.de/\tnutch.score=2.5`.

use crate::record::Metadata;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct SeedLine {
    pub url: String,
    pub metadata: Metadata,
}

/// Parse a single URL, trying to add `http://` if it has no scheme.
pub fn parse_url_line(line: &str) -> Option<String> {
    if line.contains("://") && Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    None
}

/// Parse one `key=value` pair. The value may itself contain `=`.
pub fn parse_metadata_pair(pair: &str) -> Option<(String, String)> {
    let (key, value) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Parse a seed list line. Blank lines and `#` comments yield `None`.
pub fn parse_seed_line(line: &str) -> Option<SeedLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut parts = line.split('\t');
    let raw_url = parts.next()?.trim();
    let Some(url) = parse_url_line(raw_url) else {
        warn!("Skipping invalid URL '{}'", raw_url);
        return None;
    };

    let mut metadata = Metadata::new();
    for part in parts.filter(|p| !p.trim().is_empty()) {
        match parse_metadata_pair(part) {
            Some((key, value)) => {
                metadata.insert(key, value);
            }
            None => warn!("Skipping malformed metadata '{}' for {}", part, url),
        }
    }

    Some(SeedLine { url, metadata })
}

/// Parse a whole seed list, skipping lines that do not hold a URL.
pub fn parse_seed_list(content: &str) -> Vec<SeedLine> {
    content.lines().filter_map(parse_seed_line).collect()
}
