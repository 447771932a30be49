//! Store keys for frontier records.
//!
//! A key is the URL with its host labels reversed, so that every URL of a site
//! (and of its subdomains) sorts next to each other:
//! `http://www.l3s.de/team?x=1` becomes `de.l3s.www:http/team?x=1`.
//! A non-default port follows the scheme: `com.example:https:8443/`.

use crate::error::{Result, SeedError};
use url::Url;

/// Derive the store key for `url`.
pub fn to_key(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| SeedError::invalid_url(url, e))?;
    if parsed.cannot_be_a_base() {
        return Err(SeedError::invalid_url(url, "URL has no hierarchical path"));
    }

    let host = parsed.host_str().unwrap_or("");
    let mut key = String::with_capacity(url.len() + 1);
    key.push_str(&reverse_host(host));
    key.push(':');
    key.push_str(parsed.scheme());
    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(parsed.path());
    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }
    Ok(key)
}

/// Rebuild the URL a key was derived from.
pub fn from_key(key: &str) -> Result<String> {
    let (host, rest) = split_host(key)
        .ok_or_else(|| SeedError::invalid_url(key, "key has no scheme separator"))?;

    let path_start = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, file) = rest.split_at(path_start);
    let (scheme, port) = match authority.split_once(':') {
        Some((scheme, port)) => (scheme, Some(port)),
        None => (authority, None),
    };
    if scheme.is_empty() {
        return Err(SeedError::invalid_url(key, "key has an empty scheme"));
    }

    let mut url = format!("{}://{}", scheme, reverse_host(host));
    if let Some(port) = port {
        url.push(':');
        url.push_str(port);
    }
    url.push_str(file);
    Ok(url)
}

/// The reversed host portion of a key, e.g. `de.l3s.www`.
pub fn host_of_key(key: &str) -> &str {
    split_host(key).map_or(key, |(host, _)| host)
}

/// Split a key after its host. Bracketed IPv6 hosts contain `:` themselves.
fn split_host(key: &str) -> Option<(&str, &str)> {
    if key.starts_with('[') {
        let end = key.find("]:")?;
        return Some((&key[..=end], &key[end + 2..]));
    }
    key.split_once(':')
}

fn reverse_host(host: &str) -> String {
    if host.starts_with('[') {
        return host.to_string();
    }
    host.split('.').rev().collect::<Vec<_>>().join(".")
}
