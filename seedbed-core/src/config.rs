use crate::error::{Result, SeedError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default score for injected pages.
pub const DEFAULT_SCORE: f32 = 1.0;
/// Default re-fetch interval: 30 days.
pub const DEFAULT_FETCH_INTERVAL_SECS: i32 = 2_592_000;
/// Default bound on redirect hops followed by one chain.
pub const DEFAULT_MAX_REDIRECT_HOPS: usize = 16;

/// Metadata keys whose values override the seed defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideKeys {
    pub score: String,
    pub fetch_interval: String,
}

impl Default for OverrideKeys {
    fn default() -> Self {
        Self {
            score: "nutch.score".to_string(),
            fetch_interval: "nutch.fetchInterval".to_string(),
        }
    }
}

/// Construction-time settings for an [`Injector`](crate::injector::Injector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    pub default_score: f32,
    pub default_fetch_interval_secs: i32,
    pub override_keys: OverrideKeys,
    pub max_redirect_hops: usize,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            default_score: DEFAULT_SCORE,
            default_fetch_interval_secs: DEFAULT_FETCH_INTERVAL_SECS,
            override_keys: OverrideKeys::default(),
            max_redirect_hops: DEFAULT_MAX_REDIRECT_HOPS,
        }
    }
}

impl InjectorConfig {
    pub fn with_default_score(mut self, score: f32) -> Self {
        self.default_score = score;
        self
    }

    pub fn with_default_fetch_interval(mut self, secs: i32) -> Self {
        self.default_fetch_interval_secs = secs;
        self
    }

    pub fn with_override_keys(mut self, keys: OverrideKeys) -> Self {
        self.override_keys = keys;
        self
    }

    /// Bound redirect chains to `hops` hops; at least one is always allowed.
    pub fn with_max_redirect_hops(mut self, hops: usize) -> Self {
        self.max_redirect_hops = hops.max(1);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: InjectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<()> {
        if !self.default_score.is_finite() {
            return Err(SeedError::Config("default_score must be finite".to_string()));
        }
        if self.max_redirect_hops < 1 {
            return Err(SeedError::Config(
                "max_redirect_hops must allow at least one hop".to_string(),
            ));
        }
        if self.override_keys.score == self.override_keys.fetch_interval {
            return Err(SeedError::Config(
                "score and fetch interval override keys must differ".to_string(),
            ));
        }
        Ok(())
    }
}
