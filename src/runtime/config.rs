//! Runtime configuration.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! JSON document ([`RuntimeConfig::from_json`]) and environment overrides
//! ([`RuntimeConfig::with_env_overrides`]).
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CADR_GC_THRESHOLD` | `10000` | Allocations between collections |
//! | `CADR_GC_ENABLED` | `true` | Allow threshold-driven collection |
//! | `CADR_MINOR_GC` | `true` | Threshold-driven collections are young-only |
//! | `CADR_RECYCLE_PAIRS` | `true` | Released pairs go onto the free list |
//! | `CADR_SORT_PIVOT_THRESHOLD` | `15` | Vector size above which quicksort uses median-of-three |
//! | `CADR_SHUFFLE_SEED` | unset | Fixed seed for `shuffle` |
//!
//! Unparsable values are ignored with a warning.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::runtime::error::{Error, Result};

pub const DEFAULT_GC_THRESHOLD: usize = 10_000;
pub const DEFAULT_SORT_PIVOT_THRESHOLD: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub gc_threshold: usize,
    pub gc_enabled: bool,
    pub minor_collections: bool,
    pub recycle_pairs: bool,
    pub sort_pivot_threshold: usize,
    pub shuffle_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_enabled: true,
            minor_collections: true,
            recycle_pairs: true,
            sort_pivot_threshold: DEFAULT_SORT_PIVOT_THRESHOLD,
            shuffle_seed: None,
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| {
            Error::type_mismatch("runtime-config", format!("invalid configuration: {}", err))
        })
    }

    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = parse_var(&lookup, "CADR_GC_THRESHOLD") {
            self.gc_threshold = n;
        }
        if let Some(b) = parse_flag(&lookup, "CADR_GC_ENABLED") {
            self.gc_enabled = b;
        }
        if let Some(b) = parse_flag(&lookup, "CADR_MINOR_GC") {
            self.minor_collections = b;
        }
        if let Some(b) = parse_flag(&lookup, "CADR_RECYCLE_PAIRS") {
            self.recycle_pairs = b;
        }
        if let Some(n) = parse_var(&lookup, "CADR_SORT_PIVOT_THRESHOLD") {
            self.sort_pivot_threshold = n;
        }
        if let Some(seed) = parse_var(&lookup, "CADR_SHUFFLE_SEED") {
            self.shuffle_seed = Some(seed);
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let raw = lookup(name)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(variable = name, value = %raw, "ignoring unparsable flag");
            None
        }
    }
}
