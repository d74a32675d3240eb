//
//  config.rs
//  routecheck
//

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, RouteCheckError};
use crate::model::HttpMethod;

/// Top-level routecheck configuration (`routecheck.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteCheckConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Source discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directories to scan (relative to the config file's directory).
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    /// Extra directory names to skip on top of the built-in list.
    #[serde(default)]
    pub extra_ignores: Vec<String>,
}

/// How HTTP client invocations are recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Receiver names treated as request dispatchers (`restTemplate.get(...)`).
    #[serde(default = "default_dispatch_receivers")]
    pub dispatch_receivers: Vec<String>,
    /// Declared field/local/parameter types treated as request dispatchers.
    #[serde(default = "default_dispatch_types")]
    pub dispatch_types: Vec<String>,
    /// Extra invocation names mapped to a verb, on top of the built-ins.
    #[serde(default)]
    pub verb_aliases: BTreeMap<String, HttpMethod>,
}

/// Whether scheme/host prefixes take part in matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HostPolicy {
    /// Compare paths only.
    #[default]
    Strip,
    /// Calls carrying a scheme/host never match routes of the scanned code.
    Keep,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub host_policy: HostPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    /// Occurrences of one fragment in a class before it is reported.
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Derive cross-class constants from the scanned classes themselves.
    #[serde(default = "default_true")]
    pub derive_globals: bool,
    /// Worker threads (default: one per core).
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_roots() -> Vec<String> {
    vec![".".to_string()]
}

fn default_dispatch_receivers() -> Vec<String> {
    [
        "httpClient",
        "restTemplate",
        "restClient",
        "webClient",
        "client",
        "http",
        "template",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_dispatch_types() -> Vec<String> {
    [
        "RestTemplate",
        "RestOperations",
        "RestClient",
        "WebClient",
        "HttpClient",
        "TestRestTemplate",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_occurrences() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            extra_ignores: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dispatch_receivers: default_dispatch_receivers(),
            dispatch_types: default_dispatch_types(),
            verb_aliases: BTreeMap::new(),
        }
    }
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            min_occurrences: default_min_occurrences(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            derive_globals: default_true(),
            threads: None,
        }
    }
}

impl RouteCheckConfig {
    pub const FILE_NAME: &'static str = "routecheck.toml";

    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                warn!("ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Load config from a file the user asked for explicitly.
    pub fn try_load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| RouteCheckError::Config(format!("{}: {e}", path.display())))
    }

    /// Resolve the scan roots relative to `base`.
    pub fn resolve_roots(&self, base: &Path) -> Vec<PathBuf> {
        self.scan.roots.iter().map(|root| base.join(root)).collect()
    }
}
