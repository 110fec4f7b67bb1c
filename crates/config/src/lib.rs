use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Defaults ─────────────────────────────────────────────────────────────────

/// Stock full-node RPC address for a local deployment.
pub const DEFAULT_FULL_NODE_URL: &str = "https://localhost:8555";
/// Stock farmer control address; only probed over raw TCP, never called.
pub const DEFAULT_FARMER_URL: &str = "https://localhost:8559";
/// Stock harvester RPC address.
pub const DEFAULT_HARVESTER_URL: &str = "https://localhost:8560";
/// Root directory holding one `<service>/private_<service>.{crt,key}` pair
/// per backend service.
pub const DEFAULT_CERT_DIR: &str = "certs";
/// Upper bound on any single RPC request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
/// Upper bound on the farmer TCP probe, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

// ── Services config ──────────────────────────────────────────────────────────

/// Where each backend service lives and where its TLS material is mounted.
///
/// Addresses are kept as strings here and parsed at client-factory
/// construction, so a bad address surfaces as a factory error for that
/// service rather than a config-load failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Base address of the full-node RPC.  Overridden at runtime by the
    /// `FARMWATCH_FULL_NODE_URL` environment variable when set.
    pub full_node_url: String,
    /// Address of the farmer control endpoint.  Overridden by
    /// `FARMWATCH_FARMER_URL`.  Reachability of this host:port is the whole
    /// farmer health signal.
    pub farmer_url: String,
    /// Base address of the harvester RPC.  Overridden by
    /// `FARMWATCH_HARVESTER_URL`.
    pub harvester_url: String,
    /// Directory containing per-service certificate pairs.  Overridden by
    /// `FARMWATCH_CERT_DIR`.
    pub cert_dir: PathBuf,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            full_node_url: DEFAULT_FULL_NODE_URL.to_string(),
            farmer_url: DEFAULT_FARMER_URL.to_string(),
            harvester_url: DEFAULT_HARVESTER_URL.to_string(),
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
        }
    }
}

// ── RPC config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Explicit configuration handed to the client factory at construction.
/// Core code never reads the environment directly; all ambient lookups
/// happen once, here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub services: ServicesConfig,
    pub rpc: RpcConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment
    /// overrides.  A missing file yields the defaults; a file that exists
    /// but fails to parse is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take precedence over the config file.
    /// Absent or empty variables fall back silently.
    fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("FARMWATCH_FULL_NODE_URL") {
            self.services.full_node_url = url;
        }
        if let Some(url) = non_empty_env("FARMWATCH_FARMER_URL") {
            self.services.farmer_url = url;
        }
        if let Some(url) = non_empty_env("FARMWATCH_HARVESTER_URL") {
            self.services.harvester_url = url;
        }
        if let Some(dir) = non_empty_env("FARMWATCH_CERT_DIR") {
            self.services.cert_dir = PathBuf::from(dir);
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

// ── Tests ────────────────────────────────────────────────────────────────────
