//! Authenticated RPC clients for the backend services behind the status
//! indicator.
//!
//! One mutual-TLS identity per service kind, loaded from disk at client
//! construction and immutable afterward.  The factory resolves addresses and
//! credential paths from [`farmwatch_config::Config`]; the call primitive
//! speaks the JSON envelope every backend RPC expects and hands back the raw
//! response without interpreting the body.  Decoding lives in [`wire`], the
//! farmer liveness check in [`probe`].

mod error;
pub mod probe;
pub mod wire;

pub use error::RpcError;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use farmwatch_config::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

// ── Service kinds ────────────────────────────────────────────────────────────

/// The backend services this deployment knows about.
///
/// Adding a new RPC-capable service means a new variant plus a registry
/// entry in [`ClientFactory::new`] — the call contract does not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    FullNode,
    Farmer,
    Harvester,
}

impl ServiceKind {
    /// Directory and file-name stem for this service's TLS material:
    /// `<cert_dir>/<slug>/private_<slug>.{crt,key}`.
    pub fn slug(&self) -> &'static str {
        match self {
            ServiceKind::FullNode => "full_node",
            ServiceKind::Farmer => "farmer",
            ServiceKind::Harvester => "harvester",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ── Endpoint registry ────────────────────────────────────────────────────────

/// Resolved base address plus credential paths for one service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub base_url: Url,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl ServiceEndpoint {
    fn resolve(service: ServiceKind, raw_url: &str, cert_dir: &Path) -> Result<Self, RpcError> {
        let base_url = parse_service_url(service, raw_url)?;
        let dir = cert_dir.join(service.slug());
        Ok(Self {
            base_url,
            cert_path: dir.join(format!("private_{}.crt", service.slug())),
            key_path: dir.join(format!("private_{}.key", service.slug())),
        })
    }
}

/// Parse a configured or caller-supplied address, tagging failures with the
/// owning service.
pub fn parse_service_url(service: ServiceKind, raw: &str) -> Result<Url, RpcError> {
    Url::parse(raw).map_err(|source| RpcError::InvalidAddress {
        service,
        address: raw.to_string(),
        source,
    })
}

// ── Client factory ───────────────────────────────────────────────────────────

/// Builds per-service mutual-TLS clients from the endpoint registry.
///
/// The registry covers the RPC-capable services.  The farmer exposes no RPC
/// surface to this system — it is only probed over raw TCP — so asking for a
/// farmer client yields [`RpcError::UnknownService`].
#[derive(Debug, Clone)]
pub struct ClientFactory {
    registry: HashMap<ServiceKind, ServiceEndpoint>,
    request_timeout: Duration,
}

impl ClientFactory {
    pub fn new(config: &Config) -> Result<Self, RpcError> {
        let services = &config.services;
        let mut registry = HashMap::new();
        registry.insert(
            ServiceKind::FullNode,
            ServiceEndpoint::resolve(
                ServiceKind::FullNode,
                &services.full_node_url,
                &services.cert_dir,
            )?,
        );
        registry.insert(
            ServiceKind::Harvester,
            ServiceEndpoint::resolve(
                ServiceKind::Harvester,
                &services.harvester_url,
                &services.cert_dir,
            )?,
        );

        Ok(Self {
            registry,
            request_timeout: Duration::from_secs(config.rpc.request_timeout_secs),
        })
    }

    pub fn endpoint(&self, service: ServiceKind) -> Result<&ServiceEndpoint, RpcError> {
        self.registry
            .get(&service)
            .ok_or(RpcError::UnknownService(service))
    }

    /// Build a client bound to `service`'s identity and base address.
    ///
    /// The certificate pair is read here, once; the returned client is
    /// immutable afterward and safe to share across concurrent requests.
    pub fn client(&self, service: ServiceKind) -> Result<RpcClient, RpcError> {
        let endpoint = self.endpoint(service)?;
        let identity = load_identity(service, &endpoint.cert_path, &endpoint.key_path)?;

        // The deployment trusts one fixed self-issued server certificate and
        // does not participate in public CA trust, so chain verification
        // against the system store is disabled.
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .danger_accept_invalid_certs(true)
            .timeout(self.request_timeout)
            .build()
            .map_err(|source| RpcError::IdentityInvalid { service, source })?;

        Ok(RpcClient {
            service,
            base_url: endpoint.base_url.clone(),
            http,
        })
    }
}

fn load_identity(
    service: ServiceKind,
    cert_path: &Path,
    key_path: &Path,
) -> Result<reqwest::Identity, RpcError> {
    let cert = fs::read(cert_path).map_err(|source| RpcError::IdentityLoad {
        service,
        path: cert_path.to_path_buf(),
        source,
    })?;
    let key = fs::read(key_path).map_err(|source| RpcError::IdentityLoad {
        service,
        path: key_path.to_path_buf(),
        source,
    })?;

    // rustls takes the private key and certificate chain as one PEM bundle.
    let mut pem = key;
    pem.extend_from_slice(&cert);
    reqwest::Identity::from_pem(&pem).map_err(|source| RpcError::IdentityInvalid { service, source })
}

// ── RPC client ───────────────────────────────────────────────────────────────

/// A request primitive bound to one service's identity and base address.
#[derive(Debug, Clone)]
pub struct RpcClient {
    service: ServiceKind,
    base_url: Url,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue an authenticated POST and return the raw response.
    ///
    /// `path` is resolved against the base address; an absolute path (or a
    /// full URL) overrides it.  Every supported backend RPC requires a JSON
    /// body even for no-argument calls, so an omitted `body` is sent as `{}`.
    /// No retries here — retry policy, if any, belongs to the caller.
    pub async fn call(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, RpcError> {
        let url = resolve_path(&self.base_url, path).map_err(|source| {
            RpcError::InvalidAddress {
                service: self.service,
                address: path.to_string(),
                source,
            }
        })?;
        let body = body.unwrap_or_else(|| serde_json::json!({}));

        debug!(service = %self.service, %url, "rpc call");
        self.http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    RpcError::Timeout {
                        service: self.service,
                        url: url.to_string(),
                    }
                } else {
                    RpcError::Transport {
                        service: self.service,
                        source,
                    }
                }
            })
    }
}

/// Join a caller path onto a base address.  Relative paths append, absolute
/// paths replace, full URLs win outright (`Url::join` semantics).
fn resolve_path(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    base.join(path)
}

// ── Tests ────────────────────────────────────────────────────────────────────
