use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ServiceKind;

/// Everything that can go wrong between "build me a client" and "here is the
/// raw response".  The factory and call primitive surface these to the
/// caller; they never substitute default values themselves.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The requested kind has no registry entry.  A programming or
    /// deployment error, fatal.
    #[error("no RPC endpoint registered for service `{0}`")]
    UnknownService(ServiceKind),

    /// Certificate or key unreadable.  Fatal to client construction for
    /// that service; no network call is attempted.
    #[error("failed to load TLS identity for `{service}` from {}", path.display())]
    IdentityLoad {
        service: ServiceKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The PEM material was read but rejected while building the client.
    #[error("TLS identity for `{service}` was rejected")]
    IdentityInvalid {
        service: ServiceKind,
        #[source]
        source: reqwest::Error,
    },

    /// A configured or caller-supplied address failed to parse.
    #[error("invalid address for `{service}`: {address}")]
    InvalidAddress {
        service: ServiceKind,
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// The request exceeded the configured bound.  Callers may retry or
    /// treat it as a data-source failure; the core does neither.
    #[error("request to `{service}` at {url} timed out")]
    Timeout { service: ServiceKind, url: String },

    /// Non-2xx status, or a body failing its shape guard.  Carries the
    /// status and a body snippet for diagnostics.
    #[error("unexpected response from `{service}` (HTTP {status}): {detail}")]
    UnexpectedResponse {
        service: ServiceKind,
        status: u16,
        detail: String,
    },

    /// Connect or TLS handshake failure.  Fail fast, no retry.
    #[error("transport error calling `{service}`")]
    Transport {
        service: ServiceKind,
        #[source]
        source: reqwest::Error,
    },
}
