//! Response envelopes and their shape guards.
//!
//! Each backend call returns loosely-typed JSON.  Before any field is
//! trusted, a guard checks the one key that disambiguates a well-formed
//! response from garbage (wrong endpoint, error page, version skew), then
//! the value deserializes into its typed envelope.  The result is a
//! `Result`, never a flag plus an unchecked cast, so downstream code cannot
//! touch unvalidated data.  Semantically invalid but well-shaped data passes
//! by design.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{RpcClient, RpcError, ServiceKind};

/// Cap on the body snippet carried in diagnostics.
const DETAIL_LIMIT: usize = 200;

// ── Envelopes ────────────────────────────────────────────────────────────────

/// `sync` object inside `get_blockchain_state`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SyncWire {
    pub sync_mode: bool,
    pub sync_progress_height: u64,
    pub sync_tip_height: u64,
    pub synced: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BlockchainStateWire {
    pub sync: SyncWire,
}

/// `get_blockchain_state` response.  The `success` flag is carried but not
/// consulted, matching the backend's own tooling.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BlockchainStateResponse {
    pub blockchain_state: BlockchainStateWire,
    #[serde(default)]
    pub success: bool,
}

/// One plot record.  The backend sends many more fields (filename, plot id,
/// key material); only the size contributes to the status surface.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlotWire {
    pub file_size: u64,
}

/// `get_plots` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotsResponse {
    pub plots: Vec<PlotWire>,
    #[serde(default)]
    pub success: bool,
}

// ── Guarded decoding ─────────────────────────────────────────────────────────

pub fn decode_blockchain_state(
    service: ServiceKind,
    status: StatusCode,
    body: &str,
) -> Result<BlockchainStateResponse, RpcError> {
    decode_guarded(service, status, body, "blockchain_state")
}

pub fn decode_plots(
    service: ServiceKind,
    status: StatusCode,
    body: &str,
) -> Result<PlotsResponse, RpcError> {
    decode_guarded(service, status, body, "plots")
}

fn decode_guarded<T: DeserializeOwned>(
    service: ServiceKind,
    status: StatusCode,
    body: &str,
    guard_key: &str,
) -> Result<T, RpcError> {
    if !status.is_success() {
        return Err(unexpected(service, status, detail_snippet(body)));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| unexpected(service, status, format!("body is not JSON: {err}")))?;

    if value.get(guard_key).is_none() {
        return Err(unexpected(
            service,
            status,
            format!("missing `{guard_key}` key"),
        ));
    }

    serde_json::from_value(value)
        .map_err(|err| unexpected(service, status, format!("malformed `{guard_key}`: {err}")))
}

fn unexpected(service: ServiceKind, status: StatusCode, detail: String) -> RpcError {
    RpcError::UnexpectedResponse {
        service,
        status: status.as_u16(),
        detail,
    }
}

fn detail_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= DETAIL_LIMIT {
        return trimmed.to_string();
    }
    let mut end = DETAIL_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

// ── Typed calls ──────────────────────────────────────────────────────────────

impl RpcClient {
    /// `get_blockchain_state` (POST, empty JSON body).
    pub async fn get_blockchain_state(&self) -> Result<BlockchainStateResponse, RpcError> {
        let response = self.call("get_blockchain_state", None).await?;
        let status = response.status();
        let body = self.read_body(response).await?;
        decode_blockchain_state(self.service(), status, &body)
    }

    /// `get_plots` (POST, empty JSON body).
    pub async fn get_plots(&self) -> Result<PlotsResponse, RpcError> {
        let response = self.call("get_plots", None).await?;
        let status = response.status();
        let body = self.read_body(response).await?;
        decode_plots(self.service(), status, &body)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, RpcError> {
        response.text().await.map_err(|source| RpcError::Transport {
            service: self.service(),
            source,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_NODE: ServiceKind = ServiceKind::FullNode;
    const HARVESTER: ServiceKind = ServiceKind::Harvester;

    fn assert_unexpected(err: RpcError, wanted_status: u16, wanted_detail: &str) {
        match err {
            RpcError::UnexpectedResponse { status, detail, .. } => {
                assert_eq!(status, wanted_status);
                assert!(
                    detail.contains(wanted_detail),
                    "detail `{detail}` missing `{wanted_detail}`"
                );
            }
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }

    // ── Blockchain state ───────────────────────────────────────────────────

    #[test]
    fn decodes_well_formed_blockchain_state() {
        let body = r#"{
            "blockchain_state": {
                "sync": {
                    "sync_mode": true,
                    "sync_progress_height": 50,
                    "sync_tip_height": 500,
                    "synced": false
                }
            },
            "success": true
        }"#;

        let decoded = decode_blockchain_state(FULL_NODE, StatusCode::OK, body).unwrap();
        let sync = decoded.blockchain_state.sync;
        assert!(sync.sync_mode);
        assert!(!sync.synced);
        assert_eq!(sync.sync_progress_height, 50);
        assert_eq!(sync.sync_tip_height, 500);
        assert!(decoded.success);
    }

    #[test]
    fn rejects_body_without_blockchain_state_key() {
        let err =
            decode_blockchain_state(FULL_NODE, StatusCode::OK, r#"{"error": "bad"}"#).unwrap_err();
        assert_unexpected(err, 200, "missing `blockchain_state` key");
    }

    #[test]
    fn rejects_blockchain_state_with_wrong_shape() {
        // Guard key present but the inner structure is not the sync object.
        let body = r#"{"blockchain_state": {"sync": "nope"}}"#;
        let err = decode_blockchain_state(FULL_NODE, StatusCode::OK, body).unwrap_err();
        assert_unexpected(err, 200, "malformed `blockchain_state`");
    }

    // ── Plots ──────────────────────────────────────────────────────────────

    #[test]
    fn decodes_plots_ignoring_extra_fields() {
        let body = r#"{
            "plots": [
                {"file_size": 1000, "filename": "plot-a.dat", "pool_key": "abc"},
                {"file_size": 2000, "filename": "plot-b.dat"}
            ],
            "success": true
        }"#;

        let decoded = decode_plots(HARVESTER, StatusCode::OK, body).unwrap();
        assert_eq!(decoded.plots.len(), 2);
        assert_eq!(decoded.plots[0].file_size, 1000);
        assert_eq!(decoded.plots[1].file_size, 2000);
    }

    #[test]
    fn decodes_empty_plot_inventory() {
        let decoded = decode_plots(HARVESTER, StatusCode::OK, r#"{"plots": []}"#).unwrap();
        assert!(decoded.plots.is_empty());
        assert!(!decoded.success, "absent success flag defaults to false");
    }

    #[test]
    fn rejects_body_without_plots_key() {
        let err = decode_plots(HARVESTER, StatusCode::OK, r#"{"harvesters": []}"#).unwrap_err();
        assert_unexpected(err, 200, "missing `plots` key");
    }

    // ── HTTP and parse failures ────────────────────────────────────────────

    #[test]
    fn non_2xx_fails_with_status_and_body_text() {
        let err = decode_plots(HARVESTER, StatusCode::SERVICE_UNAVAILABLE, "harvester starting")
            .unwrap_err();
        assert_unexpected(err, 503, "harvester starting");
    }

    #[test]
    fn non_json_body_fails_guard() {
        let err =
            decode_blockchain_state(FULL_NODE, StatusCode::OK, "<html>error</html>").unwrap_err();
        assert_unexpected(err, 200, "body is not JSON");
    }

    #[test]
    fn long_error_bodies_are_truncated_in_detail() {
        let body = "x".repeat(5000);
        let err = decode_plots(HARVESTER, StatusCode::BAD_GATEWAY, &body).unwrap_err();
        match err {
            RpcError::UnexpectedResponse { detail, .. } => {
                assert!(detail.chars().count() <= DETAIL_LIMIT + 1);
                assert!(detail.ends_with('…'));
            }
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }
}
