//! Status derivation: three independent observations in, one display state
//! out.
//!
//! Everything here is pure — no I/O, no clocks, no hidden state.  Upstream
//! failures are the caller's problem: degrade to the safe defaults
//! ([`SyncState::default`], `farmer_up = false`, empty plots) or, better,
//! short-circuit to an explicit unknown/error surface before calling in.

use serde::{Deserialize, Serialize};

// ── Inputs ───────────────────────────────────────────────────────────────────

/// The node's self-reported sync progress.
///
/// `tip_height == 0` means the tip is unknown; when it is known,
/// `progress_height <= tip_height` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub syncing: bool,
    pub synced: bool,
    pub progress_height: u64,
    pub tip_height: u64,
}

/// One unit of farming storage.  Order of a plot inventory is irrelevant;
/// only count and total size feed the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    pub size_bytes: u64,
}

// ── Display states ───────────────────────────────────────────────────────────

/// The closed set of states the indicator can show.  Recomputed on every
/// refresh, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    SyncedFarming,
    SyncedNotFarming,
    Syncing,
    NotSyncing,
    Unknown,
}

impl DisplayState {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayState::SyncedFarming => "Farming",
            DisplayState::SyncedNotFarming => "Not Farming",
            DisplayState::Syncing => "Syncing",
            DisplayState::NotSyncing => "Not Syncing",
            DisplayState::Unknown => "Unknown",
        }
    }

    /// Fixed presentation tokens — a static table, not derived logic.
    pub fn text_color(&self) -> &'static str {
        match self {
            DisplayState::SyncedFarming => "text-emerald-600",
            DisplayState::SyncedNotFarming => "text-red-800",
            DisplayState::Syncing => "text-amber-600",
            DisplayState::NotSyncing => "text-red-800",
            DisplayState::Unknown => "text-stone-700",
        }
    }

    pub fn icon_color(&self) -> &'static str {
        match self {
            DisplayState::SyncedFarming => "fill-emerald-600",
            DisplayState::SyncedNotFarming => "fill-red-800",
            DisplayState::Syncing => "fill-amber-600",
            DisplayState::NotSyncing => "fill-red-800",
            DisplayState::Unknown => "fill-stone-700",
        }
    }
}

/// Auxiliary progress shown under the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    /// Chain position when the tip is known.
    Heights { progress: u64, tip: u64 },
    /// Plot inventory summary when farming with no tip to report.
    Plots { count: usize, total_bytes: u64 },
}

/// Derived, ephemeral result of one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: DisplayState,
    pub progress: Option<Progress>,
}

// ── Derivation ───────────────────────────────────────────────────────────────

/// Reduce the three observations to a display state plus progress payload.
///
/// The state table is one exhaustive match over `(syncing, synced,
/// farmer_up)`, so totality and mutual exclusion are proved by the
/// compiler rather than by precedence conventions.  A node claiming to be
/// both syncing and synced is contradictory and reads as [`DisplayState::Unknown`].
pub fn derive_status(sync: &SyncState, farmer_up: bool, plots: &[Plot]) -> StatusReport {
    let state = match (sync.syncing, sync.synced, farmer_up) {
        (false, true, true) => DisplayState::SyncedFarming,
        (false, true, false) => DisplayState::SyncedNotFarming,
        (true, false, _) => DisplayState::Syncing,
        (false, false, _) => DisplayState::NotSyncing,
        (true, true, _) => DisplayState::Unknown,
    };

    // Payload selection is independent of which row matched: a known tip
    // always yields the height pair.
    let progress = if sync.tip_height > 0 {
        Some(Progress::Heights {
            progress: sync.progress_height,
            tip: sync.tip_height,
        })
    } else if state == DisplayState::SyncedFarming {
        Some(Progress::Plots {
            count: plots.len(),
            total_bytes: plots.iter().map(|plot| plot.size_bytes).sum(),
        })
    } else {
        None
    };

    StatusReport { state, progress }
}

// ── Tests ────────────────────────────────────────────────────────────────────
