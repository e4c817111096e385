//! Per-package load state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a package is in its load.
///
/// ```text
/// NotRequested → Resolving → Fetching → Extracting → DependencyResolving
///              → Loading → Loaded
/// any step     → Failed
/// ```
///
/// A package that was only resolved (never executed) rests at `Resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    NotRequested,
    /// Choosing an artifact.
    Resolving,
    /// Downloading the artifact.
    Fetching,
    /// Reading the archive and its metadata.
    Extracting,
    /// Walking the dependency graph.
    DependencyResolving,
    /// Fetched and dependencies walked; nothing executed yet.
    Resolved,
    /// Executing code entries in the host.
    Loading,
    Loaded,
    /// The load failed; carries the reason.
    Failed(String),
}

impl LoadState {
    /// `Loaded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::Failed(_))
    }

    /// Whether a step of the load is currently running.
    pub fn is_in_progress(&self) -> bool {
        !matches!(
            self,
            LoadState::NotRequested | LoadState::Resolved | LoadState::Loaded | LoadState::Failed(_)
        )
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::NotRequested => f.write_str("not requested"),
            LoadState::Resolving => f.write_str("resolving"),
            LoadState::Fetching => f.write_str("fetching"),
            LoadState::Extracting => f.write_str("extracting"),
            LoadState::DependencyResolving => f.write_str("resolving dependencies"),
            LoadState::Resolved => f.write_str("resolved"),
            LoadState::Loading => f.write_str("loading"),
            LoadState::Loaded => f.write_str("loaded"),
            LoadState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
