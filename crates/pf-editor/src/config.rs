//! Editor tuning knobs.
//!
//! Hosts pass these as JSON (camelCase keys); every field has a default so
//! partial configs are fine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Coalescing window for document writes during a drag.
    pub commit_debounce_ms: u64,
    /// Coalescing window for working-size recompute after a layout change.
    pub recompute_debounce_ms: u64,
    /// Maximum undo depth.
    pub history_depth: usize,
    /// Decimals kept when a resized dimension is written back.
    pub precision: u32,
}

impl EditorConfig {
    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }

    pub fn recompute_debounce(&self) -> Duration {
        Duration::from_millis(self.recompute_debounce_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            commit_debounce_ms: 500,
            recompute_debounce_ms: 1,
            history_depth: 200,
            precision: pf_core::dimension::DEFAULT_PRECISION,
        }
    }
}
