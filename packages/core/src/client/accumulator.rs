//! Change accumulator
//!
//! Decides what happens to a committed move after it has been applied to the
//! rendered tree: forward it at once ([`SaveMode::Immediate`]) or hold it in an
//! ordered pending batch until Save or Cancel ([`SaveMode::Batched`]).

use crate::models::MoveIntent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveMode {
    Immediate,
    Batched,
}

/// Save/Cancel control state for the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAffordances {
    pub save_enabled: bool,
    pub cancel_enabled: bool,
    pub show_unsaved_indicator: bool,
}

#[derive(Debug, Clone)]
pub struct ChangeAccumulator {
    mode: SaveMode,
    pending: Vec<MoveIntent>,
}

impl ChangeAccumulator {
    pub fn new(mode: SaveMode) -> Self {
        Self {
            mode,
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> SaveMode {
        self.mode
    }

    /// True once a move is queued and until Save or Cancel
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &[MoveIntent] {
        &self.pending
    }

    /// Record a committed move.
    ///
    /// Returns the moves to persist right now: the move itself in immediate
    /// mode, nothing in batched mode.
    pub fn record(&mut self, intent: MoveIntent) -> Option<Vec<MoveIntent>> {
        match self.mode {
            SaveMode::Immediate => Some(vec![intent]),
            SaveMode::Batched => {
                self.pending.push(intent);
                tracing::debug!("Queued move, {} pending", self.pending.len());
                None
            }
        }
    }

    /// Hand out the whole queue in order and clear the dirty flag
    pub fn take_batch(&mut self) -> Vec<MoveIntent> {
        std::mem::take(&mut self.pending)
    }

    /// Drop the queue. Returns how many moves were discarded.
    pub fn discard(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    pub fn affordances(&self) -> SaveAffordances {
        let dirty = self.mode == SaveMode::Batched && self.is_dirty();
        SaveAffordances {
            save_enabled: dirty,
            cancel_enabled: dirty,
            show_unsaved_indicator: dirty,
        }
    }
}
