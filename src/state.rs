// ===============================
// src/state.rs
// ===============================
//
// Blob state antar tick (opaque bagi harness). Isinya hanya rolling state
// per strategi; config (limit, koefisien, fair) tidak ikut disimpan.
//
// Blob kosong / rusak / versi beda -> StateError, dan Trader me-reset semua
// strategi ke default. Tidak pernah menggagalkan tick.
//

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ConversionObservation, Symbol};
use crate::predictor::PriceWindow;

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("empty state blob")]
    Empty,
    #[error("state decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("state version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },
    #[error("state for {symbol} has kind {found}, strategy is {expected}")]
    KindMismatch { symbol: String, found: &'static str, expected: &'static str },
    #[error("state is missing {0}")]
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyState {
    FixedFair,
    Predictive { window: PriceWindow },
    Conversion { last_observation: Option<ConversionObservation> },
    Basket { first_mid: Option<f64>, deviation: Option<f64> },
}

impl StrategyState {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyState::FixedFair => "fixed_fair",
            StrategyState::Predictive { .. } => "predictive",
            StrategyState::Conversion { .. } => "conversion",
            StrategyState::Basket { .. } => "basket",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub ticks: u64,
    pub strategies: BTreeMap<Symbol, StrategyState>,
}

impl PersistedState {
    pub fn new(ticks: u64, strategies: BTreeMap<Symbol, StrategyState>) -> Self {
        Self { version: STATE_VERSION, ticks, strategies }
    }

    pub fn encode(&self) -> String {
        // Semua field serializable tanpa map key non-string -> tidak bisa gagal.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(blob: &str) -> Result<Self, StateError> {
        if blob.trim().is_empty() {
            return Err(StateError::Empty);
        }
        let state: PersistedState = serde_json::from_str(blob)?;
        if state.version != STATE_VERSION {
            return Err(StateError::Version { found: state.version, expected: STATE_VERSION });
        }
        Ok(state)
    }
}
