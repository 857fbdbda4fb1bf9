//! Transferable strategy snapshots
//!
//! Workers never share a live `Strategy`. Each one receives a snapshot (the
//! name plus a JSON payload describing the logic) and rebuilds its own copy.

use ipd_match::{Strategy, StrategyLogic};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub name: String,
    /// `serde_json` encoding of the strategy's logic
    pub payload: String,
}

impl StrategySnapshot {
    pub fn capture(strategy: &Strategy) -> Result<Self, SnapshotError> {
        let payload = serde_json::to_string(&strategy.logic).map_err(|source| {
            SnapshotError::Encode {
                name: strategy.name.clone(),
                message: source.to_string(),
            }
        })?;
        Ok(Self {
            name: strategy.name.clone(),
            payload,
        })
    }

    /// Rebuild the strategy. An empty name becomes `placeholder`.
    pub fn restore(&self, placeholder: &str) -> Result<Strategy, SnapshotError> {
        let name = if self.name.is_empty() { placeholder } else { &self.name };

        let logic: StrategyLogic = serde_json::from_str(&self.payload).map_err(|source| {
            SnapshotError::Decode {
                name: name.to_string(),
                message: source.to_string(),
            }
        })?;

        if let StrategyLogic::Program(program) = &logic {
            program.validate().map_err(|source| SnapshotError::Reconstruct {
                name: name.to_string(),
                source,
            })?;
        }

        Ok(Strategy::new(name, logic))
    }
}
