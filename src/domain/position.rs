//! Per-asset position state.

use super::error::EngineError;
use super::order::Fill;

/// FLAT / LONG phase of the per-asset state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionPhase {
    Flat,
    Long,
}

/// Open/closed flag plus entry price. Only fills move it between phases.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionState {
    is_open: bool,
    entry_price: Option<f64>,
}

impl PositionState {
    pub fn flat() -> Self {
        PositionState::default()
    }

    /// An already-open position, for evaluating decisions outside the engine.
    pub fn long(entry_price: f64) -> Self {
        PositionState {
            is_open: true,
            entry_price: Some(entry_price),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn phase(&self) -> PositionPhase {
        if self.is_open {
            PositionPhase::Long
        } else {
            PositionPhase::Flat
        }
    }

    /// FLAT + buy fill -> LONG at the fill price; LONG + sell fill -> FLAT.
    pub(crate) fn apply_fill(&mut self, fill: &Fill) -> Result<(), EngineError> {
        match (self.phase(), fill.quantity.signum()) {
            (PositionPhase::Flat, 1) => {
                self.is_open = true;
                self.entry_price = Some(fill.price);
                Ok(())
            }
            (PositionPhase::Long, -1) => {
                self.is_open = false;
                self.entry_price = None;
                Ok(())
            }
            (phase, _) => Err(EngineError::validation(format!(
                "fill of {} {} is not a valid transition from {:?}",
                fill.quantity, fill.asset, phase
            ))),
        }
    }
}
