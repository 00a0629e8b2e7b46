//! Baseline model: predicts that the next value equals the last one seen.
//!
//! Stands in for a trained model when none is deployed, and gives forecast
//! output a floor any real model has to beat.

use crate::domain::error::PredictionError;
use crate::ports::predictor_port::Predictor;

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistencePredictor;

impl Predictor for PersistencePredictor {
    fn predict(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>, PredictionError> {
        windows
            .iter()
            .enumerate()
            .map(|(i, window)| {
                window
                    .last()
                    .copied()
                    .ok_or_else(|| PredictionError::InvalidInput(format!("window {i} is empty")))
            })
            .collect()
    }
}
