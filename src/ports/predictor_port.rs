//! Model inference port trait.

use crate::domain::error::PredictionError;

pub trait Predictor {
    /// One prediction per input window. Windows hold normalised values.
    fn predict(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>, PredictionError>;
}
