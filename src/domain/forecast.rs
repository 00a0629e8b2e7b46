//! Price forecasting pipeline around an opaque [`Predictor`].
//!
//! Input prices are min-max normalised with the training bounds, sliced into
//! sliding windows of `time_steps`, passed to the predictor, and the
//! predictions are mapped back to price space.

use super::error::{EngineError, PredictionError};
use crate::ports::predictor_port::Predictor;

/// Default window length fed to the model.
pub const DEFAULT_TIME_STEPS: usize = 5;

/// Price bounds the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationParams {
    pub min_price: f64,
    pub max_price: f64,
}

impl NormalizationParams {
    pub fn new(min_price: f64, max_price: f64) -> Result<Self, EngineError> {
        if !min_price.is_finite() || !max_price.is_finite() || max_price <= min_price {
            return Err(EngineError::ConfigInvalid {
                section: "model".to_string(),
                key: "max_price".to_string(),
                reason: format!("max_price ({max_price}) must exceed min_price ({min_price})"),
            });
        }
        Ok(Self {
            min_price,
            max_price,
        })
    }

    fn range(&self) -> f64 {
        self.max_price - self.min_price
    }

    pub fn normalize(&self, price: f64) -> f64 {
        (price - self.min_price) / self.range()
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.range() + self.min_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    pub time_steps: usize,
    pub normalization: NormalizationParams,
}

/// Every contiguous window of `time_steps` values, oldest first.
pub fn build_windows(data: &[f64], time_steps: usize) -> Result<Vec<Vec<f64>>, PredictionError> {
    if data.is_empty() {
        return Err(PredictionError::InvalidInput("no data provided".to_string()));
    }
    if time_steps == 0 {
        return Err(PredictionError::InvalidInput(
            "time_steps must be at least 1".to_string(),
        ));
    }
    if data.len() < time_steps {
        return Err(PredictionError::InvalidInput(format!(
            "data must contain at least {time_steps} values, got {}",
            data.len()
        )));
    }
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        return Err(PredictionError::InvalidInput(format!(
            "value at index {pos} is not a finite number"
        )));
    }
    Ok(data.windows(time_steps).map(<[f64]>::to_vec).collect())
}

pub struct Forecaster<P> {
    predictor: P,
    config: ModelConfig,
}

impl<P: Predictor> Forecaster<P> {
    pub fn new(predictor: P, config: ModelConfig) -> Self {
        Self { predictor, config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// One predicted price per window of the input.
    pub fn forecast(&self, prices: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let params = self.config.normalization;
        let normalized: Vec<f64> = prices.iter().map(|&p| params.normalize(p)).collect();
        let windows = build_windows(&normalized, self.config.time_steps)?;

        let predictions = self.predictor.predict(&windows)?;
        if predictions.len() != windows.len() {
            return Err(PredictionError::Internal(format!(
                "predictor returned {} values for {} windows",
                predictions.len(),
                windows.len()
            )));
        }
        tracing::debug!(windows = windows.len(), "forecast computed");

        Ok(predictions
            .into_iter()
            .map(|v| params.denormalize(v))
            .collect())
    }
}
