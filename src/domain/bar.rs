//! Price bar representation.

use chrono::NaiveDateTime;

use super::error::EngineError;

/// One timestamped price observation for an asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub asset: String,
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

impl Bar {
    pub fn new(asset: impl Into<String>, timestamp: NaiveDateTime, price: f64) -> Self {
        Self {
            asset: asset.into(),
            timestamp,
            price,
        }
    }

    /// Rejects prices no market can print: NaN, infinities, zero and negatives.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.price.is_finite() {
            return Err(EngineError::validation(format!(
                "{} price at {} is not finite",
                self.asset, self.timestamp
            )));
        }
        if self.price <= 0.0 {
            return Err(EngineError::validation(format!(
                "{} price at {} must be positive, got {}",
                self.asset, self.timestamp, self.price
            )));
        }
        Ok(())
    }
}

/// Closing prices of a bar slice, oldest first.
pub fn prices(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.price).collect()
}
