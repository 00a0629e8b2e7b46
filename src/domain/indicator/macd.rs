//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9

use super::ema::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD at every index; `None` until both the slow EMA and the signal EMA are seeded.
pub fn calculate_macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<Option<MacdPoint>> {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return vec![None; prices.len()];
    }

    let ema_fast = calculate_ema(prices, fast);
    let ema_slow = calculate_ema(prices, slow);

    let macd_line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The signal EMA runs over the defined part of the MACD line only.
    let first_defined = macd_line.iter().position(Option::is_some);
    let mut signal_line = vec![None; prices.len()];
    if let Some(start) = first_defined {
        let defined: Vec<f64> = macd_line[start..].iter().flatten().copied().collect();
        for (offset, value) in calculate_ema(&defined, signal_period).into_iter().enumerate() {
            signal_line[start + offset] = value;
        }
    }

    macd_line
        .into_iter()
        .zip(signal_line)
        .map(|(line, signal)| {
            let (line, signal) = (line?, signal?);
            Some(MacdPoint {
                line,
                signal,
                histogram: line - signal,
            })
        })
        .collect()
}

pub fn calculate_macd_default(prices: &[f64]) -> Vec<Option<MacdPoint>> {
    calculate_macd(prices, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn macd_warmup_default() {
        let series = calculate_macd_default(&rising(40));
        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for (i, point) in series.iter().enumerate().take(warmup) {
            assert!(point.is_none(), "Index {} should not be defined", i);
        }
        assert!(series[warmup].is_some());
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0)
            .collect();
        for point in calculate_macd_default(&prices).into_iter().flatten() {
            assert_relative_eq!(point.histogram, point.line - point.signal);
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let prices = rising(10);
        let series = calculate_macd(&prices, 3, 5, 2);
        let fast = calculate_ema(&prices, 3);
        let slow = calculate_ema(&prices, 5);

        for (i, point) in series.iter().enumerate() {
            if let Some(p) = point {
                assert_relative_eq!(p.line, fast[i].unwrap() - slow[i].unwrap());
            }
        }
    }

    #[test]
    fn macd_linear_trend_converges() {
        // a constant slope gives a constant EMA gap, so the line equals its signal
        let series = calculate_macd(&rising(30), 3, 5, 2);
        let last = series.last().copied().flatten().unwrap();
        assert_relative_eq!(last.histogram, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.line, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn macd_zero_period() {
        let prices = rising(3);
        assert!(calculate_macd(&prices, 0, 26, 9).iter().all(Option::is_none));
        assert!(calculate_macd(&prices, 12, 0, 9).iter().all(Option::is_none));
        assert!(calculate_macd(&prices, 12, 26, 0).iter().all(Option::is_none));
    }

    #[test]
    fn macd_empty_prices() {
        assert!(calculate_macd_default(&[]).is_empty());
    }
}
