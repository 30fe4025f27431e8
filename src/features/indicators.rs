//! Technical indicators over one entity's close/volume series.
//!
//! All functions are causal: output `i` depends on inputs `0..=i` only.

use super::rolling::{diff, ema, rolling_mean, rolling_sample_std};

/// Relative strength index from simple rolling means of gains and losses.
///
/// `rs = avg_gain / (avg_loss + eps)`, `rsi = 100 - 100 / (1 + rs)`.
/// Index 0 has no price change and is NaN.
pub fn rsi(close: &[f64], period: usize, eps: f64) -> Vec<f64> {
    let delta = diff(close);
    let gain: Vec<f64> = delta
        .iter()
        .map(|&d| if d.is_nan() { d } else { d.max(0.0) })
        .collect();
    let loss: Vec<f64> = delta
        .iter()
        .map(|&d| if d.is_nan() { d } else { (-d).max(0.0) })
        .collect();

    let avg_gain = rolling_mean(&gain, period);
    let avg_loss = rolling_mean(&loss, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            let rs = g / (l + eps);
            100.0 - 100.0 / (1.0 + rs)
        })
        .collect()
}

/// MACD line (fast EMA minus slow EMA) and its signal EMA.
pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>) {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);
    (line, signal_line)
}

/// Log return over `lag` periods; undefined or non-finite values become 0.
pub fn log_returns(close: &[f64], lag: usize) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            if i < lag {
                return 0.0;
            }
            let r = (close[i] / close[i - lag]).ln();
            if r.is_finite() {
                r
            } else {
                0.0
            }
        })
        .collect()
}

/// Rolling sample std of `returns`; undefined windows become 0.
pub fn rolling_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    rolling_sample_std(returns, window)
        .into_iter()
        .map(|v| if v.is_nan() { 0.0 } else { v })
        .collect()
}

/// `(volume - mean) / (std + eps)` over a rolling window.
///
/// A zero or undefined rolling std means no signal and yields 0.
pub fn volume_zscore(volume: &[f64], window: usize, eps: f64) -> Vec<f64> {
    let mean = rolling_mean(volume, window);
    let std = rolling_sample_std(volume, window);
    volume
        .iter()
        .zip(mean.iter().zip(&std))
        .map(|(v, (m, s))| {
            if s.is_nan() || *s == 0.0 {
                return 0.0;
            }
            let z = (v - m) / (s + eps);
            if z.is_finite() {
                z
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_first_row_undefined_then_defined() {
        let close = [10.0, 11.0, 10.5, 11.5];
        let r = rsi(&close, 14, 1e-9);
        assert!(r[0].is_nan());
        assert!(r[1..].iter().all(|v| v.is_finite()));
        // only gains so far
        assert!(r[1] > 99.9);
    }

    #[test]
    fn test_rsi_flat_series_is_zero() {
        let r = rsi(&[5.0; 6], 14, 1e-9);
        assert!(r[1..].iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_macd_constant_series() {
        let (line, signal) = macd(&[7.0; 30], 12, 26, 9);
        assert!(line.iter().all(|v| v.abs() < 1e-12));
        assert!(signal.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_log_returns_lag_and_zero_fill() {
        let close = [100.0, 110.0, 121.0];
        let r1 = log_returns(&close, 1);
        assert_eq!(r1[0], 0.0);
        assert!((r1[1] - 1.1f64.ln()).abs() < 1e-12);
        let r5 = log_returns(&close, 5);
        assert!(r5.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_volume_zscore_constant_volume_is_zero() {
        let z = volume_zscore(&[1000.0; 25], 20, 1e-9);
        assert!(z.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_volume_zscore_spike_positive() {
        let mut vol = vec![100.0; 10];
        vol.push(1000.0);
        let z = volume_zscore(&vol, 20, 1e-9);
        assert!(z[10] > 2.0);
    }
}
