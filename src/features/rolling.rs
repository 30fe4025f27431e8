//! Trailing-window statistics with `min_periods = 1` semantics.
//!
//! Each output at index `i` is computed from `values[i+1-window ..= i]`
//! (clamped at the series start) and never reads past `i`. NaN inputs are
//! skipped; a window with no finite value yields NaN.
//!
//! ```text
//! window = 3
//! values:  x0   x1        x2           x3
//! mean:    x0  (x0+x1)/2  (x0+x1+x2)/3 (x1+x2+x3)/3
//! ```

/// Slice of the trailing window ending at `i`.
#[inline]
fn trailing(values: &[f64], i: usize, window: usize) -> &[f64] {
    let start = (i + 1).saturating_sub(window);
    &values[start..=i]
}

/// Rolling mean over the available finite observations.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let (sum, n) = trailing(values, i, window)
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            if n == 0 {
                f64::NAN
            } else {
                sum / n as f64
            }
        })
        .collect()
}

/// Rolling sample standard deviation (ddof = 1); NaN with fewer than two
/// finite observations in the window.
pub fn rolling_sample_std(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let win: Vec<f64> = trailing(values, i, window)
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            crate::stats::sample_std(&win).unwrap_or(f64::NAN)
        })
        .collect()
}

/// Recursive exponential moving average, `alpha = 2 / (span + 1)`, seeded
/// with the first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// First difference; index 0 is NaN.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(f64::NAN);
    out.extend(values.windows(2).map(|w| w[1] - w[0]));
    out
}
