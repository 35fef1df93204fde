use crate::errors::{IndicatorValue, require};

/// Mean of the last `n` values.
pub fn sma(values: &[f64], n: usize) -> IndicatorValue<f64> {
    require("sma", values.len(), n.max(1))?;
    let window = &values[values.len() - n.max(1)..];
    Ok(window.iter().sum::<f64>() / window.len() as f64)
}

/// Rolling `n`-period mean; `None` until `n` values are available.
pub fn sma_series(values: &[f64], n: usize) -> Vec<Option<f64>> {
    let n = n.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= n {
            sum -= values[i - n];
        }
        out.push((i + 1 >= n).then(|| sum / n as f64));
    }
    out
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}
