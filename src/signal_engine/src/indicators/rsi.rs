use crate::errors::{IndicatorError, IndicatorValue, require};

/// Wilder's RSI over `n` periods for the last bar.
///
/// The first average gain/loss is the simple mean of the first `n` changes;
/// afterwards `avg = (prev * (n - 1) + current) / n`. Needs `n + 1` closes.
/// A zero average loss yields 100, flat prices included.
pub fn rsi(closes: &[f64], n: usize) -> IndicatorValue<f64> {
    rsi_series(closes, n)?
        .last()
        .copied()
        .ok_or(IndicatorError::Undefined {
            indicator: "rsi",
            reason: "no rsi value",
        })
}

/// RSI for every bar from index `n` onward (oldest first).
pub fn rsi_series(closes: &[f64], n: usize) -> IndicatorValue<Vec<f64>> {
    let n = n.max(1);
    require("rsi", closes.len(), n + 1)?;

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let mut avg_gain = changes[..n].iter().map(|c| c.max(0.0)).sum::<f64>() / n as f64;
    let mut avg_loss = changes[..n].iter().map(|c| (-c).max(0.0)).sum::<f64>() / n as f64;

    let mut out = Vec::with_capacity(changes.len() - n + 1);
    out.push(to_rsi(avg_gain, avg_loss));
    for c in &changes[n..] {
        avg_gain = (avg_gain * (n as f64 - 1.0) + c.max(0.0)) / n as f64;
        avg_loss = (avg_loss * (n as f64 - 1.0) + (-c).max(0.0)) / n as f64;
        out.push(to_rsi(avg_gain, avg_loss));
    }
    Ok(out)
}

fn to_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
