use crate::errors::{IndicatorError, IndicatorValue, require};

/// Last volume divided by the mean of the `n` volumes before it.
pub fn volume_surge_ratio(volumes: &[f64], n: usize) -> IndicatorValue<f64> {
    let n = n.max(1);
    require("volume_surge_ratio", volumes.len(), n + 1)?;

    let last = volumes.len() - 1;
    let baseline = volumes[last - n..last].iter().sum::<f64>() / n as f64;
    if baseline <= 0.0 {
        return Err(IndicatorError::Undefined {
            indicator: "volume_surge_ratio",
            reason: "zero baseline volume",
        });
    }
    Ok(volumes[last] / baseline)
}

/// Consecutive closes strictly above the previous close, ending at the last bar.
pub fn up_streak(closes: &[f64]) -> usize {
    closes
        .windows(2)
        .rev()
        .take_while(|w| w[1] > w[0])
        .count()
}

/// The three volumes before the last bar are strictly decreasing.
pub fn volume_contraction(volumes: &[f64]) -> IndicatorValue<bool> {
    require("volume_contraction", volumes.len(), 4)?;
    let v = &volumes[volumes.len() - 4..volumes.len() - 1];
    Ok(v[0] > v[1] && v[1] > v[2])
}
