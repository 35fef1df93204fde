use crate::errors::{IndicatorValue, require};
use crate::indicators::moving_average::sma;

/// On-Balance Volume series: volume is added on up-closes and subtracted on
/// down-closes, starting from zero.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let len = closes.len().min(volumes.len());
    let mut out = Vec::with_capacity(len);
    let mut acc = 0.0;
    for i in 0..len {
        if i > 0 {
            if closes[i] > closes[i - 1] {
                acc += volumes[i];
            } else if closes[i] < closes[i - 1] {
                acc -= volumes[i];
            }
        }
        out.push(acc);
    }
    out
}

/// Whether the last OBV value is above its `n`-period moving average.
pub fn obv_rising(closes: &[f64], volumes: &[f64], n: usize) -> IndicatorValue<bool> {
    let series = obv(closes, volumes);
    require("obv", series.len(), n.max(1))?;
    let avg = sma(&series, n)?;
    Ok(series[series.len() - 1] > avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obv_accumulates_by_direction() {
        let closes = [10.0, 11.0, 10.5, 10.5, 12.0];
        let volumes = [100.0, 200.0, 50.0, 70.0, 30.0];
        assert_eq!(obv(&closes, &volumes), vec![0.0, 200.0, 150.0, 150.0, 180.0]);
    }

    #[test]
    fn rising_after_accumulation() {
        let closes: Vec<f64> = (0..12).map(f64::from).collect();
        let volumes = vec![10.0; 12];
        assert!(obv_rising(&closes, &volumes, 10).unwrap());

        let falling: Vec<f64> = closes.iter().rev().copied().collect();
        assert!(!obv_rising(&falling, &volumes, 10).unwrap());
    }
}
