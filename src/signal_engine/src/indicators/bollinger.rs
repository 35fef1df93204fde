use serde::Serialize;

use crate::errors::{IndicatorValue, require};

const FLAT_EPSILON: f64 = 1e-12;
const POSITION_CLIP: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bollinger {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
    /// `(close - mid) / (k * sd)`, clipped to `[-1.5, 1.5]`. `-1` is the
    /// lower band, `+1` the upper band.
    pub position: f64,
}

impl Bollinger {
    /// Classic %B: 0 at the lower band, 1 at the upper band.
    pub fn percent_b(&self) -> f64 {
        (self.position + 1.0) / 2.0
    }
}

/// Bollinger Bands over the last `n` closes with `k` sample standard deviations.
pub fn bollinger(closes: &[f64], n: usize, k: f64) -> IndicatorValue<Bollinger> {
    let n = n.max(2);
    require("bollinger", closes.len(), n)?;

    let window = &closes[closes.len() - n..];
    let mid = window.iter().sum::<f64>() / n as f64;
    let var = window.iter().map(|c| (c - mid).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    let width = k * var.sqrt();
    let close = window[n - 1];

    let position = if width.abs() < FLAT_EPSILON {
        let diff = close - mid;
        if diff.abs() < FLAT_EPSILON {
            0.0
        } else {
            POSITION_CLIP.copysign(diff)
        }
    } else {
        ((close - mid) / width).clamp(-POSITION_CLIP, POSITION_CLIP)
    };

    Ok(Bollinger {
        upper: mid + width,
        mid,
        lower: mid - width,
        position,
    })
}
