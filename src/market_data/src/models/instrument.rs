//! Instruments and the two index universes they belong to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two index universes screened each day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Universe {
    /// Primary index (KOSPI).
    Primary,
    /// Secondary index (KOSDAQ).
    Secondary,
}

impl Universe {
    pub const ALL: [Universe; 2] = [Universe::Primary, Universe::Secondary];

    /// Default display label used when the catalog does not provide one.
    pub fn default_label(self) -> &'static str {
        match self {
            Universe::Primary => "KOSPI",
            Universe::Secondary => "KOSDAQ",
        }
    }

    /// Stable lowercase code, used as the database value.
    pub fn code(self) -> &'static str {
        match self {
            Universe::Primary => "primary",
            Universe::Secondary => "secondary",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "primary" => Some(Universe::Primary),
            "secondary" => Some(Universe::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_label())
    }
}

/// A listed instrument inside a universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange code (e.g. "005930"). Unique within a universe.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    pub universe: Universe,
    /// Market capitalisation in the listing currency, when known.
    pub market_cap: Option<f64>,
    /// Symbol the data provider expects (code plus exchange suffix).
    pub remote_symbol: String,
}

impl Instrument {
    pub fn new(code: impl Into<String>, name: impl Into<String>, universe: Universe) -> Self {
        let code = code.into();
        Self {
            remote_symbol: code.clone(),
            code,
            name: name.into(),
            universe,
            market_cap: None,
        }
    }

    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    pub fn with_remote_symbol(mut self, remote_symbol: impl Into<String>) -> Self {
        self.remote_symbol = remote_symbol.into();
        self
    }
}
