//! Universe catalog: parsing, normalization, filtering and loading.
//!
//! This module defines a TOML-backed catalog that describes the two index
//! universes screened each day:
//! - A display label per universe (e.g. "KOSPI", "KOSDAQ")
//! - The suffix the data provider appends to exchange codes (e.g. ".KS")
//! - The listed instruments (code, name, optional market cap)
//!
//! Key behaviors:
//! - Normalization trims codes and names, uppercases codes and de-duplicates
//!   instruments by code while preserving the first occurrence order.
//! - An instrument code may appear in only one universe; a code listed in both
//!   is treated as an error.
//! - [`UniverseFilter`] drops instruments the screens should never see
//!   (preferred shares, SPACs, market caps under a floor).
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_catalog_str`]
//! - Parse + normalize from a file path: [`load_catalog_path`]
//!
//! Example:
//! ```toml
//! [universes.primary]
//! label = "KOSPI"
//! symbol_suffix = ".KS"
//! instruments = [
//!     { code = "005930", name = "삼성전자", market_cap = 4.2e14 },
//! ]
//! ```

use std::collections::HashSet;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::instrument::{Instrument, Universe};

/// Top-level catalog holding both universes.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UniverseCatalog {
    #[serde(default)]
    pub universes: UniversesCfg,
}

/// Per-universe configuration; a missing universe is simply empty.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UniversesCfg {
    pub primary: Option<UniverseCfg>,
    pub secondary: Option<UniverseCfg>,
}

impl UniversesCfg {
    pub fn get(&self, universe: Universe) -> Option<&UniverseCfg> {
        match universe {
            Universe::Primary => self.primary.as_ref(),
            Universe::Secondary => self.secondary.as_ref(),
        }
    }

    fn get_mut(&mut self, universe: Universe) -> Option<&mut UniverseCfg> {
        match universe {
            Universe::Primary => self.primary.as_mut(),
            Universe::Secondary => self.secondary.as_mut(),
        }
    }
}

/// Configuration payload for one universe.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UniverseCfg {
    /// Display label; defaults to [`Universe::default_label`].
    pub label: Option<String>,
    /// Suffix appended to codes to form the provider symbol (e.g. ".KS").
    #[serde(default)]
    pub symbol_suffix: String,
    /// Listed instruments.
    #[serde(default)]
    pub instruments: Vec<InstrumentCfg>,
}

/// One listed instrument.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentCfg {
    pub code: String,
    pub name: String,
    pub market_cap: Option<f64>,
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq)]
pub struct NormalizationReport {
    /// Number of codes that changed when trimming/uppercasing.
    pub codes_rewritten: usize,
    /// Count of removed duplicate codes within a universe.
    pub instruments_deduped: usize,
}

impl UniverseCatalog {
    /// Label for a universe, falling back to the default.
    pub fn label(&self, universe: Universe) -> String {
        self.universes
            .get(universe)
            .and_then(|cfg| cfg.label.clone())
            .unwrap_or_else(|| universe.default_label().to_string())
    }

    /// Instruments of one universe, with provider symbols resolved.
    pub fn instruments(&self, universe: Universe) -> Vec<Instrument> {
        let Some(cfg) = self.universes.get(universe) else {
            return Vec::new();
        };
        cfg.instruments
            .iter()
            .map(|ic| {
                let mut inst = Instrument::new(ic.code.clone(), ic.name.clone(), universe)
                    .with_remote_symbol(format!("{}{}", ic.code, cfg.symbol_suffix));
                inst.market_cap = ic.market_cap;
                inst
            })
            .collect()
    }
}

/// Normalize a catalog in-place.
///
/// What normalization does:
/// - Trim + uppercase codes, trim names and the symbol suffix
/// - Deduplicate instruments by code within a universe, keeping the first occurrence
///
/// Errors:
/// - Empty codes or names after trimming
/// - Negative market caps
/// - A code listed in both universes
pub fn normalize_catalog(cat: &mut UniverseCatalog) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();
    let mut claimed: IndexMap<String, Universe> = IndexMap::new();

    for universe in Universe::ALL {
        let Some(cfg) = cat.universes.get_mut(universe) else {
            continue;
        };
        cfg.symbol_suffix = cfg.symbol_suffix.trim().to_string();
        if let Some(label) = cfg.label.as_mut() {
            *label = label.trim().to_string();
        }

        let before_len = cfg.instruments.len();
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(before_len);

        for mut ic in std::mem::take(&mut cfg.instruments) {
            let code = ic.code.trim().to_uppercase();
            if code.is_empty() {
                bail!("instrument code cannot be empty after trimming ({universe})");
            }
            if code != ic.code {
                report.codes_rewritten += 1;
            }
            ic.code = code;
            ic.name = ic.name.trim().to_string();
            if ic.name.is_empty() {
                bail!("instrument {} has an empty name", ic.code);
            }
            if ic.market_cap.is_some_and(|m| m < 0.0) {
                bail!("instrument {} has a negative market cap", ic.code);
            }
            if seen.insert(ic.code.clone()) {
                if let Some(other) = claimed.get(&ic.code) {
                    bail!("instrument {} is listed in both {other} and {universe}", ic.code);
                }
                claimed.insert(ic.code.clone(), universe);
                out.push(ic);
            }
        }
        report.instruments_deduped += before_len.saturating_sub(out.len());
        cfg.instruments = out;
    }

    Ok(report)
}

/// Parse and normalize a catalog from a TOML string.
pub fn load_catalog_str(toml_str: &str) -> anyhow::Result<UniverseCatalog> {
    let mut cat: UniverseCatalog =
        toml::from_str(toml_str).context("failed to parse universe catalog TOML")?;
    let report = normalize_catalog(&mut cat).context("normalize_catalog failed")?;
    tracing::debug!(?report, "universe catalog normalized");
    Ok(cat)
}

/// Read a catalog TOML file from disk, parse, and normalize it.
pub fn load_catalog_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<UniverseCatalog> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read universe catalog {}", path.as_ref().display()))?;
    load_catalog_str(&text)
}

/// Filters applied to a universe before screening.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UniverseFilter {
    /// Exclude preferred shares and SPACs.
    pub common_stock_only: bool,
    /// Exclude instruments whose known market cap is below this floor.
    pub min_market_cap: Option<f64>,
}

impl UniverseFilter {
    /// Whether an instrument survives the filter.
    ///
    /// Instruments without a known market cap pass the market cap floor.
    pub fn accepts(&self, inst: &Instrument) -> bool {
        if self.common_stock_only && !is_common_stock(&inst.code, &inst.name) {
            return false;
        }
        match (self.min_market_cap, inst.market_cap) {
            (Some(floor), Some(cap)) => cap >= floor,
            _ => true,
        }
    }

    pub fn apply(&self, instruments: Vec<Instrument>) -> Vec<Instrument> {
        instruments.into_iter().filter(|i| self.accepts(i)).collect()
    }
}

/// Heuristic used by the Korean exchanges' code scheme: preferred share codes
/// end in 5/7/9, SPAC codes start with "43", and both are marked in the name
/// ("우" for preferred, "스팩" for SPAC).
pub fn is_common_stock(code: &str, name: &str) -> bool {
    let pref_code = code.ends_with(['5', '7', '9']);
    let spac_code = code.starts_with("43");
    !(pref_code || spac_code || name.contains('우') || name.contains("스팩"))
}
