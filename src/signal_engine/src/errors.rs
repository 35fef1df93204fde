use thiserror::Error;

/// Why an indicator has no value.
///
/// Both cases are distinct outcomes; an indicator never reports a numeric
/// placeholder instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndicatorError {
    #[error("{indicator}: needs {required} values, got {available}")]
    InsufficientHistory {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{indicator}: undefined ({reason})")]
    Undefined {
        indicator: &'static str,
        reason: &'static str,
    },
}

impl IndicatorError {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, IndicatorError::InsufficientHistory { .. })
    }
}

pub type IndicatorValue<T> = Result<T, IndicatorError>;

/// Fails with `InsufficientHistory` when fewer than `required` values are available.
pub(crate) fn require(
    indicator: &'static str,
    available: usize,
    required: usize,
) -> IndicatorValue<()> {
    if available < required {
        return Err(IndicatorError::InsufficientHistory {
            indicator,
            required,
            available,
        });
    }
    Ok(())
}
