use std::fmt;
use std::ops::RangeInclusive;

use crate::error::ParameterError;

/// Accepted range for the outguess derivation (iteration seed) count.
pub const DERIVATION_COUNT_RANGE: RangeInclusive<i64> = 1..=100;

/// Optional user-supplied inputs. Every value is passed to a tool as its own
/// argument; none of them is ever parsed by a shell.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AnalysisParameters {
    /// steghide passphrase. Enables the extraction module.
    pub passphrase: Option<String>,
    /// outguess key (`-k`).
    pub key: Option<String>,
    /// outguess derivation count (`-s`).
    pub derivation_count: Option<i64>,
}

impl AnalysisParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_text("passphrase", self.passphrase.as_deref())?;
        check_text("key", self.key.as_deref())?;
        if let Some(count) = self.derivation_count {
            if !DERIVATION_COUNT_RANGE.contains(&count) {
                return Err(ParameterError::OutOfRange {
                    name: "derivation count",
                    value: count,
                    min: *DERIVATION_COUNT_RANGE.start(),
                    max: *DERIVATION_COUNT_RANGE.end(),
                });
            }
        }
        Ok(())
    }
}

fn check_text(name: &'static str, value: Option<&str>) -> Result<(), ParameterError> {
    match value {
        Some("") => Err(ParameterError::Empty { name }),
        Some(v) if v.contains('\0') => Err(ParameterError::NulByte { name }),
        _ => Ok(()),
    }
}

// Secrets stay out of debug logs.
impl fmt::Debug for AnalysisParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("AnalysisParameters")
            .field("passphrase", &mask(&self.passphrase))
            .field("key", &mask(&self.key))
            .field("derivation_count", &self.derivation_count)
            .finish()
    }
}
