//! Human-readable order codes: `PREFIX-NNNN`.

use serde::{Deserialize, Serialize};

/// Prefix and zero-padding of generated order codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFormat {
    prefix: String,
    width: usize,
}

impl CodeFormat {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn format(&self, sequence: u32) -> String {
        format!("{}-{:0width$}", self.prefix, sequence, width = self.width)
    }

    /// Code following `last`. A missing or unparseable code restarts at 1.
    pub fn next_after(&self, last: Option<&str>) -> String {
        let current = last.and_then(parse_sequence).unwrap_or(0);
        self.format(current.saturating_add(1))
    }
}

impl Default for CodeFormat {
    fn default() -> Self {
        Self::new("VENDA", 4)
    }
}

/// Numeric suffix after the last `-`.
pub fn parse_sequence(code: &str) -> Option<u32> {
    let (_, suffix) = code.trim().rsplit_once('-')?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
