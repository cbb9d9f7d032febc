//! Runtime configuration for the sales core.

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};

use stockline_sales::CodeFormat;

pub const ENV_CODE_PREFIX: &str = "STOCKLINE_CODE_PREFIX";
pub const ENV_CODE_WIDTH: &str = "STOCKLINE_CODE_WIDTH";
pub const ENV_STOCK_WRITE_ATTEMPTS: &str = "STOCKLINE_STOCK_WRITE_ATTEMPTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    /// Order code prefix, e.g. `VENDA` in `VENDA-0001`.
    pub code_prefix: String,
    /// Zero padding of the numeric code suffix.
    pub code_width: usize,
    /// Compare-and-swap attempts per stock write before giving up.
    pub stock_write_attempts: u32,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            code_prefix: "VENDA".to_string(),
            code_width: 4,
            stock_write_attempts: 3,
        }
    }
}

impl SalesConfig {
    /// Defaults overridden by `STOCKLINE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup(ENV_CODE_PREFIX) {
            config.code_prefix = prefix.trim().to_string();
        }
        if let Some(width) = lookup(ENV_CODE_WIDTH) {
            config.code_width = width
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CODE_WIDTH} must be a number, got {width:?}"))?;
        }
        if let Some(attempts) = lookup(ENV_STOCK_WRITE_ATTEMPTS) {
            config.stock_write_attempts = attempts.trim().parse().with_context(|| {
                format!("{ENV_STOCK_WRITE_ATTEMPTS} must be a number, got {attempts:?}")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.code_prefix.is_empty(), "order code prefix cannot be empty");
        ensure!(
            !self.code_prefix.contains('-'),
            "order code prefix cannot contain '-' (got {:?})",
            self.code_prefix
        );
        ensure!(
            (1..=12).contains(&self.code_width),
            "order code width must be between 1 and 12 (got {})",
            self.code_width
        );
        ensure!(
            self.stock_write_attempts >= 1,
            "stock write attempts must be at least 1"
        );
        Ok(())
    }

    pub fn code_format(&self) -> CodeFormat {
        CodeFormat::new(self.code_prefix.clone(), self.code_width)
    }
}
