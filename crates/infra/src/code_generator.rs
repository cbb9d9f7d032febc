//! Next sequential order code (`PREFIX-NNNN`).

use rand::Rng;
use tracing::warn;

use stockline_sales::CodeFormat;

use crate::store::SalesStore;

/// Upper bound of the random suffix used when the store can't be read.
const DEGRADED_MAX: u32 = 9_999;

/// A suggested order code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedCode {
    /// Derived from the highest stored code.
    Sequential(String),
    /// Random suffix; the store could not be read, uniqueness is unlikely
    /// but not guaranteed.
    Degraded(String),
}

impl GeneratedCode {
    pub fn code(&self) -> &str {
        match self {
            GeneratedCode::Sequential(code) | GeneratedCode::Degraded(code) => code,
        }
    }

    pub fn into_code(self) -> String {
        match self {
            GeneratedCode::Sequential(code) | GeneratedCode::Degraded(code) => code,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, GeneratedCode::Degraded(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderCodeGenerator {
    format: CodeFormat,
}

impl OrderCodeGenerator {
    pub fn new(format: CodeFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &CodeFormat {
        &self.format
    }

    /// Never fails: a store error degrades to a random suffix.
    pub fn generate<S>(&self, store: &S) -> GeneratedCode
    where
        S: SalesStore + ?Sized,
    {
        match store.max_order_code(self.format.prefix()) {
            Ok(last) => GeneratedCode::Sequential(self.format.next_after(last.as_deref())),
            Err(e) => {
                let suffix = rand::thread_rng().gen_range(1..=DEGRADED_MAX);
                let code = self.format.format(suffix);
                warn!(error = %e, %code, "order code generation degraded to random suffix");
                GeneratedCode::Degraded(code)
            }
        }
    }
}
