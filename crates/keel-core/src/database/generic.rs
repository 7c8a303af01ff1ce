//! ANSI-leaning fallback dialect.

use super::{Capability, Database, DatabaseKind, QuotingStrategy};

/// Fallback dialect used when no specific backend is targeted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDatabase {
    quoting: QuotingStrategy,
}

impl GenericDatabase {
    /// Creates a generic dialect with legacy quoting.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            quoting: QuotingStrategy::Legacy,
        }
    }

    /// Sets the quoting strategy.
    #[must_use]
    pub const fn quoting(mut self, quoting: QuotingStrategy) -> Self {
        self.quoting = quoting;
        self
    }
}

impl Database for GenericDatabase {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Generic
    }

    fn short_name(&self) -> &str {
        "generic"
    }

    fn supports(&self, capability: Capability) -> bool {
        !matches!(capability, Capability::InlinePrimaryKeyForAutoIncrement)
    }

    fn quoting_strategy(&self) -> QuotingStrategy {
        self.quoting
    }
}
