//! Unified error type for the dynamic port breakout engine.
//!
//! Every fallible operation across the tree store, key searcher, diff
//! engine, merge engine, and orchestrator returns [`DpbResult`]. There is
//! exactly one error enum (mirroring the single `CfgMgrError`/
//! `RedisBackendError` per crate-family convention elsewhere in this
//! workspace) so callers never have to match on more than one error type
//! to decide what happened to a transaction.

use thiserror::Error;

/// Result type alias for dynamic port breakout operations.
pub type DpbResult<T> = Result<T, DpbError>;

/// Errors that can occur during a dynamic port breakout transaction.
#[derive(Debug, Error)]
pub enum DpbError {
    /// Deleting the requested ports would orphan configuration that
    /// depends on them, and `force` was not set.
    #[error("{} dependent xpath(s) block deletion: {}", .xpaths.len(), .xpaths.join(", "))]
    Dependencies {
        /// xpaths of the dependent nodes, verbatim.
        xpaths: Vec<String>,
    },

    /// YANG validation failed after a delete or add plan was applied.
    #[error("data tree validation failed: {message}")]
    Validation {
        /// Details from the underlying validator.
        message: String,
    },

    /// The input tree contained tables with no matching YANG model and
    /// `allow_tables_without_yang` was false.
    #[error("tables without a YANG model: {}", .tables.join(", "))]
    SchemaCoverage {
        /// Names of the uncovered tables.
        tables: Vec<String>,
    },

    /// The merge engine found incompatible shapes (map vs. list) at the
    /// same path in its two operands.
    #[error("cannot merge incompatible shapes at '{path}': {detail}")]
    MergeShape {
        /// The path at which the shapes diverged.
        path: String,
        /// Human-readable description (e.g. "map vs list").
        detail: String,
    },

    /// The underlying Config DB or Asic DB store raised on read or write.
    #[error("database operation failed: {operation}: {message}")]
    DbIo {
        /// The operation that failed (e.g. "get_config", "mod_config").
        operation: String,
        /// Error message from the store.
        message: String,
    },

    /// The Asic DB poll window elapsed with ports still present.
    ///
    /// This is the one *critical* failure kind (see `is_critical`): the
    /// switch is left in the intermediate post-delete state and recovery
    /// is the caller's problem.
    #[error("ports not released by ASIC within the wait window: {}", .ports.join(", "))]
    AsicNotConverged {
        /// The ports that were still present in Asic DB at timeout.
        ports: Vec<String>,
    },

    /// The defaults file could not be read or parsed.
    #[error("failed to load defaults file '{path}': {message}")]
    DefaultsFile {
        /// Path that was attempted.
        path: String,
        /// Underlying error.
        message: String,
    },

    /// Unexpected internal state; indicates a bug rather than bad input.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the inconsistency.
        message: String,
    },
}

impl DpbError {
    pub fn dependencies(xpaths: Vec<String>) -> Self {
        Self::Dependencies { xpaths }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn schema_coverage(tables: Vec<String>) -> Self {
        Self::SchemaCoverage { tables }
    }

    pub fn merge_shape(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MergeShape {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn db_io(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DbIo {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn asic_not_converged(ports: Vec<String>) -> Self {
        Self::AsicNotConverged { ports }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn defaults_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DefaultsFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true for the single error kind that is critical: an Asic
    /// convergence timeout. Callers use this to decide whether to tag a
    /// log event as critical.
    pub fn is_critical(&self) -> bool {
        matches!(self, DpbError::AsicNotConverged { .. })
    }

    /// Returns true if no database write has happened yet when this error
    /// can occur, i.e. the switch is guaranteed untouched.
    pub fn leaves_switch_untouched(&self) -> bool {
        matches!(
            self,
            DpbError::Dependencies { .. }
                | DpbError::Validation { .. }
                | DpbError::SchemaCoverage { .. }
                | DpbError::MergeShape { .. }
                | DpbError::DefaultsFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_asic_not_converged_is_critical() {
        assert!(DpbError::asic_not_converged(vec!["Ethernet0".into()]).is_critical());
        assert!(!DpbError::validation("bad tree").is_critical());
        assert!(!DpbError::internal("bug").is_critical());
    }

    #[test]
    fn pre_write_errors_leave_switch_untouched() {
        assert!(DpbError::dependencies(vec!["/x".into()]).leaves_switch_untouched());
        assert!(DpbError::validation("bad").leaves_switch_untouched());
        assert!(!DpbError::asic_not_converged(vec!["Ethernet0".into()]).leaves_switch_untouched());
        assert!(!DpbError::db_io("mod_config", "timeout").leaves_switch_untouched());
    }

    #[test]
    fn dependency_display_lists_xpaths() {
        let err = DpbError::dependencies(vec![
            "/sonic-vlan:sonic-vlan/VLAN_MEMBER/VLAN_MEMBER_LIST[name='Vlan100']".to_string(),
        ]);
        assert!(err.to_string().contains("Vlan100"));
    }
}
