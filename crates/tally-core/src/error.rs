//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! Two levels, following the same split as input handling itself:
//!
//! - [`CoreError`] - business rule violations reported by store operations
//! - [`ValidationError`] - field-level input failures, caught before any
//!   table is touched
//!
//! Every error is scoped to the failing operation; previously committed
//! state is left untouched. Errors are enum variants with context fields,
//! never bare strings.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and lookup failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity cannot be found under the given id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A polymorphic item reference no longer resolves to a live item of
    /// the stated kind.
    #[error("dangling {kind} item reference: {id}")]
    DanglingReference { kind: String, id: String },

    /// Unique constraint violation on a natural key (handle, email,
    /// national id).
    #[error("duplicate {field}: '{value}' already exists")]
    DuplicateKey { field: String, value: String },

    /// Insert declared a parent node that does not exist.
    #[error("cannot insert {entity}: parent {parent} does not exist")]
    OrphanReference { entity: String, parent: String },

    /// A composite item component is not a live simple item of the owning
    /// tenant, or a stock operation was aimed at a non-stock-bearing item.
    #[error("invalid component {component}: {reason}")]
    InvalidComponent { component: String, reason: String },

    /// A composite item was declared with no components.
    #[error("composite item must reference at least one component")]
    EmptyComposite,

    /// Requested quantity exceeds the available stock.
    ///
    /// For a composite item the failing component is named, not the
    /// composite itself.
    #[error("insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// The entity is not in a state that allows the requested operation.
    ///
    /// Raised for transitions out of a terminal transaction status, and for
    /// restricted principal removal while ledger history still exists.
    #[error("{entity} {id} is {state}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        state: String,
        operation: String,
    },

    /// Completing a transaction that has no lines.
    #[error("transaction {id} has no lines")]
    EmptyTransaction { id: String },

    /// Authentication failed. Covers both an unknown handle and a bad
    /// credential so the surface does not reveal which handles exist.
    #[error("authentication failed")]
    Unauthorized,

    /// Field-level validation failure (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Infrastructure failure surfaced verbatim (e.g. the credential
    /// hasher). Not part of the domain taxonomy.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a DuplicateKey error naming the violated field.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::DuplicateKey {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an OrphanReference error for an insert with a missing parent.
    pub fn orphan(entity: impl Into<String>, parent: impl Into<String>) -> Self {
        CoreError::OrphanReference {
            entity: entity.into(),
            parent: parent.into(),
        }
    }

    /// Creates an InvalidComponent error.
    pub fn invalid_component(component: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidComponent {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        state: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            state: state.into(),
            operation: operation.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "coffee".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for coffee: available 1, requested 2"
        );

        let err = CoreError::duplicate("email", "ada@example.cl");
        assert_eq!(
            err.to_string(),
            "duplicate email: 'ada@example.cl' already exists"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "handle".to_string(),
        };
        assert_eq!(err.to_string(), "handle is required");

        let err = ValidationError::OutOfRange {
            field: "score".to_string(),
            min: 0,
            max: 50,
        };
        assert_eq!(err.to_string(), "score must be between 0 and 50");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
