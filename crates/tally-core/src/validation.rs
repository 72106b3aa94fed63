//! # Validation Module
//!
//! Field-level validation, run at the operation boundary before any table
//! is touched. Uniqueness and referential checks are not here - those need
//! the store and live in the integrity layer.

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an entity display name (items, tenants, roles, categories,
/// geographic nodes).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a login handle.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores and dots
pub fn validate_handle(handle: &str) -> ValidationResult<()> {
    let handle = handle.trim();

    if handle.is_empty() {
        return Err(ValidationError::Required {
            field: "handle".to_string(),
        });
    }

    if handle.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "handle".to_string(),
            max: 50,
        });
    }

    if !handle
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "handle".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Minimal structural check: one `@` with a non-empty local part and a
/// domain containing a dot. Anything stricter belongs to a mail delivery
/// layer, not the identity store.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected local@domain.tld".to_string(),
        });
    }

    Ok(())
}

/// Validates a national id string.
///
/// Format differs per jurisdiction, so only emptiness and length are
/// checked here; the string is treated as opaque.
pub fn validate_national_id(national_id: &str) -> ValidationResult<()> {
    let national_id = national_id.trim();

    if national_id.is_empty() {
        return Err(ValidationError::Required {
            field: "national_id".to_string(),
        });
    }

    if national_id.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "national_id".to_string(),
            max: 20,
        });
    }

    Ok(())
}

/// Validates a credential before hashing.
pub fn validate_credential(credential: &str) -> ValidationResult<()> {
    if credential.is_empty() {
        return Err(ValidationError::Required {
            field: "credential".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Catalog prices are never negative.
pub fn validate_price(price_cents: i64) -> ValidationResult<()> {
    if price_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates an initial stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Cafe Andes").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name(&"a".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_handle() {
        assert!(validate_handle("ada.lovelace").is_ok());
        assert!(validate_handle("ada_l-1").is_ok());
        assert!(validate_handle("").is_err());
        assert!(validate_handle("ada lovelace").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.cl").is_ok());
        assert!(validate_email("ada").is_err());
        assert!(validate_email("@example.cl").is_err());
        assert!(validate_email("ada@localhost").is_err());
    }

    #[test]
    fn test_validate_national_id() {
        assert!(validate_national_id("12.345.678-9").is_ok());
        assert!(validate_national_id("").is_err());
        assert!(validate_national_id(&"1".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(-1).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }
}
