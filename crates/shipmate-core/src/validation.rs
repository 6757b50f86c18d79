//! # Validation Module
//!
//! Input validation for quote requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service layer (HTTP / CLI, outside this workspace)           │
//! │  └── Deserialization of the request body                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── SKU / quantity / order size checks                                │
//! │  └── Country code shape                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Splitter                                                     │
//! │  └── Physical limits per carrier (PermanentPacking errors)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::LineItem;
use crate::MAX_ORDER_UNITS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Only alphanumeric characters, hyphens, underscores, dots
///
/// ## Example
/// ```rust
/// use shipmate_core::validation::validate_sku;
///
/// assert!(validate_sku("CHAIR-OAK-01").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 64,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates an ISO 3166-1 alpha-2 country code and returns it uppercased.
///
/// ## Example
/// ```rust
/// use shipmate_core::validation::validate_country_code;
///
/// assert_eq!(validate_country_code(" cz ").unwrap(), "CZ");
/// assert!(validate_country_code("CZE").is_err());
/// ```
pub fn validate_country_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "country".to_string(),
        });
    }

    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "country".to_string(),
            reason: "must be a two-letter ISO code".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a VAT rate in basis points (0% to 100%).
pub fn validate_vat_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "vat_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the line items of one order.
///
/// ## Rules
/// - At least one line item
/// - Every SKU and quantity valid
/// - Total exploded units ≤ MAX_ORDER_UNITS
pub fn validate_line_items(items: &[LineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut units: i64 = 0;
    for item in items {
        validate_sku(&item.sku)?;
        validate_quantity(item.quantity)?;
        units = units.saturating_add(item.quantity);
    }

    if units > MAX_ORDER_UNITS as i64 {
        return Err(ValidationError::OutOfRange {
            field: "order units".to_string(),
            min: 1,
            max: MAX_ORDER_UNITS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
