//! # Error Types
//!
//! Domain-specific error types for shipmate-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Kinds                                     │
//! │                                                                         │
//! │  Input              - malformed order, unknown SKU, bad destination     │
//! │  PermanentPacking   - item physically cannot ship with this carrier     │
//! │  ConfigurationGap   - no tariff row for a computed parcel               │
//! │  UpstreamDegraded   - rate/postal upstream failed (absorbed, logged)    │
//! │  InternalInvariant  - packing guard tripped, units lost (hard failure)  │
//! │                                                                         │
//! │  Scope: Input/Packing/Gap are reported per carrier in combined quotes;  │
//! │         InternalInvariant aborts the whole request.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, carrier, tariff key)
//! 3. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by callers to route a failure.
///
/// End users see "no shipping available"; operators additionally need to
/// tell "no tariff configured" apart from "item physically unshippable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    PermanentPacking,
    ConfigurationGap,
    UpstreamDegraded,
    InternalInvariant,
}

impl ErrorKind {
    /// Ordering used when several channels of one carrier fail and a single
    /// error has to be reported. Higher wins.
    pub fn severity(&self) -> u8 {
        match self {
            ErrorKind::UpstreamDegraded => 0,
            ErrorKind::Input => 1,
            ErrorKind::PermanentPacking => 2,
            ErrorKind::ConfigurationGap => 3,
            ErrorKind::InternalInvariant => 4,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Input => write!(f, "input"),
            ErrorKind::PermanentPacking => write!(f, "permanent_packing"),
            ErrorKind::ConfigurationGap => write!(f, "configuration_gap"),
            ErrorKind::UpstreamDegraded => write!(f, "upstream_degraded"),
            ErrorKind::InternalInvariant => write!(f, "internal_invariant"),
        }
    }
}

// =============================================================================
// Shipping Error
// =============================================================================

/// Errors produced while computing shipping options.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// SKU is not present in the variant catalog.
    #[error("Unknown SKU: {0}")]
    UnknownSku(String),

    /// Pickup point identifier is not in the local directory.
    #[error("Unknown pickup point: {0}")]
    UnknownPickupPoint(String),

    /// Destination postal code failed both local and remote validation.
    #[error("Invalid postal code '{postal_code}' for {country}: {reason}")]
    InvalidPostalCode {
        country: String,
        postal_code: String,
        reason: String,
    },

    /// Carrier does not offer the requested channel.
    #[error("{carrier} does not offer channel {channel}")]
    UnsupportedChannel { carrier: String, channel: String },

    /// A single unit exceeds the loosest limits of the carrier/channel.
    ///
    /// ## When This Occurs
    /// ```text
    /// SKU "SOFA-3" (35 kg) ──► DPD pickup (cap 20 kg)
    ///      │
    ///      ▼
    /// UnitTooLarge { sku: "SOFA-3", carrier: "dpd", channel: "PUDO", .. }
    ///      │
    ///      ▼
    /// Not retryable: change the item or the carrier
    /// ```
    #[error("SKU {sku} cannot be shipped with {carrier} ({channel}): {reason}")]
    UnitTooLarge {
        sku: String,
        carrier: String,
        channel: String,
        reason: String,
    },

    /// No tariff row matches a computed parcel.
    #[error("No shipping rate configured for {key}")]
    NoRate { key: String },

    /// Packing produced an impossible result (lost units, zero parcels,
    /// runaway loop, non-positive exchange rate).
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

impl ShippingError {
    /// Returns the routing kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShippingError::Validation(_)
            | ShippingError::UnknownSku(_)
            | ShippingError::UnknownPickupPoint(_)
            | ShippingError::InvalidPostalCode { .. }
            | ShippingError::UnsupportedChannel { .. } => ErrorKind::Input,
            ShippingError::UnitTooLarge { .. } => ErrorKind::PermanentPacking,
            ShippingError::NoRate { .. } => ErrorKind::ConfigurationGap,
            ShippingError::Invariant(_) => ErrorKind::InternalInvariant,
        }
    }

    /// Returns true if the failure means the packing algorithm or its data
    /// is broken and the request must fail loudly.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::InternalInvariant
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        ShippingError::Invariant(message.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request data doesn't meet requirements.
/// Used for early validation before packing runs.
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

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., lowercase country code, bad channel name).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with ShippingError.
pub type ShippingResult<T> = Result<T, ShippingError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ShippingError::UnitTooLarge {
            sku: "SOFA-3".to_string(),
            carrier: "dpd".to_string(),
            channel: "PUDO".to_string(),
            reason: "weight 35 kg exceeds cap 20 kg".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "SKU SOFA-3 cannot be shipped with dpd (PUDO): weight 35 kg exceeds cap 20 kg"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ShippingError::UnknownSku("X".into()).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            ShippingError::NoRate { key: "k".into() }.kind(),
            ErrorKind::ConfigurationGap
        );
        assert!(ShippingError::invariant("boom").is_fatal());
        assert!(!ShippingError::NoRate { key: "k".into() }.is_fatal());
    }

    #[test]
    fn test_validation_converts_to_shipping_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let err: ShippingError = validation_err.into();
        assert!(matches!(err, ShippingError::Validation(_)));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_severity_prefers_configuration_gap_over_packing() {
        assert!(ErrorKind::ConfigurationGap.severity() > ErrorKind::PermanentPacking.severity());
        assert!(ErrorKind::InternalInvariant.severity() > ErrorKind::ConfigurationGap.severity());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ConfigurationGap).unwrap();
        assert_eq!(json, "\"configuration_gap\"");
    }
}
