//! # Dimension / Weight Normalizer
//!
//! Product variants are stored in millimeters and grams; packing and rate
//! logic work in centimeters and kilograms. This module converts between the
//! two and explodes line items into one [`AtomicUnit`] per physical copy.
//!
//! ## Flow
//! ```text
//! LineItem { sku: "MUG", quantity: 3 }
//!      │
//!      ▼  VariantLookup ("MUG" → 120×90×100 mm, 350 g)
//!      │
//!      ▼  normalize: 12.0×9.0×10.0 cm, 0.35 kg
//!      │
//!      ▼  explode
//! [AtomicUnit MUG, AtomicUnit MUG, AtomicUnit MUG]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ShippingError, ShippingResult};
use crate::types::LineItem;
use crate::validation::validate_line_items;

/// Smallest side length kept after conversion (avoids degenerate boxes).
pub const MIN_SIDE_CM: f64 = 0.1;

/// Smallest weight kept after conversion.
pub const MIN_WEIGHT_KG: f64 = 0.001;

/// Tolerance used for every geometric and weight comparison.
pub const EPSILON: f64 = 1e-9;

// =============================================================================
// Stored Variant Dimensions
// =============================================================================

/// Physical data as stored by the product catalog (mm / g).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDimensions {
    pub sku: String,
    pub length_mm: u32,
    pub width_mm: u32,
    pub height_mm: u32,
    pub weight_grams: u32,
}

/// Physical data in packing units (cm / kg).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantPhysical {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
}

impl VariantPhysical {
    /// Converts stored mm/g values, applying the 0.1 cm / 0.001 kg floors.
    ///
    /// ## Example
    /// ```rust
    /// use shipmate_core::units::{VariantDimensions, VariantPhysical};
    ///
    /// let stored = VariantDimensions {
    ///     sku: "PIN".into(),
    ///     length_mm: 0,
    ///     width_mm: 25,
    ///     height_mm: 400,
    ///     weight_grams: 0,
    /// };
    /// let physical = VariantPhysical::from_stored(&stored);
    /// assert_eq!(physical.length_cm, 0.1);
    /// assert_eq!(physical.width_cm, 2.5);
    /// assert_eq!(physical.height_cm, 40.0);
    /// assert_eq!(physical.weight_kg, 0.001);
    /// ```
    pub fn from_stored(stored: &VariantDimensions) -> Self {
        VariantPhysical {
            length_cm: mm_to_cm(stored.length_mm),
            width_cm: mm_to_cm(stored.width_mm),
            height_cm: mm_to_cm(stored.height_mm),
            weight_kg: grams_to_kg(stored.weight_grams),
        }
    }

    /// Builds physical data directly in cm/kg, applying the same floors.
    pub fn new(length_cm: f64, width_cm: f64, height_cm: f64, weight_kg: f64) -> Self {
        VariantPhysical {
            length_cm: length_cm.max(MIN_SIDE_CM),
            width_cm: width_cm.max(MIN_SIDE_CM),
            height_cm: height_cm.max(MIN_SIDE_CM),
            weight_kg: weight_kg.max(MIN_WEIGHT_KG),
        }
    }
}

/// Millimeters to centimeters with the 0.1 cm floor.
pub fn mm_to_cm(mm: u32) -> f64 {
    (f64::from(mm) / 10.0).max(MIN_SIDE_CM)
}

/// Grams to kilograms with the 0.001 kg floor.
pub fn grams_to_kg(grams: u32) -> f64 {
    (f64::from(grams) / 1000.0).max(MIN_WEIGHT_KG)
}

/// Rounds a weight to whole grams, keeping sums of many units stable.
pub fn round_kg(kg: f64) -> f64 {
    (kg * 1000.0).round() / 1000.0
}

// =============================================================================
// Variant Lookup
// =============================================================================

/// Read-only access to the product catalog's physical data.
pub trait VariantLookup {
    fn physical(&self, sku: &str) -> Option<VariantPhysical>;
}

impl VariantLookup for HashMap<String, VariantPhysical> {
    fn physical(&self, sku: &str) -> Option<VariantPhysical> {
        self.get(sku).copied()
    }
}

// =============================================================================
// Atomic Unit
// =============================================================================

/// One physical copy of a SKU.
///
/// Dimensions are stored longest-first (`length ≥ width ≥ height`), which is
/// the orientation every packer starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicUnit {
    pub sku: String,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
}

impl AtomicUnit {
    pub fn new(sku: impl Into<String>, physical: VariantPhysical) -> Self {
        let mut dims = [physical.length_cm, physical.width_cm, physical.height_cm];
        dims.sort_by(|a, b| b.total_cmp(a));
        AtomicUnit {
            sku: sku.into(),
            length_cm: dims[0],
            width_cm: dims[1],
            height_cm: dims[2],
            weight_kg: physical.weight_kg,
        }
    }

    /// Dimensions longest-first.
    pub fn dims(&self) -> [f64; 3] {
        [self.length_cm, self.width_cm, self.height_cm]
    }

    pub fn volume(&self) -> f64 {
        self.length_cm * self.width_cm * self.height_cm
    }

    /// Base area when lying flat (two longest sides).
    pub fn footprint(&self) -> f64 {
        self.length_cm * self.width_cm
    }
}

/// Explodes line items into atomic units.
///
/// ## Errors
/// - `Validation` for empty orders, bad SKUs or quantities
/// - `UnknownSku` when the catalog has no physical data for a SKU
pub fn explode(items: &[LineItem], catalog: &dyn VariantLookup) -> ShippingResult<Vec<AtomicUnit>> {
    validate_line_items(items)?;

    let mut units = Vec::new();
    for item in items {
        let sku = item.sku.trim();
        let physical = catalog
            .physical(sku)
            .ok_or_else(|| ShippingError::UnknownSku(sku.to_string()))?;
        for _ in 0..item.quantity {
            units.push(AtomicUnit::new(sku, physical));
        }
    }
    Ok(units)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> HashMap<String, VariantPhysical> {
        let mut map = HashMap::new();
        map.insert("A".to_string(), VariantPhysical::new(20.0, 40.0, 30.0, 5.0));
        map.insert("B".to_string(), VariantPhysical::new(10.0, 10.0, 10.0, 1.0));
        map
    }

    #[test]
    fn test_mm_and_grams_conversion() {
        assert_eq!(mm_to_cm(405), 40.5);
        assert_eq!(mm_to_cm(0), MIN_SIDE_CM);
        assert_eq!(grams_to_kg(31_500), 31.5);
        assert_eq!(grams_to_kg(0), MIN_WEIGHT_KG);
    }

    #[test]
    fn test_unit_dims_sorted_longest_first() {
        let unit = AtomicUnit::new("A", VariantPhysical::new(20.0, 40.0, 30.0, 5.0));
        assert_eq!(unit.dims(), [40.0, 30.0, 20.0]);
        assert_eq!(unit.volume(), 24_000.0);
    }

    #[test]
    fn test_explode_quantities() {
        let units = explode(&[LineItem::new("A", 2), LineItem::new("B", 3)], &catalog()).unwrap();
        assert_eq!(units.len(), 5);
        assert_eq!(units.iter().filter(|u| u.sku == "A").count(), 2);
        assert_eq!(units.iter().filter(|u| u.sku == "B").count(), 3);
    }

    #[test]
    fn test_explode_unknown_sku() {
        let err = explode(&[LineItem::new("NOPE", 1)], &catalog()).unwrap_err();
        assert!(matches!(err, ShippingError::UnknownSku(ref sku) if sku == "NOPE"));
    }

    #[test]
    fn test_explode_rejects_bad_quantity() {
        let err = explode(&[LineItem::new("A", 0)], &catalog()).unwrap_err();
        assert!(matches!(err, ShippingError::Validation(_)));
    }

    #[test]
    fn test_explode_bulk_order() {
        let units = explode(&[LineItem::new("B", 600), LineItem::new("B", 600)], &catalog()).unwrap();
        assert_eq!(units.len(), 1200);
    }

    #[test]
    fn test_round_kg() {
        assert_eq!(round_kg(0.1 + 0.2), 0.3);
        assert_eq!(round_kg(10.0004), 10.0);
    }
}
