//! # Parcel Splitter
//!
//! Partitions an order's atomic units into physical parcels that respect a
//! carrier's limits.
//!
//! ## Packers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Packing Strategies                              │
//! │                                                                         │
//! │  CartonPacker (carton.rs)            StackPacker (stack.rs)            │
//! │  ─────────────────────────           ──────────────────────            │
//! │  • Bins = carton catalog             • Bin = running stack             │
//! │  • 3-D guillotine placement          • bbox = max L, max W, Σ H        │
//! │  • Rounds until pool is empty        • Close parcel on any violation   │
//! │  • Evict heaviest when overweight                                      │
//! │                                                                         │
//! │  Both: pre-reject units that exceed the loosest limits                 │
//! │        (PermanentPacking), then verify_packing() on the output.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Termination
//! Every carton round places at least one unit (each unit fits some carton
//! on its own and weighs no more than the cap), so the pool strictly
//! shrinks. [`crate::PACKING_ROUND_LIMIT`] is only an assertion.

pub mod carton;
pub mod stack;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ShippingError, ShippingResult};
use crate::units::{round_kg, AtomicUnit, EPSILON};

pub use carton::CartonPacker;
pub use stack::StackPacker;

// =============================================================================
// Dimensions
// =============================================================================

/// Outer dimensions of a parcel or carton in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Dimensions {
    pub fn new(length_cm: f64, width_cm: f64, height_cm: f64) -> Self {
        Dimensions {
            length_cm,
            width_cm,
            height_cm,
        }
    }

    /// Dimensions longest-first.
    pub fn sorted(&self) -> [f64; 3] {
        let mut dims = [self.length_cm, self.width_cm, self.height_cm];
        dims.sort_by(|a, b| b.total_cmp(a));
        dims
    }

    pub fn longest(&self) -> f64 {
        self.sorted()[0]
    }

    /// `L + 2 * (W + H)` with L the longest side.
    pub fn girth(&self) -> f64 {
        let [l, w, h] = self.sorted();
        l + 2.0 * (w + h)
    }

    pub fn sum_of_sides(&self) -> f64 {
        self.length_cm + self.width_cm + self.height_cm
    }

    pub fn volume(&self) -> f64 {
        self.length_cm * self.width_cm * self.height_cm
    }

    /// True when a box with these sorted dims fits inside `outer` sorted dims.
    pub fn fits_within(&self, outer: &Dimensions) -> bool {
        let inner = self.sorted();
        let outer = outer.sorted();
        inner.iter().zip(outer.iter()).all(|(i, o)| *i <= *o + EPSILON)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}×{} cm", self.length_cm, self.width_cm, self.height_cm)
    }
}

// =============================================================================
// Physical Limits
// =============================================================================

/// Secondary size constraint on top of the single-side limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeRule {
    /// `L + 2*(W+H)` must not exceed the value.
    Girth(f64),
    /// `L + W + H` must not exceed the value.
    SumOfSides(f64),
    /// No secondary constraint.
    Unbounded,
}

/// Carrier limits for one parcel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalLimits {
    pub max_weight_kg: f64,
    pub max_side_cm: f64,
    pub size_rule: SizeRule,
}

impl PhysicalLimits {
    pub const fn new(max_weight_kg: f64, max_side_cm: f64, size_rule: SizeRule) -> Self {
        PhysicalLimits {
            max_weight_kg,
            max_side_cm,
            size_rule,
        }
    }

    /// Applies a weight cap override on top of the carrier limit.
    pub fn capped(self, cap_kg: Option<f64>) -> Self {
        match cap_kg {
            Some(cap) if cap < self.max_weight_kg => PhysicalLimits {
                max_weight_kg: cap,
                ..self
            },
            _ => self,
        }
    }

    pub fn admits_weight(&self, weight_kg: f64) -> bool {
        weight_kg <= self.max_weight_kg + EPSILON
    }

    pub fn admits_dims(&self, dims: &Dimensions) -> bool {
        if dims.longest() > self.max_side_cm + EPSILON {
            return false;
        }
        match self.size_rule {
            SizeRule::Girth(max) => dims.girth() <= max + EPSILON,
            SizeRule::SumOfSides(max) => dims.sum_of_sides() <= max + EPSILON,
            SizeRule::Unbounded => true,
        }
    }

    pub fn admits(&self, dims: &Dimensions, weight_kg: f64) -> bool {
        self.admits_weight(weight_kg) && self.admits_dims(dims)
    }

    /// Explains why a single unit is rejected, or `None` if it is admitted.
    pub fn rejection_reason(&self, unit: &AtomicUnit) -> Option<String> {
        let dims = unit_dimensions(unit);
        if !self.admits_weight(unit.weight_kg) {
            return Some(format!(
                "weight {} kg exceeds cap {} kg",
                unit.weight_kg, self.max_weight_kg
            ));
        }
        if dims.longest() > self.max_side_cm + EPSILON {
            return Some(format!(
                "side {} cm exceeds max side {} cm",
                dims.longest(),
                self.max_side_cm
            ));
        }
        match self.size_rule {
            SizeRule::Girth(max) if dims.girth() > max + EPSILON => Some(format!(
                "girth {} cm exceeds max girth {} cm",
                dims.girth(),
                max
            )),
            SizeRule::SumOfSides(max) if dims.sum_of_sides() > max + EPSILON => Some(format!(
                "sum of sides {} cm exceeds max {} cm",
                dims.sum_of_sides(),
                max
            )),
            _ => None,
        }
    }
}

/// Bounding box of a single unit.
pub fn unit_dimensions(unit: &AtomicUnit) -> Dimensions {
    Dimensions::new(unit.length_cm, unit.width_cm, unit.height_cm)
}

// =============================================================================
// Parcel
// =============================================================================

/// One SKU and how many of its units travel in a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedItem {
    pub sku: String,
    pub quantity: u32,
}

/// Result of packing: one physical parcel.
///
/// Created per calculation and never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub contents: Vec<PackedItem>,
    pub total_weight_kg: f64,
    pub bin_dims: Dimensions,
}

impl Parcel {
    /// Builds a parcel from the units it carries. Contents are grouped by SKU
    /// in first-seen order.
    pub fn from_units<'a, I>(units: I, bin_dims: Dimensions) -> Parcel
    where
        I: IntoIterator<Item = &'a AtomicUnit>,
    {
        let mut contents: Vec<PackedItem> = Vec::new();
        let mut weight = 0.0;
        for unit in units {
            weight += unit.weight_kg;
            match contents.iter_mut().find(|c| c.sku == unit.sku) {
                Some(item) => item.quantity += 1,
                None => contents.push(PackedItem {
                    sku: unit.sku.clone(),
                    quantity: 1,
                }),
            }
        }
        Parcel {
            contents,
            total_weight_kg: round_kg(weight),
            bin_dims,
        }
    }

    /// Number of atomic units in the parcel.
    pub fn unit_count(&self) -> u32 {
        self.contents.iter().map(|c| c.quantity).sum()
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Checks a splitter result before it is priced.
///
/// ## Checks
/// - Non-empty input produced at least one parcel
/// - Conservation: per-SKU unit counts in equal counts out
/// - Every parcel satisfies `limits`
///
/// Any failure is an `Invariant` error: the packing logic or its data is
/// broken, not the request.
pub fn verify_packing(
    units: &[AtomicUnit],
    parcels: &[Parcel],
    limits: &PhysicalLimits,
) -> ShippingResult<()> {
    if !units.is_empty() && parcels.is_empty() {
        return Err(ShippingError::invariant(format!(
            "packing produced zero parcels for {} units",
            units.len()
        )));
    }

    let mut expected: BTreeMap<&str, u32> = BTreeMap::new();
    for unit in units {
        *expected.entry(unit.sku.as_str()).or_default() += 1;
    }
    let mut actual: BTreeMap<&str, u32> = BTreeMap::new();
    for parcel in parcels {
        for item in &parcel.contents {
            *actual.entry(item.sku.as_str()).or_default() += item.quantity;
        }
    }
    if expected != actual {
        return Err(ShippingError::invariant(format!(
            "packing lost or duplicated units: expected {:?}, got {:?}",
            expected, actual
        )));
    }

    for (index, parcel) in parcels.iter().enumerate() {
        if !limits.admits(&parcel.bin_dims, parcel.total_weight_kg) {
            return Err(ShippingError::invariant(format!(
                "parcel {} ({}, {} kg) violates carrier limits",
                index, parcel.bin_dims, parcel.total_weight_kg
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::VariantPhysical;

    fn unit(sku: &str, l: f64, w: f64, h: f64, kg: f64) -> AtomicUnit {
        AtomicUnit::new(sku, VariantPhysical::new(l, w, h, kg))
    }

    #[test]
    fn test_girth_uses_longest_side() {
        let dims = Dimensions::new(30.0, 100.0, 20.0);
        assert_eq!(dims.girth(), 100.0 + 2.0 * (30.0 + 20.0));
        assert_eq!(dims.sum_of_sides(), 150.0);
    }

    #[test]
    fn test_limits_admit() {
        let limits = PhysicalLimits::new(20.0, 100.0, SizeRule::Girth(250.0));
        assert!(limits.admits(&Dimensions::new(100.0, 35.0, 40.0), 20.0));
        assert!(!limits.admits(&Dimensions::new(101.0, 10.0, 10.0), 1.0));
        assert!(!limits.admits(&Dimensions::new(100.0, 40.0, 40.0), 1.0)); // girth 260
        assert!(!limits.admits(&Dimensions::new(10.0, 10.0, 10.0), 20.5));
    }

    #[test]
    fn test_capped_only_lowers() {
        let limits = PhysicalLimits::new(31.5, 175.0, SizeRule::Girth(300.0));
        assert_eq!(limits.capped(Some(20.0)).max_weight_kg, 20.0);
        assert_eq!(limits.capped(Some(40.0)).max_weight_kg, 31.5);
        assert_eq!(limits.capped(None).max_weight_kg, 31.5);
    }

    #[test]
    fn test_parcel_groups_contents() {
        let units = vec![
            unit("A", 10.0, 10.0, 10.0, 1.25),
            unit("B", 10.0, 10.0, 10.0, 0.5),
            unit("A", 10.0, 10.0, 10.0, 1.25),
        ];
        let parcel = Parcel::from_units(&units, Dimensions::new(10.0, 10.0, 30.0));
        assert_eq!(parcel.contents.len(), 2);
        assert_eq!(parcel.contents[0].quantity, 2);
        assert_eq!(parcel.total_weight_kg, 3.0);
        assert_eq!(parcel.unit_count(), 3);
    }

    #[test]
    fn test_verify_rejects_zero_parcels_for_nonempty_input() {
        let units = vec![unit("A", 10.0, 10.0, 10.0, 1.0)];
        let limits = PhysicalLimits::new(31.5, 120.0, SizeRule::SumOfSides(300.0));
        let err = verify_packing(&units, &[], &limits).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("zero parcels"));
    }

    #[test]
    fn test_verify_rejects_lost_units() {
        let units = vec![unit("A", 10.0, 10.0, 10.0, 1.0), unit("A", 10.0, 10.0, 10.0, 1.0)];
        let parcel = Parcel::from_units(&units[..1], Dimensions::new(10.0, 10.0, 10.0));
        let limits = PhysicalLimits::new(31.5, 120.0, SizeRule::SumOfSides(300.0));
        let err = verify_packing(&units, &[parcel], &limits).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_verify_rejects_limit_violation() {
        let units = vec![unit("A", 10.0, 10.0, 10.0, 25.0)];
        let parcel = Parcel::from_units(&units, Dimensions::new(10.0, 10.0, 10.0));
        let limits = PhysicalLimits::new(20.0, 120.0, SizeRule::Unbounded);
        assert!(verify_packing(&units, &[parcel], &limits).is_err());
    }

    #[test]
    fn test_rejection_reason() {
        let limits = PhysicalLimits::new(15.0, 120.0, SizeRule::SumOfSides(150.0));
        // 60 + 50 + 50 = 160 > 150
        let reason = limits.rejection_reason(&unit("A", 60.0, 50.0, 50.0, 1.0)).unwrap();
        assert!(reason.contains("sum of sides"));
        // Exactly on the limit is admitted
        assert!(limits.rejection_reason(&unit("A", 50.0, 50.0, 50.0, 1.0)).is_none());
        assert!(limits.rejection_reason(&unit("A", 50.0, 50.0, 40.0, 1.0)).is_none());
        let reason = limits.rejection_reason(&unit("A", 10.0, 10.0, 10.0, 16.0)).unwrap();
        assert!(reason.contains("weight"));
    }
}
