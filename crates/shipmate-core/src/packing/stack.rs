//! Stack-by-height packer.
//!
//! Units are laid flat (longest side along the length) and stacked. The
//! running parcel is the bounding box `max(L) × max(W) × Σ(H)`; a unit that
//! would push the box or the weight past a limit closes the parcel.

use tracing::debug;

use crate::carrier::Carrier;
use crate::error::{ShippingError, ShippingResult};
use crate::packing::{Dimensions, Parcel, PhysicalLimits};
use crate::types::Channel;
use crate::units::AtomicUnit;

/// Greedy single-column packer used by GLS and Packeta.
#[derive(Debug, Clone, Copy)]
pub struct StackPacker {
    limits: PhysicalLimits,
}

/// Parcel being filled.
#[derive(Default)]
struct Stack<'a> {
    units: Vec<&'a AtomicUnit>,
    length: f64,
    width: f64,
    height: f64,
    weight: f64,
}

impl<'a> Stack<'a> {
    fn grown_by(&self, unit: &AtomicUnit) -> (Dimensions, f64) {
        (
            Dimensions::new(
                self.length.max(unit.length_cm),
                self.width.max(unit.width_cm),
                self.height + unit.height_cm,
            ),
            self.weight + unit.weight_kg,
        )
    }

    fn push(&mut self, unit: &'a AtomicUnit) {
        let (dims, weight) = self.grown_by(unit);
        self.length = dims.length_cm;
        self.width = dims.width_cm;
        self.height = dims.height_cm;
        self.weight = weight;
        self.units.push(unit);
    }

    fn close(self) -> Parcel {
        let dims = Dimensions::new(self.length, self.width, self.height);
        Parcel::from_units(self.units, dims)
    }
}

impl StackPacker {
    pub fn new(limits: PhysicalLimits) -> Self {
        StackPacker { limits }
    }

    pub fn limits(&self) -> &PhysicalLimits {
        &self.limits
    }

    /// Packs `units` into stacked parcels.
    ///
    /// ## Errors
    /// - `UnitTooLarge` when a single unit breaks the limits on its own
    pub fn pack(
        &self,
        carrier: Carrier,
        channel: Channel,
        units: &[AtomicUnit],
    ) -> ShippingResult<Vec<Parcel>> {
        for unit in units {
            if let Some(reason) = self.limits.rejection_reason(unit) {
                return Err(ShippingError::UnitTooLarge {
                    sku: unit.sku.clone(),
                    carrier: carrier.code().to_string(),
                    channel: channel.code().to_string(),
                    reason,
                });
            }
        }

        // Widest base first, heavier first, then SKU so the output does not
        // depend on line-item order.
        let mut ordered: Vec<&AtomicUnit> = units.iter().collect();
        ordered.sort_by(|a, b| {
            b.footprint()
                .total_cmp(&a.footprint())
                .then(b.weight_kg.total_cmp(&a.weight_kg))
                .then(a.sku.cmp(&b.sku))
        });

        let mut parcels = Vec::new();
        let mut current = Stack::default();
        for unit in ordered {
            if !current.units.is_empty() {
                let (dims, weight) = current.grown_by(unit);
                if !self.limits.admits(&dims, weight) {
                    parcels.push(std::mem::take(&mut current).close());
                }
            }
            current.push(unit);
        }
        if !current.units.is_empty() {
            parcels.push(current.close());
        }

        debug!(
            carrier = %carrier,
            channel = %channel,
            units = units.len(),
            parcels = parcels.len(),
            "stack packing complete"
        );
        Ok(parcels)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::{verify_packing, SizeRule};
    use crate::units::VariantPhysical;

    fn gls() -> StackPacker {
        StackPacker::new(PhysicalLimits::new(31.5, 120.0, SizeRule::SumOfSides(300.0)))
    }

    fn unit(sku: &str, l: f64, w: f64, h: f64, kg: f64) -> AtomicUnit {
        AtomicUnit::new(sku, VariantPhysical::new(l, w, h, kg))
    }

    #[test]
    fn test_two_boxes_stack_into_one_parcel() {
        let units = vec![
            unit("A", 40.0, 30.0, 20.0, 5.0),
            unit("B", 40.0, 30.0, 20.0, 5.0),
        ];
        let parcels = gls().pack(Carrier::Gls, Channel::Hd, &units).unwrap();

        assert_eq!(parcels.len(), 1);
        assert_eq!(parcels[0].bin_dims, Dimensions::new(40.0, 30.0, 40.0));
        assert_eq!(parcels[0].total_weight_kg, 10.0);
        verify_packing(&units, &parcels, gls().limits()).unwrap();
    }

    #[test]
    fn test_weight_limit_closes_parcel() {
        let units: Vec<_> = (0..4).map(|_| unit("W", 20.0, 20.0, 10.0, 10.0)).collect();
        let parcels = gls().pack(Carrier::Gls, Channel::Hd, &units).unwrap();

        // 3 × 10 kg fits under 31.5, the fourth opens a new parcel
        assert_eq!(parcels.len(), 2);
        assert_eq!(parcels[0].unit_count(), 3);
        assert_eq!(parcels[1].unit_count(), 1);
        verify_packing(&units, &parcels, gls().limits()).unwrap();
    }

    #[test]
    fn test_height_limit_closes_parcel() {
        // 100 + 10 + h: sum of sides allows a stack of at most 190 cm
        let units: Vec<_> = (0..25).map(|_| unit("P", 100.0, 10.0, 10.0, 0.5)).collect();
        let parcels = gls().pack(Carrier::Gls, Channel::Hd, &units).unwrap();

        assert!(parcels.len() > 1);
        verify_packing(&units, &parcels, gls().limits()).unwrap();
    }

    #[test]
    fn test_oversized_unit_rejected() {
        let units = vec![unit("LONG", 130.0, 10.0, 10.0, 1.0)];
        let err = gls().pack(Carrier::Gls, Channel::Hd, &units).unwrap_err();
        assert!(matches!(err, ShippingError::UnitTooLarge { ref sku, .. } if sku == "LONG"));
    }

    #[test]
    fn test_empty_input_gives_no_parcels() {
        let parcels = gls().pack(Carrier::Gls, Channel::Hd, &[]).unwrap();
        assert!(parcels.is_empty());
    }

    #[test]
    fn test_packing_is_idempotent_and_order_independent() {
        let units = vec![
            unit("A", 30.0, 20.0, 10.0, 2.0),
            unit("B", 50.0, 40.0, 30.0, 12.0),
            unit("C", 10.0, 10.0, 10.0, 0.3),
            unit("B", 50.0, 40.0, 30.0, 12.0),
        ];
        let mut reversed = units.clone();
        reversed.reverse();

        let first = gls().pack(Carrier::Gls, Channel::Hd, &units).unwrap();
        let second = gls().pack(Carrier::Gls, Channel::Hd, &units).unwrap();
        let third = gls().pack(Carrier::Gls, Channel::Hd, &reversed).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }
}
