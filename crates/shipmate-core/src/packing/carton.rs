//! Carton-based 3-D packer.
//!
//! ## Round Structure
//! ```text
//! pool (largest first) ──► for each carton, smallest first:
//!                              guillotine-place units into the carton
//!                              evict heaviest until within weight cap
//!                          ──► commit: first carton taking ALL remaining,
//!                              else the one placing the most (ties: smaller)
//!                          ──► remove placed units from pool, repeat
//! ```
//!
//! Placement is a guillotine split: a unit goes into the smallest free box
//! that holds it in any of its six orientations, and the leftover space is
//! cut into a right, front and top box.

use tracing::debug;

use crate::cartons::{Carton, CartonCatalog};
use crate::carrier::Carrier;
use crate::error::{ShippingError, ShippingResult};
use crate::packing::{unit_dimensions, Parcel, PhysicalLimits};
use crate::types::Channel;
use crate::units::{AtomicUnit, EPSILON};
use crate::PACKING_ROUND_LIMIT;

/// Packs units into catalog cartons.
#[derive(Debug, Clone, Copy)]
pub struct CartonPacker {
    catalog: &'static CartonCatalog,
    limits: PhysicalLimits,
}

/// Free box left inside a carton.
#[derive(Debug, Clone, Copy)]
struct FreeSpace {
    x: f64,
    y: f64,
    z: f64,
}

impl FreeSpace {
    fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }
}

/// Best fill of one carton in one round.
struct Candidate {
    carton_index: usize,
    placed: Vec<usize>,
}

impl CartonPacker {
    /// `limits` must already carry any weight cap override.
    pub fn new(catalog: &'static CartonCatalog, limits: PhysicalLimits) -> Self {
        CartonPacker { catalog, limits }
    }

    pub fn limits(&self) -> &PhysicalLimits {
        &self.limits
    }

    /// Packs `units` into cartons.
    ///
    /// ## Errors
    /// - `UnitTooLarge` when a unit fits no carton or exceeds the weight cap
    /// - `Invariant` when a round places nothing or the round guard trips
    pub fn pack(
        &self,
        carrier: Carrier,
        channel: Channel,
        units: &[AtomicUnit],
    ) -> ShippingResult<Vec<Parcel>> {
        for unit in units {
            if let Some(reason) = self.rejection_reason(unit) {
                return Err(ShippingError::UnitTooLarge {
                    sku: unit.sku.clone(),
                    carrier: carrier.code().to_string(),
                    channel: channel.code().to_string(),
                    reason,
                });
            }
        }

        let mut pool: Vec<&AtomicUnit> = units.iter().collect();
        pool.sort_by(|a, b| {
            b.volume()
                .total_cmp(&a.volume())
                .then(b.weight_kg.total_cmp(&a.weight_kg))
                .then(a.sku.cmp(&b.sku))
        });

        let round_limit = PACKING_ROUND_LIMIT.max(pool.len());
        let mut parcels = Vec::new();
        let mut rounds = 0usize;
        while !pool.is_empty() {
            rounds += 1;
            if rounds > round_limit {
                return Err(ShippingError::invariant(format!(
                    "carton packing exceeded {} rounds with {} units left",
                    round_limit,
                    pool.len()
                )));
            }

            let candidate = self.best_candidate(&pool);
            let Some(candidate) = candidate.filter(|c| !c.placed.is_empty()) else {
                return Err(ShippingError::invariant(format!(
                    "carton packing round {} placed no units ({} left)",
                    rounds,
                    pool.len()
                )));
            };

            let carton = self.catalog.cartons()[candidate.carton_index];
            let mut placed = candidate.placed;
            placed.sort_unstable();
            let contents: Vec<&AtomicUnit> = placed.iter().map(|&i| pool[i]).collect();
            parcels.push(Parcel::from_units(contents, carton.dims()));

            for &index in placed.iter().rev() {
                pool.remove(index);
            }
        }

        debug!(
            carrier = %carrier,
            channel = %channel,
            units = units.len(),
            parcels = parcels.len(),
            rounds,
            "carton packing complete"
        );
        Ok(parcels)
    }

    fn rejection_reason(&self, unit: &AtomicUnit) -> Option<String> {
        if let Some(reason) = self.limits.rejection_reason(unit) {
            return Some(reason);
        }
        let dims = unit_dimensions(unit);
        let cap = self.limits.max_weight_kg;
        let fits = self.catalog.cartons().iter().any(|carton| {
            dims.fits_within(&carton.dims()) && unit.weight_kg <= carton.weight_cap(cap) + EPSILON
        });
        if fits {
            None
        } else {
            Some(format!("{} ({} kg) fits no carton", dims, unit.weight_kg))
        }
    }

    /// Tries every carton against the pool and picks the round's winner.
    fn best_candidate(&self, pool: &[&AtomicUnit]) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (carton_index, carton) in self.catalog.cartons().iter().enumerate() {
            let placed = self.fill(carton, pool);
            if placed.len() == pool.len() {
                return Some(Candidate {
                    carton_index,
                    placed,
                });
            }
            let better = best
                .as_ref()
                .map_or(true, |current| placed.len() > current.placed.len());
            if better {
                best = Some(Candidate {
                    carton_index,
                    placed,
                });
            }
        }
        best
    }

    /// Places as many pool units as fit into one carton, then evicts the
    /// heaviest until the carton is within its weight cap. Returns pool
    /// indices of the units that stay.
    fn fill(&self, carton: &Carton, pool: &[&AtomicUnit]) -> Vec<usize> {
        let mut spaces = vec![FreeSpace {
            x: carton.length_cm,
            y: carton.width_cm,
            z: carton.height_cm,
        }];
        let mut placed = Vec::new();

        for (index, unit) in pool.iter().enumerate() {
            if place(&mut spaces, unit) {
                placed.push(index);
            }
        }

        let cap = carton.weight_cap(self.limits.max_weight_kg);
        let mut weight: f64 = placed.iter().map(|&i| pool[i].weight_kg).sum();
        if weight > cap + EPSILON {
            // Lightest first so eviction pops the heaviest from the back.
            placed.sort_by(|&a, &b| {
                pool[a]
                    .weight_kg
                    .total_cmp(&pool[b].weight_kg)
                    .then(b.cmp(&a))
            });
            while weight > cap + EPSILON {
                match placed.pop() {
                    Some(evicted) => weight -= pool[evicted].weight_kg,
                    None => break,
                }
            }
        }
        placed
    }
}

/// Puts `unit` into the smallest free space that holds it, splitting the
/// remainder. Returns false when no space and orientation fit.
fn place(spaces: &mut Vec<FreeSpace>, unit: &AtomicUnit) -> bool {
    let [l, w, h] = unit.dims();
    let orientations = [
        (l, w, h),
        (l, h, w),
        (w, l, h),
        (w, h, l),
        (h, l, w),
        (h, w, l),
    ];

    let mut best: Option<(usize, (f64, f64, f64))> = None;
    for (index, space) in spaces.iter().enumerate() {
        let Some(orientation) = orientations.iter().copied().find(|&(a, b, c)| {
            a <= space.x + EPSILON && b <= space.y + EPSILON && c <= space.z + EPSILON
        }) else {
            continue;
        };
        let smaller = best.map_or(true, |(current, _)| space.volume() < spaces[current].volume());
        if smaller {
            best = Some((index, orientation));
        }
    }

    let Some((index, (a, b, c))) = best else {
        return false;
    };
    let space = spaces.swap_remove(index);
    let splits = [
        FreeSpace {
            x: space.x - a,
            y: space.y,
            z: space.z,
        },
        FreeSpace {
            x: a,
            y: space.y - b,
            z: space.z,
        },
        FreeSpace {
            x: a,
            y: b,
            z: space.z - c,
        },
    ];
    spaces.extend(
        splits
            .into_iter()
            .filter(|s| s.x > EPSILON && s.y > EPSILON && s.z > EPSILON),
    );
    true
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartons::{dpd_home, dpd_pickup};
    use crate::packing::{verify_packing, Dimensions, SizeRule};
    use crate::units::VariantPhysical;

    fn pickup() -> CartonPacker {
        let limits = PhysicalLimits::new(20.0, 100.0, SizeRule::Girth(250.0)).capped(Some(20.0));
        CartonPacker::new(dpd_pickup(), limits)
    }

    fn home() -> CartonPacker {
        let limits = PhysicalLimits::new(31.5, 175.0, SizeRule::Girth(300.0)).capped(Some(20.0));
        CartonPacker::new(dpd_home(), limits)
    }

    fn unit(sku: &str, l: f64, w: f64, h: f64, kg: f64) -> AtomicUnit {
        AtomicUnit::new(sku, VariantPhysical::new(l, w, h, kg))
    }

    fn repeat(sku: &str, n: usize, l: f64, w: f64, h: f64, kg: f64) -> Vec<AtomicUnit> {
        (0..n).map(|_| unit(sku, l, w, h, kg)).collect()
    }

    #[test]
    fn test_single_small_unit_uses_smallest_carton() {
        let units = vec![unit("MUG", 12.0, 9.0, 10.0, 0.35)];
        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert_eq!(parcels.len(), 1);
        assert_eq!(parcels[0].bin_dims, Dimensions::new(20.0, 15.0, 10.0));
    }

    #[test]
    fn test_carton_rating_forces_larger_box() {
        // Fits 20×15×10 by size, but that box is rated for 3 kg only
        let units = vec![unit("IRON", 15.0, 10.0, 8.0, 4.0)];
        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert_eq!(parcels[0].bin_dims, Dimensions::new(30.0, 20.0, 15.0));
    }

    #[test]
    fn test_heavy_unit_rejected_without_parcels() {
        let units = vec![unit("SOFA", 60.0, 40.0, 30.0, 35.0)];
        let err = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap_err();
        match err {
            ShippingError::UnitTooLarge { sku, carrier, channel, reason } => {
                assert_eq!(sku, "SOFA");
                assert_eq!(carrier, "dpd");
                assert_eq!(channel, "PUDO");
                assert!(reason.contains("weight"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_long_unit_only_fits_home_catalog() {
        let units = vec![unit("SKI", 160.0, 20.0, 10.0, 3.0)];
        assert!(matches!(
            pickup().pack(Carrier::Dpd, Channel::Pudo, &units),
            Err(ShippingError::UnitTooLarge { .. })
        ));
        let parcels = home().pack(Carrier::Dpd, Channel::Hd, &units).unwrap();
        assert_eq!(parcels[0].bin_dims, Dimensions::new(175.0, 30.0, 30.0));
    }

    #[test]
    fn test_weight_cap_splits_order() {
        // 5 × 6 kg = 30 kg, cap 20 kg → at least two parcels
        let units = repeat("BRICK", 5, 20.0, 10.0, 10.0, 6.0);
        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert_eq!(parcels.len(), 2);
        assert!(parcels.iter().all(|p| p.total_weight_kg <= 20.0));
        verify_packing(&units, &parcels, pickup().limits()).unwrap();
    }

    #[test]
    fn test_conservation_and_limits_on_mixed_order() {
        let mut units = repeat("BOOK", 12, 24.0, 17.0, 4.0, 0.8);
        units.extend(repeat("LAMP", 3, 45.0, 25.0, 25.0, 3.5));
        units.extend(repeat("PAN", 4, 35.0, 30.0, 8.0, 1.6));
        units.push(unit("RUG", 95.0, 25.0, 25.0, 7.0));

        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert!(!parcels.is_empty());
        let total: u32 = parcels.iter().map(Parcel::unit_count).sum();
        assert_eq!(total as usize, units.len());
        verify_packing(&units, &parcels, pickup().limits()).unwrap();
    }

    #[test]
    fn test_every_round_shrinks_pool() {
        // Worst case for rounds: each unit needs its own carton
        let units = repeat("CRATE", 40, 100.0, 40.0, 30.0, 15.0);
        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert_eq!(parcels.len(), 40);
        verify_packing(&units, &parcels, pickup().limits()).unwrap();
    }

    #[test]
    fn test_bulk_order_of_small_units() {
        let units = repeat("SCREW", 1200, 5.0, 1.0, 1.0, 0.01);
        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert!(!parcels.is_empty());
        verify_packing(&units, &parcels, pickup().limits()).unwrap();
    }

    #[test]
    fn test_more_rounds_than_the_minimum_guard() {
        // One carton per unit, so this order needs 1001 rounds
        let units = repeat("CRATE", PACKING_ROUND_LIMIT + 1, 100.0, 40.0, 30.0, 15.0);
        let parcels = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert_eq!(parcels.len(), PACKING_ROUND_LIMIT + 1);
        verify_packing(&units, &parcels, pickup().limits()).unwrap();
    }

    #[test]
    fn test_packing_is_idempotent() {
        let mut units = repeat("A", 7, 30.0, 20.0, 10.0, 1.2);
        units.extend(repeat("B", 3, 40.0, 30.0, 20.0, 4.0));
        let first = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        let second = pickup().pack(Carrier::Dpd, Channel::Pudo, &units).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_place_splits_free_space() {
        let mut spaces = vec![FreeSpace {
            x: 40.0,
            y: 30.0,
            z: 20.0,
        }];
        assert!(place(&mut spaces, &unit("A", 20.0, 30.0, 20.0, 1.0)));
        // 10×30×20 strip on the right, 30×10×20 strip in front
        assert_eq!(spaces.len(), 2);
        assert!(place(&mut spaces, &unit("B", 10.0, 30.0, 20.0, 1.0)));
        assert!(place(&mut spaces, &unit("C", 5.0, 5.0, 5.0, 1.0)));
        assert!(!place(&mut spaces, &unit("D", 25.0, 25.0, 25.0, 1.0)));
    }
}
