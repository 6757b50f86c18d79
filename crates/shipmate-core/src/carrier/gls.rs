//! GLS: single stack per parcel, same limits for both channels.

use crate::carrier::{Carrier, CarrierPolicy, CarrierSettings, SurchargePolicy};
use crate::error::ShippingResult;
use crate::packing::{Parcel, PhysicalLimits, SizeRule, StackPacker};
use crate::rates::WeightTiers;
use crate::types::{Category, Channel};
use crate::units::AtomicUnit;

pub const LIMITS: PhysicalLimits = PhysicalLimits::new(31.5, 120.0, SizeRule::SumOfSides(300.0));

/// Parcels with a side longer than this are billed as oversized.
pub const STANDARD_MAX_SIDE_CM: f64 = 100.0;

static TIERS: WeightTiers = WeightTiers::new(&[1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 25.0, 31.5]);

#[derive(Debug, Clone)]
pub struct GlsPolicy {
    settings: CarrierSettings,
}

impl GlsPolicy {
    pub fn new(settings: CarrierSettings) -> Self {
        GlsPolicy { settings }
    }
}

impl CarrierPolicy for GlsPolicy {
    fn carrier(&self) -> Carrier {
        Carrier::Gls
    }

    fn channels(&self) -> &'static [Channel] {
        &Channel::ALL
    }

    fn limits(&self, _channel: Channel) -> PhysicalLimits {
        LIMITS.capped(self.settings.weight_cap_override_kg)
    }

    fn pack(&self, channel: Channel, units: &[AtomicUnit]) -> ShippingResult<Vec<Parcel>> {
        StackPacker::new(self.limits(channel)).pack(Carrier::Gls, channel, units)
    }

    fn category(&self, _channel: Channel, parcel: &Parcel) -> Category {
        if parcel.bin_dims.longest() > STANDARD_MAX_SIDE_CM {
            Category::Oversized
        } else {
            Category::Standard
        }
    }

    fn weight_tiers(&self) -> &'static WeightTiers {
        &TIERS
    }

    fn surcharges(&self) -> &SurchargePolicy {
        &self.settings.surcharges
    }
}
