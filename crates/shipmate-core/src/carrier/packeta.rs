//! Packeta: two tiers.
//!
//! The normal tier serves both channels; the extended tier only home
//! delivery. Each channel packs with the loosest tier it allows and parcels
//! beyond the normal tier are billed as oversized.

use crate::carrier::{Carrier, CarrierPolicy, CarrierSettings, SurchargePolicy};
use crate::error::ShippingResult;
use crate::packing::{Parcel, PhysicalLimits, SizeRule, StackPacker};
use crate::rates::WeightTiers;
use crate::types::{Category, Channel};
use crate::units::AtomicUnit;

pub const NORMAL_TIER: PhysicalLimits = PhysicalLimits::new(15.0, 120.0, SizeRule::SumOfSides(150.0));
pub const EXTENDED_TIER: PhysicalLimits = PhysicalLimits::new(30.0, 120.0, SizeRule::Unbounded);

static TIERS: WeightTiers = WeightTiers::new(&[1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0]);

#[derive(Debug, Clone)]
pub struct PacketaPolicy {
    settings: CarrierSettings,
}

impl PacketaPolicy {
    pub fn new(settings: CarrierSettings) -> Self {
        PacketaPolicy { settings }
    }
}

impl CarrierPolicy for PacketaPolicy {
    fn carrier(&self) -> Carrier {
        Carrier::Packeta
    }

    fn channels(&self) -> &'static [Channel] {
        &Channel::ALL
    }

    fn limits(&self, channel: Channel) -> PhysicalLimits {
        let tier = match channel {
            Channel::Pudo => NORMAL_TIER,
            Channel::Hd => EXTENDED_TIER,
        };
        tier.capped(self.settings.weight_cap_override_kg)
    }

    fn pack(&self, channel: Channel, units: &[AtomicUnit]) -> ShippingResult<Vec<Parcel>> {
        StackPacker::new(self.limits(channel)).pack(Carrier::Packeta, channel, units)
    }

    fn category(&self, _channel: Channel, parcel: &Parcel) -> Category {
        if NORMAL_TIER.admits(&parcel.bin_dims, parcel.total_weight_kg) {
            Category::Standard
        } else {
            Category::Oversized
        }
    }

    fn weight_tiers(&self) -> &'static WeightTiers {
        &TIERS
    }

    fn surcharges(&self) -> &SurchargePolicy {
        &self.settings.surcharges
    }
}
