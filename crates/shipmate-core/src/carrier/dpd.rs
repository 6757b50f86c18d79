//! DPD: carton catalog packing with pickup and home profiles.

use crate::cartons::{dpd_home, dpd_pickup};
use crate::carrier::{Carrier, CarrierPolicy, CarrierSettings, SurchargePolicy};
use crate::error::ShippingResult;
use crate::packing::{CartonPacker, Parcel, PhysicalLimits, SizeRule};
use crate::rates::WeightTiers;
use crate::types::{Category, Channel};
use crate::units::AtomicUnit;

pub const PICKUP_LIMITS: PhysicalLimits = PhysicalLimits::new(20.0, 100.0, SizeRule::Girth(250.0));
pub const HOME_LIMITS: PhysicalLimits = PhysicalLimits::new(31.5, 175.0, SizeRule::Girth(300.0));

static TIERS: WeightTiers = WeightTiers::new(&[1.0, 3.0, 5.0, 10.0, 15.0, 20.0, 31.5]);

#[derive(Debug, Clone)]
pub struct DpdPolicy {
    settings: CarrierSettings,
}

impl DpdPolicy {
    pub fn new(settings: CarrierSettings) -> Self {
        DpdPolicy { settings }
    }

    fn packer(&self, channel: Channel) -> CartonPacker {
        let catalog = match channel {
            Channel::Pudo => dpd_pickup(),
            Channel::Hd => dpd_home(),
        };
        CartonPacker::new(catalog, self.limits(channel))
    }
}

impl CarrierPolicy for DpdPolicy {
    fn carrier(&self) -> Carrier {
        Carrier::Dpd
    }

    fn channels(&self) -> &'static [Channel] {
        &Channel::ALL
    }

    fn limits(&self, channel: Channel) -> PhysicalLimits {
        let profile = match channel {
            Channel::Pudo => PICKUP_LIMITS,
            Channel::Hd => HOME_LIMITS,
        };
        profile.capped(self.settings.weight_cap_override_kg)
    }

    fn pack(&self, channel: Channel, units: &[AtomicUnit]) -> ShippingResult<Vec<Parcel>> {
        self.packer(channel).pack(Carrier::Dpd, channel, units)
    }

    /// Home parcels that would not pass as pickup parcels are oversized.
    fn category(&self, channel: Channel, parcel: &Parcel) -> Category {
        match channel {
            Channel::Pudo => Category::Standard,
            Channel::Hd if PICKUP_LIMITS.admits(&parcel.bin_dims, parcel.total_weight_kg) => {
                Category::Standard
            }
            Channel::Hd => Category::Oversized,
        }
    }

    fn weight_tiers(&self) -> &'static WeightTiers {
        &TIERS
    }

    fn surcharges(&self) -> &SurchargePolicy {
        &self.settings.surcharges
    }
}
