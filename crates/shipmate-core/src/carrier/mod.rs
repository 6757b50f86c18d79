//! # Carriers
//!
//! The closed set of supported couriers and the policy each one applies:
//! which packer it uses, its physical limits, tariff categories, weight
//! tiers and surcharges.
//!
//! ## Policy Map
//! ```text
//! ┌──────────┬──────────────────────┬──────────────────────┬─────────────────┐
//! │ Carrier  │ Packer               │ Limits               │ Category        │
//! ├──────────┼──────────────────────┼──────────────────────┼─────────────────┤
//! │ DPD      │ CartonPacker         │ PUDO 20 kg/100/g250  │ HD parcel over  │
//! │          │ (pickup/home boxes)  │ HD 31.5 kg/175/g300  │ pickup profile  │
//! │          │                      │ + carrier-wide cap   │ → oversized     │
//! ├──────────┼──────────────────────┼──────────────────────┼─────────────────┤
//! │ GLS      │ StackPacker          │ 31.5 kg/120/Σ300     │ side > 100 →    │
//! │          │                      │                      │ oversized       │
//! ├──────────┼──────────────────────┼──────────────────────┼─────────────────┤
//! │ Packeta  │ StackPacker          │ PUDO 15 kg/120/Σ150  │ over normal     │
//! │          │                      │ HD 30 kg/120         │ tier → oversized│
//! └──────────┴──────────────────────┴──────────────────────┴─────────────────┘
//! ```
//!
//! Adding a carrier means adding an enum variant; [`policy_for`] matches
//! exhaustively, so the compiler points at every place that needs a policy.

mod dpd;
mod gls;
mod packeta;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ShippingError, ShippingResult, ValidationError};
use crate::packing::{verify_packing, Parcel, PhysicalLimits};
use crate::rates::{RateKey, WeightTiers};
use crate::types::{AddressBundle, Category, Channel};
use crate::units::AtomicUnit;

pub use dpd::DpdPolicy;
pub use gls::GlsPolicy;
pub use packeta::PacketaPolicy;

// =============================================================================
// Carrier
// =============================================================================

/// Supported couriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Dpd,
    Gls,
    Packeta,
}

impl Carrier {
    pub const ALL: [Carrier; 3] = [Carrier::Dpd, Carrier::Gls, Carrier::Packeta];

    /// Courier code used in tariff files and responses.
    pub fn code(&self) -> &'static str {
        match self {
            Carrier::Dpd => "dpd",
            Carrier::Gls => "gls",
            Carrier::Packeta => "packeta",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Carrier::Dpd => "DPD",
            Carrier::Gls => "GLS",
            Carrier::Packeta => "Packeta",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Carrier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dpd" => Ok(Carrier::Dpd),
            "gls" => Ok(Carrier::Gls),
            "packeta" | "zasilkovna" => Ok(Carrier::Packeta),
            _ => Err(ValidationError::NotAllowed {
                field: "courier".to_string(),
                allowed: Carrier::ALL.iter().map(|c| c.code().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Carrier Settings
// =============================================================================

/// Surcharges added to the base tariff in local currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurchargePolicy {
    /// Fuel surcharge as a percentage of the base price (12.5 = 12.5 %).
    #[serde(default)]
    pub fuel_pct: Decimal,
    /// Toll per started kilogram.
    #[serde(default)]
    pub toll_per_kg: Decimal,
}

impl SurchargePolicy {
    pub fn none() -> Self {
        SurchargePolicy {
            fuel_pct: Decimal::ZERO,
            toll_per_kg: Decimal::ZERO,
        }
    }
}

/// Operator-tunable parameters of one carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierSettings {
    #[serde(default = "SurchargePolicy::none")]
    pub surcharges: SurchargePolicy,
    /// Carrier-wide weight cap applied on top of the profile limits.
    /// `None` (or omitted) disables it.
    #[serde(default)]
    pub weight_cap_override_kg: Option<f64>,
}

impl CarrierSettings {
    /// Built-in settings for a carrier.
    pub fn defaults_for(carrier: Carrier) -> Self {
        match carrier {
            Carrier::Dpd => CarrierSettings {
                surcharges: SurchargePolicy {
                    fuel_pct: Decimal::new(125, 1),
                    toll_per_kg: Decimal::new(190, 2),
                },
                weight_cap_override_kg: Some(20.0),
            },
            Carrier::Gls => CarrierSettings {
                surcharges: SurchargePolicy {
                    fuel_pct: Decimal::from(9),
                    toll_per_kg: Decimal::new(125, 2),
                },
                weight_cap_override_kg: None,
            },
            Carrier::Packeta => CarrierSettings {
                surcharges: SurchargePolicy::none(),
                weight_cap_override_kg: None,
            },
        }
    }
}

// =============================================================================
// Carrier Policy
// =============================================================================

/// Everything that differs between carriers.
///
/// Implementations are stateless apart from their settings and are shared
/// across calculations.
pub trait CarrierPolicy: Send + Sync {
    fn carrier(&self) -> Carrier;

    /// Channels this carrier offers, pick-up first.
    fn channels(&self) -> &'static [Channel];

    /// Effective limits for a channel, including any weight cap override.
    fn limits(&self, channel: Channel) -> PhysicalLimits;

    /// Packs units for a channel. Callers go through [`CarrierPolicy::split`].
    fn pack(&self, channel: Channel, units: &[AtomicUnit]) -> ShippingResult<Vec<Parcel>>;

    /// Tariff category of a packed parcel.
    fn category(&self, channel: Channel, parcel: &Parcel) -> Category;

    fn weight_tiers(&self) -> &'static WeightTiers;

    fn surcharges(&self) -> &SurchargePolicy;

    fn supports(&self, channel: Channel) -> bool {
        self.channels().contains(&channel)
    }

    /// Splits units into verified parcels for a channel.
    ///
    /// ## Errors
    /// - `UnsupportedChannel` when the carrier does not offer the channel
    /// - `UnitTooLarge` from the packer
    /// - `Invariant` when the packer output fails verification
    fn split(&self, channel: Channel, units: &[AtomicUnit]) -> ShippingResult<Vec<Parcel>> {
        if !self.supports(channel) {
            return Err(ShippingError::UnsupportedChannel {
                carrier: self.carrier().code().to_string(),
                channel: channel.code().to_string(),
            });
        }
        let parcels = self.pack(channel, units)?;
        verify_packing(units, &parcels, &self.limits(channel))?;
        Ok(parcels)
    }

    /// Tariff lookup key for one parcel.
    fn rate_key(
        &self,
        country: &str,
        channel: Channel,
        parcel: &Parcel,
        bundle: AddressBundle,
    ) -> RateKey {
        RateKey {
            courier: self.carrier(),
            country: country.to_string(),
            channel,
            category: self.category(channel, parcel),
            weight_tier: self.weight_tiers().tier_for(parcel.total_weight_kg),
            address_bundle: bundle,
        }
    }

    /// Human-readable service name, e.g. "DPD Pickup Point".
    fn service_name(&self, channel: Channel) -> String {
        format!("{} {}", self.carrier().display_name(), channel.label())
    }
}

/// Returns the policy for a carrier.
pub fn policy_for(carrier: Carrier, settings: &CarrierSettings) -> Box<dyn CarrierPolicy> {
    match carrier {
        Carrier::Dpd => Box::new(DpdPolicy::new(settings.clone())),
        Carrier::Gls => Box::new(GlsPolicy::new(settings.clone())),
        Carrier::Packeta => Box::new(PacketaPolicy::new(settings.clone())),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
