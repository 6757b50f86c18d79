//! # Domain Types
//!
//! Core domain types shared by the splitter, the rate selector and the
//! aggregator.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │     Parcel      │   │ ShippingOption  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku            │──►│  contents       │──►│  service        │       │
//! │  │  quantity ≥ 1   │   │  total_weight   │   │  price          │       │
//! │  └─────────────────┘   │  bin_dims       │   │  priceWithVat   │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Channel      │   │    Category     │   │  AddressBundle  │       │
//! │  │  PUDO | HD      │   │ standard |      │   │  one | multi    │       │
//! │  │                 │   │ oversized       │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::carrier::Carrier;
use crate::error::ValidationError;

// =============================================================================
// Line Item
// =============================================================================

/// One purchased SKU and its quantity. Immutable input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        LineItem {
            sku: sku.into(),
            quantity,
        }
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Delivery channel: pick-up/drop-off point or home delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "PUDO")]
    Pudo,
    #[serde(rename = "HD")]
    Hd,
}

impl Channel {
    /// Both channels, pick-up first (the ranking tie-break order).
    pub const ALL: [Channel; 2] = [Channel::Pudo, Channel::Hd];

    /// Tariff code as it appears in rate files.
    pub fn code(&self) -> &'static str {
        match self {
            Channel::Pudo => "PUDO",
            Channel::Hd => "HD",
        }
    }

    /// Human label used in service names.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Pudo => "Pickup Point",
            Channel::Hd => "Home Delivery",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Channel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PUDO" | "PICKUP" => Ok(Channel::Pudo),
            "HD" | "HOME" => Ok(Channel::Hd),
            _ => Err(ValidationError::NotAllowed {
                field: "channel".to_string(),
                allowed: vec!["PUDO".to_string(), "HD".to_string()],
            }),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// Tariff category of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Standard,
    Oversized,
}

impl Category {
    pub fn code(&self) -> &'static str {
        match self {
            Category::Standard => "standard",
            Category::Oversized => "oversized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Category::Standard),
            "oversized" => Ok(Category::Oversized),
            _ => Err(ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: vec!["standard".to_string(), "oversized".to_string()],
            }),
        }
    }
}

// =============================================================================
// Address Bundle
// =============================================================================

/// Whether the order ships as a single parcel or as several parcels
/// bundled to the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressBundle {
    One,
    Multi,
}

impl AddressBundle {
    /// Bundle tariff for an order split into `parcel_count` parcels.
    pub fn for_parcel_count(parcel_count: usize) -> Self {
        if parcel_count > 1 {
            AddressBundle::Multi
        } else {
            AddressBundle::One
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AddressBundle::One => "one",
            AddressBundle::Multi => "multi",
        }
    }
}

impl fmt::Display for AddressBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AddressBundle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one" | "single" => Ok(AddressBundle::One),
            "multi" | "multiple" => Ok(AddressBundle::Multi),
            _ => Err(ValidationError::NotAllowed {
                field: "address_bundle".to_string(),
                allowed: vec!["one".to_string(), "multi".to_string()],
            }),
        }
    }
}

// =============================================================================
// Destination
// =============================================================================

/// Where the order is going.
///
/// At least one of `country` or `pickup_point_id` must be set; a pickup
/// point resolves to its country through the local directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub pickup_point_id: Option<String>,
}

// =============================================================================
// Quote Output
// =============================================================================

/// Final output unit: one priced delivery option of one carrier.
///
/// When an order splits into N parcels, `price` and `price_with_vat` are the
/// sums over all N parcels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub service: String,
    pub channel: Channel,
    pub courier: Carrier,
    pub price: Decimal,
    pub price_with_vat: Decimal,
    pub currency: String,
    pub estimate: String,
    pub parcels: usize,
}

/// A channel the carrier could not offer for this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUnavailable {
    pub channel: Channel,
    pub kind: crate::error::ErrorKind,
    pub reason: String,
}

/// Single-carrier result: ranked options, cheapest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierQuote {
    pub total_parcels: usize,
    pub options: Vec<ShippingOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<ChannelUnavailable>,
}

impl CarrierQuote {
    /// Returns the cheapest option (first after ranking).
    pub fn best(&self) -> Option<&ShippingOption> {
        self.options.first()
    }

    /// Returns the option for a channel, if the carrier offered it.
    pub fn option(&self, channel: Channel) -> Option<&ShippingOption> {
        self.options.iter().find(|o| o.channel == channel)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
