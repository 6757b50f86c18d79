//! # Rate Selector
//!
//! Exact-match tariff lookup.
//!
//! ## Lookup
//! ```text
//! Parcel (12.4 kg, HD, standard, one parcel in order)
//!      │
//!      ▼  WeightTiers::tier_for(12.4) ── ceiling bucket ──► "15"
//!      │
//!      ▼  RateKey { dpd, CZ, HD, standard, "15", one }
//!      │
//!      ▼  RateTable::select ── several rows? keep the cheapest
//!      │
//! ShippingRate { price: 189.00, cod_fee: 35.00, estimate: "1-2 days" }
//! ```
//!
//! A missing row is a configuration gap, reported as `NoRate`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::carrier::Carrier;
use crate::error::{ShippingError, ShippingResult};
use crate::types::{AddressBundle, Category, Channel};
use crate::units::EPSILON;

/// Tier code for weights above every threshold of a carrier.
pub const OVER_LIMIT: &str = "over_limit";

// =============================================================================
// Weight Tiers
// =============================================================================

/// Ascending weight thresholds of one carrier, in kilograms.
#[derive(Debug)]
pub struct WeightTiers {
    thresholds: &'static [f64],
}

impl WeightTiers {
    pub const fn new(thresholds: &'static [f64]) -> Self {
        WeightTiers { thresholds }
    }

    pub fn thresholds(&self) -> &'static [f64] {
        self.thresholds
    }

    /// Smallest threshold that is at least `weight_kg`, printed without
    /// trailing zeros ("10", "31.5"), or [`OVER_LIMIT`].
    ///
    /// ## Example
    /// ```rust
    /// use shipmate_core::rates::WeightTiers;
    ///
    /// static TIERS: WeightTiers = WeightTiers::new(&[1.0, 3.0, 5.0, 31.5]);
    /// assert_eq!(TIERS.tier_for(1.0), "1");
    /// assert_eq!(TIERS.tier_for(1.01), "3");
    /// assert_eq!(TIERS.tier_for(20.0), "31.5");
    /// assert_eq!(TIERS.tier_for(32.0), "over_limit");
    /// ```
    pub fn tier_for(&self, weight_kg: f64) -> String {
        self.thresholds
            .iter()
            .find(|&&threshold| weight_kg <= threshold + EPSILON)
            .map(|threshold| threshold.to_string())
            .unwrap_or_else(|| OVER_LIMIT.to_string())
    }
}

// =============================================================================
// Rate Key
// =============================================================================

/// Unique lookup tuple of a tariff row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateKey {
    pub courier: Carrier,
    pub country: String,
    pub channel: Channel,
    pub category: Category,
    pub weight_tier: String,
    pub address_bundle: AddressBundle,
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.courier,
            self.country,
            self.channel,
            self.category,
            self.weight_tier,
            self.address_bundle
        )
    }
}

// =============================================================================
// Shipping Rate
// =============================================================================

/// One tariff row, prices in the carrier's local currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub courier: Carrier,
    pub country: String,
    pub channel: Channel,
    pub category: Category,
    pub weight_tier: String,
    pub address_bundle: AddressBundle,
    pub price: Decimal,
    #[serde(default)]
    pub cod_fee: Decimal,
    pub estimate: String,
}

impl ShippingRate {
    pub fn key(&self) -> RateKey {
        RateKey {
            courier: self.courier,
            country: self.country.to_ascii_uppercase(),
            channel: self.channel,
            category: self.category,
            weight_tier: self.weight_tier.clone(),
            address_bundle: self.address_bundle,
        }
    }
}

// =============================================================================
// Rate Table
// =============================================================================

/// In-memory tariff table. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rows: HashMap<RateKey, Vec<ShippingRate>>,
    len: usize,
}

impl RateTable {
    pub fn new() -> Self {
        RateTable::default()
    }

    pub fn insert(&mut self, rate: ShippingRate) {
        self.rows.entry(rate.key()).or_default().push(rate);
        self.len += 1;
    }

    /// Number of rows, duplicates included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the cheapest row for `key`.
    pub fn select(&self, key: &RateKey) -> Option<&ShippingRate> {
        self.rows
            .get(key)
            .and_then(|rows| rows.iter().min_by(|a, b| a.price.cmp(&b.price)))
    }

    /// Like [`RateTable::select`] but a miss is a `NoRate` error.
    pub fn require(&self, key: &RateKey) -> ShippingResult<&ShippingRate> {
        self.select(key).ok_or_else(|| ShippingError::NoRate {
            key: key.to_string(),
        })
    }
}

impl FromIterator<ShippingRate> for RateTable {
    fn from_iter<I: IntoIterator<Item = ShippingRate>>(iter: I) -> Self {
        let mut table = RateTable::new();
        for rate in iter {
            table.insert(rate);
        }
        table
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    static DPD: WeightTiers = WeightTiers::new(&[1.0, 3.0, 5.0, 10.0, 15.0, 20.0, 31.5]);

    fn rate(tier: &str, price: i64) -> ShippingRate {
        ShippingRate {
            courier: Carrier::Dpd,
            country: "cz".to_string(),
            channel: Channel::Hd,
            category: Category::Standard,
            weight_tier: tier.to_string(),
            address_bundle: AddressBundle::One,
            price: Decimal::new(price, 2),
            cod_fee: Decimal::ZERO,
            estimate: "1-2 days".to_string(),
        }
    }

    fn key(tier: &str) -> RateKey {
        RateKey {
            courier: Carrier::Dpd,
            country: "CZ".to_string(),
            channel: Channel::Hd,
            category: Category::Standard,
            weight_tier: tier.to_string(),
            address_bundle: AddressBundle::One,
        }
    }

    #[test]
    fn test_ceiling_bucketing() {
        assert_eq!(DPD.tier_for(0.001), "1");
        assert_eq!(DPD.tier_for(3.0), "3");
        assert_eq!(DPD.tier_for(9.99), "10");
        assert_eq!(DPD.tier_for(10.0), "10");
        assert_eq!(DPD.tier_for(20.5), "31.5");
        assert_eq!(DPD.tier_for(31.6), OVER_LIMIT);
    }

    #[test]
    fn test_duplicates_resolve_to_lowest_price() {
        let table: RateTable = vec![rate("10", 15000), rate("10", 13000), rate("10", 14000)]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 3);
        assert_eq!(table.select(&key("10")).unwrap().price, Decimal::new(13000, 2));
    }

    #[test]
    fn test_country_is_case_insensitive_in_rows() {
        let table: RateTable = vec![rate("5", 9900)].into_iter().collect();
        assert!(table.select(&key("5")).is_some());
    }

    #[test]
    fn test_missing_row_is_configuration_gap() {
        let table = RateTable::new();
        let err = table.require(&key("10")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationGap);
        assert_eq!(err.to_string(), "No shipping rate configured for dpd/CZ/HD/standard/10/one");
    }
}
