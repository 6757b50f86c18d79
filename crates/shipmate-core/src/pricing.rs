//! # Pricing Pipeline
//!
//! Turns one tariff row into a VAT-inclusive price in the settlement
//! currency. The stages run in a fixed order and each result is rounded
//! half-up to two decimals before the next stage sees it.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │ Stage 1  local  = base + fuel% of base + ceil(kg) × toll [+ COD fee]  │
//! │ Stage 2  net    = local / exchange rate                               │
//! │ Stage 3  gross  = net × (1 + VAT)                                     │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reordering the stages changes the result; see
//! `test_stage_order_matters`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::carrier::SurchargePolicy;
use crate::error::{ShippingError, ShippingResult};
use crate::money::{Money, VatRate};

/// Every intermediate amount of one priced parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base: Money,
    pub fuel: Money,
    pub toll: Money,
    pub cod_fee: Money,
    /// Stage 1, local currency.
    pub local_total: Money,
    /// Stage 2, settlement currency before VAT.
    pub price: Money,
    /// Stage 3.
    pub price_with_vat: Money,
}

/// Inputs of a single parcel price.
#[derive(Debug, Clone)]
pub struct PriceInput<'a> {
    pub base: Decimal,
    pub weight_kg: f64,
    pub surcharges: &'a SurchargePolicy,
    /// `Some` when cash on delivery was requested.
    pub cod_fee: Option<Decimal>,
}

// =============================================================================
// Stages
// =============================================================================

/// Stage 1 result with its components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTotal {
    pub base: Money,
    pub fuel: Money,
    pub toll: Money,
    pub cod_fee: Money,
    pub total: Money,
}

/// Stage 1: base price plus surcharges in local currency.
pub fn local_total(input: &PriceInput<'_>) -> LocalTotal {
    let base = Money::new(input.base);
    let fuel = base.percentage(input.surcharges.fuel_pct);
    let toll = Money::new(Decimal::from(billable_kg(input.weight_kg)) * input.surcharges.toll_per_kg);
    let cod_fee = input.cod_fee.map(Money::new).unwrap_or_default();
    LocalTotal {
        base,
        fuel,
        toll,
        cod_fee,
        total: base + fuel + toll + cod_fee,
    }
}

/// Stage 2: local currency divided by the exchange rate.
///
/// ## Errors
/// - `Invariant` for a zero or negative rate; the rate provider never
///   hands one out
pub fn convert(local: Money, rate: Decimal) -> ShippingResult<Money> {
    local
        .convert(rate)
        .ok_or_else(|| ShippingError::invariant(format!("non-positive exchange rate {rate}")))
}

/// Stage 3: VAT on the converted price.
pub fn apply_vat(price: Money, vat: VatRate) -> Money {
    price.with_vat(vat)
}

/// Runs all three stages for one parcel.
pub fn calculate_price(
    input: &PriceInput<'_>,
    exchange_rate: Decimal,
    vat: VatRate,
) -> ShippingResult<PriceBreakdown> {
    let local = local_total(input);
    let price = convert(local.total, exchange_rate)?;
    let price_with_vat = apply_vat(price, vat);
    Ok(PriceBreakdown {
        base: local.base,
        fuel: local.fuel,
        toll: local.toll,
        cod_fee: local.cod_fee,
        local_total: local.total,
        price,
        price_with_vat,
    })
}

/// Started kilograms billed by the toll (0.2 kg bills as 1).
fn billable_kg(weight_kg: f64) -> u32 {
    let kg = weight_kg.max(0.0).ceil();
    if kg >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        kg as u32
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
