//! # Single-Carrier Aggregator
//!
//! Runs splitter, rate selector and pricing pipeline for every requested
//! channel of one carrier and ranks the resulting options.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for channel in [PUDO, HD]:                                             │
//! │      parcels = policy.split(channel, units)                             │
//! │      bundle  = one | multi (by parcel count)                            │
//! │      for parcel in parcels:                                             │
//! │          rate  = table.require(policy.rate_key(..))                     │
//! │          price = calculate_price(rate, parcel weight, ..)               │
//! │      option = Σ price, Σ price_with_vat                                 │
//! │                                                                         │
//! │  failed channel  → recorded in `unavailable`                            │
//! │  all channels failed → highest-severity error                           │
//! │  Invariant anywhere → returned immediately                              │
//! │                                                                         │
//! │  rank: price_with_vat ascending, PUDO before HD                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::carrier::CarrierPolicy;
use crate::error::{ShippingError, ShippingResult};
use crate::money::{Money, VatRate};
use crate::packing::Parcel;
use crate::pricing::{calculate_price, PriceBreakdown, PriceInput};
use crate::rates::RateTable;
use crate::types::{AddressBundle, CarrierQuote, Channel, ChannelUnavailable, ShippingOption};
use crate::units::AtomicUnit;

/// Everything a calculation needs besides the order itself.
#[derive(Debug, Clone, Copy)]
pub struct QuoteContext<'a> {
    pub rates: &'a RateTable,
    /// Destination country, uppercase ISO code.
    pub country: &'a str,
    /// Local currency per settlement unit.
    pub exchange_rate: Decimal,
    pub vat: VatRate,
    /// Settlement currency code, e.g. "EUR".
    pub currency: &'a str,
    pub cash_on_delivery: bool,
}

/// Quotes one carrier for the requested channels.
///
/// ## Errors
/// - `Invariant` from any channel, immediately
/// - The highest-severity channel error when no channel could be quoted
pub fn quote_carrier(
    policy: &dyn CarrierPolicy,
    units: &[AtomicUnit],
    channels: &[Channel],
    ctx: &QuoteContext<'_>,
) -> ShippingResult<CarrierQuote> {
    let mut options = Vec::new();
    let mut unavailable = Vec::new();
    let mut worst: Option<ShippingError> = None;

    for &channel in channels {
        match quote_channel(policy, units, channel, ctx) {
            Ok(option) => options.push(option),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                unavailable.push(ChannelUnavailable {
                    channel,
                    kind: err.kind(),
                    reason: err.to_string(),
                });
                let replace = worst
                    .as_ref()
                    .map_or(true, |w| err.kind().severity() > w.kind().severity());
                if replace {
                    worst = Some(err);
                }
            }
        }
    }

    if options.is_empty() {
        return Err(worst.unwrap_or_else(|| {
            ShippingError::UnsupportedChannel {
                carrier: policy.carrier().code().to_string(),
                channel: "none requested".to_string(),
            }
        }));
    }

    rank(&mut options);
    let total_parcels = options.first().map_or(0, |o| o.parcels);
    Ok(CarrierQuote {
        total_parcels,
        options,
        unavailable,
    })
}

/// Prices one channel: split, look up each parcel, sum.
pub fn quote_channel(
    policy: &dyn CarrierPolicy,
    units: &[AtomicUnit],
    channel: Channel,
    ctx: &QuoteContext<'_>,
) -> ShippingResult<ShippingOption> {
    let parcels = policy.split(channel, units)?;
    let bundle = AddressBundle::for_parcel_count(parcels.len());

    let mut price = Money::zero();
    let mut price_with_vat = Money::zero();
    let mut estimate = String::new();
    for parcel in &parcels {
        let (breakdown, parcel_estimate) = price_parcel(policy, parcel, channel, bundle, ctx)?;
        price = price + breakdown.price;
        price_with_vat = price_with_vat + breakdown.price_with_vat;
        if estimate.is_empty() {
            estimate = parcel_estimate.to_string();
        }
    }

    Ok(ShippingOption {
        service: policy.service_name(channel),
        channel,
        courier: policy.carrier(),
        price: price.amount(),
        price_with_vat: price_with_vat.amount(),
        currency: ctx.currency.to_string(),
        estimate,
        parcels: parcels.len(),
    })
}

fn price_parcel<'a>(
    policy: &dyn CarrierPolicy,
    parcel: &Parcel,
    channel: Channel,
    bundle: AddressBundle,
    ctx: &QuoteContext<'a>,
) -> ShippingResult<(PriceBreakdown, &'a str)> {
    let key = policy.rate_key(ctx.country, channel, parcel, bundle);
    let rate = ctx.rates.require(&key)?;
    let input = PriceInput {
        base: rate.price,
        weight_kg: parcel.total_weight_kg,
        surcharges: policy.surcharges(),
        cod_fee: ctx.cash_on_delivery.then_some(rate.cod_fee),
    };
    let breakdown = calculate_price(&input, ctx.exchange_rate, ctx.vat)?;
    Ok((breakdown, rate.estimate.as_str()))
}

/// Cheapest VAT-inclusive price first; pick-up before home on ties.
pub fn rank(options: &mut [ShippingOption]) {
    options.sort_by(|a, b| {
        a.price_with_vat
            .cmp(&b.price_with_vat)
            .then(a.channel.cmp(&b.channel))
    });
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::{policy_for, Carrier, CarrierSettings};
    use crate::error::ErrorKind;
    use crate::rates::ShippingRate;
    use crate::types::Category;
    use crate::units::VariantPhysical;

    fn row(
        carrier: Carrier,
        channel: Channel,
        category: Category,
        tier: &str,
        bundle: AddressBundle,
        price: i64,
    ) -> ShippingRate {
        ShippingRate {
            courier: carrier,
            country: "CZ".into(),
            channel,
            category,
            weight_tier: tier.into(),
            address_bundle: bundle,
            price: Decimal::new(price, 2),
            cod_fee: Decimal::new(3500, 2),
            estimate: "1-2 days".into(),
        }
    }

    fn ctx(rates: &RateTable) -> QuoteContext<'_> {
        QuoteContext {
            rates,
            country: "CZ",
            exchange_rate: Decimal::new(250, 1),
            vat: VatRate::from_bps(2100),
            currency: "EUR",
            cash_on_delivery: false,
        }
    }

    fn unit(sku: &str, l: f64, w: f64, h: f64, kg: f64) -> AtomicUnit {
        AtomicUnit::new(sku, VariantPhysical::new(l, w, h, kg))
    }

    fn packeta() -> Box<dyn CarrierPolicy> {
        policy_for(Carrier::Packeta, &CarrierSettings::defaults_for(Carrier::Packeta))
    }

    #[test]
    fn test_worked_example_home_delivery() {
        let rates: RateTable = vec![row(Carrier::Packeta, Channel::Hd, Category::Standard, "10", AddressBundle::One, 13000)]
            .into_iter()
            .collect();
        let units = vec![unit("KETTLE", 30.0, 25.0, 20.0, 7.2)];

        let quote = quote_carrier(packeta().as_ref(), &units, &[Channel::Hd], &ctx(&rates)).unwrap();
        assert_eq!(quote.total_parcels, 1);
        let option = quote.best().unwrap();
        assert_eq!(option.price.to_string(), "5.20");
        assert_eq!(option.price_with_vat.to_string(), "6.29");
        assert_eq!(option.service, "Packeta Home Delivery");
    }

    #[test]
    fn test_ranking_prefers_pickup_on_tie() {
        let rates: RateTable = vec![
            row(Carrier::Packeta, Channel::Hd, Category::Standard, "10", AddressBundle::One, 13000),
            row(Carrier::Packeta, Channel::Pudo, Category::Standard, "10", AddressBundle::One, 13000),
        ]
        .into_iter()
        .collect();
        let units = vec![unit("KETTLE", 30.0, 25.0, 20.0, 7.2)];

        let quote = quote_carrier(packeta().as_ref(), &units, &Channel::ALL, &ctx(&rates)).unwrap();
        assert_eq!(quote.options.len(), 2);
        assert_eq!(quote.options[0].channel, Channel::Pudo);
        assert_eq!(quote.options[1].channel, Channel::Hd);
    }

    #[test]
    fn test_multi_parcel_sums_prices() {
        let rates: RateTable = vec![row(Carrier::Packeta, Channel::Pudo, Category::Standard, "10", AddressBundle::Multi, 13000)]
            .into_iter()
            .collect();
        // 3 × 8 kg: the 15 kg pickup tier holds one unit per parcel
        let units: Vec<_> = (0..3).map(|_| unit("BAG", 30.0, 20.0, 20.0, 8.0)).collect();

        let quote = quote_carrier(packeta().as_ref(), &units, &[Channel::Pudo], &ctx(&rates)).unwrap();
        assert_eq!(quote.total_parcels, 3);
        let option = quote.option(Channel::Pudo).unwrap();
        assert_eq!(option.price.to_string(), "15.60");
        assert_eq!(option.price_with_vat.to_string(), "18.87");
    }

    #[test]
    fn test_failed_channel_is_recorded() {
        let rates: RateTable = vec![row(Carrier::Packeta, Channel::Hd, Category::Oversized, "20", AddressBundle::One, 25000)]
            .into_iter()
            .collect();
        let units = vec![unit("TV", 100.0, 60.0, 15.0, 18.0)];

        let quote = quote_carrier(packeta().as_ref(), &units, &Channel::ALL, &ctx(&rates)).unwrap();
        assert_eq!(quote.options.len(), 1);
        assert_eq!(quote.unavailable.len(), 1);
        assert_eq!(quote.unavailable[0].channel, Channel::Pudo);
        assert_eq!(quote.unavailable[0].kind, ErrorKind::PermanentPacking);
    }

    #[test]
    fn test_all_channels_failed_reports_configuration_gap_first() {
        let rates = RateTable::new();
        let units = vec![unit("TV", 100.0, 60.0, 15.0, 18.0)];

        // PUDO: too heavy, HD: no tariff row
        let err = quote_carrier(packeta().as_ref(), &units, &Channel::ALL, &ctx(&rates)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationGap);
    }

    #[test]
    fn test_cash_on_delivery_adds_fee() {
        let rates: RateTable = vec![row(Carrier::Packeta, Channel::Hd, Category::Standard, "10", AddressBundle::One, 13000)]
            .into_iter()
            .collect();
        let units = vec![unit("KETTLE", 30.0, 25.0, 20.0, 7.2)];
        let mut context = ctx(&rates);
        context.cash_on_delivery = true;

        let quote = quote_carrier(packeta().as_ref(), &units, &[Channel::Hd], &context).unwrap();
        // (130 + 35) / 25 = 6.60 → 7.99 with VAT
        assert_eq!(quote.options[0].price.to_string(), "6.60");
        assert_eq!(quote.options[0].price_with_vat.to_string(), "7.99");
    }

    #[test]
    fn test_dpd_heavy_sku_has_no_options() {
        let rates = RateTable::new();
        let units = vec![unit("SOFA-3", 60.0, 40.0, 30.0, 35.0)];
        let dpd = policy_for(Carrier::Dpd, &CarrierSettings::defaults_for(Carrier::Dpd));

        let err = quote_carrier(dpd.as_ref(), &units, &[Channel::Pudo], &ctx(&rates)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermanentPacking);
    }
}
