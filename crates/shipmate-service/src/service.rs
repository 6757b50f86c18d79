//! # Shipping Service
//!
//! Multi-carrier quoting: resolves the destination, fetches the exchange
//! rate once, then quotes every requested carrier independently.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  QuoteRequest                                                           │
//! │      │                                                                  │
//! │      ├── destination ──► country (pickup point directory or explicit)   │
//! │      │                   postal code ──► PostalResolver                 │
//! │      │                                   rejected → InvalidPostalCode   │
//! │      │                                                                  │
//! │      ├── ExchangeRateProvider::get_rate()      (never fails)            │
//! │      │                                                                  │
//! │      ├── explode items into atomic units                                │
//! │      │                                                                  │
//! │      └── for carrier in couriers:                                       │
//! │              quote_carrier(policy, units, channels)                     │
//! │                  Ok          → couriers[code] = {totalParcels, options} │
//! │                  Invariant   → whole request fails                      │
//! │                  other Err   → couriers[code] = {error, kind}           │
//! │                                                                         │
//! │  CombinedQuote { couriers, meta }                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shipmate_core::postal::PostalResolution;
use shipmate_core::quote::{quote_carrier, QuoteContext};
use shipmate_core::units::explode;
use shipmate_core::validation::validate_country_code;
use shipmate_core::{
    policy_for, Carrier, CarrierQuote, Channel, Destination, ErrorKind, ExchangeRateOrigin, LineItem,
    RateTable, ShippingError, ValidationError,
};
use shipmate_data::{load_rate_table, PickupPointDirectory, PostalDirectory, VariantCatalog};

use crate::config::{CarriersConfig, DataSettings, PricingSettings, ShipmateConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::exchange::ExchangeRateProvider;
use crate::postal::PostalResolver;

// =============================================================================
// Request / Response
// =============================================================================

/// One multi-carrier quote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub items: Vec<LineItem>,
    pub destination: Destination,
    /// Carriers to quote; empty means all.
    #[serde(default)]
    pub couriers: Vec<Carrier>,
    /// Channels to quote; empty means every channel the carrier offers.
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub cash_on_delivery: bool,
}

/// Per-carrier result inside a [`CombinedQuote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CourierOutcome {
    Quoted(CarrierQuote),
    Failed { error: String, kind: ErrorKind },
}

impl CourierOutcome {
    fn failed(err: &ShippingError) -> Self {
        CourierOutcome::Failed {
            error: err.to_string(),
            kind: err.kind(),
        }
    }

    pub fn quote(&self) -> Option<&CarrierQuote> {
        match self {
            CourierOutcome::Quoted(quote) => Some(quote),
            CourierOutcome::Failed { .. } => None,
        }
    }
}

/// Inputs every carrier in a [`CombinedQuote`] was priced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteMeta {
    pub quote_id: Uuid,
    pub country: String,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub exchange_rate_source: ExchangeRateOrigin,
    pub vat_bps: u32,
    pub calculated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal: Option<PostalResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_point_id: Option<String>,
}

/// Multi-carrier response, keyed by carrier code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedQuote {
    pub couriers: BTreeMap<String, CourierOutcome>,
    pub meta: QuoteMeta,
}

// =============================================================================
// Service Data
// =============================================================================

/// Operator data shared by every request; read-only after loading.
#[derive(Debug, Clone)]
pub struct ServiceData {
    pub rates: Arc<RateTable>,
    pub variants: Arc<VariantCatalog>,
    pub pickup_points: Arc<PickupPointDirectory>,
}

impl ServiceData {
    /// Loads tariffs, variants and (if present) pickup points.
    pub fn load(settings: &DataSettings) -> ServiceResult<Self> {
        let rates = load_rate_table(&settings.rates)?;
        let variants = VariantCatalog::load(&settings.variants)?;
        let pickup_points = load_pickup_points(&settings.pickup_points)?;

        Ok(ServiceData {
            rates: Arc::new(rates),
            variants: Arc::new(variants),
            pickup_points: Arc::new(pickup_points),
        })
    }
}

fn load_pickup_points(path: &Path) -> ServiceResult<PickupPointDirectory> {
    if path.exists() {
        Ok(PickupPointDirectory::load(path)?)
    } else {
        warn!(path = %path.display(), "No pickup point file, pickup point destinations disabled");
        Ok(PickupPointDirectory::new())
    }
}

// =============================================================================
// Shipping Service
// =============================================================================

/// Quotes orders against every configured carrier.
pub struct ShippingService {
    data: ServiceData,
    exchange: ExchangeRateProvider,
    postal: PostalResolver,
    pricing: PricingSettings,
    carriers: CarriersConfig,
}

impl ShippingService {
    pub fn new(
        config: &ShipmateConfig,
        data: ServiceData,
        exchange: ExchangeRateProvider,
        postal: PostalResolver,
    ) -> Self {
        ShippingService {
            data,
            exchange,
            postal,
            pricing: config.pricing.clone(),
            carriers: config.carriers.clone(),
        }
    }

    /// Loads data files and builds the upstream clients from configuration.
    pub fn from_config(config: &ShipmateConfig) -> ServiceResult<Self> {
        let data = ServiceData::load(&config.data)?;
        let exchange = ExchangeRateProvider::from_settings(&config.exchange)?;
        let directory = Arc::new(PostalDirectory::new(&config.data.postal_dir));
        directory.preload()?;
        let postal = PostalResolver::from_settings(directory, &config.postal)?;

        info!(
            rates = data.rates.len(),
            variants = data.variants.len(),
            pickup_points = data.pickup_points.len(),
            "Shipping service ready"
        );
        Ok(Self::new(config, data, exchange, postal))
    }

    /// Quotes all requested carriers.
    ///
    /// ## Errors
    /// - Input errors about the destination (unknown pickup point, missing
    ///   or malformed country, rejected postal code)
    /// - `Invariant` from any carrier: the packing logic is broken
    ///
    /// Everything else is reported per carrier inside the result.
    pub async fn quote(&self, request: &QuoteRequest) -> ServiceResult<CombinedQuote> {
        let quote_id = Uuid::new_v4();
        let country = self.destination_country(&request.destination)?;

        let postal = match request.destination.postal_code.as_deref() {
            Some(code) if !code.trim().is_empty() => {
                let check = self.postal.resolve(&country, code).await;
                if check.is_rejected() {
                    return Err(ShippingError::InvalidPostalCode {
                        country: country.clone(),
                        postal_code: code.trim().to_string(),
                        reason: check.resolution.error.unwrap_or_default(),
                    }
                    .into());
                }
                Some(check.resolution)
            }
            _ => None,
        };

        let exchange = self.exchange.get_rate().await;
        let ctx = QuoteContext {
            rates: &self.data.rates,
            country: &country,
            exchange_rate: exchange.rate,
            vat: self.pricing.vat(),
            currency: &self.pricing.currency,
            cash_on_delivery: request.cash_on_delivery,
        };

        let units = explode(&request.items, self.data.variants.as_ref());
        let mut couriers = BTreeMap::new();
        for carrier in requested_carriers(&request.couriers) {
            let outcome = match &units {
                Ok(units) => {
                    let policy = policy_for(carrier, self.carriers.settings(carrier));
                    let channels = if request.channels.is_empty() {
                        policy.channels().to_vec()
                    } else {
                        request.channels.clone()
                    };
                    match quote_carrier(policy.as_ref(), units, &channels, &ctx) {
                        Ok(quote) => {
                            debug!(%quote_id, courier = carrier.code(), parcels = quote.total_parcels, "Carrier quoted");
                            CourierOutcome::Quoted(quote)
                        }
                        Err(err) if err.is_fatal() => {
                            error!(%quote_id, courier = carrier.code(), error = %err, "Packing invariant violated");
                            return Err(err.into());
                        }
                        Err(err) => {
                            debug!(%quote_id, courier = carrier.code(), kind = %err.kind(), error = %err, "Carrier unavailable");
                            CourierOutcome::failed(&err)
                        }
                    }
                }
                Err(err) => CourierOutcome::failed(err),
            };
            couriers.insert(carrier.code().to_string(), outcome);
        }

        let quoted = couriers.values().filter(|o| o.quote().is_some()).count();
        info!(
            %quote_id,
            country = %country,
            couriers = couriers.len(),
            quoted,
            exchange_rate = %exchange.rate,
            "Quote calculated"
        );

        Ok(CombinedQuote {
            couriers,
            meta: QuoteMeta {
                quote_id,
                country,
                currency: self.pricing.currency.clone(),
                exchange_rate: exchange.rate,
                exchange_rate_source: exchange.origin,
                vat_bps: self.pricing.vat_bps,
                calculated_at: Utc::now(),
                postal,
                pickup_point_id: request.destination.pickup_point_id.clone(),
            },
        })
    }

    /// Country from the pickup point if one is given, else the explicit one.
    fn destination_country(&self, destination: &Destination) -> ServiceResult<String> {
        let explicit = destination
            .country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(validate_country_code)
            .transpose()
            .map_err(ShippingError::from)?;

        let Some(point_id) = destination.pickup_point_id.as_deref().filter(|p| !p.trim().is_empty()) else {
            return explicit.ok_or_else(|| {
                ServiceError::from(ShippingError::from(ValidationError::Required {
                    field: "destination.country".to_string(),
                }))
            });
        };

        let point_country = self
            .data
            .pickup_points
            .country_of(point_id)
            .ok_or_else(|| ShippingError::UnknownPickupPoint(point_id.trim().to_string()))?;

        match explicit {
            Some(country) if country != point_country => {
                Err(ShippingError::from(ValidationError::InvalidFormat {
                    field: "destination.country".to_string(),
                    reason: format!("pickup point {} is in {point_country}, not {country}", point_id.trim()),
                })
                .into())
            }
            _ => Ok(point_country.to_string()),
        }
    }
}

/// Requested carriers in a stable order without duplicates.
fn requested_carriers(requested: &[Carrier]) -> Vec<Carrier> {
    if requested.is_empty() {
        return Carrier::ALL.to_vec();
    }
    let mut carriers = requested.to_vec();
    carriers.sort();
    carriers.dedup();
    carriers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeSettings;
    use crate::exchange::RateSource;
    use async_trait::async_trait;
    use shipmate_core::cache::{Clock, SystemClock, TtlCache};
    use shipmate_core::money::ExchangeRate;
    use shipmate_core::postal::PostalSource;
    use shipmate_core::types::{AddressBundle, Category};
    use shipmate_core::units::VariantDimensions;
    use shipmate_core::ShippingRate;
    use shipmate_data::{PickupPoint, PostalDataset};

    struct FixedRate(Option<Decimal>);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn fetch(&self) -> ServiceResult<Decimal> {
            self.0.ok_or_else(|| ServiceError::Http("down".into()))
        }
    }

    fn rate(courier: Carrier, channel: Channel, tier: &str, price: i64) -> ShippingRate {
        ShippingRate {
            courier,
            country: "CZ".to_string(),
            channel,
            category: Category::Standard,
            weight_tier: tier.to_string(),
            address_bundle: AddressBundle::One,
            price: Decimal::new(price, 2),
            cod_fee: Decimal::new(3500, 2),
            estimate: "1-2 days".to_string(),
        }
    }

    fn service(rate_source: Option<Decimal>) -> ShippingService {
        let config = ShipmateConfig::default();

        let rates: RateTable = vec![
            rate(Carrier::Packeta, Channel::Hd, "10", 13000),
            rate(Carrier::Packeta, Channel::Pudo, "5", 8900),
        ]
        .into_iter()
        .collect();

        let variants: VariantCatalog = vec![
            VariantDimensions {
                sku: "BOOK".to_string(),
                length_mm: 240,
                width_mm: 170,
                height_mm: 40,
                weight_grams: 6_000,
            },
            VariantDimensions {
                sku: "ANVIL".to_string(),
                length_mm: 300,
                width_mm: 200,
                height_mm: 200,
                weight_grams: 35_000,
            },
        ]
        .into_iter()
        .collect();

        let mut pickup_points = PickupPointDirectory::new();
        pickup_points.insert(PickupPoint {
            id: "PK-1001".to_string(),
            courier: Carrier::Packeta,
            country: "CZ".to_string(),
            name: "Brno Hlavni nadrazi".to_string(),
        });

        let data = ServiceData {
            rates: Arc::new(rates),
            variants: Arc::new(variants),
            pickup_points: Arc::new(pickup_points),
        };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache: Arc<TtlCache<String, ExchangeRate>> = Arc::new(TtlCache::new(4, Arc::clone(&clock)));
        let exchange = ExchangeRateProvider::new(
            Arc::new(FixedRate(rate_source)),
            cache,
            clock,
            &ExchangeSettings::default(),
        );

        let mut cz = PostalDataset::new("CZ");
        cz.insert("60200", "Brno");
        let postal = PostalResolver::new(Arc::new(PostalDirectory::in_memory().with_dataset(cz)), None, false);

        ShippingService::new(&config, data, exchange, postal)
    }

    fn request(items: Vec<LineItem>, couriers: Vec<Carrier>) -> QuoteRequest {
        QuoteRequest {
            items,
            destination: Destination {
                country: Some("cz".to_string()),
                postal_code: Some("60200".to_string()),
                pickup_point_id: None,
            },
            couriers,
            channels: Vec::new(),
            cash_on_delivery: false,
        }
    }

    #[tokio::test]
    async fn test_quote_prices_packeta_and_scopes_other_failures() {
        let service = service(Some(Decimal::from(25)));
        let quote = service
            .quote(&request(vec![LineItem::new("BOOK", 1)], Vec::new()))
            .await
            .unwrap();

        let packeta = quote.couriers["packeta"].quote().unwrap();
        // 6 kg: PUDO tier "10" has no row, HD tier "10" is 130.00 CZK
        let hd = packeta.option(Channel::Hd).unwrap();
        assert_eq!(hd.price, Decimal::new(520, 2));
        assert_eq!(hd.price_with_vat, Decimal::new(629, 2));
        assert_eq!(packeta.total_parcels, 1);

        // No DPD or GLS tariffs at all
        for code in ["dpd", "gls"] {
            match &quote.couriers[code] {
                CourierOutcome::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::ConfigurationGap),
                other => panic!("{code} should have failed: {other:?}"),
            }
        }

        assert_eq!(quote.meta.country, "CZ");
        assert_eq!(quote.meta.exchange_rate_source, ExchangeRateOrigin::Live);
        let postal = quote.meta.postal.unwrap();
        assert_eq!(postal.normalized_code.as_deref(), Some("602 00"));
        assert_eq!(postal.source, PostalSource::Local);
    }

    #[tokio::test]
    async fn test_fallback_rate_used_when_upstream_down() {
        let service = service(None);
        let quote = service
            .quote(&request(vec![LineItem::new("BOOK", 1)], vec![Carrier::Packeta]))
            .await
            .unwrap();

        assert_eq!(quote.couriers.len(), 1);
        assert_eq!(quote.meta.exchange_rate, Decimal::new(250, 1));
        assert_eq!(quote.meta.exchange_rate_source, ExchangeRateOrigin::Fallback);
    }

    #[tokio::test]
    async fn test_too_heavy_item_is_permanent_packing_error() {
        let service = service(Some(Decimal::from(25)));
        let quote = service
            .quote(&request(vec![LineItem::new("ANVIL", 1)], vec![Carrier::Dpd]))
            .await
            .unwrap();

        match &quote.couriers["dpd"] {
            CourierOutcome::Failed { kind, error } => {
                assert_eq!(*kind, ErrorKind::PermanentPacking);
                assert!(error.contains("ANVIL"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_sku_reported_per_carrier() {
        let service = service(Some(Decimal::from(25)));
        let quote = service
            .quote(&request(vec![LineItem::new("GHOST", 1)], Vec::new()))
            .await
            .unwrap();

        assert_eq!(quote.couriers.len(), 3);
        assert!(quote
            .couriers
            .values()
            .all(|o| matches!(o, CourierOutcome::Failed { kind: ErrorKind::Input, .. })));
    }

    #[tokio::test]
    async fn test_rejected_postal_code_fails_request() {
        let service = service(Some(Decimal::from(25)));
        let mut req = request(vec![LineItem::new("BOOK", 1)], Vec::new());
        req.destination.postal_code = Some("70200".to_string());

        let err = service.quote(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Shipping(ShippingError::InvalidPostalCode { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_pickup_point_resolves_country() {
        let service = service(Some(Decimal::from(25)));
        let mut req = request(vec![LineItem::new("BOOK", 1)], vec![Carrier::Packeta]);
        req.destination = Destination {
            country: None,
            postal_code: None,
            pickup_point_id: Some("PK-1001".to_string()),
        };

        let quote = service.quote(&req).await.unwrap();
        assert_eq!(quote.meta.country, "CZ");
        assert_eq!(quote.meta.pickup_point_id.as_deref(), Some("PK-1001"));
        assert!(quote.meta.postal.is_none());

        req.destination.pickup_point_id = Some("PK-0000".to_string());
        assert!(matches!(
            service.quote(&req).await,
            Err(ServiceError::Shipping(ShippingError::UnknownPickupPoint(_)))
        ));

        req.destination = Destination {
            country: Some("SK".to_string()),
            postal_code: None,
            pickup_point_id: Some("PK-1001".to_string()),
        };
        assert!(service.quote(&req).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_country_rejected() {
        let service = service(Some(Decimal::from(25)));
        let mut req = request(vec![LineItem::new("BOOK", 1)], Vec::new());
        req.destination = Destination::default();
        let err = service.quote(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_requested_carriers_dedup() {
        assert_eq!(requested_carriers(&[]), Carrier::ALL.to_vec());
        assert_eq!(
            requested_carriers(&[Carrier::Packeta, Carrier::Dpd, Carrier::Packeta]),
            vec![Carrier::Dpd, Carrier::Packeta]
        );
    }

    #[test]
    fn test_combined_quote_json_shape() {
        let mut couriers = BTreeMap::new();
        couriers.insert(
            "gls".to_string(),
            CourierOutcome::Failed {
                error: "No shipping rate configured for gls/CZ/HD/standard/5/one".to_string(),
                kind: ErrorKind::ConfigurationGap,
            },
        );
        let quote = CombinedQuote {
            couriers,
            meta: QuoteMeta {
                quote_id: Uuid::nil(),
                country: "CZ".to_string(),
                currency: "EUR".to_string(),
                exchange_rate: Decimal::new(250, 1),
                exchange_rate_source: ExchangeRateOrigin::Fallback,
                vat_bps: 2100,
                calculated_at: Utc::now(),
                postal: None,
                pickup_point_id: None,
            },
        };

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["couriers"]["gls"]["kind"], "configuration_gap");
        assert_eq!(json["meta"]["exchangeRateSource"], "fallback");
        assert_eq!(json["meta"]["vatBps"], 2100);
        assert!(json["meta"].get("postal").is_none());

        let back: CombinedQuote = serde_json::from_value(json).unwrap();
        assert_eq!(back, quote);
    }

    #[test]
    fn test_request_from_json() {
        let req: QuoteRequest = serde_json::from_str(
            r#"{
                "items": [{"sku": "BOOK", "quantity": 2}],
                "destination": {"country": "CZ", "postalCode": "602 00"},
                "couriers": ["packeta"],
                "cashOnDelivery": true
            }"#,
        )
        .unwrap();
        assert_eq!(req.couriers, vec![Carrier::Packeta]);
        assert!(req.channels.is_empty());
        assert!(req.cash_on_delivery);
        assert_eq!(req.destination.postal_code.as_deref(), Some("602 00"));
    }
}
