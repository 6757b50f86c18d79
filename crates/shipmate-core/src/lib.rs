//! # shipmate-core: Pure Shipping Logic for Shipmate
//!
//! This crate holds every shipping calculation as pure functions with zero
//! I/O dependencies: parcel splitting, tariff selection and pricing.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shipmate Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 shipmate-service (network)                      │   │
//! │  │   config ──► exchange rate ──► postal resolver ──► quote all   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ shipmate-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐      │   │
//! │  │   │  units   │─►│ packing  │─►│  rates   │─►│ pricing  │      │   │
//! │  │   │ explode  │  │ cartons  │  │ tiers    │  │ decimal  │      │   │
//! │  │   └──────────┘  │ stacks   │  └──────────┘  └────┬─────┘      │   │
//! │  │                 └──────────┘                     ▼            │   │
//! │  │   carrier (DPD / GLS / Packeta)           quote (rank)        │   │
//! │  │   postal rules · cache + clock                                │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO FILES • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │                 shipmate-data (CSV loaders)                     │   │
//! │  │          tariffs, variants, postal datasets, pickup points      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Line items, channels, categories, shipping options
//! - [`money`] - Decimal money, VAT rate, exchange rate value
//! - [`units`] - mm/g → cm/kg normalization and atomic units
//! - [`cartons`] - Carrier carton catalogs
//! - [`packing`] - Parcel splitter (carton and stack packers)
//! - [`carrier`] - Carrier enum and per-carrier policies
//! - [`rates`] - Tariff table and weight tiers
//! - [`pricing`] - Local total → conversion → VAT
//! - [`quote`] - Single-carrier aggregation and ranking
//! - [`postal`] - Postal code normalization rules
//! - [`cache`] - TTL cache and clock
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same order, same tariffs, same parcels and prices
//! 2. **No I/O**: file system and network access are FORBIDDEN here
//! 3. **Decimal Money**: every amount is a `rust_decimal::Decimal` rounded
//!    half-up to 2 places after each pricing stage
//! 4. **Explicit Errors**: "no rate" and "too large" are `Result` variants
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use shipmate_core::money::{Money, VatRate};
//!
//! // 130.00 CZK at 25.0 CZK/EUR, 21 % VAT
//! let local = Money::new(Decimal::new(13000, 2));
//! let price = local.convert(Decimal::new(250, 1)).unwrap();
//! assert_eq!(price.to_string(), "5.20");
//! assert_eq!(price.with_vat(VatRate::from_bps(2100)).to_string(), "6.29");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod carrier;
pub mod cartons;
pub mod error;
pub mod money;
pub mod packing;
pub mod postal;
pub mod pricing;
pub mod quote;
pub mod rates;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use carrier::{policy_for, Carrier, CarrierPolicy, CarrierSettings, SurchargePolicy};
pub use error::{ErrorKind, ShippingError, ShippingResult, ValidationError};
pub use money::{ExchangeRate, ExchangeRateOrigin, Money, VatRate};
pub use packing::Parcel;
pub use rates::{RateTable, ShippingRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum atomic units in one order.
///
/// Bounds the memory of the explosion into atomic units; far above any
/// real marketplace order.
pub const MAX_ORDER_UNITS: usize = 100_000;

/// Minimum packing rounds before the carton packer gives up.
///
/// The effective guard is the larger of this and the unit count. Every
/// round places at least one unit, so reaching it is a bug.
pub const PACKING_ROUND_LIMIT: usize = 1000;
