//! # shipmate-service: Shipping Options Service
//!
//! Wires the pure calculation in `shipmate-core` and the data files from
//! `shipmate-data` to the two upstream lookups (exchange rate, postal
//! validation) and answers multi-carrier quote requests.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     shipmate-service (THIS CRATE)                       │
//! │                                                                         │
//! │   ShipmateConfig ──► ShippingService::from_config                      │
//! │                          │                                              │
//! │        ┌─────────────────┼──────────────────┐                          │
//! │        ▼                 ▼                  ▼                          │
//! │   ServiceData     ExchangeRateProvider   PostalResolver                │
//! │   (CSV files)     (fixing, 24h cache)    (dataset → geocoder)          │
//! │        │                 │                  │                          │
//! │        └─────────────────┼──────────────────┘                          │
//! │                          ▼                                              │
//! │              quote(QuoteRequest) → CombinedQuote                        │
//! │              {couriers: {dpd, gls, packeta}, meta}                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`exchange`] - Exchange-rate source and cached provider
//! - [`postal`] - Remote postal lookup and the local-then-remote resolver
//! - [`service`] - Multi-carrier aggregation
//! - [`retry`] - Linear backoff for upstream calls
//! - [`error`] - Service error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shipmate_service::{QuoteRequest, ShipmateConfig, ShippingService};
//!
//! let config = ShipmateConfig::load(None)?;
//! let service = ShippingService::from_config(&config)?;
//! let quote = service.quote(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod exchange;
pub mod postal;
pub mod retry;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ShipmateConfig;
pub use error::{ServiceError, ServiceResult};
pub use exchange::{CnbRateSource, ExchangeRateProvider, RateSource};
pub use postal::{HttpPostalLookup, PostalCheck, PostalResolver, RemotePostalLookup, Verdict};
pub use service::{CombinedQuote, CourierOutcome, QuoteMeta, QuoteRequest, ServiceData, ShippingService};
