//! # shipmate-data: Operator Data Files for Shipmate
//!
//! Loads the files operators maintain next to the service: tariff rows,
//! variant dimensions, per-country postal datasets and the pickup-point
//! directory.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shipmate Data Flow                               │
//! │                                                                         │
//! │  data/                                                                 │
//! │  ├── rates.csv ──────────► tariffs::load_rate_table ──► RateTable      │
//! │  ├── variants.csv ───────► VariantCatalog::load ──────► VariantLookup  │
//! │  ├── pickup_points.csv ──► PickupPointDirectory::load                  │
//! │  └── postal/{CC}.csv ────► PostalDirectory (lazy, per country)         │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                        shipmate-service (ShippingService)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`tariffs`] - Tariff CSV → `RateTable`
//! - [`variants`] - Variant CSV → `VariantCatalog`
//! - [`postal`] - Postal datasets and the lazy per-country directory
//! - [`pickup_points`] - Pickup-point directory
//! - [`error`] - Data error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shipmate_data::{load_rate_table, VariantCatalog};
//!
//! let rates = load_rate_table("data/rates.csv")?;
//! let variants = VariantCatalog::load("data/variants.csv")?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pickup_points;
pub mod postal;
pub mod tariffs;
pub mod variants;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DataError, DataResult};
pub use pickup_points::{PickupPoint, PickupPointDirectory};
pub use postal::{PostalDataset, PostalDirectory};
pub use tariffs::{load_rate_table, read_rate_table};
pub use variants::VariantCatalog;
