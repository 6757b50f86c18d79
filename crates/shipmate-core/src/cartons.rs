//! # Carton Catalog
//!
//! Static box sizes a carrier accepts, per channel. Catalogs are built once
//! per process and sorted smallest-volume-first so the carton packer tries
//! the cheapest box first.
//!
//! ```text
//! DPD pickup                      DPD home
//! ──────────                      ────────
//! 20×15×10  (≤ 3 kg)              every pickup carton, plus
//! 30×20×15  (≤ 10 kg)             100×60×40
//! 40×30×20                        120×50×40
//! 50×40×30                        150×40×30
//! 60×40×40                        175×30×30
//! 80×50×30
//! 100×40×30
//! ```

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::packing::Dimensions;

/// A carrier-approved box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Carton {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    /// Box-specific weight rating, tighter than the carrier cap.
    #[serde(default)]
    pub max_weight_kg: Option<f64>,
}

impl Carton {
    pub const fn new(length_cm: f64, width_cm: f64, height_cm: f64) -> Self {
        Carton {
            length_cm,
            width_cm,
            height_cm,
            max_weight_kg: None,
        }
    }

    pub const fn rated(self, max_weight_kg: f64) -> Self {
        Carton {
            max_weight_kg: Some(max_weight_kg),
            ..self
        }
    }

    pub fn dims(&self) -> Dimensions {
        Dimensions::new(self.length_cm, self.width_cm, self.height_cm)
    }

    pub fn volume(&self) -> f64 {
        self.length_cm * self.width_cm * self.height_cm
    }

    /// Weight this carton may carry under a carrier cap.
    pub fn weight_cap(&self, carrier_cap_kg: f64) -> f64 {
        match self.max_weight_kg {
            Some(rating) => rating.min(carrier_cap_kg),
            None => carrier_cap_kg,
        }
    }
}

/// Immutable list of cartons, smallest volume first.
#[derive(Debug, Clone, PartialEq)]
pub struct CartonCatalog {
    cartons: Vec<Carton>,
}

impl CartonCatalog {
    /// Builds a catalog, sorting by volume (ties by longest side).
    pub fn new(mut cartons: Vec<Carton>) -> Self {
        cartons.sort_by(|a, b| {
            a.volume()
                .total_cmp(&b.volume())
                .then(a.dims().longest().total_cmp(&b.dims().longest()))
        });
        CartonCatalog { cartons }
    }

    pub fn cartons(&self) -> &[Carton] {
        &self.cartons
    }

    pub fn len(&self) -> usize {
        self.cartons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cartons.is_empty()
    }
}

// =============================================================================
// DPD Catalogs
// =============================================================================

const DPD_PICKUP_CARTONS: [Carton; 7] = [
    Carton::new(20.0, 15.0, 10.0).rated(3.0),
    Carton::new(30.0, 20.0, 15.0).rated(10.0),
    Carton::new(40.0, 30.0, 20.0),
    Carton::new(50.0, 40.0, 30.0),
    Carton::new(60.0, 40.0, 40.0),
    Carton::new(80.0, 50.0, 30.0),
    Carton::new(100.0, 40.0, 30.0),
];

const DPD_HOME_EXTRA_CARTONS: [Carton; 4] = [
    Carton::new(100.0, 60.0, 40.0),
    Carton::new(120.0, 50.0, 40.0),
    Carton::new(150.0, 40.0, 30.0),
    Carton::new(175.0, 30.0, 30.0),
];

/// DPD pick-up point cartons.
pub fn dpd_pickup() -> &'static CartonCatalog {
    static CATALOG: OnceLock<CartonCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| CartonCatalog::new(DPD_PICKUP_CARTONS.to_vec()))
}

/// DPD home delivery cartons (pickup sizes plus long boxes).
pub fn dpd_home() -> &'static CartonCatalog {
    static CATALOG: OnceLock<CartonCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut cartons = DPD_PICKUP_CARTONS.to_vec();
        cartons.extend_from_slice(&DPD_HOME_EXTRA_CARTONS);
        CartonCatalog::new(cartons)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
