//! # Pickup-Point Directory
//!
//! Maps pickup-point identifiers to their courier and country, so a
//! destination given only as a pickup point can be quoted.
//!
//! File format: `id,courier,country,name`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use shipmate_core::carrier::Carrier;
use shipmate_core::validation::validate_country_code;

use crate::error::{record_line, DataError, DataResult};

#[derive(Debug, Deserialize)]
struct PickupPointRecord {
    id: String,
    courier: String,
    country: String,
    #[serde(default)]
    name: String,
}

/// One pickup / drop-off point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupPoint {
    pub id: String,
    pub courier: Carrier,
    pub country: String,
    pub name: String,
}

/// All known pickup points by id.
#[derive(Debug, Clone, Default)]
pub struct PickupPointDirectory {
    points: HashMap<String, PickupPoint>,
}

impl PickupPointDirectory {
    pub fn new() -> Self {
        PickupPointDirectory::default()
    }

    pub fn insert(&mut self, point: PickupPoint) {
        self.points.insert(point.id.clone(), point);
    }

    pub fn get(&self, id: &str) -> Option<&PickupPoint> {
        self.points.get(id.trim())
    }

    /// Country of a pickup point, if known.
    pub fn country_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|p| p.country.as_str())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn load(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| DataError::io(&name, e))?;
        let directory = Self::read(file, &name)?;
        info!(path = %name, points = directory.len(), "Loaded pickup points");
        Ok(directory)
    }

    pub fn read<R: Read>(reader: R, source: &str) -> DataResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = csv.headers().map_err(|e| DataError::csv(source, e))?.clone();

        let mut directory = PickupPointDirectory::new();
        for record in csv.records() {
            let record = record.map_err(|e| DataError::csv(source, e))?;
            let line = record_line(&record);
            let row: PickupPointRecord = record
                .deserialize(Some(&headers))
                .map_err(|e| DataError::csv(source, e))?;

            if row.id.is_empty() {
                return Err(DataError::invalid_row(source, line, "id is required"));
            }
            let courier = Carrier::from_str(&row.courier)
                .map_err(|e| DataError::invalid_row(source, line, e.to_string()))?;
            let country = validate_country_code(&row.country)
                .map_err(|e| DataError::invalid_row(source, line, e.to_string()))?;

            directory.insert(PickupPoint {
                id: row.id,
                courier,
                country,
                name: row.name,
            });
        }
        Ok(directory)
    }
}
