//! # Variant Catalog
//!
//! Physical dimensions of every sellable variant, as exported by the
//! product catalog (`sku,length_mm,width_mm,height_mm,weight_grams`).
//! Values are normalized to cm/kg when loaded.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use shipmate_core::units::{VariantDimensions, VariantLookup, VariantPhysical};
use shipmate_core::validation::validate_sku;

use crate::error::{record_line, DataError, DataResult};

/// SKU → physical data, read-only after loading.
#[derive(Debug, Clone, Default)]
pub struct VariantCatalog {
    variants: HashMap<String, VariantPhysical>,
}

impl VariantCatalog {
    pub fn new() -> Self {
        VariantCatalog::default()
    }

    /// Adds or replaces one variant.
    pub fn insert(&mut self, stored: &VariantDimensions) {
        self.variants
            .insert(stored.sku.trim().to_string(), VariantPhysical::from_stored(stored));
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Loads a variant file.
    pub fn load(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| DataError::io(&name, e))?;
        let catalog = Self::read(file, &name)?;
        info!(path = %name, variants = catalog.len(), "Loaded variant catalog");
        Ok(catalog)
    }

    /// Reads variants from any reader. Later rows win on duplicate SKUs.
    pub fn read<R: Read>(reader: R, source: &str) -> DataResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = csv.headers().map_err(|e| DataError::csv(source, e))?.clone();

        let mut catalog = VariantCatalog::new();
        for record in csv.records() {
            let record = record.map_err(|e| DataError::csv(source, e))?;
            let line = record_line(&record);
            let stored: VariantDimensions = record
                .deserialize(Some(&headers))
                .map_err(|e| DataError::csv(source, e))?;
            validate_sku(&stored.sku).map_err(|e| DataError::invalid_row(source, line, e.to_string()))?;
            if catalog.variants.contains_key(stored.sku.trim()) {
                warn!(sku = %stored.sku, line, "Duplicate SKU in variant file, keeping the later row");
            }
            catalog.insert(&stored);
        }
        Ok(catalog)
    }
}

impl VariantLookup for VariantCatalog {
    fn physical(&self, sku: &str) -> Option<VariantPhysical> {
        self.variants.get(sku).copied()
    }
}

impl FromIterator<VariantDimensions> for VariantCatalog {
    fn from_iter<I: IntoIterator<Item = VariantDimensions>>(iter: I) -> Self {
        let mut catalog = VariantCatalog::new();
        for stored in iter {
            catalog.insert(&stored);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VARIANTS: &str = "\
sku,length_mm,width_mm,height_mm,weight_grams
MUG-01,120,90,100,350
PIN,0,25,400,0
";

    #[test]
    fn test_read_normalizes_units() {
        let catalog = VariantCatalog::read(VARIANTS.as_bytes(), "variants.csv").unwrap();
        assert_eq!(catalog.len(), 2);

        let mug = catalog.physical("MUG-01").unwrap();
        assert_eq!(mug.length_cm, 12.0);
        assert_eq!(mug.weight_kg, 0.35);

        let pin = catalog.physical("PIN").unwrap();
        assert_eq!(pin.length_cm, 0.1);
        assert_eq!(pin.weight_kg, 0.001);
    }

    #[test]
    fn test_negative_dimension_is_csv_error() {
        let data = "sku,length_mm,width_mm,height_mm,weight_grams\nBAD,-1,10,10,10\n";
        assert!(matches!(
            VariantCatalog::read(data.as_bytes(), "variants.csv"),
            Err(DataError::Csv { .. })
        ));
    }

    #[test]
    fn test_invalid_sku_reports_line() {
        let data = "sku,length_mm,width_mm,height_mm,weight_grams\nOK,1,1,1,1\nhas space,10,10,10,10\n";
        let err = VariantCatalog::read(data.as_bytes(), "variants.csv").unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { line: 3, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VARIANTS.as_bytes()).unwrap();
        let catalog = VariantCatalog::load(file.path()).unwrap();
        assert!(catalog.physical("MUG-01").is_some());
        assert!(catalog.physical("NOPE").is_none());
    }
}
