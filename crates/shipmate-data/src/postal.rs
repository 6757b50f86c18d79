//! # Postal Datasets
//!
//! One CSV per country (`{dir}/CZ.csv`, `{dir}/AT.csv`, ...) with columns
//! `code,city`. Codes are stored normalized (uppercase, no spaces or
//! dashes); countries matched on a prefix (AT, GB, ...) list the prefix.
//!
//! ## Loading
//! ```text
//! dataset("CZ")
//!     │
//!     ├── read lock: already loaded? ──► Arc<PostalDataset>
//!     │
//!     └── load {dir}/CZ.csv (no lock held)
//!             missing file → empty dataset (remembered too)
//!         write lock: insert unless another caller won the race
//! ```
//!
//! Services call [`PostalDirectory::preload`] at startup; after that every
//! lookup is served from memory and countries without a file are empty
//! without touching the disk.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use tracing::{debug, info, warn};

use shipmate_core::postal::{normalize, PostalIndex};

use crate::error::{DataError, DataResult};

#[derive(Debug, Deserialize)]
struct PostalRecord {
    code: String,
    #[serde(default)]
    city: String,
}

/// Postal codes of one country.
#[derive(Debug, Clone, Default)]
pub struct PostalDataset {
    country: String,
    cities: HashMap<String, String>,
}

impl PostalDataset {
    pub fn new(country: impl Into<String>) -> Self {
        PostalDataset {
            country: country.into().to_ascii_uppercase(),
            cities: HashMap::new(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn insert(&mut self, code: &str, city: impl Into<String>) {
        let key = normalize(code);
        if !key.is_empty() {
            self.cities.insert(key, city.into());
        }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Reads `code,city` rows.
    pub fn read<R: Read>(country: &str, reader: R, source: &str) -> DataResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut dataset = PostalDataset::new(country);
        for record in csv.deserialize::<PostalRecord>() {
            let record = record.map_err(|e| DataError::csv(source, e))?;
            dataset.insert(&record.code, record.city);
        }
        Ok(dataset)
    }
}

impl PostalIndex for PostalDataset {
    fn city_for(&self, key: &str) -> Option<&str> {
        self.cities.get(key).map(String::as_str)
    }
}

/// Lazily loaded datasets for every country, kept for the process lifetime.
#[derive(Debug, Default)]
pub struct PostalDirectory {
    dir: Option<PathBuf>,
    datasets: RwLock<HashMap<String, Arc<PostalDataset>>>,
    preloaded: AtomicBool,
}

impl PostalDirectory {
    /// Directory holding `{CC}.csv` files.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PostalDirectory {
            dir: Some(dir.into()),
            datasets: RwLock::new(HashMap::new()),
            preloaded: AtomicBool::new(false),
        }
    }

    /// Directory with no files; only datasets added with
    /// [`PostalDirectory::with_dataset`] exist.
    pub fn in_memory() -> Self {
        PostalDirectory::default()
    }

    pub fn with_dataset(self, dataset: PostalDataset) -> Self {
        self.datasets
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(dataset.country.clone(), Arc::new(dataset));
        self
    }

    /// Returns the dataset for a country, loading it on first use. A country
    /// without a file gets an empty dataset.
    pub fn dataset(&self, country: &str) -> DataResult<Arc<PostalDataset>> {
        let country = country.to_ascii_uppercase();
        if let Some(dataset) = self
            .datasets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&country)
        {
            return Ok(Arc::clone(dataset));
        }

        let loaded = Arc::new(self.load(&country)?);
        let mut datasets = self.datasets.write().unwrap_or_else(|e| e.into_inner());
        let dataset = datasets.entry(country).or_insert(loaded);
        Ok(Arc::clone(dataset))
    }

    /// Loads every `{CC}.csv` in the directory. Returns the number of
    /// datasets loaded; a missing directory loads none.
    pub fn preload(&self) -> DataResult<usize> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        let name = dir.display().to_string();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %name, "Postal dataset directory missing, local checks disabled");
                self.preloaded.store(true, Ordering::Release);
                return Ok(0);
            }
            Err(e) => return Err(DataError::io(name, e)),
        };

        let mut loaded = 0;
        for entry in entries {
            let path = entry.map_err(|e| DataError::io(&name, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            let Some(country) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
                continue;
            }
            self.dataset(country)?;
            loaded += 1;
        }

        self.preloaded.store(true, Ordering::Release);
        info!(path = %name, countries = loaded, "Preloaded postal datasets");
        Ok(loaded)
    }

    fn load(&self, country: &str) -> DataResult<PostalDataset> {
        let Some(dir) = &self.dir else {
            return Ok(PostalDataset::new(country));
        };
        if self.preloaded.load(Ordering::Acquire) {
            return Ok(PostalDataset::new(country));
        }
        let path = dir.join(format!("{country}.csv"));
        let name = path.display().to_string();
        match File::open(&path) {
            Ok(file) => {
                let dataset = PostalDataset::read(country, file, &name)?;
                info!(country, codes = dataset.len(), "Loaded postal dataset");
                Ok(dataset)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(country, path = %name, "No postal dataset for country");
                Ok(PostalDataset::new(country))
            }
            Err(e) => Err(DataError::io(name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipmate_core::postal::check_local;
    use std::fs;

    #[test]
    fn test_dataset_normalizes_codes() {
        let data = "code,city\n602 00,Brno\n110-00,Praha\n";
        let dataset = PostalDataset::read("cz", data.as_bytes(), "CZ.csv").unwrap();
        assert_eq!(dataset.country(), "CZ");
        assert_eq!(dataset.city_for("60200"), Some("Brno"));
        assert_eq!(dataset.city_for("11000"), Some("Praha"));
    }

    #[test]
    fn test_directory_loads_once_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("CZ.csv"), "code,city\n60200,Brno\n").unwrap();
        let directory = PostalDirectory::new(dir.path());

        let first = directory.dataset("cz").unwrap();
        assert!(check_local(first.as_ref(), "CZ", "602 00").is_some());

        // Removing the file does not matter once loaded
        fs::remove_file(dir.path().join("CZ.csv")).unwrap();
        let second = directory.dataset("CZ").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_preload_serves_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("CZ.csv"), "code,city\n60200,Brno\n").unwrap();
        fs::write(dir.path().join("SK.csv"), "code,city\n81101,Bratislava\n").unwrap();
        fs::write(dir.path().join("README.txt"), "not a dataset").unwrap();
        let directory = PostalDirectory::new(dir.path());

        assert_eq!(directory.preload().unwrap(), 2);

        // Files appearing later are not read
        fs::write(dir.path().join("AT.csv"), "code,city\n1010,Wien\n").unwrap();
        assert!(directory.dataset("AT").unwrap().is_empty());
        assert_eq!(directory.dataset("SK").unwrap().len(), 1);
    }

    #[test]
    fn test_preload_missing_directory() {
        let directory = PostalDirectory::new("/nonexistent/postal");
        assert_eq!(directory.preload().unwrap(), 0);
        assert!(directory.dataset("CZ").unwrap().is_empty());
    }

    #[test]
    fn test_missing_country_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let directory = PostalDirectory::new(dir.path());
        assert!(directory.dataset("PL").unwrap().is_empty());
    }

    #[test]
    fn test_in_memory_directory() {
        let mut sk = PostalDataset::new("SK");
        sk.insert("811 01", "Bratislava");
        let directory = PostalDirectory::in_memory().with_dataset(sk);
        assert_eq!(directory.dataset("SK").unwrap().len(), 1);
        assert!(directory.dataset("HU").unwrap().is_empty());
    }
}
