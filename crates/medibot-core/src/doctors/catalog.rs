//! Static doctor catalog

use std::path::Path;

use tracing::{debug, info, warn};

use super::record::DoctorRecord;
use crate::error::{Error, Result};

/// Read-only collection of doctor records, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct DoctorCatalog {
    records: Vec<DoctorRecord>,
}

impl DoctorCatalog {
    pub fn from_records(records: Vec<DoctorRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON array of records from disk
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::CatalogLoad(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&contents)
            .map_err(|e| Error::CatalogLoad(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), doctors = catalog.len(), "Loaded doctor catalog");
        Ok(catalog)
    }

    /// Load from disk, treating any failure as an empty catalog
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Doctor catalog unavailable, continuing with none");
                Self::empty()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let records: Vec<DoctorRecord> = serde_json::from_str(contents)?;
        let usable: Vec<DoctorRecord> = records
            .into_iter()
            .filter(|r| {
                let keep = !r.specialty.trim().is_empty();
                if !keep {
                    debug!(profile = ?r.profile, "Skipping catalog record without specialty");
                }
                keep
            })
            .collect();
        Ok(Self::from_records(usable))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DoctorRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[DoctorRecord] {
        &self.records
    }

    /// Distinct specialties, sorted
    pub fn specialties(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.iter().map(|r| r.specialty.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
