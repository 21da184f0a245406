//! Satellite catalog loaded from YAML.
//!
//! # Format
//! ```yaml
//! satellites:
//!   - name: LEO 1
//!     perigee_km: 423
//!     apogee_km: 939
//!     ecc: 0.0365331
//!     inc_deg: 99.2936
//!     raan_deg: 237.4020
//!     aop_deg: 179.9420
//!     ma_deg: 180.1886
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::body::CentralBody;
use crate::elements::OrbitalElements;
use crate::error::PropagationError;

/// Catalog loading errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Catalog contains no satellites")]
    Empty,

    #[error("Satellite '{0}' appears more than once")]
    DuplicateName(String),

    #[error("No satellite named '{0}' in catalog")]
    UnknownSatellite(String),
}

/// One catalog entry, in the units operators write them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SatelliteEntry {
    pub name: String,
    /// Perigee altitude (km)
    pub perigee_km: f64,
    /// Apogee altitude (km)
    pub apogee_km: f64,
    /// Eccentricity
    pub ecc: f64,
    /// Inclination (deg)
    pub inc_deg: f64,
    /// RAAN (deg)
    pub raan_deg: f64,
    /// Argument of perigee (deg)
    pub aop_deg: f64,
    /// Mean anomaly at epoch (deg)
    pub ma_deg: f64,
}

impl SatelliteEntry {
    /// Validated element set around `body`.
    pub fn elements(&self, body: &CentralBody) -> Result<OrbitalElements, PropagationError> {
        OrbitalElements::from_apsides(
            self.perigee_km,
            self.apogee_km,
            self.ecc,
            self.inc_deg,
            self.raan_deg,
            self.aop_deg,
            self.ma_deg,
            body,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    satellites: Vec<SatelliteEntry>,
}

impl Catalog {
    /// Catalog shipped with the binary.
    pub fn builtin() -> Self {
        Catalog {
            satellites: vec![SatelliteEntry {
                name: "LEO 1".to_string(),
                perigee_km: 423.0,
                apogee_km: 939.0,
                ecc: 0.0365331,
                inc_deg: 99.2936,
                raan_deg: 237.4020,
                aop_deg: 179.9420,
                ma_deg: 180.1886,
            }],
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&yaml)?;
        log::info!("Loaded {} satellites from {:?}", catalog.satellites.len(), path);
        Ok(catalog)
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Result<&SatelliteEntry, CatalogError> {
        let name = name.trim();
        self.satellites
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownSatellite(name.to_string()))
    }

    pub fn entries(&self) -> &[SatelliteEntry] {
        &self.satellites
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.satellites.iter().map(|s| s.name.as_str())
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.satellites.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (k, entry) in self.satellites.iter().enumerate() {
            if self.satellites[..k]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&entry.name))
            {
                return Err(CatalogError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(())
    }
}
