//! Grid configuration supplied by the simulation setup.

use serde::{Deserialize, Serialize};

use crate::constants::{INSERT_CHUNK, MIN_PARALLEL_PARTICLES};
use crate::error::ConfigError;
use crate::locate::CellLocator;

/// Tunables for building the bucket grid.
///
/// `HASH_DIM` is not part of this: it is fixed at compile time through the
/// `GridIndex` type parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Interaction radius `h`, also the cell edge length (unit domain).
    pub interaction_radius: f32,
    /// Use the rayon build. Small particle sets still take the serial path.
    pub parallel: bool,
    /// Minimum particles per rayon task during insertion.
    pub insert_chunk: usize,
    /// Particle count below which the parallel build runs serially.
    pub min_parallel_particles: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            interaction_radius: 0.05,
            parallel: true,
            insert_chunk: INSERT_CHUNK,
            min_parallel_particles: MIN_PARALLEL_PARTICLES,
        }
    }
}

impl GridConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: GridConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject radii the locator cannot quantize.
    pub fn validate(&self) -> Result<(), ConfigError> {
        CellLocator::new(self.interaction_radius).map(|_| ())
    }

    /// Build the per-step locator for this config's radius.
    pub fn locator(&self) -> Result<CellLocator, ConfigError> {
        CellLocator::new(self.interaction_radius)
    }

    pub(crate) fn chunk(&self) -> usize {
        self.insert_chunk.max(1)
    }
}
