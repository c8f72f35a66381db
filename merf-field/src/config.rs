//! Network configuration

use burn::config::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::NetworkError;
use crate::proposal::NetworkKind;

/// Backend of the 3D spatial encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridBackend {
    /// Multiresolution hash grid followed by an MLP.
    #[default]
    Hash,
    /// Dense voxel grid sampled trilinearly. Experimental.
    Dense,
}

/// Options the network is built from.
#[derive(Config, Debug)]
pub struct NetworkConfig {
    /// Half extent of the scene box; points live in `[-bound, bound]^3`.
    #[config(default = 1.0)]
    pub bound: f32,
    /// The renderer marches rays on the GPU, so no proposal networks are built.
    #[config(default = false)]
    pub cuda_ray: bool,
    /// Add the grid total-variation penalty in `apply_total_variation`.
    #[config(default = false)]
    pub total_variation: bool,
    /// Lattice vertices sampled per level for the total-variation penalty.
    #[config(default = 4096)]
    pub tv_samples: usize,
    #[config(default = "GridBackend::Hash")]
    pub grid_backend: GridBackend,
    /// Voxels per axis of the dense backend.
    #[config(default = 64)]
    pub dense_resolution: usize,
}

impl NetworkConfig {
    /// Whether proposal networks exist, decided once from `cuda_ray`.
    pub fn kind(&self) -> NetworkKind {
        NetworkKind::from_cuda_ray(self.cuda_ray)
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        if !(self.bound.is_finite() && self.bound > 0.0) {
            return Err(NetworkError::InvalidBound(self.bound));
        }
        Ok(())
    }

    /// Load a JSON configuration from disk.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let config = Self::load(path.as_ref()).map_err(|e| NetworkError::Config(e.to_string()))?;
        config.validate()?;
        info!(
            "Loaded network config: bound {}, {:?}, {:?} grid",
            config.bound,
            config.kind(),
            config.grid_backend
        );
        Ok(config)
    }

    /// Write the configuration as JSON.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        self.save(path.as_ref())?;
        debug!("Saved network config to {}", path.as_ref().display());
        Ok(())
    }
}
