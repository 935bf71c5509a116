//! Engine configuration, loadable from TOML.
//!
//! Every tunable lives in a section named for the module it drives:
//!
//! ```toml
//! [characterizer]
//! object_frame_ms = 1500
//! background_frame_ms = 1000
//! min_reflectivity = 0.0
//! background_distance = 60.0
//!
//! [octree]
//! max_leaf_points = 16
//! min_leaf_extent = 1.0
//!
//! [clustering]
//! min_points = 20
//! radius = 100.0
//!
//! [faces]
//! min_points = 30
//! radius = 50.0
//! normal_radius = 20.0
//! max_normal_angle = 0.30
//! max_mean_angle = 0.30
//! max_mean_angle_single = 0.10
//!
//! [detection]
//! max_face_match_angle = 0.30
//! similarity_tolerance = 5.0
//! ```
//!
//! Missing sections and fields fall back to the defaults above. Radii are
//! millimeters, angles radians, durations milliseconds of stream time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithms::clustering::{FaceConfig, ProximityConfig};
use crate::algorithms::octree::OctreeConfig;
use crate::detection::anomaly::DetectionConfig;
use crate::engine::characterizer::CharacterizerConfig;
use crate::error::{Error, Result};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub characterizer: CharacterizerConfig,
    pub octree: OctreeConfig,
    pub clustering: ProximityConfig,
    pub faces: FaceConfig,
    pub detection: DetectionConfig,
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: EngineConfig =
            basic_toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value > 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!("{} must be positive (got {})", name, value)))
            }
        }

        positive("clustering.radius", self.clustering.radius)?;
        positive("faces.radius", self.faces.radius)?;
        positive("faces.normal_radius", self.faces.normal_radius)?;
        positive("faces.max_normal_angle", self.faces.max_normal_angle)?;
        positive("faces.max_mean_angle", self.faces.max_mean_angle)?;
        positive("faces.max_mean_angle_single", self.faces.max_mean_angle_single)?;
        positive(
            "characterizer.background_distance",
            self.characterizer.background_distance,
        )?;
        positive("octree.min_leaf_extent", self.octree.min_leaf_extent)?;
        positive(
            "detection.max_face_match_angle",
            self.detection.max_face_match_angle,
        )?;
        positive(
            "detection.similarity_tolerance",
            self.detection.similarity_tolerance,
        )?;

        if self.clustering.min_points == 0 || self.faces.min_points == 0 {
            return Err(Error::Config("min_points must be at least 1".to_string()));
        }
        if self.octree.max_leaf_points == 0 {
            return Err(Error::Config(
                "octree.max_leaf_points must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
