//! Drishti - LiDAR object characterization and anomaly detection.
//!
//! The engine ingests a time-stamped point stream from an abstract scanner,
//! separates foreground objects from a captured static background, extracts
//! a geometric descriptor (bounding box plus planar faces) from each
//! isolated object, stores descriptors as named models, and compares new
//! observations against a model to produce a structured anomaly report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  drishti (bin)                      │  ← CLI shell
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Model codec, registry
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              engine/  +  detection/                 │  ← Characterizer, builder,
//! │                                                     │    anomaly reports
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Octree, normals,
//! │                                                     │    density clustering
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Point, BBox, math
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Point streams come from the `drishti-io` crate ([`drishti_io::PointSource`]);
//! the characterizer drives any of its sources — CSV replay, binary capture,
//! synthetic simulation, or a live driver.
//!
//! # Pipeline
//!
//! raw points → [`ObjectCharacterizer`] (reflectivity gate, background
//! subtraction, stream-time frames) → [`engine::builder::characterize`]
//! (octree → proximity clusters → normals → face clusters → descriptors) →
//! [`CharacterizedObject`] → stored via [`ModelRegistry`] or compared with
//! [`detection::anomaly::compare`] → [`AnomalyReport`].

pub mod algorithms;
pub mod config;
pub mod core;
pub mod detection;
pub mod engine;
pub mod error;
pub mod io;

// Core types
pub use crate::core::types::{BBox, Point, Vector};
pub use config::EngineConfig;
pub use error::{Error, Result};

// Algorithms
pub use algorithms::clustering::{
    cluster_by_normals, cluster_by_proximity, FaceConfig, Partition, ProximityConfig,
};
pub use algorithms::normals::estimate_normals;
pub use algorithms::octree::{Kernel, Octree, OctreeConfig};

// Engine
pub use engine::builder::characterize;
pub use engine::characterizer::{CharacterizerConfig, ObjectCharacterizer, Phase};
pub use engine::object::{CharacterizedObject, Face};

// Detection
pub use detection::anomaly::{
    compare, AnomalyReport, Comparison, DetectionConfig, FaceComparison, FaceMatch,
};

// I/O
pub use io::registry::ModelRegistry;
