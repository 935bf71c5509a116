//! Anomaly detection: compare an observed object against a stored model.
//!
//! Faces are matched greedily in the observed object's face order (largest
//! first, as emitted by the builder): each observed face takes the unmatched
//! model face with the smallest acute normal angle, provided that angle
//! passes the match gate. Ties resolve to the lower model index. All deltas
//! are `model - observed`, so a positive delta means the observation shrank.

use serde::{Deserialize, Serialize};

use crate::core::math::acute_angle;
use crate::core::types::BBox;
use crate::engine::object::CharacterizedObject;

/// Detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Max acute angle between matched face normals (radians)
    pub max_face_match_angle: f64,
    /// Max per-axis delta magnitude for `similar` (millimeters)
    pub similarity_tolerance: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_face_match_angle: 0.30,
            similarity_tolerance: 5.0,
        }
    }
}

/// Per-axis extent deltas between two boxes (`model - observed`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Comparison {
    /// Deltas between the extents of `model` and `observed`.
    pub fn between(model: &BBox, observed: &BBox) -> Self {
        let m = model.delta();
        let o = observed.delta();
        Self {
            dx: m.x - o.x,
            dy: m.y - o.y,
            dz: m.z - o.z,
        }
    }

    /// Largest delta magnitude across the three axes.
    pub fn max_abs(&self) -> f64 {
        self.dx.abs().max(self.dy.abs()).max(self.dz.abs())
    }

    /// True if every axis delta is within `tolerance`.
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_abs() <= tolerance
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(dx {:+.2}, dy {:+.2}, dz {:+.2})", self.dx, self.dy, self.dz)
    }
}

/// A successful face match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Index of the matched face in the model
    pub model_face: usize,
    /// Acute angle between the matched normals (radians)
    pub angle: f64,
    /// Local-frame extent deltas (`model - observed`)
    pub deltas: Comparison,
}

/// Match outcome for one observed face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceComparison {
    /// Index of the face in the observed object
    pub observed_face: usize,
    /// The matched model face, or `None` when no model face passed the gate
    pub matched: Option<FaceMatch>,
}

/// Structural and dimensional differences between an observed object and a
/// reference model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// True iff the observation has faces, every one matched, and every
    /// delta (overall and per-face) is within the similarity tolerance
    pub similar: bool,
    /// Overall bounding-box extent deltas (`model - observed`)
    pub overall: Comparison,
    /// `model face count - observed face count`
    pub delta_face_count: i64,
    /// One entry per observed face, in observed face order
    pub face_comparisons: Vec<FaceComparison>,
}

/// Compare an observed object against a model.
///
/// A faceless side (either one) produces a degenerate report: the overall
/// deltas are still computed, every observed face goes unmatched, and
/// `similar` is false.
pub fn compare(
    observed: &CharacterizedObject,
    model: &CharacterizedObject,
    config: &DetectionConfig,
) -> AnomalyReport {
    let overall = Comparison::between(&model.bbox, &observed.bbox);
    let delta_face_count = model.faces.len() as i64 - observed.faces.len() as i64;

    if model.faces.is_empty() || observed.faces.is_empty() {
        log::warn!(
            "Degenerate comparison: model has {} faces, observation has {}",
            model.faces.len(),
            observed.faces.len()
        );
        return AnomalyReport {
            similar: false,
            overall,
            delta_face_count,
            face_comparisons: (0..observed.faces.len())
                .map(|i| FaceComparison {
                    observed_face: i,
                    matched: None,
                })
                .collect(),
        };
    }

    let mut taken = vec![false; model.faces.len()];
    let mut face_comparisons = Vec::with_capacity(observed.faces.len());

    for (i, face) in observed.faces.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (j, candidate) in model.faces.iter().enumerate() {
            if taken[j] {
                continue;
            }
            let angle = acute_angle(&face.normal, &candidate.normal);
            // Strict < keeps the lowest index on ties.
            if best.map_or(true, |(_, a)| angle < a) {
                best = Some((j, angle));
            }
        }

        let matched = best.filter(|&(_, angle)| angle <= config.max_face_match_angle).map(
            |(j, angle)| {
                taken[j] = true;
                FaceMatch {
                    model_face: j,
                    angle,
                    deltas: Comparison::between(&model.faces[j].bbox, &face.bbox),
                }
            },
        );

        face_comparisons.push(FaceComparison {
            observed_face: i,
            matched,
        });
    }

    let all_matched = face_comparisons.iter().all(|fc| fc.matched.is_some());
    let within_tolerance = overall.within(config.similarity_tolerance)
        && face_comparisons.iter().all(|fc| {
            fc.matched
                .as_ref()
                .map(|m| m.deltas.within(config.similarity_tolerance))
                .unwrap_or(false)
        });

    AnomalyReport {
        similar: all_matched && within_tolerance,
        overall,
        delta_face_count,
        face_comparisons,
    }
}
