//! Characterized-object descriptor types.

use serde::{Deserialize, Serialize};

use crate::core::types::{BBox, Point, Vector};

/// One planar face of a characterized object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    /// Unit normal of the face plane (sign is arbitrary but stable)
    pub normal: Vector,
    /// Mean of the member positions
    pub centroid: Point,
    /// Bounding box in the face-local frame, where +Z is the face normal
    pub bbox: BBox,
    /// Member indices into the owning object's point set
    pub members: Vec<usize>,
}

impl Face {
    /// Number of member points.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the face has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// In-plane extents of the face (the two local-frame deltas that are not
    /// the plane thickness).
    pub fn extents(&self) -> (f64, f64) {
        (self.bbox.delta().x, self.bbox.delta().y)
    }
}

/// Structured descriptor of one scanned object: overall bounding box plus
/// planar faces, largest face first. Immutable once built; persisted as a
/// model under a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterizedObject {
    /// Axis-aligned bounding box over the object's points, sensor frame
    pub bbox: BBox,
    /// Faces in descending order of member count
    pub faces: Vec<Face>,
    /// The object's points, referenced by face member indices
    pub points: Vec<Point>,
}

impl CharacterizedObject {
    /// Number of detected faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}
