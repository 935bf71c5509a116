//! Persisted model codec.
//!
//! A characterized object is stored as a flat little-endian stream, floats
//! as IEEE-754 binary64:
//!
//! ```text
//! [u32 version]
//! [object bbox: min xyz, max xyz]
//! [u32 face count]
//! per face:
//!   [normal xyz][centroid xyz][local bbox: min xyz, max xyz]
//!   [u32 member count][member xyz ...]
//! ```
//!
//! The loader rejects unknown version words. Object points are rebuilt from
//! the face member coordinates, so points outside every face are not
//! persisted; the object bounding box is stored explicitly for that reason.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::types::{BBox, Point};
use crate::engine::object::{CharacterizedObject, Face};
use crate::error::{Error, Result};

/// Current model format version.
pub const MODEL_VERSION: u32 = 2;

/// Serialize an object into a writer.
pub fn save(object: &CharacterizedObject, w: &mut impl Write) -> Result<()> {
    w.write_all(&MODEL_VERSION.to_le_bytes())?;
    write_bbox(w, &object.bbox)?;
    write_u32(w, object.faces.len())?;

    for face in &object.faces {
        write_point(w, &face.normal)?;
        write_point(w, &face.centroid)?;
        write_bbox(w, &face.bbox)?;
        write_u32(w, face.members.len())?;
        for &i in &face.members {
            write_point(w, &object.points[i])?;
        }
    }
    Ok(())
}

/// Deserialize an object from a reader.
pub fn load(r: &mut impl Read) -> Result<CharacterizedObject> {
    let version = read_u32(r)?;
    if version != MODEL_VERSION {
        return Err(Error::Model(format!(
            "unsupported model version {} (expected {})",
            version, MODEL_VERSION
        )));
    }

    let bbox = read_bbox(r)?;
    let face_count = read_u32(r)? as usize;

    let mut points = Vec::new();
    let mut faces = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        let normal = read_point(r)?;
        let centroid = read_point(r)?;
        let face_bbox = read_bbox(r)?;
        let member_count = read_u32(r)? as usize;

        let mut members = Vec::with_capacity(member_count);
        for _ in 0..member_count {
            members.push(points.len());
            points.push(read_point(r)?);
        }

        faces.push(Face {
            normal,
            centroid,
            bbox: face_bbox,
            members,
        });
    }

    Ok(CharacterizedObject {
        bbox,
        faces,
        points,
    })
}

/// Write an object to a file.
pub fn save_file(object: &CharacterizedObject, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    save(object, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read an object from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<CharacterizedObject> {
    let mut reader = BufReader::new(File::open(path)?);
    load(&mut reader)
}

fn write_u32(w: &mut impl Write, value: usize) -> Result<()> {
    let value = u32::try_from(value).map_err(|_| Error::Model("count overflow".to_string()))?;
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_point(w: &mut impl Write, p: &Point) -> Result<()> {
    w.write_all(&p.x.to_le_bytes())?;
    w.write_all(&p.y.to_le_bytes())?;
    w.write_all(&p.z.to_le_bytes())?;
    Ok(())
}

fn write_bbox(w: &mut impl Write, bbox: &BBox) -> Result<()> {
    write_point(w, bbox.min())?;
    write_point(w, bbox.max())?;
    Ok(())
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut buffer = [0u8; 4];
    r.read_exact(&mut buffer)
        .map_err(|_| Error::Model("truncated model".to_string()))?;
    Ok(u32::from_le_bytes(buffer))
}

fn read_f64(r: &mut impl Read) -> Result<f64> {
    let mut buffer = [0u8; 8];
    r.read_exact(&mut buffer)
        .map_err(|_| Error::Model("truncated model".to_string()))?;
    Ok(f64::from_le_bytes(buffer))
}

fn read_point(r: &mut impl Read) -> Result<Point> {
    Ok(Point::new(read_f64(r)?, read_f64(r)?, read_f64(r)?))
}

fn read_bbox(r: &mut impl Read) -> Result<BBox> {
    let min = read_point(r)?;
    let max = read_point(r)?;
    Ok(BBox::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vector;

    fn sample_object() -> CharacterizedObject {
        let points = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(10.0, 0.0, 0.5),
            Point::new(0.0, 10.0, -0.5),
            Point::new(5.0, 5.0, 20.0),
        ];
        let faces = vec![
            Face {
                normal: Vector::new(0.0, 0.0, 1.0),
                centroid: Point::new(3.3, 3.3, 0.0),
                bbox: BBox::new(Point::new(0.0, 0.0, -0.5), Point::new(10.0, 10.0, 0.5)),
                members: vec![0, 1, 2],
            },
            Face {
                normal: Vector::new(1.0, 0.0, 0.0),
                centroid: Point::new(5.0, 5.0, 20.0),
                bbox: BBox::new(Point::ZERO, Point::new(0.0, 1.0, 1.0)),
                members: vec![3],
            },
        ];
        CharacterizedObject {
            bbox: BBox::new(Point::new(0.0, 0.0, -0.5), Point::new(10.0, 10.0, 20.0)),
            faces,
            points,
        }
    }

    #[test]
    fn test_roundtrip() {
        let object = sample_object();
        let mut buffer = Vec::new();
        save(&object, &mut buffer).unwrap();

        let loaded = load(&mut buffer.as_slice()).unwrap();
        assert_eq!(*loaded.bbox.min(), *object.bbox.min());
        assert_eq!(*loaded.bbox.delta(), *object.bbox.delta());
        assert_eq!(loaded.faces.len(), 2);
        assert_eq!(loaded.points.len(), 4);
        for (a, b) in loaded.faces.iter().zip(&object.faces) {
            assert_eq!(a.normal, b.normal);
            assert_eq!(a.centroid, b.centroid);
            assert_eq!(a.members.len(), b.members.len());
            for (&i, &j) in a.members.iter().zip(&b.members) {
                assert_eq!(loaded.points[i], object.points[j]);
            }
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let object = sample_object();
        let mut buffer = Vec::new();
        save(&object, &mut buffer).unwrap();
        buffer[0] = 0xFF;

        assert!(matches!(load(&mut buffer.as_slice()), Err(Error::Model(_))));
    }

    #[test]
    fn test_truncated_model_rejected() {
        let object = sample_object();
        let mut buffer = Vec::new();
        save(&object, &mut buffer).unwrap();
        buffer.truncate(buffer.len() / 2);

        assert!(matches!(load(&mut buffer.as_slice()), Err(Error::Model(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.dmod");
        let object = sample_object();
        save_file(&object, &path).unwrap();
        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.faces.len(), object.faces.len());
    }
}
