//! End-to-end anomaly scenarios: characterize synthetic clouds and compare.

mod common;

use common::{box_surface, cube_surface, tuned_config};
use drishti_core::{characterize, compare, DetectionConfig, Point, Vector};

#[test]
fn test_shrunk_axis_anomaly() {
    // Model: a 100 mm cube. Observed: the same object flattened to half
    // height. The overall z extent and the four side faces must flag it.
    let config = tuned_config();
    let model = characterize(
        cube_surface(Point::new(0.0, 0.0, 500.0), 100.0, 2.0),
        &config,
    )
    .unwrap();
    let observed = characterize(
        box_surface(Point::new(0.0, 0.0, 500.0), Vector::new(100.0, 100.0, 50.0), 2.0),
        &config,
    )
    .unwrap();

    let report = compare(&observed, &model, &DetectionConfig::default());

    assert!(!report.similar);
    assert_eq!(report.delta_face_count, 0);
    assert!((report.overall.dx).abs() <= 1e-6);
    assert!((report.overall.dy).abs() <= 1e-6);
    assert!((report.overall.dz - 50.0).abs() <= 1e-6);

    assert_eq!(report.face_comparisons.len(), 6);
    assert!(report.face_comparisons.iter().all(|fc| fc.matched.is_some()));

    // The two z-normal faces kept their shape; the four side faces lost
    // 50 mm along one local axis.
    let mut flagged = 0;
    for fc in &report.face_comparisons {
        let m = fc.matched.as_ref().unwrap();
        if m.deltas.max_abs() > 25.0 {
            flagged += 1;
            assert!((m.deltas.max_abs() - 50.0).abs() <= 6.0);
        } else {
            assert!(m.deltas.max_abs() <= 6.0);
        }
    }
    assert_eq!(flagged, 4);
}

#[test]
fn test_missing_face_anomaly() {
    // Observed: the model cube with its top face removed.
    let config = tuned_config();
    let cloud = cube_surface(Point::new(0.0, 0.0, 500.0), 100.0, 2.0);
    let model = characterize(cloud.clone(), &config).unwrap();
    assert_eq!(model.face_count(), 6);

    let top = cloud.iter().map(|p| p.z).fold(f64::MIN, f64::max);
    let without_top: Vec<Point> = cloud
        .into_iter()
        .filter(|p| (p.z - top).abs() > 1e-9)
        .collect();
    let observed = characterize(without_top, &config).unwrap();
    assert_eq!(observed.face_count(), 5);

    let report = compare(&observed, &model, &DetectionConfig::default());

    // Greedy matching runs over the observed faces, so the unmatched side
    // is the model's: the report carries one comparison per observed face
    // plus the face-count delta.
    assert_eq!(report.delta_face_count, 1);
    assert_eq!(report.face_comparisons.len(), 5);
    assert!(report.face_comparisons.iter().all(|fc| fc.matched.is_some()));

    // All five matched faces are distinct model faces.
    let mut matched: Vec<usize> = report
        .face_comparisons
        .iter()
        .map(|fc| fc.matched.as_ref().unwrap().model_face)
        .collect();
    matched.sort_unstable();
    matched.dedup();
    assert_eq!(matched.len(), 5);
}

#[test]
fn test_same_object_twice_is_similar() {
    let config = tuned_config();
    let cloud = cube_surface(Point::new(0.0, 0.0, 500.0), 100.0, 2.0);
    let model = characterize(cloud.clone(), &config).unwrap();
    let observed = characterize(cloud, &config).unwrap();

    let report = compare(&observed, &model, &DetectionConfig::default());
    assert!(report.similar, "identical clouds must compare similar");
    assert_eq!(report.overall.max_abs(), 0.0);
}
