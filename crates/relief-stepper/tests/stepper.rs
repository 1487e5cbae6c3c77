//! Stepper behavior: layer precedence, local-frame accuracy, geoid
//! correction and JSON registration.

use std::path::Path;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use relief_dem::ErrorCode;
use relief_geodesy::{ecef_to_geodetic, enu_basis, geodetic_to_ecef};
use relief_stepper::{Map, Stack, Stepper, StepperError};
use tempfile::TempDir;

/// Write an SRTM-style `.hgt` tile with a constant elevation.
fn write_srtm_tile(dir: &Path, lat: i32, lon: i32, n: usize, z: i16) {
    let ns = if lat < 0 { 'S' } else { 'N' };
    let ew = if lon < 0 { 'W' } else { 'E' };
    let name = format!("{}{:02}{}{:03}.hgt", ns, lat.abs(), ew, lon.abs());
    let mut bytes = Vec::with_capacity(n * n * 2);
    for _ in 0..n * n {
        bytes.extend_from_slice(&z.to_be_bytes());
    }
    std::fs::write(dir.join(name), bytes).unwrap();
}

/// A constant geographic map patch over lat 45..46, lon 3..4.
fn patch_map(value: f64) -> Arc<Map> {
    Arc::new(Map::new([3.0, 45.0], [1.0, 1.0], [2, 2], vec![value; 4], None).unwrap())
}

#[test]
fn test_layer_precedence() {
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.add_map(patch_map(500.0));

    // Inside the patch the top layer wins.
    let step = stepper.step(geodetic_to_ecef(45.5, 3.5, 2000.0)).unwrap();
    let ground = step.ground.unwrap();
    assert_eq!(ground.layer, 1);
    assert_abs_diff_eq!(ground.elevation, 500.0, epsilon = 1e-9);

    // Outside it falls through to the flat bottom layer.
    let step = stepper.step(geodetic_to_ecef(50.0, 10.0, 2000.0)).unwrap();
    let ground = step.ground.unwrap();
    assert_eq!(ground.layer, 0);
    assert_abs_diff_eq!(ground.elevation, 0.0, epsilon = 1e-9);
}

#[test]
fn test_no_layer_hit() {
    let mut stepper = Stepper::new();
    stepper.add_map(patch_map(500.0));

    let position = geodetic_to_ecef(50.0, 10.0, 2000.0);
    let step = stepper.step(position).unwrap();
    assert!(step.ground.is_none());

    let err = stepper.step_strict(position).unwrap_err();
    assert!(matches!(err, StepperError::NoLayer { .. }));
    assert_eq!(err.code(), ErrorCode::DomainError);
}

#[test]
fn test_local_frame_accuracy_within_range() {
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.set_range(100.0);

    let origin = geodetic_to_ecef(45.0, 3.0, 1000.0);
    let [east, north, up] = enu_basis(45.0, 3.0);

    // Prime the frame on the origin itself.
    let step = stepper.step(origin).unwrap();
    assert_abs_diff_eq!(step.latitude, 45.0, epsilon = 1e-9);

    // 100 points spread through the 100 m sphere around the origin.
    for i in 0..100 {
        let angle = f64::from(i) * 0.7;
        let radius = 10.0 + f64::from(i) * 0.9;
        let e = radius * angle.cos();
        let n = radius * angle.sin();
        let u = f64::from(i % 21) - 10.0;
        let mut position = origin;
        for k in 0..3 {
            position[k] += e * east[k] + n * north[k] + u * up[k];
        }

        let step = stepper.step(position).unwrap();
        // Rebuilding the ECEF point from the approximate geodetic result
        // must land within a centimeter of the true point.
        let rebuilt = geodetic_to_ecef(step.latitude, step.longitude, step.altitude);
        let err = ((rebuilt[0] - position[0]).powi(2)
            + (rebuilt[1] - position[1]).powi(2)
            + (rebuilt[2] - position[2]).powi(2))
        .sqrt();
        assert!(err < 0.01, "point {}: {} m off the exact transform", i, err);
    }
}

#[test]
fn test_local_frame_reprimes_out_of_range() {
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.set_range(100.0);

    stepper.step(geodetic_to_ecef(45.0, 3.0, 1000.0)).unwrap();

    // 10 km away: outside the frame, so the result is the exact transform.
    let far = geodetic_to_ecef(45.09, 3.0, 1000.0);
    let step = stepper.step(far).unwrap();
    let (lat, lon, alt) = ecef_to_geodetic(&far);
    assert_abs_diff_eq!(step.latitude, lat, epsilon = 1e-12);
    assert_abs_diff_eq!(step.longitude, lon, epsilon = 1e-12);
    assert_abs_diff_eq!(step.altitude, alt, epsilon = 1e-9);
}

#[test]
fn test_range_disabled_is_exact() {
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.set_range(100.0);
    stepper.step(geodetic_to_ecef(45.0, 3.0, 1000.0)).unwrap();

    // Disabling the cache drops the primed frame.
    stepper.set_range(0.0);
    assert_eq!(stepper.range(), 0.0);
    let position = geodetic_to_ecef(45.0001, 3.0001, 1000.0);
    let step = stepper.step(position).unwrap();
    let (lat, lon, _) = ecef_to_geodetic(&position);
    assert_abs_diff_eq!(step.latitude, lat, epsilon = 1e-12);
    assert_abs_diff_eq!(step.longitude, lon, epsilon = 1e-12);
}

#[test]
fn test_geoid_correction() {
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    // 50 m of undulation over the patch.
    stepper.set_geoid(patch_map(50.0));

    let step = stepper.step(geodetic_to_ecef(45.5, 3.5, 1000.0)).unwrap();
    assert_abs_diff_eq!(step.altitude, 950.0, epsilon = 1e-6);

    // Outside the geoid grid the altitude stays ellipsoidal.
    let step = stepper.step(geodetic_to_ecef(50.0, 10.0, 1000.0)).unwrap();
    assert_abs_diff_eq!(step.altitude, 1000.0, epsilon = 1e-6);
}

#[test]
fn test_stack_layer() {
    let dir = TempDir::new().unwrap();
    write_srtm_tile(dir.path(), 45, 3, 11, 800);

    let stack = Arc::new(Stack::new(dir.path(), 2, None, None).unwrap());
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.add_stack(&stack).unwrap();

    let step = stepper.step(geodetic_to_ecef(45.5, 3.5, 1200.0)).unwrap();
    let ground = step.ground.unwrap();
    assert_eq!(ground.layer, 1);
    assert_abs_diff_eq!(ground.elevation, 800.0, epsilon = 1e-9);

    // Outside the tile directory's coverage the flat layer answers.
    let step = stepper.step(geodetic_to_ecef(10.0, 10.0, 1200.0)).unwrap();
    assert_eq!(step.ground.unwrap().layer, 0);
}

#[test]
fn test_stepper_owns_stack_clients() {
    let dir = TempDir::new().unwrap();
    write_srtm_tile(dir.path(), 45, 3, 11, 800);

    let lock: relief_dem::LockHook = Box::new(|| 0);
    let unlock: relief_dem::LockHook = Box::new(|| 0);
    let stack = Arc::new(Stack::new(dir.path(), 2, Some(lock), Some(unlock)).unwrap());

    let mut stepper = Stepper::new();
    stepper.add_stack(&stack).unwrap();
    stepper.step(geodetic_to_ecef(45.5, 3.5, 1200.0)).unwrap();
    assert_eq!(stack.total_pins(), 1);

    // Dropping the stepper drops its client and the pin with it.
    drop(stepper);
    assert_eq!(stack.total_pins(), 0);
}

#[test]
fn test_json_registration() {
    let dir = TempDir::new().unwrap();
    write_srtm_tile(dir.path(), 45, 3, 11, 800);

    let json = serde_json::json!([
        { "kind": "flat", "z": 0.0 },
        { "kind": "stack", "path": dir.path(), "max_tiles": 2, "format": "srtm" },
    ])
    .to_string();

    let mut stepper = Stepper::new();
    stepper.add_layers_json(&json).unwrap();
    assert_eq!(stepper.layer_count(), 2);

    let step = stepper.step(geodetic_to_ecef(45.5, 3.5, 1200.0)).unwrap();
    assert_eq!(step.ground.unwrap().layer, 1);
    assert_abs_diff_eq!(step.ground.unwrap().elevation, 800.0, epsilon = 1e-9);
}

#[test]
fn test_json_map_layer() {
    let json = serde_json::json!([
        { "kind": "flat", "z": 0.0 },
        { "kind": "map", "origin": [3.0, 45.0], "step": [1.0, 1.0],
          "shape": [2, 2], "values": [500.0, 500.0, 500.0, 500.0] },
    ])
    .to_string();

    let mut stepper = Stepper::new();
    stepper.add_layers_json(&json).unwrap();
    assert_eq!(stepper.layer_count(), 2);

    let step = stepper.step(geodetic_to_ecef(45.5, 3.5, 1000.0)).unwrap();
    assert_eq!(step.ground.unwrap().layer, 1);
    assert_abs_diff_eq!(step.ground.unwrap().elevation, 500.0, epsilon = 1e-9);

    let step = stepper.step(geodetic_to_ecef(50.0, 10.0, 1000.0)).unwrap();
    assert_eq!(step.ground.unwrap().layer, 0);
}

#[test]
fn test_json_rejects_garbage() {
    let mut stepper = Stepper::new();

    let err = stepper.add_layers_json("[{").unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadJson);

    // A kind outside the supported set is a domain error, not bad JSON.
    let err = stepper
        .add_layers_json(r#"[{ "kind": "volcano", "z": 1.0 }]"#)
        .unwrap_err();
    assert!(matches!(err, StepperError::UnknownLayerKind(ref kind) if kind == "volcano"));
    assert_eq!(err.code(), ErrorCode::DomainError);

    let err = stepper
        .add_layers_json(r#"[{ "kind": "stack", "path": "/nowhere", "format": "dted" }]"#)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadFormat);

    let err = stepper
        .add_layers_json(
            r#"[{ "kind": "map", "origin": [0.0, 0.0], "step": [1.0, 1.0],
                  "shape": [2, 2], "values": [0.0, 0.0, 0.0, 0.0],
                  "projection": "Mercator" }]"#,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadProjection);
}
