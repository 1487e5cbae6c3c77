//! ECEF, geodetic and horizontal coordinate conversions.

use crate::{GeoError, Result};

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity.
pub const WGS84_E: f64 = 0.081_819_190_842_622;

const E2: f64 = WGS84_E * WGS84_E;

/// Convert geodetic coordinates to ECEF.
///
/// `latitude` and `longitude` are in degrees, `altitude` in meters above
/// the WGS84 ellipsoid. Returns `[x, y, z]` in meters.
pub fn geodetic_to_ecef(latitude: f64, longitude: f64, altitude: f64) -> [f64; 3] {
    let (sin_phi, cos_phi) = latitude.to_radians().sin_cos();
    let (sin_lam, cos_lam) = longitude.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - E2 * sin_phi * sin_phi).sqrt();
    [
        (n + altitude) * cos_phi * cos_lam,
        (n + altitude) * cos_phi * sin_lam,
        (n * (1.0 - E2) + altitude) * sin_phi,
    ]
}

/// Convert an ECEF position to geodetic coordinates.
///
/// Uses Bowring's (1985) closed form with a single parametric-latitude
/// iteration, which is accurate to well under a millimeter for terrestrial
/// positions. Returns `(latitude, longitude, altitude)` with angles in
/// degrees.
///
/// On the polar axis the longitude is reported as 0; on the equatorial
/// plane the latitude is exactly 0.
pub fn ecef_to_geodetic(position: &[f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = *position;
    let b = WGS84_A * (1.0 - E2).sqrt();
    let p = x.hypot(y);

    if p == 0.0 {
        let latitude = if z < 0.0 { -90.0 } else { 90.0 };
        return (latitude, 0.0, z.abs() - b);
    }
    let longitude = y.atan2(x).to_degrees();
    if z == 0.0 {
        return (0.0, longitude, p - WGS84_A);
    }

    let ep2 = (WGS84_A * WGS84_A - b * b) / (b * b);
    let u = (z * WGS84_A).atan2(p * b);
    let (sin_u, cos_u) = u.sin_cos();
    let phi = (z + ep2 * b * sin_u.powi(3)).atan2(p - E2 * WGS84_A * cos_u.powi(3));
    let (sin_phi, cos_phi) = phi.sin_cos();
    let n = WGS84_A / (1.0 - E2 * sin_phi * sin_phi).sqrt();
    let altitude = p * cos_phi + z * sin_phi - WGS84_A * WGS84_A / n;

    (phi.to_degrees(), longitude, altitude)
}

/// Local East-North-Up basis at a geodetic position.
///
/// Returns `[east, north, up]` as unit vectors in ECEF coordinates.
pub fn enu_basis(latitude: f64, longitude: f64) -> [[f64; 3]; 3] {
    let (sin_phi, cos_phi) = latitude.to_radians().sin_cos();
    let (sin_lam, cos_lam) = longitude.to_radians().sin_cos();
    [
        [-sin_lam, cos_lam, 0.0],
        [-sin_phi * cos_lam, -sin_phi * sin_lam, cos_phi],
        [cos_phi * cos_lam, cos_phi * sin_lam, sin_phi],
    ]
}

/// ECEF direction of a horizontal (azimuth, elevation) pair.
///
/// Azimuth is degrees clockwise from north, elevation degrees above the
/// local horizontal plane. The result is a unit vector.
pub fn horizontal_to_ecef(latitude: f64, longitude: f64, azimuth: f64, elevation: f64) -> [f64; 3] {
    let [east, north, up] = enu_basis(latitude, longitude);
    let (sin_az, cos_az) = azimuth.to_radians().sin_cos();
    let (sin_el, cos_el) = elevation.to_radians().sin_cos();
    let mut direction = [0.0; 3];
    for i in 0..3 {
        direction[i] = cos_el * sin_az * east[i] + cos_el * cos_az * north[i] + sin_el * up[i];
    }
    direction
}

/// Horizontal (azimuth, elevation) of an ECEF direction at a position.
///
/// The direction does not need to be normalized. Azimuth is reported in
/// `[0, 360)` degrees. Fails for a zero direction vector.
pub fn ecef_to_horizontal(latitude: f64, longitude: f64, direction: &[f64; 3]) -> Result<(f64, f64)> {
    let norm = (direction[0] * direction[0]
        + direction[1] * direction[1]
        + direction[2] * direction[2])
        .sqrt();
    if norm <= 0.0 {
        return Err(GeoError::ZeroDirection);
    }
    let [east, north, up] = enu_basis(latitude, longitude);
    let e = dot(direction, &east);
    let n = dot(direction, &north);
    let u = dot(direction, &up);

    let mut azimuth = e.atan2(n).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    let elevation = (u / norm).clamp(-1.0, 1.0).asin().to_degrees();
    Ok((azimuth, elevation))
}

/// Meridional radius of curvature at a latitude, in meters.
pub fn meridional_radius(latitude: f64) -> f64 {
    let s = latitude.to_radians().sin();
    let w2 = 1.0 - E2 * s * s;
    WGS84_A * (1.0 - E2) / (w2 * w2.sqrt())
}

/// Prime-vertical radius of curvature at a latitude, in meters.
pub fn prime_vertical_radius(latitude: f64) -> f64 {
    let s = latitude.to_radians().sin();
    WGS84_A / (1.0 - E2 * s * s).sqrt()
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
