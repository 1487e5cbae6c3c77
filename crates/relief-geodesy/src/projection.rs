//! Lambert conformal conic and UTM map projections.
//!
//! Projections are parsed from their conventional names: the French
//! `Lambert I..IV`, `Lambert IIe` and `Lambert 93` zones, and
//! `UTM {zone}{N|S}` (or `UTM {central longitude}{N|S}` for a transverse
//! Mercator strip centered on an arbitrary meridian).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

use crate::{GeoError, Result, WGS84_A, WGS84_E};

/// UTM scale factor on the central meridian.
const K0: f64 = 0.9996;

/// A supported map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Lambert conformal conic, one of the French national zones.
    Lambert(LambertZone),
    /// Transverse Mercator strip with UTM conventions.
    Utm {
        /// Central meridian in degrees.
        central_longitude: f64,
        /// Hemisphere, selecting the false northing.
        hemisphere: Hemisphere,
    },
}

/// French Lambert conformal conic zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambertZone {
    I,
    II,
    IIe,
    III,
    IV,
    /// Lambert 93, the RGF93 national grid.
    Rgf93,
}

/// Hemisphere of a UTM strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// Secant-form parameters of a Lambert conformal conic zone.
struct LambertParameters {
    /// First eccentricity of the zone's reference ellipsoid.
    e: f64,
    /// Central meridian in radians.
    lambda0: f64,
    /// Cone constant (sine of the reference latitude).
    n: f64,
    /// Projected radius of the equator, meters.
    c: f64,
    /// False easting, meters.
    xs: f64,
    /// False northing of the cone apex, meters.
    ys: f64,
}

/// Clarke 1880 IGN eccentricity (NTF zones).
const NTF_E: f64 = 0.082_483_256_76;
/// GRS80 eccentricity (Lambert 93).
const GRS80_E: f64 = 0.081_819_191_042_8;
/// Paris meridian relative to Greenwich, degrees (2 deg 20 min 14.025 sec).
const PARIS_MERIDIAN_DEG: f64 = 2.337_229_166_666_667;

impl LambertZone {
    fn parameters(self) -> LambertParameters {
        let paris = PARIS_MERIDIAN_DEG.to_radians();
        match self {
            LambertZone::I => LambertParameters {
                e: NTF_E,
                lambda0: paris,
                n: 0.760_405_965_6,
                c: 11_603_796.98,
                xs: 600_000.0,
                ys: 5_657_616.674,
            },
            LambertZone::II => LambertParameters {
                e: NTF_E,
                lambda0: paris,
                n: 0.728_968_627_4,
                c: 11_745_793.39,
                xs: 600_000.0,
                ys: 6_199_695.768,
            },
            LambertZone::IIe => LambertParameters {
                e: NTF_E,
                lambda0: paris,
                n: 0.728_968_627_4,
                c: 11_745_793.39,
                xs: 600_000.0,
                ys: 8_199_695.768,
            },
            LambertZone::III => LambertParameters {
                e: NTF_E,
                lambda0: paris,
                n: 0.695_912_796_6,
                c: 11_947_992.52,
                xs: 600_000.0,
                ys: 6_791_905.085,
            },
            LambertZone::IV => LambertParameters {
                e: NTF_E,
                lambda0: paris,
                n: 0.671_267_932_2,
                c: 12_136_281.99,
                xs: 234.358,
                ys: 7_239_161.542,
            },
            LambertZone::Rgf93 => LambertParameters {
                e: GRS80_E,
                lambda0: 3.0_f64.to_radians(),
                n: 0.725_607_765_0,
                c: 11_754_255.426,
                xs: 700_000.0,
                ys: 12_655_612.050,
            },
        }
    }
}

impl Projection {
    /// Project geodetic coordinates (degrees) to map coordinates (meters).
    pub fn project(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        match *self {
            Projection::Lambert(zone) => {
                let p = zone.parameters();
                let l = isometric_latitude(latitude.to_radians(), p.e);
                let r = p.c * (-p.n * l).exp();
                let gamma = p.n * (longitude.to_radians() - p.lambda0);
                (p.xs + r * gamma.sin(), p.ys - r * gamma.cos())
            }
            Projection::Utm {
                central_longitude,
                hemisphere,
            } => utm_project(latitude, longitude, central_longitude, hemisphere),
        }
    }

    /// Invert map coordinates (meters) back to geodetic degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Projection::Lambert(zone) => {
                let p = zone.parameters();
                let dx = x - p.xs;
                let dy = p.ys - y;
                let r = dx.hypot(dy);
                let gamma = dx.atan2(dy);
                let longitude = (p.lambda0 + gamma / p.n).to_degrees();
                let l = -(r / p.c).ln() / p.n;
                (latitude_from_isometric(l, p.e).to_degrees(), longitude)
            }
            Projection::Utm {
                central_longitude,
                hemisphere,
            } => utm_unproject(x, y, central_longitude, hemisphere),
        }
    }
}

/// Isometric latitude on an ellipsoid of eccentricity `e`.
fn isometric_latitude(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 + phi / 2.0).tan().ln() - e / 2.0 * ((1.0 + es) / (1.0 - es)).ln()
}

/// Latitude whose isometric latitude is `l`, by fixed-point iteration.
fn latitude_from_isometric(l: f64, e: f64) -> f64 {
    let mut phi = 2.0 * l.exp().atan() - FRAC_PI_2;
    for _ in 0..16 {
        let es = e * phi.sin();
        let next = 2.0 * (l + e / 2.0 * ((1.0 + es) / (1.0 - es)).ln()).exp().atan() - FRAC_PI_2;
        if (next - phi).abs() < 1e-13 {
            return next;
        }
        phi = next;
    }
    phi
}

/// Meridian arc length from the equator to `phi` on WGS84, meters.
fn meridian_arc(phi: f64) -> f64 {
    let e2 = WGS84_E * WGS84_E;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - 35.0 * e6 / 3072.0 * (6.0 * phi).sin())
}

fn utm_project(latitude: f64, longitude: f64, central: f64, hemisphere: Hemisphere) -> (f64, f64) {
    let e2 = WGS84_E * WGS84_E;
    let ep2 = e2 / (1.0 - e2);
    let phi = latitude.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = sin_phi / cos_phi;

    let mut dl = longitude - central;
    if dl > 180.0 {
        dl -= 360.0;
    } else if dl < -180.0 {
        dl += 360.0;
    }

    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = dl.to_radians() * cos_phi;
    let a2 = a * a;
    let m = meridian_arc(phi);

    let x = 500_000.0
        + K0 * n
            * (a + (1.0 - t + c) * a2 * a / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a2 * a2 * a / 120.0);
    let mut y = K0
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a2 * a2 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a2 * a2 * a2 / 720.0));
    if hemisphere == Hemisphere::South {
        y += 10_000_000.0;
    }
    (x, y)
}

fn utm_unproject(x: f64, y: f64, central: f64, hemisphere: Hemisphere) -> (f64, f64) {
    let e2 = WGS84_E * WGS84_E;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let northing = match hemisphere {
        Hemisphere::North => y,
        Hemisphere::South => y - 10_000_000.0,
    };

    let m = northing / K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let tan_phi1 = sin_phi1 / cos_phi1;
    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let w = 1.0 - e2 * sin_phi1 * sin_phi1;
    let n1 = WGS84_A / w.sqrt();
    let r1 = WGS84_A * (1.0 - e2) / (w * w.sqrt());
    let d = (x - 500_000.0) / (n1 * K0);
    let d2 = d * d;

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d2 * d2 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d2
                    * d2
                    * d2
                    / 720.0);
    let dl = (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
            * d2
            * d2
            * d
            / 120.0)
        / cos_phi1;

    (phi.to_degrees(), central + dl.to_degrees())
}

impl FromStr for Projection {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(rest) = trimmed.strip_prefix("Lambert") {
            let zone = match rest.trim() {
                "I" => LambertZone::I,
                "II" => LambertZone::II,
                "IIe" => LambertZone::IIe,
                "III" => LambertZone::III,
                "IV" => LambertZone::IV,
                "93" => LambertZone::Rgf93,
                _ => return Err(GeoError::UnknownProjection(s.to_string())),
            };
            return Ok(Projection::Lambert(zone));
        }
        if let Some(rest) = trimmed.strip_prefix("UTM") {
            let rest = rest.trim();
            let hemisphere = match rest.chars().last() {
                Some('N') => Hemisphere::North,
                Some('S') => Hemisphere::South,
                _ => return Err(GeoError::UnknownProjection(s.to_string())),
            };
            let body = rest[..rest.len() - 1].trim();
            if body.is_empty() {
                return Err(GeoError::UnknownProjection(s.to_string()));
            }
            let central_longitude = if let Ok(zone) = body.parse::<i32>() {
                if !(1..=60).contains(&zone) {
                    return Err(GeoError::InvalidUtmZone(zone));
                }
                f64::from(6 * zone - 183)
            } else if let Ok(longitude) = body.parse::<f64>() {
                longitude
            } else {
                return Err(GeoError::UnknownProjection(s.to_string()));
            };
            return Ok(Projection::Utm {
                central_longitude,
                hemisphere,
            });
        }
        Err(GeoError::UnknownProjection(s.to_string()))
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Projection::Lambert(zone) => {
                let name = match zone {
                    LambertZone::I => "I",
                    LambertZone::II => "II",
                    LambertZone::IIe => "IIe",
                    LambertZone::III => "III",
                    LambertZone::IV => "IV",
                    LambertZone::Rgf93 => "93",
                };
                write!(f, "Lambert {}", name)
            }
            Projection::Utm {
                central_longitude,
                hemisphere,
            } => {
                let tag = match hemisphere {
                    Hemisphere::North => 'N',
                    Hemisphere::South => 'S',
                };
                let zone = (central_longitude + 183.0) / 6.0;
                if zone.fract() == 0.0 && (1.0..=60.0).contains(&zone) {
                    write!(f, "UTM {}{}", zone as i32, tag)
                } else {
                    write!(f, "UTM {}{}", central_longitude, tag)
                }
            }
        }
    }
}
