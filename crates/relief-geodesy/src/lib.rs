//! # relief-geodesy
//!
//! Geodetic conversions and map projections for terrain sampling.
//!
//! This crate provides the pure-math layer of the relief workspace:
//!
//! - Conversions between geodetic coordinates (latitude, longitude,
//!   altitude above the WGS84 ellipsoid) and Earth-Centered-Earth-Fixed
//!   (ECEF) Cartesian coordinates.
//! - Local East-North-Up bases and horizontal (azimuth, elevation)
//!   direction conversions.
//! - The Lambert conformal conic zones used by French national grids and
//!   UTM transverse Mercator, parsed from their conventional names.
//!
//! Angles are degrees at every public boundary; radians are an internal
//! detail.
//!
//! ## Example
//!
//! ```
//! use relief_geodesy::{ecef_to_geodetic, geodetic_to_ecef, Projection};
//!
//! let ecef = geodetic_to_ecef(45.0, 3.0, 1000.0);
//! let (lat, lon, alt) = ecef_to_geodetic(&ecef);
//! assert!((lat - 45.0).abs() < 1e-9);
//!
//! let utm: Projection = "UTM 31N".parse()?;
//! let (x, y) = utm.project(45.0, 3.0);
//! let (lat, lon) = utm.unproject(x, y);
//! assert!((lat - 45.0).abs() < 1e-6 && (lon - 3.0).abs() < 1e-6);
//! # Ok::<(), relief_geodesy::GeoError>(())
//! ```

mod ecef;
mod error;
mod projection;

pub use ecef::{
    ecef_to_geodetic, ecef_to_horizontal, enu_basis, geodetic_to_ecef, horizontal_to_ecef,
    meridional_radius, prime_vertical_radius, WGS84_A, WGS84_E,
};
pub use error::GeoError;
pub use projection::{Hemisphere, LambertZone, Projection};

/// Result type for geodesy operations.
pub type Result<T> = std::result::Result<T, GeoError>;
