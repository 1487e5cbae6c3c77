//! Error types for geodetic conversions and projections.

use thiserror::Error;

/// Errors that can occur in geodetic conversions and projections.
#[derive(Debug, Error)]
pub enum GeoError {
    /// A direction vector of zero length has no azimuth or elevation.
    #[error("cannot derive azimuth/elevation from a zero direction vector")]
    ZeroDirection,

    /// Projection name not part of the supported grammar.
    #[error("unrecognized projection: {0:?}")]
    UnknownProjection(String),

    /// UTM zone outside the valid range.
    #[error("UTM zone {0} outside 1-60")]
    InvalidUtmZone(i32),
}
