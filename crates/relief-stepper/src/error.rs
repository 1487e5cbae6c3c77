//! Error type for the terrain stepper.

use relief_dem::{DemError, ErrorCode};
use relief_geodesy::GeoError;
use thiserror::Error;

/// Errors that can occur while sampling layered terrain.
#[derive(Debug, Error)]
pub enum StepperError {
    /// Tile cache or map error.
    #[error(transparent)]
    Dem(#[from] DemError),

    /// Geodetic conversion or projection error.
    #[error(transparent)]
    Geodesy(#[from] GeoError),

    /// Malformed JSON layer description.
    #[error("malformed layer description: {0}")]
    Json(#[from] serde_json::Error),

    /// Layer description names a kind the stepper does not provide.
    #[error("unknown layer kind: {0:?}")]
    UnknownLayerKind(String),

    /// No registered layer covers the sampled point.
    #[error("no layer covers ({lat}, {lon})")]
    NoLayer {
        /// Latitude of the sampled point.
        lat: f64,
        /// Longitude of the sampled point.
        lon: f64,
    },
}

impl StepperError {
    /// The stable code this error maps onto.
    pub fn code(&self) -> ErrorCode {
        match self {
            StepperError::Dem(e) => e.code(),
            StepperError::Geodesy(GeoError::ZeroDirection) => ErrorCode::DomainError,
            StepperError::Geodesy(_) => ErrorCode::BadProjection,
            StepperError::Json(_) => ErrorCode::BadJson,
            StepperError::UnknownLayerKind(_) => ErrorCode::DomainError,
            StepperError::NoLayer { .. } => ErrorCode::DomainError,
        }
    }
}
