//! Error types and the stable error-code taxonomy.

use std::path::PathBuf;

use relief_geodesy::GeoError;
use thiserror::Error;

/// Stable error codes for foreign-function and logging boundaries.
///
/// The names and their ordering are part of the public contract; new codes
/// are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorCode {
    Success,
    BadAddress,
    BadExtension,
    BadFormat,
    BadProjection,
    BadJson,
    DomainError,
    LibraryError,
    LockError,
    MemoryError,
    PathError,
    UnlockError,
}

/// Errors that can occur when working with DEM tiles and caches.
#[derive(Debug, Error)]
pub enum DemError {
    /// Lock and unlock hooks must be supplied together.
    #[error("lock and unlock hooks must be supplied together")]
    MismatchedHooks,

    /// A client requires a stack carrying lock hooks.
    #[error("stack has no lock hooks; clients need a lockable stack")]
    UnsynchronizedStack,

    /// Tile files in the stack directory carry an unsupported extension.
    #[error("unsupported tile extension: {0:?}")]
    UnsupportedExtension(String),

    /// Format tag string not recognized.
    #[error("unknown tile format: {0:?}")]
    UnknownFormat(String),

    /// Grid parameters inconsistent with the sample buffer.
    #[error("invalid raster grid: {0}")]
    InvalidGrid(String),

    /// Tile file decoded but its contents are not usable.
    #[error("malformed tile file {}: {reason}", path.display())]
    MalformedTile {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Geodetic conversion or projection error.
    #[error(transparent)]
    Geodesy(#[from] GeoError),

    /// Tile file missing on disk.
    #[error("no tile file at {}", path.display())]
    TileNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// No tile covers the coordinate.
    #[error("no tile covering ({lat}, {lon})")]
    NoCoverage {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// Coordinate outside the supported integer-degree domain.
    #[error("coordinate ({lat}, {lon}) outside the supported tile domain")]
    CoordinateOutOfRange {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pin count was decremented below zero; the count was snapped back
    /// to zero and the cache should be considered suspect.
    #[error("tile pin count underflow")]
    PinUnderflow,

    /// The caller's lock hook reported failure.
    #[error("lock hook failed with status {0}")]
    LockFailed(i32),

    /// The caller's unlock hook reported failure; the stack is poisoned.
    #[error("unlock hook failed with status {0}; stack is poisoned")]
    UnlockFailed(i32),

    /// The stack was poisoned by an earlier unlock failure or by a thread
    /// that panicked inside the critical section.
    #[error("stack poisoned by an earlier failure")]
    Poisoned,
}

impl DemError {
    /// The stable code this error maps onto.
    pub fn code(&self) -> ErrorCode {
        match self {
            DemError::MismatchedHooks | DemError::UnsynchronizedStack => ErrorCode::BadAddress,
            DemError::UnsupportedExtension(_) => ErrorCode::BadExtension,
            DemError::UnknownFormat(_)
            | DemError::InvalidGrid(_)
            | DemError::MalformedTile { .. } => ErrorCode::BadFormat,
            DemError::TiffDecode(tiff::TiffError::LimitsExceeded) => ErrorCode::MemoryError,
            DemError::TiffDecode(_) => ErrorCode::BadFormat,
            DemError::Geodesy(GeoError::ZeroDirection) => ErrorCode::DomainError,
            DemError::Geodesy(_) => ErrorCode::BadProjection,
            DemError::TileNotFound { .. } | DemError::NoCoverage { .. } | DemError::Io(_) => {
                ErrorCode::PathError
            }
            DemError::CoordinateOutOfRange { .. } => ErrorCode::DomainError,
            DemError::PinUnderflow => ErrorCode::LibraryError,
            DemError::LockFailed(_) | DemError::Poisoned => ErrorCode::LockError,
            DemError::UnlockFailed(_) => ErrorCode::UnlockError,
        }
    }
}
