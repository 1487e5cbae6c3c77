//! # relief-stepper
//!
//! Layered terrain sampling along rays expressed in Earth-Centered-
//! Earth-Fixed (ECEF) coordinates.
//!
//! A [`Stepper`] holds an ordered chain of terrain layers: flat planes,
//! projected raster [`Map`]s, and tiled-DEM [`Stack`]s. Each sampled
//! ECEF position is resolved to geodetic coordinates (optionally through
//! a cached local frame that amortizes the exact ellipsoid transform
//! across short ray segments), corrected by a geoid-undulation map when
//! one is configured, and answered by the topmost layer covering the
//! point.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use relief_geodesy::geodetic_to_ecef;
//! use relief_stepper::{Stack, Stepper};
//!
//! let mut stepper = Stepper::new();
//! stepper.add_flat(0.0);
//! let stack = Arc::new(Stack::new("dem_data", 4, None, None)?);
//! stepper.add_stack(&stack)?;
//! stepper.set_range(100.0);
//!
//! let step = stepper.step(geodetic_to_ecef(45.5, 3.5, 1200.0))?;
//! if let Some(ground) = step.ground {
//!     println!(
//!         "layer {} puts the ground at {:.1} m, {:.1} m below the ray",
//!         ground.layer,
//!         ground.elevation,
//!         step.altitude - ground.elevation,
//!     );
//! }
//! # Ok::<(), relief_stepper::StepperError>(())
//! ```

mod error;
mod options;
mod stepper;

pub use error::StepperError;
pub use options::LayerSpec;
pub use stepper::{Ground, Layer, Step, Stepper};

// Re-export the collaborating containers for convenience.
pub use relief_dem::{Map, Stack};

/// Result type for stepper operations.
pub type Result<T> = std::result::Result<T, StepperError>;
