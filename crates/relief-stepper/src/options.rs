//! JSON layer registration.

use std::path::PathBuf;
use std::sync::Arc;

use relief_dem::{Map, Stack};
use relief_geodesy::Projection;
use serde::Deserialize;

use crate::{Result, Stepper, StepperError};

fn default_max_tiles() -> usize {
    4
}

/// Layer kinds the registration document may name.
const KNOWN_KINDS: [&str; 3] = ["flat", "stack", "map"];

/// One layer description in a JSON registration document.
///
/// The document is an array of tagged objects, e.g.
///
/// ```json
/// [
///   { "kind": "flat", "z": 0.0 },
///   { "kind": "stack", "path": "/data/gdem2", "max_tiles": 8 },
///   { "kind": "map", "origin": [3.0, 45.0], "step": [1.0, 1.0],
///     "shape": [2, 2], "values": [500.0, 500.0, 500.0, 500.0] }
/// ]
/// ```
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    /// Constant ground elevation.
    Flat {
        /// Ground elevation in meters.
        z: f64,
    },
    /// Tiled DEM directory.
    Stack {
        /// Tile directory.
        path: PathBuf,
        /// Resident-tile bound.
        #[serde(default = "default_max_tiles")]
        max_tiles: usize,
        /// Tile format name (`gdem2`, `srtm`); detected from the
        /// directory when omitted.
        #[serde(default)]
        format: Option<String>,
    },
    /// In-memory raster map.
    Map {
        /// Grid origin `[x0, y0]`.
        origin: [f64; 2],
        /// Grid steps `[dx, dy]`.
        step: [f64; 2],
        /// Grid dimensions `[nx, ny]`.
        shape: [usize; 2],
        /// Row-major values, first row at `y0`.
        values: Vec<f64>,
        /// Projection name (e.g. `"Lambert 93"`, `"UTM 31N"`); the grid
        /// is geographic when omitted.
        #[serde(default)]
        projection: Option<String>,
    },
}

impl Stepper {
    /// Register layers described by a JSON array, bottom first.
    ///
    /// Stacks opened this way carry no lock hooks and are read through
    /// the single-threaded path; build the stack yourself and use
    /// [`Stepper::add_stack`] when the stepper is shared across threads.
    pub fn add_layers_json(&mut self, json: &str) -> Result<()> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
        for entry in entries {
            // A kind outside the supported set is a domain error, not a
            // syntax error.
            if let Some(kind) = entry.get("kind").and_then(|kind| kind.as_str()) {
                if !KNOWN_KINDS.contains(&kind) {
                    return Err(StepperError::UnknownLayerKind(kind.to_string()));
                }
            }
            match serde_json::from_value(entry)? {
                LayerSpec::Flat { z } => self.add_flat(z),
                LayerSpec::Stack {
                    path,
                    max_tiles,
                    format,
                } => {
                    let stack = match format {
                        Some(name) => {
                            Stack::with_format(&path, name.parse()?, max_tiles, None, None)?
                        }
                        None => Stack::new(&path, max_tiles, None, None)?,
                    };
                    self.add_stack(&Arc::new(stack))?;
                }
                LayerSpec::Map {
                    origin,
                    step,
                    shape,
                    values,
                    projection,
                } => {
                    let projection = projection
                        .map(|name| name.parse::<Projection>())
                        .transpose()?;
                    let map = Map::new(origin, step, shape, values, projection)?;
                    self.add_map(Arc::new(map));
                }
            }
        }
        Ok(())
    }
}
