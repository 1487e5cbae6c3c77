//! Single decoded elevation tile.

use crate::{DemError, Result};

/// A decoded elevation raster, usually covering a 1x1 degree cell.
///
/// Samples are stored south-up: row `iy = 0` holds the southernmost grid
/// nodes, so the origin `(x0, y0)` is the lower-left corner. File readers
/// flip north-up scanline order on ingest. Tiles are immutable after
/// construction and are shared between the cache and its clients.
#[derive(Debug)]
pub struct Tile {
    /// Grid nodes along the longitude axis.
    nx: usize,
    /// Grid nodes along the latitude axis.
    ny: usize,
    /// Longitude of the lower-left node, degrees.
    x0: f64,
    /// Latitude of the lower-left node, degrees.
    y0: f64,
    /// Longitude step per cell, degrees.
    dx: f64,
    /// Latitude step per cell, degrees.
    dy: f64,
    /// Elevation samples in meters, row-major from the south row.
    samples: Vec<i16>,
}

impl Tile {
    /// Build a tile from raw grid parameters and a south-up sample buffer.
    pub fn new(
        nx: usize,
        ny: usize,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
        samples: Vec<i16>,
    ) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(DemError::InvalidGrid(format!(
                "grid must be at least 2x2, got {}x{}",
                nx, ny
            )));
        }
        if dx <= 0.0 || dy <= 0.0 {
            return Err(DemError::InvalidGrid(format!(
                "grid steps must be positive, got ({}, {})",
                dx, dy
            )));
        }
        if samples.len() != nx * ny {
            return Err(DemError::InvalidGrid(format!(
                "expected {} samples for a {}x{} grid, got {}",
                nx * ny,
                nx,
                ny,
                samples.len()
            )));
        }
        Ok(Self {
            nx,
            ny,
            x0,
            y0,
            dx,
            dy,
            samples,
        })
    }

    /// Build a tile covering the 1-degree cell whose lower-left corner is
    /// `(lat, lon)` in integer degrees, with node-registered steps.
    pub fn from_degree_cell(lat: i32, lon: i32, nx: usize, ny: usize, samples: Vec<i16>) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(DemError::InvalidGrid(format!(
                "grid must be at least 2x2, got {}x{}",
                nx, ny
            )));
        }
        Self::new(
            nx,
            ny,
            f64::from(lon),
            f64::from(lat),
            1.0 / (nx - 1) as f64,
            1.0 / (ny - 1) as f64,
            samples,
        )
    }

    /// Elevation at grid node `(ix, iy)` in meters; `iy = 0` is the south row.
    pub fn z(&self, ix: usize, iy: usize) -> f64 {
        f64::from(self.samples[iy * self.nx + ix])
    }

    /// Whether the tile's footprint covers a geodetic coordinate.
    ///
    /// The footprint extends one full step beyond the last node on each
    /// axis, so queries on a shared edge resolve against whichever covering
    /// tile is inspected first.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let (hx, hy) = self.grid_coordinates(lat, lon);
        (0.0..=self.nx as f64).contains(&hx) && (0.0..=self.ny as f64).contains(&hy)
    }

    /// Fractional grid coordinates of a geodetic coordinate.
    pub fn grid_coordinates(&self, lat: f64, lon: f64) -> (f64, f64) {
        ((lon - self.x0) / self.dx, (lat - self.y0) / self.dy)
    }

    /// Bilinear interpolation at fractional grid coordinates.
    ///
    /// Indices are clamped to the grid, so a query exactly on a node
    /// returns the stored sample and queries beyond the last node degrade
    /// to edge values.
    pub fn interpolate(&self, hx: f64, hy: f64) -> f64 {
        let ix = (hx.floor() as isize).clamp(0, self.nx as isize - 1) as usize;
        let iy = (hy.floor() as isize).clamp(0, self.ny as isize - 1) as usize;
        let ix1 = (ix + 1).min(self.nx - 1);
        let iy1 = (iy + 1).min(self.ny - 1);
        let fx = hx - ix as f64;
        let fy = hy - iy as f64;
        self.z(ix, iy) * (1.0 - fx) * (1.0 - fy)
            + self.z(ix, iy1) * (1.0 - fx) * fy
            + self.z(ix1, iy) * fx * (1.0 - fy)
            + self.z(ix1, iy1) * fx * fy
    }

    /// Interpolated elevation at a geodetic coordinate, if covered.
    pub fn elevation(&self, lat: f64, lon: f64) -> Option<f64> {
        if !self.contains(lat, lon) {
            return None;
        }
        let (hx, hy) = self.grid_coordinates(lat, lon);
        Some(self.interpolate(hx, hy))
    }

    /// Grid dimensions `(nx, ny)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Lower-left corner `(x0, y0)` in degrees.
    pub fn origin(&self) -> (f64, f64) {
        (self.x0, self.y0)
    }

    /// Grid steps `(dx, dy)` in degrees per cell.
    pub fn step(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp_tile() -> Tile {
        // 3x3 cell over lat 45..46, lon 3..4 with z = 10*iy + ix.
        let samples: Vec<i16> = (0..9).map(|i| (10 * (i / 3) + i % 3) as i16).collect();
        Tile::from_degree_cell(45, 3, 3, 3, samples).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_grids() {
        assert!(Tile::new(1, 3, 0.0, 0.0, 1.0, 1.0, vec![0; 3]).is_err());
        assert!(Tile::new(3, 3, 0.0, 0.0, 1.0, 1.0, vec![0; 4]).is_err());
        assert!(Tile::new(3, 3, 0.0, 0.0, -0.5, 1.0, vec![0; 9]).is_err());
    }

    #[test]
    fn test_interpolation_exact_at_nodes() {
        let tile = ramp_tile();
        for iy in 0..3 {
            for ix in 0..3 {
                let lat = 45.0 + iy as f64 * 0.5;
                let lon = 3.0 + ix as f64 * 0.5;
                let z = tile.elevation(lat, lon).unwrap();
                assert_abs_diff_eq!(z, (10 * iy + ix) as f64, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_interpolation_midpoints() {
        let tile = ramp_tile();
        // Center of the first cell averages its four corners.
        let z = tile.elevation(45.25, 3.25).unwrap();
        assert_abs_diff_eq!(z, (0.0 + 1.0 + 10.0 + 11.0) / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_footprint() {
        let tile = ramp_tile();
        assert!(tile.contains(45.0, 3.0));
        assert!(tile.contains(46.0, 4.0));
        // One step of slack beyond the last node is still covered.
        assert!(tile.contains(46.3, 4.3));
        assert!(!tile.contains(46.6, 3.5));
        assert!(!tile.contains(44.9, 3.5));
        assert!(tile.elevation(50.0, 3.5).is_none());
    }

    #[test]
    fn test_south_row_is_zero() {
        let tile = ramp_tile();
        // iy = 0 must be the lowest latitude row.
        assert_abs_diff_eq!(tile.z(0, 0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tile.z(0, 2), 20.0, epsilon = 1e-12);
        assert!(tile.elevation(45.0, 3.0).unwrap() < tile.elevation(46.0, 3.0).unwrap());
    }
}
