//! Per-reader elevation lookup with a pinned-tile fast path.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::{DemError, Result, Stack, Tile};

/// A per-reader handle onto a shared [`Stack`].
///
/// Each client pins at most one tile. Queries landing in the pinned tile
/// are answered without entering the stack's critical section, which makes
/// spatially coherent query streams (ray marching, track following)
/// contention free. A query that misses enters the critical section,
/// searches the cache, loads the covering tile if needed and moves the pin.
///
/// A client additionally remembers the last integer-degree cell whose tile
/// was missing on disk and answers repeat queries for that cell without
/// retrying the load.
///
/// A client belongs to one thread at a time (every method takes
/// `&mut self`); the stack it shares carries the cross-thread
/// synchronization.
#[derive(Debug)]
pub struct Client {
    stack: Arc<Stack>,
    pinned: Option<PinnedTile>,
    /// Integer-degree cell of the last failed load, suppressing retries.
    last_failed: Option<(i32, i32)>,
}

struct PinnedTile {
    /// Slab index of the pinned slot in the owning stack.
    slot: usize,
    tile: Arc<Tile>,
}

impl std::fmt::Debug for PinnedTile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedTile")
            .field("slot", &self.slot)
            .field("origin", &self.tile.origin())
            .finish()
    }
}

fn cell_of(lat: f64, lon: f64) -> (i32, i32) {
    (lat.floor() as i32, lon.floor() as i32)
}

impl Client {
    /// Create a client bound to a stack.
    ///
    /// The stack must carry lock hooks; a client against an unsynchronized
    /// stack would race its cache mutations.
    pub fn new(stack: Arc<Stack>) -> Result<Self> {
        if !stack.has_hooks() {
            return Err(DemError::UnsynchronizedStack);
        }
        Ok(Self {
            stack,
            pinned: None,
            last_failed: None,
        })
    }

    /// The stack this client reads from.
    pub fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }

    /// Interpolated elevation at `(lat, lon)`.
    ///
    /// Surfaces a missing tile as an error; see [`Client::try_elevation`]
    /// for the demoting variant.
    pub fn elevation(&mut self, lat: f64, lon: f64) -> Result<f64> {
        self.try_elevation(lat, lon)?
            .ok_or(DemError::NoCoverage { lat, lon })
    }

    /// Interpolated elevation at `(lat, lon)`, or `None` when no tile
    /// covers the coordinate.
    ///
    /// The fast path answers from the pinned tile, or from the
    /// missing-cell memo, without entering the stack's critical section.
    /// Only a tile file missing on disk is demoted to `None`; any other
    /// I/O or decode failure surfaces as an error.
    pub fn try_elevation(&mut self, lat: f64, lon: f64) -> Result<Option<f64>> {
        if let Some(pin) = &self.pinned {
            if pin.tile.contains(lat, lon) {
                let (hx, hy) = pin.tile.grid_coordinates(lat, lon);
                return Ok(Some(pin.tile.interpolate(hx, hy)));
            }
        } else if self.last_failed == Some(cell_of(lat, lon)) {
            trace!(lat, lon, "suppressed lookup of a known-missing tile");
            return Ok(None);
        }
        self.lookup(lat, lon)
    }

    /// Slow path: search or load under the stack's critical section and
    /// move the pin to the resulting tile.
    fn lookup(&mut self, lat: f64, lon: f64) -> Result<Option<f64>> {
        let mut section = self.stack.lock()?;
        let skip = self.pinned.as_ref().map(|pin| pin.slot);
        match section.lookup(lat, lon, skip) {
            Ok(idx) => {
                let tile = section.pin(idx);
                let old = self.pinned.replace(PinnedTile {
                    slot: idx,
                    tile: Arc::clone(&tile),
                });
                self.last_failed = None;
                if let Some(old) = old {
                    section.unpin(old.slot)?;
                }
                // Interpolating from the shared handle needs no lock, so
                // the section is released first; an unlock failure is
                // fatal for the whole call.
                section.release()?;
                let (hx, hy) = tile.grid_coordinates(lat, lon);
                Ok(Some(tile.interpolate(hx, hy)))
            }
            Err(DemError::TileNotFound { .. }) => {
                // The pin is dropped even on a miss: the reader has moved
                // away from the pinned tile's area.
                if let Some(old) = self.pinned.take() {
                    section.unpin(old.slot)?;
                }
                self.last_failed = Some(cell_of(lat, lon));
                section.release()?;
                trace!(lat, lon, "tile missing; cell memorized");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Release the pinned tile, if any, and forget the missing-cell memo.
    pub fn clear(&mut self) -> Result<()> {
        if self.pinned.is_some() {
            let mut section = self.stack.lock()?;
            if let Some(pin) = self.pinned.take() {
                section.unpin(pin.slot)?;
            }
            section.release()?;
        }
        self.last_failed = None;
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.clear() {
            warn!(error = %e, "failed to release pinned tile on drop");
        }
    }
}
