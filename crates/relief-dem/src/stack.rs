//! Bounded LRU pool of decoded tiles shared by concurrent readers.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::loader::{self, TileFormat};
use crate::{DemError, Result, Tile};

/// Caller-supplied critical-section hook. Returns 0 on success.
pub type LockHook = Box<dyn Fn() -> i32 + Send + Sync>;

struct LockHooks {
    lock: LockHook,
    unlock: LockHook,
}

/// A bounded LRU pool of decoded elevation tiles.
///
/// Tiles are large (a 3601x3601 GDEM2 cell decodes to ~25 MB), so the pool
/// bounds how many stay resident while guaranteeing that a tile pinned by a
/// [`Client`](crate::Client) is never destroyed. The bound is soft: when
/// every resident tile is pinned the pool grows past `max_size` rather than
/// blocking or rejecting loads.
///
/// Concurrent structural access is serialized by a pair of caller-supplied
/// lock/unlock hooks bracketing every critical section, mirroring whatever
/// synchronization primitive the embedding application uses. A stack
/// built without hooks supports only single-threaded use and refuses to
/// hand out clients. A failing unlock hook leaves the stack poisoned;
/// there is no recovery beyond dropping it.
///
/// # Example
///
/// ```no_run
/// use relief_dem::Stack;
///
/// let stack = Stack::new("dem_data", 4, None, None)?;
/// let elevation = stack.elevation(45.5, 3.5)?;
/// println!("ground at {} m", elevation);
/// # Ok::<(), relief_dem::DemError>(())
/// ```
pub struct Stack {
    base: PathBuf,
    format: TileFormat,
    max_size: usize,
    hooks: Option<LockHooks>,
    poisoned: AtomicBool,
    inner: Mutex<StackInner>,
}

/// One resident tile plus its cache bookkeeping.
struct TileSlot {
    tile: Arc<Tile>,
    /// Number of clients currently holding this tile.
    pin_count: u32,
    /// Neighbor toward the LRU end.
    prev: Option<usize>,
    /// Neighbor toward the MRU end.
    next: Option<usize>,
}

/// Cache state guarded by the critical section.
#[derive(Default)]
struct StackInner {
    /// Slab of tile slots; indices stay stable for the life of a tile.
    slots: Vec<Option<TileSlot>>,
    /// Recycled slab indices.
    free: Vec<usize>,
    /// Most recently used tile.
    head: Option<usize>,
    /// Least recently used tile.
    tail: Option<usize>,
    /// Number of resident tiles.
    size: usize,
}

impl StackInner {
    fn slot(&self, idx: usize) -> &TileSlot {
        self.slots[idx].as_ref().expect("stale tile slot index")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut TileSlot {
        self.slots[idx].as_mut().expect("stale tile slot index")
    }

    /// Walk the list from the MRU head looking for a covering tile.
    fn find(&self, lat: f64, lon: f64, skip: Option<usize>) -> Option<usize> {
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let slot = self.slot(idx);
            if Some(idx) != skip && slot.tile.contains(lat, lon) {
                return Some(idx);
            }
            cursor = slot.prev;
        }
        None
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.tail = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.head = prev,
        }
        let slot = self.slot_mut(idx);
        slot.prev = None;
        slot.next = None;
    }

    fn push_head(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(idx);
            slot.prev = old_head;
            slot.next = None;
        }
        if let Some(h) = old_head {
            self.slot_mut(h).next = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    /// Move a tile to the MRU head. Touching the head is a no-op.
    fn touch(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_head(idx);
    }

    fn insert(&mut self, tile: Arc<Tile>) -> usize {
        let slot = TileSlot {
            tile,
            pin_count: 0,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.push_head(idx);
        self.size += 1;
        idx
    }

    fn remove(&mut self, idx: usize) {
        self.unlink(idx);
        self.slots[idx] = None;
        self.free.push(idx);
        self.size -= 1;
    }

    /// Reclaim unpinned tiles from the LRU end until the pool fits, in a
    /// single tail-to-head pass. The neighbor index is captured before
    /// each unlink so freed slots are never revisited. `keep` protects the
    /// tile whose load triggered the pass.
    fn evict_lru(&mut self, max_size: usize, keep: usize) {
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            if self.size <= max_size {
                break;
            }
            let next = self.slot(idx).next;
            if idx != keep && self.slot(idx).pin_count == 0 {
                let (x0, y0) = self.slot(idx).tile.origin();
                debug!(x0, y0, "evicting tile");
                self.remove(idx);
            }
            cursor = next;
        }
    }

    /// Destroy every unpinned tile.
    fn clear_unpinned(&mut self) {
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            let next = self.slot(idx).next;
            if self.slot(idx).pin_count == 0 {
                self.remove(idx);
            }
            cursor = next;
        }
    }
}

/// A held critical section over a stack's cache state.
///
/// Dropping a section releases it; error paths therefore can never leak
/// the caller's lock. [`Section::release`] is the explicit variant that
/// surfaces an unlock-hook failure.
pub(crate) struct Section<'a> {
    stack: &'a Stack,
    guard: Option<MutexGuard<'a, StackInner>>,
    hooks_engaged: bool,
    unlocked: bool,
}

impl<'a> Section<'a> {
    fn inner(&mut self) -> &mut StackInner {
        self.guard
            .as_deref_mut()
            .expect("critical section already released")
    }

    /// Find a resident tile covering `(lat, lon)` and touch it, or load the
    /// covering integer-degree tile, insert it at the MRU head and evict
    /// surplus unpinned tiles. Returns the slot index.
    pub(crate) fn lookup(&mut self, lat: f64, lon: f64, skip: Option<usize>) -> Result<usize> {
        let stack = self.stack;
        let inner = self.inner();
        if let Some(idx) = inner.find(lat, lon, skip) {
            inner.touch(idx);
            return Ok(idx);
        }
        // Loading happens while the section is held: the load plus the
        // eviction it may trigger form one atomic cache mutation.
        let tile = loader::load_tile(
            &stack.base,
            stack.format,
            lat.floor() as i32,
            lon.floor() as i32,
        )?;
        let idx = inner.insert(Arc::new(tile));
        if inner.size > stack.max_size {
            inner.evict_lru(stack.max_size, idx);
        }
        Ok(idx)
    }

    /// Shared handle to a resident tile, without pinning it.
    pub(crate) fn tile(&mut self, idx: usize) -> Arc<Tile> {
        Arc::clone(&self.inner().slot(idx).tile)
    }

    /// Pin a resident tile and return a shared handle to it.
    pub(crate) fn pin(&mut self, idx: usize) -> Arc<Tile> {
        let slot = self.inner().slot_mut(idx);
        slot.pin_count += 1;
        Arc::clone(&slot.tile)
    }

    /// Drop one pin from a resident tile.
    ///
    /// An unpin without a matching pin is a library bug: the count stays
    /// at zero and the call fails.
    pub(crate) fn unpin(&mut self, idx: usize) -> Result<()> {
        let slot = self.inner().slot_mut(idx);
        if slot.pin_count == 0 {
            warn!(slot = idx, "pin release without a matching pin");
            return Err(DemError::PinUnderflow);
        }
        slot.pin_count -= 1;
        Ok(())
    }

    /// Release the section, surfacing an unlock-hook failure.
    pub(crate) fn release(mut self) -> Result<()> {
        self.guard = None;
        self.unlocked = true;
        if self.hooks_engaged {
            self.stack.run_unlock_hook()?;
        }
        Ok(())
    }
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        if self.unlocked {
            return;
        }
        self.guard = None;
        if self.hooks_engaged {
            // Nothing to return the failure to; the poisoned flag records it.
            let _ = self.stack.run_unlock_hook();
        }
    }
}

impl Stack {
    /// Open a stack over a tile directory, detecting the tile format from
    /// the files present.
    ///
    /// `max_size` bounds the number of resident tiles (softly; pinned
    /// tiles are never reclaimed). The `lock`/`unlock` hooks make the
    /// stack shareable between threads and must be supplied together.
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size: usize,
        lock: Option<LockHook>,
        unlock: Option<LockHook>,
    ) -> Result<Self> {
        let format = TileFormat::detect(path.as_ref())?;
        Self::with_format(path, format, max_size, lock, unlock)
    }

    /// Open a stack with an explicit tile format.
    pub fn with_format<P: AsRef<Path>>(
        path: P,
        format: TileFormat,
        max_size: usize,
        lock: Option<LockHook>,
        unlock: Option<LockHook>,
    ) -> Result<Self> {
        let hooks = match (lock, unlock) {
            (Some(lock), Some(unlock)) => Some(LockHooks { lock, unlock }),
            (None, None) => None,
            _ => return Err(DemError::MismatchedHooks),
        };
        Ok(Self {
            base: path.as_ref().to_path_buf(),
            format,
            max_size,
            hooks,
            poisoned: AtomicBool::new(false),
            inner: Mutex::new(StackInner::default()),
        })
    }

    /// Whether the stack carries caller lock hooks.
    pub fn has_hooks(&self) -> bool {
        self.hooks.is_some()
    }

    /// Whether an unlock failure or a panicked holder poisoned the stack.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Tile directory this stack reads from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// On-disk tile format.
    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Resident-tile bound.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of currently resident tiles.
    pub fn resident_tiles(&self) -> usize {
        self.inner.lock().map(|inner| inner.size).unwrap_or(0)
    }

    /// Sum of client pins over all resident tiles.
    pub fn total_pins(&self) -> u32 {
        self.inner
            .lock()
            .map(|inner| {
                inner
                    .slots
                    .iter()
                    .flatten()
                    .map(|slot| slot.pin_count)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Origin of the most recently used tile, if any.
    pub fn mru_origin(&self) -> Option<(f64, f64)> {
        let inner = self.inner.lock().ok()?;
        inner.head.map(|idx| inner.slot(idx).tile.origin())
    }

    /// Destroy every tile not currently pinned by a client.
    pub fn clear(&self) -> Result<()> {
        let mut section = self.lock()?;
        section.inner().clear_unpinned();
        section.release()
    }

    /// Interpolated elevation at `(lat, lon)`, loading the covering tile
    /// on demand.
    ///
    /// This convenience path does not engage the caller lock hooks and is
    /// therefore only for single-threaded use; concurrent readers go
    /// through a [`Client`](crate::Client).
    pub fn elevation(&self, lat: f64, lon: f64) -> Result<f64> {
        self.try_elevation(lat, lon)?
            .ok_or(DemError::NoCoverage { lat, lon })
    }

    /// Like [`Stack::elevation`], but reports a tile file missing on
    /// disk as `None` instead of an error. Other I/O or decode failures
    /// still surface.
    pub fn try_elevation(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        let mut section = self.section(false)?;
        match section.lookup(lat, lon, None) {
            Ok(idx) => {
                let tile = section.tile(idx);
                section.release()?;
                let (hx, hy) = tile.grid_coordinates(lat, lon);
                Ok(Some(tile.interpolate(hx, hy)))
            }
            Err(DemError::TileNotFound { .. }) => {
                section.release()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Enter the critical section, engaging the caller lock hooks.
    pub(crate) fn lock(&self) -> Result<Section<'_>> {
        self.section(true)
    }

    fn section(&self, engage_hooks: bool) -> Result<Section<'_>> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(DemError::Poisoned);
        }
        let run_hooks = engage_hooks && self.hooks.is_some();
        if run_hooks {
            if let Some(hooks) = &self.hooks {
                let status = (hooks.lock)();
                if status != 0 {
                    return Err(DemError::LockFailed(status));
                }
            }
        }
        let guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => {
                // A thread panicked inside the section.
                self.poisoned.store(true, Ordering::Release);
                if run_hooks {
                    if let Some(hooks) = &self.hooks {
                        let _ = (hooks.unlock)();
                    }
                }
                return Err(DemError::Poisoned);
            }
        };
        Ok(Section {
            stack: self,
            guard: Some(guard),
            hooks_engaged: run_hooks,
            unlocked: false,
        })
    }

    fn run_unlock_hook(&self) -> Result<()> {
        if let Some(hooks) = &self.hooks {
            let status = (hooks.unlock)();
            if status != 0 {
                self.poisoned.store(true, Ordering::Release);
                warn!(status, "unlock hook failed; stack poisoned");
                return Err(DemError::UnlockFailed(status));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("base", &self.base)
            .field("format", &self.format)
            .field("max_size", &self.max_size)
            .field("has_hooks", &self.hooks.is_some())
            .field("resident_tiles", &self.resident_tiles())
            .finish()
    }
}
