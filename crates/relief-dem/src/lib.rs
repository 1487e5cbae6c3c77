//! # relief-dem
//!
//! Tiled Digital Elevation Model (DEM) access with a bounded,
//! pin-counting LRU tile cache.
//!
//! Global DEMs such as ASTER GDEM2 and SRTM ship as directories of 1x1
//! degree raster files. This crate keeps a bounded pool of decoded tiles
//! (a [`Stack`]) shared by any number of per-reader handles ([`Client`]s)
//! and interpolates elevations bilinearly at arbitrary geodetic
//! coordinates.
//!
//! - A [`Stack`] owns the resident tiles, ordered most-recently-used
//!   first. When the pool outgrows its bound, unpinned tiles are
//!   reclaimed from the LRU end; tiles pinned by a client always survive.
//! - A [`Client`] pins at most one tile and answers queries landing in it
//!   without taking the stack's lock, so spatially coherent readers stay
//!   off the critical section almost entirely.
//! - A [`Map`] is an in-memory raster over a projected (Lambert, UTM) or
//!   geographic grid, used for map layers and geoid-undulation grids.
//!
//! Cross-thread synchronization is delegated to the embedding
//! application: a stack is built with a pair of lock/unlock hooks that
//! bracket every structural mutation of the cache.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use relief_dem::{Client, LockHook, Stack};
//!
//! // Adapt whatever synchronization primitive the application uses;
//! // a spin lock is enough for this example.
//! let flag = Arc::new(AtomicBool::new(false));
//! let f = Arc::clone(&flag);
//! let lock: LockHook = Box::new(move || {
//!     while f.swap(true, Ordering::Acquire) {}
//!     0
//! });
//! let f = Arc::clone(&flag);
//! let unlock: LockHook = Box::new(move || {
//!     f.store(false, Ordering::Release);
//!     0
//! });
//!
//! let stack = Arc::new(Stack::new("dem_data", 4, Some(lock), Some(unlock))?);
//! let mut client = Client::new(Arc::clone(&stack))?;
//! if let Some(z) = client.try_elevation(45.5, 3.5)? {
//!     println!("ground at {z} m");
//! }
//! # Ok::<(), relief_dem::DemError>(())
//! ```

mod client;
mod error;
mod loader;
mod map;
mod stack;
mod tile;

pub use client::Client;
pub use error::{DemError, ErrorCode};
pub use loader::TileFormat;
pub use map::Map;
pub use stack::{LockHook, Stack};
pub use tile::Tile;

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
