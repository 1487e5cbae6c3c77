//! Shared fixtures: synthetic tiles on disk and counting lock hooks.
#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use relief_dem::LockHook;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Write a GDEM2-style tile: an `n x n` signed 16-bit GeoTIFF with a
/// constant elevation.
pub fn write_gdem2_tile(dir: &Path, lat: i32, lon: i32, n: usize, z: i16) {
    write_gdem2_tile_with(dir, lat, lon, n, |_, _| z);
}

/// Write a GDEM2-style tile with per-node elevations.
///
/// `f(ix, iy)` is called with `iy = 0` as the south row; scanlines are
/// emitted north-up the way real tiles are stored.
pub fn write_gdem2_tile_with(
    dir: &Path,
    lat: i32,
    lon: i32,
    n: usize,
    f: impl Fn(usize, usize) -> i16,
) {
    let ns = if lat < 0 { 'S' } else { 'N' };
    let ew = if lon < 0 { 'W' } else { 'E' };
    let name = format!(
        "ASTGTM2_{}{:02}{}{:03}_dem.tif",
        ns,
        lat.abs(),
        ew,
        lon.abs()
    );
    let file = File::create(dir.join(name)).unwrap();
    let mut tiff = TiffEncoder::new(file).unwrap();
    let mut image = tiff
        .new_image::<colortype::GrayI16>(n as u32, n as u32)
        .unwrap();

    let step = 1.0 / (n - 1) as f64;
    let scale = [step, step, 0.0];
    // Tie point: raster (0, 0) sits on the tile's northwest corner.
    let tie = [0.0, 0.0, 0.0, f64::from(lon), f64::from(lat + 1), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tie[..])
        .unwrap();

    let mut data = Vec::with_capacity(n * n);
    for row in 0..n {
        let iy = n - 1 - row;
        for ix in 0..n {
            data.push(f(ix, iy));
        }
    }
    image.write_data(&data).unwrap();
}

/// Write an SRTM-style `.hgt` tile: `n x n` big-endian i16, north-up.
pub fn write_srtm_tile_with(
    dir: &Path,
    lat: i32,
    lon: i32,
    n: usize,
    f: impl Fn(usize, usize) -> i16,
) {
    let ns = if lat < 0 { 'S' } else { 'N' };
    let ew = if lon < 0 { 'W' } else { 'E' };
    let name = format!("{}{:02}{}{:03}.hgt", ns, lat.abs(), ew, lon.abs());
    let mut bytes = Vec::with_capacity(n * n * 2);
    for row in 0..n {
        let iy = n - 1 - row;
        for ix in 0..n {
            bytes.extend_from_slice(&f(ix, iy).to_be_bytes());
        }
    }
    std::fs::write(dir.join(name), bytes).unwrap();
}

/// Counters observing how often the lock hooks actually ran.
pub struct HookCounters {
    pub locks: Arc<AtomicUsize>,
    pub unlocks: Arc<AtomicUsize>,
}

impl HookCounters {
    pub fn locks(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }

    pub fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }
}

/// A spin lock exposed as lock/unlock hooks, with call counters.
pub fn counting_hooks() -> (LockHook, LockHook, HookCounters) {
    let flag = Arc::new(AtomicBool::new(false));
    let locks = Arc::new(AtomicUsize::new(0));
    let unlocks = Arc::new(AtomicUsize::new(0));

    let (f, count) = (Arc::clone(&flag), Arc::clone(&locks));
    let lock: LockHook = Box::new(move || {
        while f.swap(true, Ordering::Acquire) {
            std::hint::spin_loop();
        }
        count.fetch_add(1, Ordering::SeqCst);
        0
    });
    let (f, count) = (Arc::clone(&flag), Arc::clone(&unlocks));
    let unlock: LockHook = Box::new(move || {
        f.store(false, Ordering::Release);
        count.fetch_add(1, Ordering::SeqCst);
        0
    });
    (lock, unlock, HookCounters { locks, unlocks })
}
