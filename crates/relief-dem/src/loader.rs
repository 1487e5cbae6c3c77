//! Mapping of integer-degree cells to on-disk tile files, and decoding.

use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, trace};

use crate::{DemError, Result, Tile};

/// Decoder memory budget per tile. A 3601x3601 GDEM2 tile decodes to
/// about 25 MB; anything an order of magnitude past that is rejected.
const DECODE_BUDGET: usize = 512 << 20;

/// On-disk layout of a tile pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    /// ASTER GDEM2: signed 16-bit GeoTIFF files named
    /// `ASTGTM2_{N|S}{LL}{E|W}{LLL}_dem.tif`.
    Gdem2,
    /// SRTM GL1: raw big-endian 16-bit `.hgt` files named
    /// `{N|S}{LL}{E|W}{LLL}.hgt`.
    Srtm,
}

impl TileFormat {
    /// File name of the tile whose lower-left corner is `(lat, lon)`.
    pub fn filename(&self, lat: i32, lon: i32) -> String {
        let ns = if lat < 0 { 'S' } else { 'N' };
        let ew = if lon < 0 { 'W' } else { 'E' };
        match self {
            TileFormat::Gdem2 => {
                format!("ASTGTM2_{}{:02}{}{:03}_dem.tif", ns, lat.abs(), ew, lon.abs())
            }
            TileFormat::Srtm => format!("{}{:02}{}{:03}.hgt", ns, lat.abs(), ew, lon.abs()),
        }
    }

    /// Detect the layout of a tile directory from the files it holds.
    ///
    /// The first recognized extension wins. A directory holding only
    /// unrecognized tile files is rejected; an empty directory defaults
    /// to GDEM2.
    pub fn detect(dir: &Path) -> Result<Self> {
        let mut unknown: Option<String> = None;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("tif") => return Ok(TileFormat::Gdem2),
                Some("hgt") => return Ok(TileFormat::Srtm),
                Some(other) if unknown.is_none() => unknown = Some(other.to_string()),
                _ => {}
            }
        }
        match unknown {
            Some(ext) => Err(DemError::UnsupportedExtension(ext)),
            None => Ok(TileFormat::Gdem2),
        }
    }
}

impl FromStr for TileFormat {
    type Err = DemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gdem2" => Ok(TileFormat::Gdem2),
            "srtm" => Ok(TileFormat::Srtm),
            _ => Err(DemError::UnknownFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileFormat::Gdem2 => write!(f, "gdem2"),
            TileFormat::Srtm => write!(f, "srtm"),
        }
    }
}

/// Load and decode the tile covering the integer-degree cell `(lat, lon)`.
pub(crate) fn load_tile(base: &Path, format: TileFormat, lat: i32, lon: i32) -> Result<Tile> {
    if lat.abs() > 89 || lon.abs() > 180 {
        return Err(DemError::CoordinateOutOfRange {
            lat: f64::from(lat),
            lon: f64::from(lon),
        });
    }
    let path = base.join(format.filename(lat, lon));
    let (nx, ny, samples) = match format {
        TileFormat::Gdem2 => decode_geotiff(&path)?,
        TileFormat::Srtm => decode_hgt(&path)?,
    };
    debug!(path = %path.display(), nx, ny, "loaded tile");
    Tile::from_degree_cell(lat, lon, nx, ny, samples)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DemError::TileNotFound {
            path: path.to_path_buf(),
        },
        _ => DemError::Io(e),
    })
}

/// Decode a signed 16-bit, north-up GeoTIFF into a south-up sample buffer.
fn decode_geotiff(path: &Path) -> Result<(usize, usize, Vec<i16>)> {
    let file = open(path)?;
    let mut limits = Limits::default();
    limits.decoding_buffer_size = DECODE_BUDGET;
    limits.intermediate_buffer_size = DECODE_BUDGET;
    let mut decoder = Decoder::new(file)?.with_limits(limits);

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    // Both georeferencing tags are required even though the grid is
    // re-anchored on the integer-degree corner below.
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).map_err(|_| {
        DemError::MalformedTile {
            path: path.to_path_buf(),
            reason: "missing ModelPixelScale tag".to_string(),
        }
    })?;
    let tie = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).map_err(|_| {
        DemError::MalformedTile {
            path: path.to_path_buf(),
            reason: "missing ModelTiepoint tag".to_string(),
        }
    })?;
    if scale.len() < 2 || tie.len() < 6 {
        return Err(DemError::MalformedTile {
            path: path.to_path_buf(),
            reason: "truncated georeferencing tags".to_string(),
        });
    }
    trace!(
        dx = scale[0],
        dy = scale[1],
        corner_lon = tie[3],
        corner_lat = tie[4],
        "tile georeferencing"
    );

    let raw = match decoder.read_image()? {
        DecodingResult::I16(data) => data,
        _ => {
            return Err(DemError::MalformedTile {
                path: path.to_path_buf(),
                reason: "expected signed 16-bit samples".to_string(),
            })
        }
    };
    if raw.len() != width * height {
        return Err(DemError::MalformedTile {
            path: path.to_path_buf(),
            reason: format!(
                "expected {} samples for {}x{}, got {}",
                width * height,
                width,
                height,
                raw.len()
            ),
        });
    }

    // Scanline 0 is the northernmost row on disk; flip to south-up.
    let samples: Vec<i16> = raw.chunks_exact(width).rev().flatten().copied().collect();
    Ok((width, height, samples))
}

/// Decode a raw SRTM `.hgt` file: a square grid of big-endian i16, north-up.
fn decode_hgt(path: &Path) -> Result<(usize, usize, Vec<i16>)> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DemError::TileNotFound {
            path: path.to_path_buf(),
        },
        _ => DemError::Io(e),
    })?;
    if bytes.len() % 2 != 0 {
        return Err(DemError::MalformedTile {
            path: path.to_path_buf(),
            reason: "odd byte count".to_string(),
        });
    }
    let count = bytes.len() / 2;
    let n = (count as f64).sqrt().round() as usize;
    if n < 2 || n * n != count {
        return Err(DemError::MalformedTile {
            path: path.to_path_buf(),
            reason: format!("{} samples is not a square grid", count),
        });
    }
    let raw: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let samples: Vec<i16> = raw.chunks_exact(n).rev().flatten().copied().collect();
    Ok((n, n, samples))
}
