//! Example: Query elevation from a directory of DEM tiles.
//!
//! Usage: cargo run --example query_elevation -- <lat> <lon> [tile_dir]

use relief_dem::Stack;
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [tile_dir]", args[0]);
        eprintln!("Example: {} 45.5 3.5 ./dem_data", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let tile_dir = args.get(3).map(|s| s.as_str()).unwrap_or("dem_data");

    let stack = Stack::new(tile_dir, 4, None, None).expect("Failed to open tile directory");
    println!("Reading {} tiles from {}", stack.format(), tile_dir);

    let start = Instant::now();
    match stack.elevation(lat, lon) {
        Ok(elevation) => {
            println!(
                "Elevation at ({}, {}): {:.2} m (loaded in {:.3}s)",
                lat,
                lon,
                elevation,
                start.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    // Second query hits the cache.
    let start = Instant::now();
    if let Ok(elevation) = stack.elevation(lat, lon) {
        println!(
            "Elevation (cached): {:.2} m in {:.6}s",
            elevation,
            start.elapsed().as_secs_f64()
        );
    }
}
