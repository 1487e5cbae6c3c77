//! Example: March a ray over layered terrain until it hits the ground.
//!
//! Usage: cargo run --example march_ray -- <lat> <lon> <alt> <az> <el> [tile_dir]

use std::sync::Arc;

use relief_geodesy::{geodetic_to_ecef, horizontal_to_ecef};
use relief_stepper::{Stack, Stepper};

const STEP_M: f64 = 10.0;
const MAX_STEPS: usize = 20_000;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 6 {
        eprintln!("Usage: {} <lat> <lon> <alt> <az> <el> [tile_dir]", args[0]);
        eprintln!("Example: {} 45.5 3.5 2000 135 -1.5 ./dem_data", args[0]);
        std::process::exit(1);
    }
    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let alt: f64 = args[3].parse().expect("Invalid altitude");
    let azimuth: f64 = args[4].parse().expect("Invalid azimuth");
    let elevation: f64 = args[5].parse().expect("Invalid elevation");
    let tile_dir = args.get(6).map(|s| s.as_str()).unwrap_or("dem_data");

    let stack = Arc::new(Stack::new(tile_dir, 4, None, None).expect("Failed to open tile directory"));
    let mut stepper = Stepper::new();
    stepper.add_flat(0.0);
    stepper.add_stack(&stack).expect("Failed to register stack layer");
    stepper.set_range(10.0 * STEP_M);

    let mut position = geodetic_to_ecef(lat, lon, alt);
    let direction = horizontal_to_ecef(lat, lon, azimuth, elevation);

    for i in 0..MAX_STEPS {
        let step = stepper.step(position).expect("Failed to sample terrain");
        if let Some(ground) = step.ground {
            if step.altitude <= ground.elevation {
                println!(
                    "Ground hit after {:.1} km at ({:.5}, {:.5}): layer {} at {:.1} m",
                    i as f64 * STEP_M / 1000.0,
                    step.latitude,
                    step.longitude,
                    ground.layer,
                    ground.elevation
                );
                return;
            }
        }
        for k in 0..3 {
            position[k] += STEP_M * direction[k];
        }
    }
    println!(
        "No ground hit within {:.0} km",
        MAX_STEPS as f64 * STEP_M / 1000.0
    );
}
