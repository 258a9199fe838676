//! Benchmark: rebuild the bucket grid and run a neighbor pass.
//!
//! Run with: cargo run --example bench --release -p binhash
//! Set RUST_LOG=debug to see per-build reports.

use std::time::Instant;

use binhash::{check_resolution, CellLocator, GridConfig, GridIndex, Particles, Vec3};
use rayon::prelude::*;

const PARTICLE_COUNTS: [usize; 4] = [10_000, 50_000, 100_000, 250_000];
const STEPS: usize = 20;
const DIM: u32 = 64;

fn main() {
    env_logger::init();

    let config = GridConfig {
        interaction_radius: 0.02,
        ..GridConfig::default()
    };
    let resolution = check_resolution::<DIM>(config.interaction_radius).expect("valid radius");
    println!(
        "h = {}, {} cells per axis, {}^3 buckets{}",
        config.interaction_radius,
        resolution.bound,
        DIM,
        if resolution.aliased { " (aliased)" } else { "" }
    );

    let mut grid = GridIndex::<DIM>::new();

    for &count in &PARTICLE_COUNTS {
        let mut particles: Particles = (0..count).map(|i| lattice_point(i, count)).collect();
        let locator = CellLocator::new(config.interaction_radius).expect("valid radius");

        // Warmup
        grid.hash_particles_with(particles.as_mut_slice(), &locator, &config);

        let start = Instant::now();
        for _ in 0..STEPS {
            grid.hash_particles_with(particles.as_mut_slice(), &locator, &config);
        }
        let parallel_ms = start.elapsed().as_secs_f64() * 1000.0 / STEPS as f64;

        let start = Instant::now();
        for _ in 0..STEPS {
            grid.hash_particles_serial(particles.as_mut_slice(), &locator);
        }
        let serial_ms = start.elapsed().as_secs_f64() * 1000.0 / STEPS as f64;

        let h2 = config.interaction_radius * config.interaction_radius;
        let start = Instant::now();
        let pairs: usize = particles
            .list
            .par_iter()
            .map(|p| {
                let hood = grid.neighborhood(&locator, p.position);
                grid.candidates(&hood, particles.as_slice())
                    .filter(|&j| {
                        p.position.distance_squared(particles.list[j as usize].position) < h2
                    })
                    .count()
            })
            .sum();
        let query_ms = start.elapsed().as_secs_f64() * 1000.0;

        let stats = grid.occupancy(particles.as_slice());
        println!(
            "{:>7} particles: build {:>7.3} ms (serial {:>7.3} ms), query {:>8.3} ms, \
             {:>9} pairs, {} buckets used, max load {}, mean {:.2}",
            count,
            parallel_ms,
            serial_ms,
            query_ms,
            pairs,
            stats.occupied_buckets,
            stats.max_load,
            stats.mean_load()
        );
    }
}

/// Deterministic jittered lattice filling the unit cube.
fn lattice_point(i: usize, count: usize) -> Vec3 {
    let side = (count as f32).cbrt().ceil() as usize;
    let x = i % side;
    let y = (i / side) % side;
    let z = i / (side * side);
    let jitter = ((i.wrapping_mul(2_654_435_761) % 1000) as f32 / 1000.0 - 0.5) * 0.25;
    let spacing = 1.0 / side as f32;
    Vec3::new(
        (x as f32 + 0.5 + jitter) * spacing,
        (y as f32 + 0.5 - jitter) * spacing,
        (z as f32 + 0.5 + jitter * 0.5) * spacing,
    )
}
