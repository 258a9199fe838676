//! Uniform spatial hash for SPH neighbor search.
//!
//! Particles live in the unit cube. Each step the [`GridIndex`] is cleared
//! and rebuilt from particle positions: a position is scaled by `1/h`,
//! truncated to a cell, bounds-checked against the domain, masked to the
//! bucket grid and Morton-encoded into a bucket id. The force phase then asks
//! for the 27 buckets around each particle and walks their lists, applying
//! its own distance cutoff.
//!
//! # Example
//!
//! ```
//! use binhash::{CellLocator, GridIndex, Particles};
//! use glam::Vec3;
//!
//! let mut particles: Particles = (0..8)
//!     .map(|i| Vec3::splat(0.1 + i as f32 * 0.1))
//!     .collect();
//! let mut grid = GridIndex::<16>::new();
//!
//! // Once per step
//! let locator = CellLocator::new(0.1).unwrap();
//! let report = grid.hash_particles(particles.as_mut_slice(), &locator);
//! assert_eq!(report.out_of_domain, 0);
//!
//! // Per particle in the force phase
//! let hood = grid.neighborhood(&locator, particles.list[3].position);
//! let candidates: Vec<u32> = grid.candidates(&hood, particles.as_slice()).collect();
//! assert!(candidates.contains(&3));
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod index;
pub mod locate;
pub mod morton;
pub mod neighborhood;
pub mod particle;

pub use config::GridConfig;
pub use constants::{HASH_DIM, NEIGHBORHOOD_SIZE, NO_PARTICLE, SELF_SLOT};
pub use error::ConfigError;
pub use glam::{IVec3, Vec3};
pub use index::{BucketIter, BuildReport, GridIndex, Occupancy};
pub use locate::{check_resolution, Bucket, CellLocator, Resolution};
pub use neighborhood::{particle_neighborhood, Neighborhood, NEIGHBOR_OFFSETS};
pub use particle::{HashedParticle, Particle, Particles};
