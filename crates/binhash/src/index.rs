//! Bucket grid rebuilt from particle positions every step.
//!
//! Each of the `DIM^3` buckets heads a singly-linked list threaded through
//! the particles' `next` links (arena indices, not pointers). A rebuild
//! clears every head, then prepends each particle to the list of its own
//! cell, so lists come out in reverse insertion order.
//!
//! The parallel build runs two rayon regions back to back: clearing, then
//! inserting. A prepend is "read head, link particle to it, publish particle
//! as head"; each bucket has its own lock around that sequence so particles
//! in different buckets never contend.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{IVec3, Vec3};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::config::GridConfig;
use crate::constants::{hash_size, ValidDim, HASH_DIM, INSERT_CHUNK, NO_PARTICLE};
use crate::locate::{Bucket, CellLocator};
use crate::neighborhood::Neighborhood;
use crate::particle::HashedParticle;

/// Outcome of one rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Particles reachable through the grid this step.
    pub indexed: usize,
    /// Particles whose own cell left the domain; skipped for this step.
    pub out_of_domain: usize,
}

/// Bucket fill statistics, for spotting hash-collision pile-ups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Occupancy {
    pub occupied_buckets: usize,
    pub max_load: usize,
    pub indexed: usize,
}

impl Occupancy {
    /// Mean particles per occupied bucket.
    pub fn mean_load(&self) -> f32 {
        if self.occupied_buckets == 0 {
            0.0
        } else {
            self.indexed as f32 / self.occupied_buckets as f32
        }
    }
}

/// Spatial hash over particles in the unit cube.
///
/// Construct once at simulation setup and rebuild it every step with
/// [`GridIndex::hash_particles`]. `DIM` is the bucket-grid resolution per
/// axis; it must be a power of two no larger than 1024.
pub struct GridIndex<const DIM: u32 = HASH_DIM> {
    /// First particle of each bucket, or `NO_PARTICLE`.
    heads: Vec<AtomicU32>,
    /// One lock per bucket, held only around a prepend.
    locks: Vec<Mutex<()>>,
    last_report: BuildReport,
}

impl<const DIM: u32> GridIndex<DIM> {
    /// Number of buckets, `DIM^3`.
    pub const SIZE: usize = hash_size(DIM);

    pub fn new() -> Self {
        let () = ValidDim::<DIM>::OK;
        Self {
            heads: (0..Self::SIZE).map(|_| AtomicU32::new(NO_PARTICLE)).collect(),
            locks: (0..Self::SIZE).map(|_| Mutex::new(())).collect(),
            last_report: BuildReport::default(),
        }
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Report from the most recent rebuild.
    pub fn last_report(&self) -> BuildReport {
        self.last_report
    }

    /// First particle in bucket `id`, or `NO_PARTICLE`.
    #[inline]
    pub fn head(&self, id: u32) -> u32 {
        self.heads[id as usize].load(Ordering::Relaxed)
    }

    /// Rebuild in parallel.
    pub fn hash_particles<P>(&mut self, particles: &mut [P], locator: &CellLocator) -> BuildReport
    where
        P: HashedParticle + Send,
    {
        self.hash_particles_parallel(particles, locator, INSERT_CHUNK)
    }

    /// Rebuild following `config`: serial when parallelism is disabled or the
    /// particle set is too small to pay for it.
    pub fn hash_particles_with<P>(
        &mut self,
        particles: &mut [P],
        locator: &CellLocator,
        config: &GridConfig,
    ) -> BuildReport
    where
        P: HashedParticle + Send,
    {
        if config.parallel && particles.len() >= config.min_parallel_particles {
            self.hash_particles_parallel(particles, locator, config.chunk())
        } else {
            self.hash_particles_serial(particles, locator)
        }
    }

    /// Single-threaded rebuild.
    pub fn hash_particles_serial<P>(
        &mut self,
        particles: &mut [P],
        locator: &CellLocator,
    ) -> BuildReport
    where
        P: HashedParticle,
    {
        check_particle_count(particles.len());

        for head in self.heads.iter_mut() {
            *head.get_mut() = NO_PARTICLE;
        }

        let mut out_of_domain = 0;
        for (i, p) in particles.iter_mut().enumerate() {
            match locator.locate::<DIM>(p.position(), IVec3::ZERO) {
                Bucket::Id(id) => {
                    let head = self.heads[id as usize].get_mut();
                    p.set_next(*head);
                    *head = i as u32;
                }
                Bucket::OutOfDomain => {
                    out_of_domain += 1;
                    skip_escaped(i, p);
                }
            }
        }

        self.finish(particles.len(), out_of_domain)
    }

    fn hash_particles_parallel<P>(
        &mut self,
        particles: &mut [P],
        locator: &CellLocator,
        chunk: usize,
    ) -> BuildReport
    where
        P: HashedParticle + Send,
    {
        check_particle_count(particles.len());

        // Every bucket must be cleared before any insertion starts;
        // for_each returns only once all of them are.
        self.heads
            .par_iter_mut()
            .for_each(|head| *head.get_mut() = NO_PARTICLE);

        let heads = &self.heads;
        let locks = &self.locks;
        let out_of_domain: usize = particles
            .par_iter_mut()
            .enumerate()
            .with_min_len(chunk)
            .map(|(i, p)| match locator.locate::<DIM>(p.position(), IVec3::ZERO) {
                Bucket::Id(id) => {
                    let b = id as usize;
                    // The lock orders the head accesses; relaxed atomics suffice.
                    let _guard = locks[b].lock();
                    p.set_next(heads[b].load(Ordering::Relaxed));
                    heads[b].store(i as u32, Ordering::Relaxed);
                    0
                }
                Bucket::OutOfDomain => {
                    skip_escaped(i, p);
                    1
                }
            })
            .sum();

        self.finish(particles.len(), out_of_domain)
    }

    fn finish(&mut self, total: usize, out_of_domain: usize) -> BuildReport {
        let report = BuildReport {
            indexed: total - out_of_domain,
            out_of_domain,
        };
        if out_of_domain > 0 {
            log::warn!(
                "{} of {} particles left the domain and were not hashed this step",
                out_of_domain,
                total
            );
        }
        log::debug!(
            "hashed {} particles into {} buckets",
            report.indexed,
            Self::SIZE
        );
        self.last_report = report;
        report
    }

    /// Walk the members of bucket `id`.
    ///
    /// `particles` must be the slice the grid was last built from.
    pub fn bucket<'a, P: HashedParticle>(
        &self,
        id: u32,
        particles: &'a [P],
    ) -> BucketIter<'a, P> {
        BucketIter {
            particles,
            cursor: self.head(id),
        }
    }

    /// The 27 buckets around `position`.
    #[inline]
    pub fn neighborhood(&self, locator: &CellLocator, position: Vec3) -> Neighborhood {
        Neighborhood::around::<DIM>(locator, position)
    }

    /// Every particle in the valid buckets of `hood`, each bucket walked once.
    ///
    /// No distance filtering: callers apply their own cutoff.
    pub fn candidates<'a, P: HashedParticle>(
        &'a self,
        hood: &'a Neighborhood,
        particles: &'a [P],
    ) -> impl Iterator<Item = u32> + 'a {
        hood.unique_ids().flat_map(move |id| self.bucket(id, particles))
    }

    pub fn occupancy<P: HashedParticle>(&self, particles: &[P]) -> Occupancy {
        let mut stats = Occupancy::default();
        for id in 0..Self::SIZE as u32 {
            let load = self.bucket(id, particles).count();
            if load > 0 {
                stats.occupied_buckets += 1;
                stats.max_load = stats.max_load.max(load);
                stats.indexed += load;
            }
        }
        stats
    }
}

impl<const DIM: u32> Default for GridIndex<DIM> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIM: u32> fmt::Debug for GridIndex<DIM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridIndex")
            .field("dim", &DIM)
            .field("buckets", &Self::SIZE)
            .field("last_report", &self.last_report)
            .finish()
    }
}

/// Members of one bucket, most recently inserted first.
pub struct BucketIter<'a, P> {
    particles: &'a [P],
    cursor: u32,
}

impl<'a, P: HashedParticle> Iterator for BucketIter<'a, P> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.cursor == NO_PARTICLE {
            return None;
        }
        let current = self.cursor;
        self.cursor = self.particles.get(current as usize)?.next();
        Some(current)
    }
}

fn check_particle_count(count: usize) {
    assert!(
        count < NO_PARTICLE as usize,
        "{} particles exceed the u32 index space of the bucket grid",
        count
    );
}

#[inline]
fn skip_escaped<P: HashedParticle>(i: usize, p: &mut P) {
    log::trace!("particle {} at {:?} is outside the domain", i, p.position());
    p.set_next(NO_PARTICLE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morton;
    use crate::particle::{Particle, Particles};

    const DIM: u32 = 8;

    fn locator(h: f32) -> CellLocator {
        CellLocator::new(h).expect("valid radius")
    }

    #[test]
    fn test_new_is_empty() {
        let grid = GridIndex::<DIM>::new();
        assert_eq!(grid.len(), 512);
        assert!((0..512).all(|id| grid.head(id) == NO_PARTICLE));
        assert_eq!(grid.last_report(), BuildReport::default());
    }

    #[test]
    fn test_default_dim() {
        assert_eq!(GridIndex::<HASH_DIM>::SIZE, 64 * 64 * 64);
    }

    #[test]
    fn test_lifo_order() {
        let mut particles: Particles = [
            Vec3::splat(0.05),
            Vec3::splat(0.06),
            Vec3::splat(0.07),
        ]
        .into_iter()
        .collect();
        let mut grid = GridIndex::<DIM>::new();
        let report = grid.hash_particles_serial(particles.as_mut_slice(), &locator(0.1));
        assert_eq!(report, BuildReport { indexed: 3, out_of_domain: 0 });

        let members: Vec<u32> = grid.bucket(0, particles.as_slice()).collect();
        assert_eq!(members, vec![2, 1, 0]);
        assert_eq!(particles.list[0].next(), NO_PARTICLE);
    }

    #[test]
    fn test_scenario_buckets() {
        let mut particles: Particles = [Vec3::splat(0.05), Vec3::splat(0.95)].into_iter().collect();
        let mut grid = GridIndex::<DIM>::new();
        grid.hash_particles_serial(particles.as_mut_slice(), &locator(0.1));

        assert_eq!(grid.head(0), 0);
        assert_eq!(grid.head(morton::encode(1, 1, 1)), 1);
    }

    #[test]
    fn test_out_of_domain_skipped() {
        let mut particles: Particles = [
            Vec3::splat(0.5),
            Vec3::new(-0.2, 0.5, 0.5),
            Vec3::new(0.5, 1.2, 0.5),
            Vec3::new(f32::NAN, 0.5, 0.5),
        ]
        .into_iter()
        .collect();
        let mut grid = GridIndex::<DIM>::new();
        let report = grid.hash_particles_serial(particles.as_mut_slice(), &locator(0.1));

        assert_eq!(report, BuildReport { indexed: 1, out_of_domain: 3 });
        assert_eq!(grid.last_report(), report);
        assert_eq!(grid.occupancy(particles.as_slice()).indexed, 1);
    }

    #[test]
    fn test_rebuild_clears_previous_step() {
        let mut particles: Particles = [Vec3::splat(0.05)].into_iter().collect();
        let mut grid = GridIndex::<DIM>::new();
        let loc = locator(0.1);
        grid.hash_particles_serial(particles.as_mut_slice(), &loc);
        assert_eq!(grid.head(0), 0);

        particles.list[0].position = Vec3::splat(0.15);
        grid.hash_particles_serial(particles.as_mut_slice(), &loc);
        assert_eq!(grid.head(0), NO_PARTICLE);
        assert_eq!(grid.head(morton::encode(1, 1, 1)), 0);
    }

    #[test]
    fn test_parallel_small_set() {
        let mut particles: Particles = (0..100)
            .map(|i| Vec3::splat(0.005 + i as f32 * 0.0099))
            .collect();
        let mut grid = GridIndex::<DIM>::new();
        let report = grid.hash_particles(particles.as_mut_slice(), &locator(0.1));
        assert_eq!(report.indexed, 100);
        assert_eq!(grid.occupancy(particles.as_slice()).indexed, 100);
    }

    #[test]
    fn test_hash_particles_with_config() {
        let mut particles: Particles = [Vec3::splat(0.3), Vec3::splat(0.31)].into_iter().collect();
        let mut grid = GridIndex::<DIM>::new();
        let config = GridConfig {
            interaction_radius: 0.1,
            ..GridConfig::default()
        };
        let loc = config.locator().expect("valid config");
        let report = grid.hash_particles_with(particles.as_mut_slice(), &loc, &config);
        assert_eq!(report.indexed, 2);
        let own = loc.locate::<DIM>(Vec3::splat(0.3), IVec3::ZERO).id().expect("inside");
        assert_eq!(grid.bucket(own, particles.as_slice()).count(), 2);
    }

    #[test]
    fn test_candidates_cover_neighbors() {
        let mut particles: Particles = [
            Vec3::splat(0.55),
            Vec3::splat(0.45),
            Vec3::new(0.55, 0.65, 0.55),
            Vec3::splat(0.05),
        ]
        .into_iter()
        .collect();
        let mut grid = GridIndex::<16>::new();
        let loc = locator(0.1);
        grid.hash_particles_serial(particles.as_mut_slice(), &loc);

        let hood = grid.neighborhood(&loc, particles.list[0].position);
        let mut found: Vec<u32> = grid.candidates(&hood, particles.as_slice()).collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
    }

    #[test]
    fn test_candidates_visit_aliased_bucket_once() {
        // h = 0.25 -> 5 cells per axis; on a 2-wide grid neighbors alias.
        let mut particles: Particles = [Vec3::splat(0.6), Vec3::splat(0.3)].into_iter().collect();
        let mut grid = GridIndex::<2>::new();
        let loc = locator(0.25);
        grid.hash_particles_serial(particles.as_mut_slice(), &loc);

        let hood = grid.neighborhood(&loc, particles.list[0].position);
        let found: Vec<u32> = grid.candidates(&hood, particles.as_slice()).collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_occupancy() {
        let mut particles: Particles = [
            Vec3::splat(0.05),
            Vec3::splat(0.06),
            Vec3::splat(0.55),
        ]
        .into_iter()
        .collect();
        let mut grid = GridIndex::<DIM>::new();
        grid.hash_particles_serial(particles.as_mut_slice(), &locator(0.1));
        let stats = grid.occupancy(particles.as_slice());
        assert_eq!(stats.occupied_buckets, 2);
        assert_eq!(stats.max_load, 2);
        assert_eq!(stats.indexed, 3);
        assert!((stats.mean_load() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_bucket_iter_tolerates_short_slice() {
        let mut particles: Particles = [Vec3::splat(0.05), Vec3::splat(0.06)].into_iter().collect();
        let mut grid = GridIndex::<DIM>::new();
        grid.hash_particles_serial(particles.as_mut_slice(), &locator(0.1));
        let short: &[Particle] = &particles.list[..1];
        assert_eq!(grid.bucket(0, short).count(), 0);
    }
}
