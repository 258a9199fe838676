//! Particle storage seen by the bucket grid.
//!
//! The grid never owns particles. It reads positions and threads each
//! bucket's list through a per-particle `next` link, which holds the arena
//! index of the following member or [`NO_PARTICLE`].

use glam::Vec3;

use crate::constants::NO_PARTICLE;

/// What the bucket grid needs from a particle.
///
/// Simulations with their own particle layout implement this instead of
/// converting to [`Particle`].
pub trait HashedParticle {
    /// Position in the unit domain.
    fn position(&self) -> Vec3;

    /// Next particle in the same bucket, or [`NO_PARTICLE`].
    fn next(&self) -> u32;

    /// Only the grid writes this, and only during a rebuild.
    fn set_next(&mut self, next: u32);
}

/// A single SPH particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Position in the unit domain
    pub position: Vec3,
    /// Current velocity
    pub velocity: Vec3,
    /// Particle mass
    pub mass: f32,
    /// Bucket list link; meaningful only after a rebuild
    next: u32,
}

impl Particle {
    /// Create a new particle at the given position with initial velocity.
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            mass: 1.0,
            next: NO_PARTICLE,
        }
    }

    /// Create a stationary particle at the given position.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO)
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl HashedParticle for Particle {
    #[inline(always)]
    fn position(&self) -> Vec3 {
        self.position
    }

    #[inline(always)]
    fn next(&self) -> u32 {
        self.next
    }

    #[inline(always)]
    fn set_next(&mut self, next: u32) {
        self.next = next;
    }
}

/// Fixed arena of particles; the index into `list` is the particle id.
#[derive(Clone, Debug, Default)]
pub struct Particles {
    pub list: Vec<Particle>,
}

impl Particles {
    /// Create an empty particle collection.
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    /// Create with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
        }
    }

    /// Add a particle and return its id.
    pub fn spawn(&mut self, position: Vec3, velocity: Vec3) -> u32 {
        let id = self.list.len() as u32;
        self.list.push(Particle::new(position, velocity));
        id
    }

    /// Add a stationary particle and return its id.
    pub fn spawn_at(&mut self, position: Vec3) -> u32 {
        self.spawn(position, Vec3::ZERO)
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.list
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.list
    }
}

impl FromIterator<Vec3> for Particles {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        Self {
            list: iter.into_iter().map(Particle::at).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_creation() {
        let p = Particle::new(Vec3::new(0.1, 0.2, 0.3), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.position, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(p.velocity, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.mass, 1.0);
        assert_eq!(p.next(), NO_PARTICLE);
    }

    #[test]
    fn test_particles_spawn_ids() {
        let mut particles = Particles::new();
        assert_eq!(particles.spawn(Vec3::ONE, Vec3::ZERO), 0);
        assert_eq!(particles.spawn_at(Vec3::splat(0.5)), 1);
        assert_eq!(particles.len(), 2);
    }

    #[test]
    fn test_collect_positions() {
        let particles: Particles = [Vec3::splat(0.1), Vec3::splat(0.2)].into_iter().collect();
        assert_eq!(particles.len(), 2);
        assert_eq!(particles.list[1].position(), Vec3::splat(0.2));
    }
}
