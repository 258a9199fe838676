//! The 27 buckets around a particle's cell.

use glam::{IVec3, Vec3};

use crate::constants::{NEIGHBORHOOD_SIZE, SELF_SLOT};
use crate::locate::{Bucket, CellLocator};

/// Displacements `{-1, 0, 1}^3`, `i` outermost and `k` innermost.
pub const NEIGHBOR_OFFSETS: [IVec3; NEIGHBORHOOD_SIZE] = {
    let mut offsets = [IVec3::ZERO; NEIGHBORHOOD_SIZE];
    let mut n = 0;
    let mut i = -1;
    while i <= 1 {
        let mut j = -1;
        while j <= 1 {
            let mut k = -1;
            while k <= 1 {
                offsets[n] = IVec3::new(i, j, k);
                n += 1;
                k += 1;
            }
            j += 1;
        }
        i += 1;
    }
    offsets
};

/// Fixed 27-slot buffer of bucket lookups.
///
/// Slots keep their positions even when the cell is out of the domain, so
/// slot `n` always corresponds to `NEIGHBOR_OFFSETS[n]`. Reuse one buffer
/// per worker and refill it per particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighborhood {
    pub buckets: [Bucket; NEIGHBORHOOD_SIZE],
}

impl Default for Neighborhood {
    fn default() -> Self {
        Self {
            buckets: [Bucket::OutOfDomain; NEIGHBORHOOD_SIZE],
        }
    }
}

impl Neighborhood {
    /// Fill a neighborhood for `position`.
    pub fn around<const DIM: u32>(locator: &CellLocator, position: Vec3) -> Self {
        let mut hood = Self::default();
        particle_neighborhood::<DIM>(&mut hood.buckets, locator, position);
        hood
    }

    /// The particle's own bucket.
    #[inline]
    pub fn own(&self) -> Bucket {
        self.buckets[SELF_SLOT]
    }

    pub fn iter(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.buckets.iter().copied()
    }

    /// Valid bucket ids with repeats removed.
    ///
    /// When the domain has more cells per axis than the bucket grid, two
    /// offsets can land in the same bucket; walking it twice would report
    /// the same candidates twice.
    pub fn unique_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.buckets.iter().enumerate().filter_map(|(n, bucket)| {
            let id = bucket.id()?;
            let repeated = self.buckets[..n].iter().any(|b| *b == Bucket::Id(id));
            (!repeated).then_some(id)
        })
    }
}

/// Write the 27 buckets around `position` into `out`, returning the number
/// of slots written (always 27).
///
/// The position is scaled once and reused for every offset.
#[inline]
pub fn particle_neighborhood<const DIM: u32>(
    out: &mut [Bucket; NEIGHBORHOOD_SIZE],
    locator: &CellLocator,
    position: Vec3,
) -> usize {
    let scaled = locator.scale(position);
    match locator.cell(scaled) {
        Some(cell) => {
            for (slot, offset) in out.iter_mut().zip(NEIGHBOR_OFFSETS.iter()) {
                *slot = locator.bucket_of_cell::<DIM>(cell.wrapping_add(*offset));
            }
        }
        None => out.fill(Bucket::OutOfDomain),
    }
    NEIGHBORHOOD_SIZE
}
