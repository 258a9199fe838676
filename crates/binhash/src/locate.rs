//! Position -> cell -> bucket quantization.
//!
//! The domain is the unit cube `[0, 1)^3`. With cell edge `h` the valid cell
//! range per axis is `[0, bound)`, `bound = floor(1/h) + 1`. Coordinates are
//! bounds-checked *before* they are masked to the bucket grid, so a cell
//! outside the domain never wraps into an unrelated bucket.

use glam::{IVec3, Vec3};

use crate::constants::{ValidDim, MAX_HASH_DIM};
use crate::error::ConfigError;
use crate::morton;

/// Result of locating a cell in the bucket grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Bucket id in `[0, HASH_DIM^3)`.
    Id(u32),
    /// The cell lies outside the domain; it holds no candidates.
    OutOfDomain,
}

impl Bucket {
    #[inline]
    pub fn id(self) -> Option<u32> {
        match self {
            Bucket::Id(id) => Some(id),
            Bucket::OutOfDomain => None,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        matches!(self, Bucket::Id(_))
    }
}

/// How the chosen `h` maps onto a bucket grid of resolution `DIM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Valid cells per axis.
    pub bound: i32,
    /// More cells per axis than buckets: distant cells share buckets.
    pub aliased: bool,
}

/// Quantizes positions for one value of `h`.
///
/// Built once per step (`h` may change between steps) so the reciprocal and
/// the bound are computed once rather than per particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellLocator {
    h: f32,
    inv_h: f32,
    bound: i32,
}

impl CellLocator {
    pub fn new(h: f32) -> Result<Self, ConfigError> {
        if !h.is_finite() || h <= 0.0 {
            return Err(ConfigError::InvalidRadius(h));
        }
        let inv_h = 1.0 / h;
        let cells = inv_h.floor();
        // The last valid cell plus the +1 neighbor offset must still fit in i32.
        if !cells.is_finite() || cells >= (i32::MAX - 2) as f32 {
            return Err(ConfigError::RadiusTooSmall(h));
        }
        Ok(Self {
            h,
            inv_h,
            bound: cells as i32 + 1,
        })
    }

    /// Cell edge length.
    pub fn h(&self) -> f32 {
        self.h
    }

    /// Valid cell coordinates per axis: `[0, bound)`.
    pub fn bound(&self) -> i32 {
        self.bound
    }

    /// Position in cell units. Compute once per particle and reuse it for
    /// every neighbor offset.
    #[inline(always)]
    pub fn scale(&self, position: Vec3) -> Vec3 {
        position * self.inv_h
    }

    /// Cell containing a scaled position, truncating toward zero.
    ///
    /// Returns `None` for NaN or infinite input.
    #[inline(always)]
    pub fn cell(&self, scaled: Vec3) -> Option<IVec3> {
        if scaled.is_finite() {
            Some(scaled.as_ivec3())
        } else {
            None
        }
    }

    /// Bucket of an integer cell, or `OutOfDomain` if it falls outside
    /// `[0, bound)` on any axis.
    #[inline(always)]
    pub fn bucket_of_cell<const DIM: u32>(&self, cell: IVec3) -> Bucket {
        let () = ValidDim::<DIM>::OK;
        // Negative coordinates become huge as u32, so one compare per axis
        // covers both ends of the range.
        let bound = self.bound as u32;
        let (ix, iy, iz) = (cell.x as u32, cell.y as u32, cell.z as u32);
        if ix >= bound || iy >= bound || iz >= bound {
            return Bucket::OutOfDomain;
        }
        let mask = DIM - 1;
        Bucket::Id(morton::encode(ix & mask, iy & mask, iz & mask))
    }

    /// Bucket of the cell `displacement` away from a pre-scaled position.
    #[inline(always)]
    pub fn locate_scaled<const DIM: u32>(&self, scaled: Vec3, displacement: IVec3) -> Bucket {
        match self.cell(scaled) {
            Some(cell) => self.bucket_of_cell::<DIM>(cell.wrapping_add(displacement)),
            None => Bucket::OutOfDomain,
        }
    }

    /// Bucket of the cell `displacement` away from the cell holding `position`.
    #[inline]
    pub fn locate<const DIM: u32>(&self, position: Vec3, displacement: IVec3) -> Bucket {
        self.locate_scaled::<DIM>(self.scale(position), displacement)
    }

    /// Compare the domain's cell count against the bucket grid.
    pub fn resolution<const DIM: u32>(&self) -> Resolution {
        let () = ValidDim::<DIM>::OK;
        Resolution {
            bound: self.bound,
            aliased: self.bound > DIM as i32,
        }
    }
}

/// Setup-time sizing check for `h` against a bucket grid of resolution `DIM`.
///
/// Aliasing is legal (the force phase re-checks distance) but degrades
/// neighbor search, so it is logged once here rather than every step.
pub fn check_resolution<const DIM: u32>(h: f32) -> Result<Resolution, ConfigError> {
    let locator = CellLocator::new(h)?;
    let resolution = locator.resolution::<DIM>();
    if resolution.aliased {
        log::warn!(
            "h = {} gives {} cells per axis but the bucket grid has {} (max {}); \
             distant cells will share buckets",
            h,
            resolution.bound,
            DIM,
            MAX_HASH_DIM
        );
    } else {
        log::debug!(
            "h = {} gives {} cells per axis on a {}^3 bucket grid",
            h,
            resolution.bound,
            DIM
        );
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: u32 = 8;

    fn locator(h: f32) -> CellLocator {
        CellLocator::new(h).expect("valid radius")
    }

    #[test]
    fn test_bound() {
        assert_eq!(locator(0.1).bound(), 11);
        assert_eq!(locator(0.25).bound(), 5);
        assert_eq!(locator(0.3).bound(), 4);
        assert_eq!(locator(1.0).bound(), 2);
    }

    #[test]
    fn test_rejects_bad_radius() {
        assert!(matches!(CellLocator::new(0.0), Err(ConfigError::InvalidRadius(_))));
        assert!(matches!(CellLocator::new(-0.1), Err(ConfigError::InvalidRadius(_))));
        assert!(matches!(CellLocator::new(f32::NAN), Err(ConfigError::InvalidRadius(_))));
        assert!(matches!(CellLocator::new(f32::INFINITY), Err(ConfigError::InvalidRadius(_))));
        assert!(matches!(CellLocator::new(1e-12), Err(ConfigError::RadiusTooSmall(_))));
    }

    #[test]
    fn test_origin_cell_is_bucket_zero() {
        let loc = locator(0.1);
        assert_eq!(loc.locate::<DIM>(Vec3::splat(0.05), IVec3::ZERO), Bucket::Id(0));
    }

    #[test]
    fn test_far_corner_masks_into_grid() {
        let loc = locator(0.1);
        let p = Vec3::splat(0.95);
        assert_eq!(loc.cell(loc.scale(p)), Some(IVec3::splat(9)));
        // (9,9,9) & 7 = (1,1,1) -> 0b111
        assert_eq!(loc.locate::<DIM>(p, IVec3::ZERO), Bucket::Id(7));
        // (10,10,10) is still below bound = 11
        assert_eq!(loc.locate::<DIM>(p, IVec3::ONE), Bucket::Id(morton::encode(2, 2, 2)));
    }

    #[test]
    fn test_boundary_displacements() {
        let loc = locator(0.1);
        let p = Vec3::new(0.0, 0.5, 0.5);
        assert_eq!(loc.locate::<DIM>(p, IVec3::new(-1, 0, 0)), Bucket::OutOfDomain);
        assert!(loc.locate::<DIM>(p, IVec3::new(1, 0, 0)).is_valid());
    }

    #[test]
    fn test_bound_checked_before_mask() {
        // Cell 11 would mask to 3 and look valid; it must be rejected.
        let loc = locator(0.1);
        let cell = IVec3::new(11, 0, 0);
        assert_eq!(loc.bucket_of_cell::<DIM>(cell), Bucket::OutOfDomain);
        assert_eq!(loc.bucket_of_cell::<DIM>(IVec3::new(-1, 3, 3)), Bucket::OutOfDomain);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let loc = locator(0.1);
        // -0.05 / 0.1 = -0.5 truncates to cell 0, not -1.
        assert_eq!(loc.cell(loc.scale(Vec3::new(-0.05, 0.0, 0.0))), Some(IVec3::ZERO));
    }

    #[test]
    fn test_non_finite_position() {
        let loc = locator(0.1);
        assert_eq!(
            loc.locate::<DIM>(Vec3::new(f32::NAN, 0.5, 0.5), IVec3::ZERO),
            Bucket::OutOfDomain
        );
        assert_eq!(
            loc.locate::<DIM>(Vec3::new(0.5, f32::INFINITY, 0.5), IVec3::ZERO),
            Bucket::OutOfDomain
        );
    }

    #[test]
    fn test_huge_position_does_not_overflow() {
        let loc = locator(0.1);
        let p = Vec3::splat(1e30);
        assert_eq!(loc.locate::<DIM>(p, IVec3::ONE), Bucket::OutOfDomain);
    }

    #[test]
    fn test_resolution() {
        assert!(!locator(0.2).resolution::<8>().aliased);
        assert!(locator(0.1).resolution::<8>().aliased);
        assert!(!locator(0.1).resolution::<16>().aliased);
        let res = check_resolution::<16>(0.1).expect("valid radius");
        assert_eq!(res.bound, 11);
    }
}
