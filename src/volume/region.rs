//! Index regions, world bounds and the conversions between them.
//!
//! A [`Region`] is an inclusive range of voxel indices per axis. A
//! [`Bounds`] is a range of world coordinates per axis. The two are related
//! through the volume's origin and spacing: index `i` along an axis sits at
//! world coordinate `origin + i * spacing`, and a world coordinate maps back
//! to the nearest index, rounding halves away from zero.
//!
//! Traversal of a region always follows the payload's memory order, with
//! axis 0 varying fastest.
//!
//! [`Region`]: ./struct.Region.html
//! [`Bounds`]: ./struct.Bounds.html

use crate::error::{MhdError, Result};
use std::convert::TryFrom;
use std::fmt;

/// A fixed-size triplet, used by the operations which only make sense in
/// three dimensions.
pub type Vector3 = [f64; 3];

/// An inclusive, N-dimensional range of voxel indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    min: Vec<i64>,
    max: Vec<i64>,
}

impl Region {
    /// Create a region from its inclusive lower and upper corners. The
    /// region may be empty (see [`is_empty`](#method.is_empty)).
    ///
    /// # Panics
    ///
    /// Panics if `min` and `max` have different lengths.
    pub fn new(min: Vec<i64>, max: Vec<i64>) -> Self {
        assert_eq!(min.len(), max.len(), "region corners of different rank");
        Region { min, max }
    }

    /// Create a region from its first index and its size along each axis.
    ///
    /// # Example
    ///
    /// ```
    /// # use mhd_stream::Region;
    /// let region = Region::from_index_size(&[0, 1, 2], &[1000, 100, 10]);
    /// assert_eq!(region.max(), &[999, 100, 11]);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `index` and `size` have different lengths, or if the last
    /// index along some axis does not fit in an `i64`. See
    /// [`checked_from_index_size`](#method.checked_from_index_size).
    pub fn from_index_size(index: &[i64], size: &[u64]) -> Self {
        assert_eq!(index.len(), size.len(), "region index and size of different rank");
        match Region::checked_from_index_size(index, size) {
            Some(region) => region,
            None => panic!("region end index overflows"),
        }
    }

    /// Create a region from its first index and its size along each axis,
    /// or `None` if the ranks differ or the last index along some axis
    /// does not fit in an `i64`.
    pub fn checked_from_index_size(index: &[i64], size: &[u64]) -> Option<Self> {
        if index.len() != size.len() {
            return None;
        }
        let max = index
            .iter()
            .zip(size)
            .map(|(i, s)| i64::try_from(*s).ok().and_then(|s| i.checked_add(s - 1)))
            .collect::<Option<Vec<i64>>>()?;
        Some(Region {
            min: index.to_vec(),
            max,
        })
    }

    /// The region holding the single voxel at `index`.
    pub fn voxel(index: &[i64]) -> Self {
        Region::new(index.to_vec(), index.to_vec())
    }

    /// Number of axes.
    pub fn ndims(&self) -> usize {
        self.min.len()
    }

    /// First index along each axis.
    pub fn min(&self) -> &[i64] {
        &self.min
    }

    /// Last index along each axis.
    pub fn max(&self) -> &[i64] {
        &self.max
    }

    /// Number of voxels along each axis, zero for inverted axes. An axis
    /// spanning the whole `i64` range saturates at `u64::MAX`.
    pub fn size(&self) -> Vec<u64> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| axis_size(*lo, *hi).unwrap_or(u64::MAX))
            .collect()
    }

    /// Number of voxels along each axis, or `None` if some axis holds more
    /// than `i64::MAX` voxels.
    pub fn checked_size(&self) -> Option<Vec<u64>> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| axis_size(*lo, *hi).filter(|s| *s <= i64::MAX as u64))
            .collect()
    }

    /// Whether the region holds no voxels: it has no axes, or some axis
    /// interval is inverted.
    pub fn is_empty(&self) -> bool {
        self.min.is_empty() || self.min.iter().zip(&self.max).any(|(lo, hi)| hi < lo)
    }

    /// Total number of voxels in the region.
    pub fn num_voxels(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.size()
            .iter()
            .fold(1_u64, |acc, s| acc.saturating_mul(*s))
    }

    /// Whether the given index lies in the region.
    pub fn contains_index(&self, index: &[i64]) -> bool {
        index.len() == self.ndims()
            && index
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(i, (lo, hi))| lo <= i && i <= hi)
    }

    /// Whether `inner` is a non-empty region fully inside this one, bounds
    /// included.
    pub fn contains(&self, inner: &Region) -> bool {
        inner.ndims() == self.ndims()
            && !inner.is_empty()
            && self.contains_index(&inner.min)
            && self.contains_index(&inner.max)
    }

    /// The common part of two regions, or `None` if they do not overlap.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        if self.ndims() != other.ndims() {
            return None;
        }
        let min: Vec<i64> = self.min.iter().zip(&other.min).map(|(a, b)| *a.max(b)).collect();
        let max: Vec<i64> = self.max.iter().zip(&other.max).map(|(a, b)| *a.min(b)).collect();
        let region = Region { min, max };
        if region.is_empty() {
            None
        } else {
            Some(region)
        }
    }

    /// The same region moved by `delta` along each axis.
    pub fn translate(&self, delta: &[i64]) -> Region {
        Region {
            min: self.min.iter().zip(delta).map(|(a, d)| a + d).collect(),
            max: self.max.iter().zip(delta).map(|(a, d)| a + d).collect(),
        }
    }

    /// Iterate over every index of the region, axis 0 fastest.
    pub fn index_iter(&self) -> RegionIter {
        RegionIter::new(self.min.clone(), self.max.clone())
    }

    /// Iterate over the first index of every row of the region, a row being
    /// the run of voxels along axis 0.
    pub fn row_iter(&self) -> RegionIter {
        let mut max = self.max.clone();
        if let Some(m) = max.first_mut() {
            *m = self.min[0];
        }
        RegionIter::new(self.min.clone(), max)
    }
}

fn axis_size(lo: i64, hi: i64) -> Option<u64> {
    if hi < lo {
        return Some(0);
    }
    u64::try_from(i128::from(hi) - i128::from(lo) + 1).ok()
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("[")?;
        for (i, (lo, hi)) in self.min.iter().zip(&self.max).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}..={}", lo, hi)?;
        }
        f.write_str("]")
    }
}

/// Iterator over the indices of a region in memory order.
#[derive(Debug, Clone)]
pub struct RegionIter {
    min: Vec<i64>,
    max: Vec<i64>,
    next: Option<Vec<i64>>,
}

impl RegionIter {
    fn new(min: Vec<i64>, max: Vec<i64>) -> Self {
        let empty = min.is_empty() || min.iter().zip(&max).any(|(lo, hi)| hi < lo);
        let next = if empty { None } else { Some(min.clone()) };
        RegionIter { min, max, next }
    }
}

impl Iterator for RegionIter {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Vec<i64>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for axis in 0..following.len() {
            if following[axis] < self.max[axis] {
                following[axis] += 1;
                self.next = Some(following);
                break;
            }
            following[axis] = self.min[axis];
        }
        Some(current)
    }
}

/// An N-dimensional range of world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Bounds {
    /// Create bounds from their lower and upper corners.
    ///
    /// # Panics
    ///
    /// Panics if `min` and `max` have different lengths.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        assert_eq!(min.len(), max.len(), "bounds corners of different rank");
        Bounds { min, max }
    }

    /// Create bounds from interleaved `[lo0, hi0, lo1, hi1, ...]` values.
    ///
    /// # Panics
    ///
    /// Panics if `values` has an odd length.
    pub fn from_interleaved(values: &[f64]) -> Self {
        assert!(values.len() % 2 == 0, "interleaved bounds of odd length");
        Bounds {
            min: values.iter().step_by(2).cloned().collect(),
            max: values.iter().skip(1).step_by(2).cloned().collect(),
        }
    }

    /// Number of axes.
    pub fn ndims(&self) -> usize {
        self.min.len()
    }

    /// Lower world coordinate along each axis.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Upper world coordinate along each axis.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// These bounds with one axis collapsed to the single `value`.
    pub fn with_axis(&self, axis: usize, value: f64) -> Bounds {
        let mut b = self.clone();
        b.min[axis] = value;
        b.max[axis] = value;
        b
    }
}

/// The bounds of a 3-dimensional volume, together with the origin and
/// spacing they were computed with.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBounds {
    bounds: Bounds,
    origin: Vector3,
    spacing: Vector3,
}

impl VolumeBounds {
    /// Compute the bounds of a 3-dimensional region.
    ///
    /// # Panics
    ///
    /// Panics if `region` is not 3-dimensional.
    pub fn new(region: &Region, origin: Vector3, spacing: Vector3) -> Self {
        assert_eq!(region.ndims(), 3, "volume bounds need a 3-dimensional region");
        VolumeBounds {
            bounds: bounds_from_region(region, &origin, &spacing),
            origin,
            spacing,
        }
    }

    /// The world bounds.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// The origin the bounds are relative to.
    pub fn origin(&self) -> Vector3 {
        self.origin
    }

    /// The voxel spacing.
    pub fn spacing(&self) -> Vector3 {
        self.spacing
    }

    /// The index region these bounds were computed from.
    pub fn region(&self) -> Region {
        region_from_bounds(&self.bounds, &self.origin, &self.spacing)
    }
}

/// Map world bounds to the region of voxel indices they cover.
///
/// Along each axis the index is `round((world - origin) / spacing)`,
/// rounding halves away from zero. Reversed bounds edges are accepted, the
/// resulting region always has `min <= max`. Indices beyond the `i64`
/// range saturate.
///
/// # Panics
///
/// Panics if `origin` or `spacing` has fewer axes than `bounds`.
pub fn region_from_bounds(bounds: &Bounds, origin: &[f64], spacing: &[f64]) -> Region {
    assert!(
        origin.len() >= bounds.ndims() && spacing.len() >= bounds.ndims(),
        "bounds of higher rank than their origin or spacing"
    );
    let (min, max) = (0..bounds.ndims())
        .map(|i| {
            let lo = ((bounds.min[i] - origin[i]) / spacing[i]).round() as i64;
            let hi = ((bounds.max[i] - origin[i]) / spacing[i]).round() as i64;
            (lo.min(hi), lo.max(hi))
        })
        .unzip();
    Region { min, max }
}

/// Map world bounds to a region of a volume with the given spacing and a
/// zero origin, rejecting bounds of another rank.
pub(crate) fn volume_region_from_bounds(bounds: &Bounds, spacing: &[f64]) -> Result<Region> {
    if bounds.ndims() != spacing.len() {
        return Err(MhdError::DimensionMismatch(spacing.len(), bounds.ndims()));
    }
    let origin = vec![0.; spacing.len()];
    Ok(region_from_bounds(bounds, &origin, spacing))
}

/// The region of `size` voxels starting at the index of a world origin,
/// rounding halves away from zero. `None` if some index does not fit in
/// an `i64`.
pub(crate) fn region_at_origin(origin: &[f64], spacing: &[f64], size: &[u64]) -> Option<Region> {
    if origin.len() != spacing.len() {
        return None;
    }
    let first = origin
        .iter()
        .zip(spacing)
        .map(|(o, s)| {
            let i = (o / s).round();
            // i64::MAX as f64 rounds up to 2^63
            if i.is_finite() && i >= i64::MIN as f64 && i < i64::MAX as f64 {
                Some(i as i64)
            } else {
                None
            }
        })
        .collect::<Option<Vec<i64>>>()?;
    Region::checked_from_index_size(&first, size)
}

/// Map a region of voxel indices to world bounds, placing each index at
/// `origin + index * spacing`.
pub fn bounds_from_region(region: &Region, origin: &[f64], spacing: &[f64]) -> Bounds {
    let (min, max) = (0..region.ndims())
        .map(|i| {
            (
                origin[i] + region.min[i] as f64 * spacing[i],
                origin[i] + region.max[i] as f64 * spacing[i],
            )
        })
        .unzip();
    Bounds { min, max }
}

/// Linear element offset of `index` within a box of `size` voxels starting
/// at `first`, axis 0 fastest.
pub(crate) fn linear_offset(index: &[i64], first: &[i64], size: &[u64]) -> u64 {
    let mut stride = 1_u64;
    let mut offset = 0_u64;
    for ((i, f), s) in index.iter().zip(first).zip(size) {
        offset += (i - f) as u64 * stride;
        stride *= s;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_and_emptiness() {
        let r = Region::from_index_size(&[0, 1, 2], &[1000, 100, 10]);
        assert_eq!(r.min(), &[0, 1, 2]);
        assert_eq!(r.max(), &[999, 100, 11]);
        assert_eq!(r.size(), vec![1000, 100, 10]);
        assert_eq!(r.num_voxels(), 1_000_000);
        assert!(!r.is_empty());

        let e = Region::from_index_size(&[0, 0], &[3, 0]);
        assert!(e.is_empty());
        assert_eq!(e.num_voxels(), 0);
        assert!(Region::new(vec![], vec![]).is_empty());
    }

    #[test]
    fn bounds_to_region_rounds_half_away_from_zero() {
        let spacing = [2., 2.];
        let origin = [0., 0.];
        let b = Bounds::new(vec![3., -3.], vec![5., -1.]);
        let r = region_from_bounds(&b, &origin, &spacing);
        assert_eq!(r, Region::new(vec![2, -2], vec![3, -1]));
    }

    #[test]
    fn reversed_bounds_edges() {
        let b = Bounds::new(vec![10., 0.], vec![0., 4.]);
        let r = region_from_bounds(&b, &[0., 0.], &[1., 2.]);
        assert_eq!(r, Region::new(vec![0, 0], vec![10, 2]));
    }

    #[test]
    fn region_bounds_region() {
        let origin = [0., 0., 0.];
        let spacing = [1.1, 2.2, 3.3];
        let r = Region::from_index_size(&[0, 1, 2], &[1000, 100, 10]);
        let b = bounds_from_region(&r, &origin, &spacing);
        assert_eq!(b.min(), &[0., 2.2, 6.6]);
        assert_eq!(region_from_bounds(&b, &origin, &spacing), r);

        let vb = VolumeBounds::new(&r, origin, spacing);
        assert_eq!(vb.region(), r);
        assert_eq!(vb.spacing(), spacing);
    }

    #[test]
    fn bounds_with_origin() {
        let r = Region::new(vec![1, 2], vec![3, 4]);
        let b = bounds_from_region(&r, &[10., -10.], &[0.5, 2.]);
        assert_eq!(b, Bounds::from_interleaved(&[10.5, 11.5, -6., -2.]));
        assert_eq!(region_from_bounds(&b, &[10., -10.], &[0.5, 2.]), r);
    }

    #[test]
    fn wide_regions_do_not_overflow() {
        let whole = Region::new(vec![i64::MIN, 0], vec![i64::MAX, 0]);
        assert_eq!(whole.size(), vec![u64::MAX, 1]);
        assert_eq!(whole.checked_size(), None);
        assert_eq!(whole.num_voxels(), u64::MAX);

        let half = Region::new(vec![0], vec![i64::MAX - 1]);
        assert_eq!(half.checked_size(), Some(vec![i64::MAX as u64]));

        assert_eq!(Region::checked_from_index_size(&[i64::MAX - 1], &[3]), None);
        assert_eq!(Region::checked_from_index_size(&[0], &[u64::MAX]), None);
        assert_eq!(
            Region::checked_from_index_size(&[i64::MAX - 2], &[3]),
            Some(Region::new(vec![i64::MAX - 2], vec![i64::MAX]))
        );
    }

    #[test]
    fn region_at_far_origins() {
        assert_eq!(
            region_at_origin(&[3., -4.5], &[1.5, 1.], &[2, 2]),
            Some(Region::new(vec![2, -5], vec![3, -4]))
        );
        assert_eq!(region_at_origin(&[1e300, 0.], &[1., 1.], &[1, 1]), None);
        assert_eq!(region_at_origin(&[-1e300, 0.], &[1., 1.], &[1, 1]), None);
        assert_eq!(region_at_origin(&[1., 0.], &[1e-320, 1.], &[1, 1]), None);
        // the first index fits, the last one does not
        assert_eq!(
            region_at_origin(&[9_223_372_036_854_774_784.], &[1.], &[2000]),
            None
        );
    }

    #[test]
    fn bounds_of_another_rank_are_rejected() {
        let b = Bounds::new(vec![0.; 4], vec![1.; 4]);
        assert!(matches!(
            volume_region_from_bounds(&b, &[1., 1., 1.]),
            Err(MhdError::DimensionMismatch(3, 4))
        ));
        assert_eq!(
            volume_region_from_bounds(&Bounds::from_interleaved(&[0., 2., 1., 3.]), &[1., 0.5])
                .unwrap(),
            Region::new(vec![0, 2], vec![2, 6])
        );
    }

    #[test]
    #[should_panic(expected = "odd length")]
    fn interleaved_bounds_need_pairs() {
        let _ = Bounds::from_interleaved(&[0., 1., 0., 1., 0.]);
    }

    #[test]
    fn intersection() {
        let a = Region::new(vec![0, 0, 0], vec![9, 9, 9]);
        let b = Region::new(vec![5, -3, 2], vec![12, 4, 2]);
        assert_eq!(a.intersect(&b), Some(Region::new(vec![5, 0, 2], vec![9, 4, 2])));
        assert_eq!(a.intersect(&b), b.intersect(&a));

        let far = Region::new(vec![10, 0, 0], vec![11, 9, 9]);
        assert_eq!(a.intersect(&far), None);
        assert_eq!(a.intersect(&Region::new(vec![0], vec![1])), None);
    }

    #[test]
    fn containment() {
        let outer = Region::new(vec![0, 1, 2], vec![9, 10, 11]);
        assert!(outer.contains(&outer));
        assert!(outer.contains(&Region::voxel(&[0, 1, 2])));
        assert!(outer.contains(&Region::new(vec![3, 4, 5], vec![9, 10, 11])));
        assert!(!outer.contains(&Region::new(vec![0, 0, 2], vec![9, 10, 11])));
        assert!(!outer.contains(&Region::new(vec![0, 1, 2], vec![10, 10, 11])));
        assert!(!outer.contains(&Region::new(vec![4, 4, 4], vec![3, 4, 4])));
        assert!(!outer.contains(&Region::new(vec![0, 1], vec![1, 2])));
    }

    #[test]
    fn memory_order_iteration() {
        let r = Region::new(vec![0, 10], vec![1, 12]);
        let indices: Vec<_> = r.index_iter().collect();
        assert_eq!(
            indices,
            vec![
                vec![0, 10],
                vec![1, 10],
                vec![0, 11],
                vec![1, 11],
                vec![0, 12],
                vec![1, 12],
            ]
        );
        let rows: Vec<_> = r.row_iter().collect();
        assert_eq!(rows, vec![vec![0, 10], vec![0, 11], vec![0, 12]]);
        assert_eq!(Region::new(vec![1], vec![0]).index_iter().count(), 0);
    }

    #[test]
    fn offsets() {
        let first = [0, 1, 2];
        let size = [16, 16, 3];
        assert_eq!(linear_offset(&[0, 1, 2], &first, &size), 0);
        assert_eq!(linear_offset(&[1, 1, 2], &first, &size), 1);
        assert_eq!(linear_offset(&[0, 2, 2], &first, &size), 16);
        assert_eq!(linear_offset(&[0, 1, 3], &first, &size), 256);
        assert_eq!(linear_offset(&[15, 16, 4], &first, &size), 16 * 16 * 3 - 1);
    }

    #[test]
    fn display() {
        assert_eq!(Region::new(vec![0, -1], vec![3, 4]).to_string(), "[0..=3, -1..=4]");
    }
}
