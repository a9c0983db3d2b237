//! Binary masks for masked writes.

use super::region::Region;
use super::region::linear_offset;

/// A set of voxels within a region, stored as one flag per voxel in memory
/// order (axis 0 fastest).
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    region: Region,
    flags: Vec<bool>,
}

impl BinaryMask {
    /// Create a mask over `region` with no voxel set.
    pub fn new(region: Region) -> Self {
        let n = region.num_voxels() as usize;
        BinaryMask {
            region,
            flags: vec![false; n],
        }
    }

    /// Create a mask over `region` in which a voxel is set when `f`
    /// returns true for its index.
    pub fn from_fn<F>(region: Region, mut f: F) -> Self
    where
        F: FnMut(&[i64]) -> bool,
    {
        let flags = region.index_iter().map(|idx| f(&idx[..])).collect();
        BinaryMask { region, flags }
    }

    /// The region covered by this mask.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Set or clear a voxel. Indices outside the mask's region are ignored.
    pub fn set(&mut self, index: &[i64], value: bool) {
        if let Some(i) = self.position(index) {
            self.flags[i] = value;
        }
    }

    /// Whether the voxel at `index` is set. Indices outside the region are
    /// never set.
    pub fn is_set(&self, index: &[i64]) -> bool {
        self.position(index).map_or(false, |i| self.flags[i])
    }

    /// Number of set voxels.
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    fn position(&self, index: &[i64]) -> Option<usize> {
        if !self.region.contains_index(index) {
            return None;
        }
        Some(linear_offset(index, self.region.min(), &self.region.size()) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryMask;
    use crate::volume::region::Region;

    #[test]
    fn set_and_query() {
        let mut mask = BinaryMask::new(Region::new(vec![2, 2, 2], vec![4, 4, 4]));
        assert_eq!(mask.count(), 0);
        mask.set(&[3, 3, 3], true);
        mask.set(&[9, 9, 9], true);
        assert!(mask.is_set(&[3, 3, 3]));
        assert!(!mask.is_set(&[2, 3, 3]));
        assert!(!mask.is_set(&[9, 9, 9]));
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn from_predicate() {
        let mask = BinaryMask::from_fn(Region::new(vec![0, 0], vec![3, 3]), |idx| idx[0] == idx[1]);
        assert_eq!(mask.count(), 4);
        assert!(mask.is_set(&[2, 2]));
        assert!(!mask.is_set(&[2, 1]));
    }
}
