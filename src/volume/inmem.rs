//! Module holding the in-memory sub-volume type, which is what every
//! region read produces and what every region write consumes.

use super::element::DataElement;
use super::region::{linear_offset, Region};
use crate::error::{MhdError, Result};

/// A fully materialized block of voxels covering a region.
///
/// Voxels are stored in memory order (axis 0 fastest), each voxel being
/// `vector_length` consecutive components.
#[derive(Debug, PartialEq, Clone)]
pub struct InMemVolume<T> {
    region: Region,
    origin: Vec<f64>,
    spacing: Vec<f64>,
    vector_length: usize,
    data: Vec<T>,
}

impl<T> InMemVolume<T>
where
    T: DataElement,
{
    /// Create a zero-filled volume over the given region.
    pub fn new(region: Region, vector_length: usize) -> Self {
        let len = region.num_voxels() as usize * vector_length;
        Self::from_parts(region, vector_length, vec![T::zero(); len])
    }

    /// Create a volume over the given region in which every voxel holds
    /// `value`. The vector length is the length of `value`.
    pub fn filled(region: Region, value: &[T]) -> Self {
        let n = region.num_voxels() as usize;
        let mut data = Vec::with_capacity(n * value.len());
        for _ in 0..n {
            data.extend_from_slice(value);
        }
        Self::from_parts(region, value.len(), data)
    }

    /// Create a volume from raw component data in memory order.
    ///
    /// # Errors
    ///
    /// - `MhdError::IncompatibleLength` if `data` does not hold exactly
    /// `vector_length` components for every voxel of the region.
    pub fn from_data(region: Region, vector_length: usize, data: Vec<T>) -> Result<Self> {
        let expected = region.num_voxels() as usize * vector_length;
        if data.len() != expected {
            return Err(MhdError::IncompatibleLength(expected, data.len()));
        }
        Ok(Self::from_parts(region, vector_length, data))
    }

    fn from_parts(region: Region, vector_length: usize, data: Vec<T>) -> Self {
        let n = region.ndims();
        InMemVolume {
            region,
            origin: vec![0.; n],
            spacing: vec![1.; n],
            vector_length,
            data,
        }
    }

    /// The region covered by this volume.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The reported world origin.
    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    /// The reported voxel spacing.
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// Number of components per voxel.
    pub fn vector_length(&self) -> usize {
        self.vector_length
    }

    /// Set the reported world origin.
    pub fn set_origin(&mut self, origin: Vec<f64>) {
        self.origin = origin;
    }

    /// Set the reported voxel spacing.
    pub fn set_spacing(&mut self, spacing: Vec<f64>) {
        self.spacing = spacing;
    }

    /// Retrieve a reference to the component data.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Retrieve a mutable reference to the component data.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Retrieve the component data, consuming the volume.
    pub fn into_raw_data(self) -> Vec<T> {
        self.data
    }

    fn voxel_start(&self, index: &[i64]) -> Option<usize> {
        if !self.region.contains_index(index) {
            return None;
        }
        let offset = linear_offset(index, self.region.min(), &self.region.size());
        Some(offset as usize * self.vector_length)
    }

    /// The components of the voxel at `index`, or `None` if it lies outside
    /// the region.
    pub fn get(&self, index: &[i64]) -> Option<&[T]> {
        let start = self.voxel_start(index)?;
        Some(&self.data[start..start + self.vector_length])
    }

    /// Overwrite the voxel at `index`.
    ///
    /// # Errors
    ///
    /// - `MhdError::OutOfBounds` if `index` lies outside the region.
    /// - `MhdError::VectorLengthMismatch` if `value` is not a whole voxel.
    pub fn set(&mut self, index: &[i64], value: &[T]) -> Result<()> {
        if value.len() != self.vector_length {
            return Err(MhdError::VectorLengthMismatch(self.vector_length, value.len()));
        }
        let start = self
            .voxel_start(index)
            .ok_or_else(|| MhdError::OutOfBounds(Region::voxel(index), self.region.clone()))?;
        self.data[start..start + self.vector_length].copy_from_slice(value);
        Ok(())
    }

    /// Iterate over the voxels in memory order.
    pub fn voxels(&self) -> std::slice::Chunks<T> {
        self.data.chunks(self.vector_length.max(1))
    }

    /// Iterate mutably over the voxels in memory order.
    pub fn voxels_mut(&mut self) -> std::slice::ChunksMut<T> {
        self.data.chunks_mut(self.vector_length.max(1))
    }

    /// Copy the voxels of a sub-region into a new volume.
    ///
    /// # Errors
    ///
    /// - `MhdError::OutOfBounds` if `region` is not inside this volume.
    pub fn extract(&self, region: &Region) -> Result<InMemVolume<T>> {
        if !self.region.contains(region) {
            return Err(MhdError::OutOfBounds(region.clone(), self.region.clone()));
        }
        let row = region.size()[0] as usize * self.vector_length;
        let mut data = Vec::with_capacity(region.num_voxels() as usize * self.vector_length);
        for first in region.row_iter() {
            // containment was checked above
            if let Some(start) = self.voxel_start(&first) {
                data.extend_from_slice(&self.data[start..start + row]);
            }
        }
        Ok(InMemVolume {
            region: region.clone(),
            origin: self.origin.clone(),
            spacing: self.spacing.clone(),
            vector_length: self.vector_length,
            data,
        })
    }
}
