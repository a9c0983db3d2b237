//! Interfaces and implementations specific to integration with `ndarray`.
//!
//! This module introduces the trait [`IntoNdArray`], which maps an
//! in-memory sub-volume into an [`Array`] with a dynamic number of
//! dimensions.
//!
//! #### Note on memory order
//!
//! Payloads are stored with axis 0 varying fastest and the components of a
//! voxel adjacent to each other. The resulting array has the shape
//! `[vector_length, size_0, ..., size_N-1]` in column major (Fortran)
//! order, so that no data is moved in the conversion. Scalar volumes keep
//! the leading axis of length 1; use `index_axis_move(Axis(0), 0)` to drop
//! it.
//!
//! [`IntoNdArray`]: ./trait.IntoNdArray.html
//! [`Array`]: ../../../ndarray/type.Array.html
use super::element::DataElement;
use super::inmem::InMemVolume;
use crate::error::{MhdError, Result};
use ::ndarray::{Array, IxDyn, ShapeBuilder};

/// Trait for volumes which can be converted to an ndarray.
///
/// Please see the [module-level documentation](index.html) for more details.
pub trait IntoNdArray {
    /// The element type of the resulting array.
    type Elem;

    /// Consume the volume into an ndarray.
    fn into_ndarray(self) -> Result<Array<Self::Elem, IxDyn>>;
}

impl<T> IntoNdArray for InMemVolume<T>
where
    T: DataElement,
{
    type Elem = T;

    fn into_ndarray(self) -> Result<Array<T, IxDyn>> {
        let mut shape = Vec::with_capacity(self.region().ndims() + 1);
        shape.push(self.vector_length());
        shape.extend(self.region().size().iter().map(|s| *s as usize));
        let expected: usize = shape.iter().product();
        let data = self.into_raw_data();
        let got = data.len();
        Array::from_shape_vec(IxDyn(&shape).f(), data)
            .map_err(|_| MhdError::IncompatibleLength(expected, got))
    }
}
