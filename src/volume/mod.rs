//! This module defines the streamed volume API: read-only and writable
//! handles over a MetaImage header/payload pair, the in-memory blocks they
//! exchange, and the region arithmetic which relates voxel indices to
//! world coordinates.
//!
//! An integration with `ndarray` allows for more elegant and
//! efficient approaches, and should be preferred when possible.
//! In order to do so, you must add the `ndarray_volumes` feature
//! to this crate.

pub mod element;
pub mod guard;
pub mod inmem;
pub mod mask;
#[cfg(feature = "ndarray_volumes")]
pub mod ndarray;
pub mod options;
pub mod region;
pub mod streamed;
pub mod writable;

pub use self::element::DataElement;
pub use self::guard::{ConcurrencyGuard, LockRegistry};
pub use self::inmem::InMemVolume;
pub use self::mask::BinaryMask;
pub use self::options::{open_for_reading, open_or_create_for_writing, VolumeOptions};
pub use self::region::{bounds_from_region, region_from_bounds, Bounds, Region, Vector3, VolumeBounds};
pub use self::streamed::{ReadableVolume, StreamedVolume};
pub use self::writable::{WritableStreamedVolume, WritableVolume};
