//! Streamed access to large MetaImage (`.mhd` + `.raw`) volumes.
//!
//! A volume is a header text file describing an N-dimensional grid of
//! voxels, and a payload file holding the voxels uncompressed, axis 0
//! varying fastest. This crate reads and writes rectangular regions of the
//! payload directly on disk, without ever loading the whole volume, so
//! volumes much larger than memory can be edited piece by piece from
//! several threads.
//!
//! # Example
//!
//! ```no_run
//! use mhd_stream::{
//!     open_for_reading, ReadableVolume, Region, WritableStreamedVolume, WritableVolume,
//! };
//! # use mhd_stream::Result;
//!
//! # fn run() -> Result<()> {
//! let region = Region::new(vec![0, 1, 2], vec![999, 100, 11]);
//! let volume = WritableStreamedVolume::<u8>::create("labels.mhd", &region, &[1.1, 2.2, 3.3])?;
//! volume.write_value(&[10, 10, 10], &[7])?;
//!
//! let reader = open_for_reading::<u8, _>("labels.mhd")?;
//! let voxel = reader.read_region(&Region::voxel(&[10, 10, 10]))?;
//! assert_eq!(voxel.data(), &[7]);
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;

pub mod error;
pub mod header;
pub mod typedef;
pub mod util;
pub mod volume;

pub use byteordered::Endianness;
pub use crate::error::{MhdError, Result};
pub use crate::header::{rewrite_field, Field, MhdHeader};
pub use crate::typedef::ElementType;
pub use crate::util::remove_volume_files;
pub use crate::volume::{
    open_for_reading, open_or_create_for_writing, BinaryMask, Bounds, DataElement, InMemVolume,
    LockRegistry, ReadableVolume, Region, StreamedVolume, VolumeBounds, VolumeOptions,
    WritableStreamedVolume, WritableVolume,
};
#[cfg(feature = "ndarray_volumes")]
pub use crate::volume::ndarray::IntoNdArray;
