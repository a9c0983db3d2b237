//! Streamed, writable access to a MetaImage volume on disk.
//!
//! A [`WritableStreamedVolume`] either adopts an existing header/payload
//! pair or creates a new one, pre-allocating the whole payload. Writes
//! take the handle's lock in exclusive mode and go straight to the
//! payload file, one row along axis 0 at a time.
//!
//! Writes come in two flavours. Exact writes ([`write_region`],
//! [`write_value`]) fail when any part of their target lies outside the
//! volume. Clipped writes (all the others) write the part which lies
//! inside, log a warning when something was cut, and fail only when
//! nothing is left.
//!
//! # Examples
//!
//! ```no_run
//! use mhd_stream::{WritableStreamedVolume, WritableVolume, ReadableVolume, Region};
//! # use mhd_stream::Result;
//!
//! # fn run() -> Result<()> {
//! let region = Region::new(vec![0, 0, 0], vec![99, 99, 99]);
//! let volume = WritableStreamedVolume::<f32>::create_vector(
//!     "field.mhd",
//!     &region,
//!     &[1., 1., 1.],
//!     3,
//! )?;
//! volume.write_constant(&Region::new(vec![0, 0, 5], vec![99, 99, 5]), &[5., 6., 7.])?;
//! # Ok(())
//! # }
//! ```
//!
//! [`WritableStreamedVolume`]: ./struct.WritableStreamedVolume.html
//! [`write_region`]: ./trait.WritableVolume.html#tymethod.write_region
//! [`write_value`]: ./trait.WritableVolume.html#tymethod.write_value

use super::element::DataElement;
use super::inmem::InMemVolume;
use super::mask::BinaryMask;
use super::options::VolumeOptions;
use super::region::{region_at_origin, volume_region_from_bounds, Bounds, Region, Vector3};
use super::streamed::{as_vector3, ReadableVolume, StreamedVolume, VolumeInfo};
use crate::error::{MhdError, Result};
use crate::header::{rewrite_field, Field, MhdHeader};
use crate::util::{remove_file_or_warn, remove_volume_files, to_raw_file};
use log::{debug, warn};
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Write access to a streamed volume.
pub trait WritableVolume<T: DataElement>: ReadableVolume<T> {
    /// Write a block exactly where its region says.
    ///
    /// # Errors
    ///
    /// - `MhdError::OutOfBounds` if the block's region is not fully inside
    /// the volume.
    /// - `MhdError::VectorLengthMismatch` if the block's vector length
    /// differs from the volume's.
    fn write_region(&self, block: &InMemVolume<T>) -> Result<()>;

    /// Write the part of a block which lies inside the volume.
    fn write_region_clipped(&self, block: &InMemVolume<T>) -> Result<()>;

    /// Write the part of a block which lies inside both the given world
    /// bounds and the volume.
    fn write_region_bounds(&self, block: &InMemVolume<T>, bounds: &Bounds) -> Result<()>;

    /// Write a single voxel.
    ///
    /// # Errors
    ///
    /// - `MhdError::OutOfBounds` if `index` lies outside the volume.
    fn write_value(&self, index: &[i64], value: &[T]) -> Result<()>;

    /// Write `value` into every voxel of a region, clipped to the volume.
    fn write_constant(&self, region: &Region, value: &[T]) -> Result<()>;

    /// Write `value` into every voxel within world bounds, clipped to the
    /// volume.
    ///
    /// # Errors
    ///
    /// - `MhdError::DimensionMismatch` if `bounds` has another number of
    /// axes than the volume.
    fn write_constant_bounds(&self, bounds: &Bounds, value: &[T]) -> Result<()>;

    /// Write `value` into every voxel set in the mask, clipped to the
    /// volume. Other voxels keep their content.
    fn write_masked(&self, mask: &BinaryMask, value: &[T]) -> Result<()>;

    /// Write `value` into every voxel within world bounds at whose world
    /// position `brush` is not positive. Requires a 3D volume.
    fn write_brush(&self, brush: &dyn Fn(Vector3) -> f64, bounds: &Bounds, value: &[T]) -> Result<()>;

    /// Write `value` into every voxel of the volume.
    fn fill(&self, value: &[T]) -> Result<()>;

    /// Move the volume's origin. The region's starting index follows, and
    /// the header is rewritten. Requires a 3D volume.
    fn set_origin(&self, origin: Vector3) -> Result<()>;

    /// Change the volume's spacing and rewrite the header. Requires a 3D
    /// volume.
    fn set_spacing(&self, spacing: Vector3) -> Result<()>;

    /// Change the volume's region. Always fails: the payload cannot be
    /// resized in place.
    fn resize(&self, region: &Region) -> Result<()>;
}

/// A writable handle to a MetaImage volume.
///
/// Scalar and vector volumes share this type; they only differ in their
/// vector length.
#[derive(Debug)]
pub struct WritableStreamedVolume<T> {
    volume: StreamedVolume<T>,
}

impl<T> WritableStreamedVolume<T>
where
    T: DataElement,
{
    /// Create a scalar volume, or adopt it if the file already exists.
    ///
    /// See [`create_vector`](#method.create_vector).
    pub fn create<P: AsRef<Path>>(path: P, region: &Region, spacing: &[f64]) -> Result<Self> {
        Self::create_vector(path, region, spacing, 1)
    }

    /// Create a volume with `vector_length` components per voxel, or adopt
    /// it if the file already exists.
    ///
    /// A new volume gets its header origin at `region.min * spacing` and a
    /// zero-filled payload. An adopted volume keeps its own region and
    /// spacing; `region` and `spacing` are then ignored.
    ///
    /// # Errors
    ///
    /// Checked in this order, before any file is touched:
    ///
    /// - `MhdError::EmptySpacing` if `spacing` is empty or has a zero entry.
    /// - `MhdError::EmptyRegion` if `region` is empty.
    /// - `MhdError::InvalidVectorLength` if `vector_length` is 0.
    /// - `MhdError::InvalidVolume` if `spacing` and `region` differ in
    /// rank, or if the region's extent or payload size does not fit in
    /// 64 bits.
    ///
    /// When adopting, `MhdError::InvalidVolume` if the file's vector length
    /// is not `vector_length`.
    pub fn create_vector<P: AsRef<Path>>(
        path: P,
        region: &Region,
        spacing: &[f64],
        vector_length: usize,
    ) -> Result<Self> {
        Self::open_or_create_with(
            path,
            Some(region),
            Some(spacing),
            Some(vector_length),
            &VolumeOptions::default(),
        )
    }

    /// Adopt an existing volume with the default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &VolumeOptions::default())
    }

    pub(crate) fn open_with<P: AsRef<Path>>(path: P, options: &VolumeOptions) -> Result<Self> {
        let volume = StreamedVolume::open_with(path, options)?;
        debug!("Adopted {} for writing", volume.file_name().display());
        Ok(WritableStreamedVolume { volume })
    }

    pub(crate) fn open_or_create_with<P: AsRef<Path>>(
        path: P,
        region: Option<&Region>,
        spacing: Option<&[f64]>,
        vector_length: Option<usize>,
        options: &VolumeOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let adopted = Self::open_with(path, options)?;
            if let Some(vl) = vector_length {
                if vl != adopted.vector_length() {
                    return Err(MhdError::InvalidVolume(
                        path.to_path_buf(),
                        format!(
                            "vector length {} requested, file has {}",
                            vl,
                            adopted.vector_length()
                        ),
                    ));
                }
            }
            return Ok(adopted);
        }
        let empty = Region::new(vec![], vec![]);
        Self::create_with(
            path,
            region.unwrap_or(&empty),
            spacing.unwrap_or(&[]),
            vector_length.unwrap_or(1),
            options,
        )
    }

    fn create_with(
        path: &Path,
        region: &Region,
        spacing: &[f64],
        vector_length: usize,
        options: &VolumeOptions,
    ) -> Result<Self> {
        if spacing.is_empty() || spacing.iter().any(|s| *s == 0. || !s.is_finite()) {
            return Err(MhdError::EmptySpacing(path.to_path_buf()));
        }
        if region.ndims() == 0 || region.is_empty() {
            return Err(MhdError::EmptyRegion(path.to_path_buf()));
        }
        if vector_length == 0 {
            return Err(MhdError::InvalidVectorLength(path.to_path_buf()));
        }
        if spacing.len() != region.ndims() {
            return Err(MhdError::InvalidVolume(
                path.to_path_buf(),
                format!(
                    "{} spacing values for a {}-dimensional region",
                    spacing.len(),
                    region.ndims()
                ),
            ));
        }
        let size = region.checked_size().ok_or_else(|| {
            MhdError::InvalidVolume(path.to_path_buf(), format!("region {} is too large", region))
        })?;
        let data_file_name = to_raw_file(path)?;
        let data_file = data_file_name
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let disk_origin: Vec<f64> = region
            .min()
            .iter()
            .zip(spacing)
            .map(|(i, s)| *i as f64 * s)
            .collect();
        if region_at_origin(&disk_origin, spacing, &size).as_ref() != Some(region) {
            return Err(MhdError::InvalidVolume(
                path.to_path_buf(),
                format!("region {} cannot be placed by a world origin", region),
            ));
        }
        let header = MhdHeader::new(
            size,
            disk_origin.clone(),
            spacing.to_vec(),
            vector_length,
            T::ELEMENT_TYPE,
            data_file,
        );

        let payload_len = header.checked_payload_len().ok_or_else(|| {
            MhdError::InvalidVolume(path.to_path_buf(), "payload size overflows".to_string())
        })?;

        // The header declares an empty region, which no open accepts, until
        // the payload is allocated.
        let mut provisional = header.clone();
        provisional.dim_size = vec![0; region.ndims()];
        fs::write(path, provisional.to_bytes()).map_err(|err| MhdError::FileIo {
            path: path.to_path_buf(),
            operation: "write header",
            err,
        })?;
        if let Err(e) = allocate_payload(&data_file_name, payload_len) {
            remove_file_or_warn(path);
            return Err(e);
        }
        if let Err(e) = rewrite_header_field(path, Field::DimSize, &header.dim_size[..]) {
            remove_volume_files(path);
            return Err(e);
        }
        debug!(
            "Created {}: {} x{} over {}, {} payload bytes",
            path.display(),
            T::ELEMENT_TYPE,
            vector_length,
            region,
            payload_len
        );

        let info = VolumeInfo {
            region: region.clone(),
            disk_origin,
            spacing: spacing.to_vec(),
            vector_length,
            endianness: header.endianness,
        };
        Ok(WritableStreamedVolume {
            volume: StreamedVolume::from_parts(path.to_path_buf(), data_file_name, info, options),
        })
    }

    /// The read-only view of this volume.
    pub fn as_readable(&self) -> &StreamedVolume<T> {
        &self.volume
    }

    /// Close the volume and delete its header and payload files. Failures
    /// are logged and otherwise ignored.
    pub fn remove_files(self) {
        let path = self.volume.file_name().to_path_buf();
        drop(self);
        remove_volume_files(path);
    }

    /// Restrict `requested` to the volume, warning when it had to be cut.
    fn clip(&self, info: &VolumeInfo, requested: &Region) -> Result<Region> {
        if info.region.contains(requested) {
            return Ok(requested.clone());
        }
        match info.region.intersect(requested) {
            Some(clipped) => {
                warn!(
                    "Region {} partially outside of {} in {}, writing {} only",
                    requested,
                    info.region,
                    self.file_name().display(),
                    clipped
                );
                Ok(clipped)
            }
            None => Err(MhdError::OutOfBounds(requested.clone(), info.region.clone())),
        }
    }

    fn check_value(info: &VolumeInfo, value: &[T]) -> Result<()> {
        if value.len() != info.vector_length {
            return Err(MhdError::VectorLengthMismatch(
                info.vector_length,
                value.len(),
            ));
        }
        Ok(())
    }

    /// Read a block, let `select` decide which voxels take `value`, and
    /// write it back, all under one exclusive lock.
    fn paint<F>(&self, region: &Region, value: &[T], mut select: F) -> Result<()>
    where
        F: FnMut(&[i64]) -> bool,
    {
        let _lock = self.volume.guard().write();
        let info = self.volume.info();
        Self::check_value(&info, value)?;
        let region = self.clip(&info, region)?;
        let mut block = self.volume.read_block_unlocked(&info, &region)?;
        for (index, voxel) in region.index_iter().zip(block.voxels_mut()) {
            if select(&index[..]) {
                voxel.copy_from_slice(value);
            }
        }
        self.volume.write_block_unlocked(&info, &block)
    }
}

/// Create the payload file with `len` zero bytes.
fn allocate_payload(path: &Path, len: u64) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|err| MhdError::FileIo {
            path: path.to_path_buf(),
            operation: "create payload",
            err,
        })?;
    file.set_len(len).map_err(|err| MhdError::FileIo {
        path: path.to_path_buf(),
        operation: "allocate payload",
        err,
    })?;
    file.flush().map_err(|err| MhdError::FileIo {
        path: path.to_path_buf(),
        operation: "flush payload",
        err,
    })
}

/// Replace one field line of the header file in place.
fn rewrite_header_field<V: Display>(path: &Path, field: Field, values: &[V]) -> Result<()> {
    let bytes = fs::read(path).map_err(|err| MhdError::FileIo {
        path: path.to_path_buf(),
        operation: "read header",
        err,
    })?;
    let bytes = rewrite_field(&bytes, field, values)?;
    fs::write(path, bytes).map_err(|err| MhdError::FileIo {
        path: path.to_path_buf(),
        operation: "write header",
        err,
    })
}

impl<T> ReadableVolume<T> for WritableStreamedVolume<T>
where
    T: DataElement,
{
    fn file_name(&self) -> &Path {
        self.volume.file_name()
    }

    fn data_file_name(&self) -> &Path {
        self.volume.data_file_name()
    }

    fn vector_length(&self) -> usize {
        self.volume.vector_length()
    }

    fn region(&self) -> Region {
        self.volume.region()
    }

    fn spacing(&self) -> Vec<f64> {
        self.volume.spacing()
    }

    fn disk_origin(&self) -> Vec<f64> {
        self.volume.disk_origin()
    }

    fn read_region(&self, region: &Region) -> Result<InMemVolume<T>> {
        self.volume.read_region(region)
    }

    fn read_whole_volume(&self) -> Result<InMemVolume<T>> {
        self.volume.read_whole_volume()
    }

    fn is_valid(&self) -> bool {
        self.volume.is_valid()
    }

    fn can_write(&self) -> bool {
        true
    }
}

impl<T> WritableVolume<T> for WritableStreamedVolume<T>
where
    T: DataElement,
{
    fn write_region(&self, block: &InMemVolume<T>) -> Result<()> {
        let _lock = self.volume.guard().write();
        let info = self.volume.info();
        self.volume.write_block_unlocked(&info, block)
    }

    fn write_region_clipped(&self, block: &InMemVolume<T>) -> Result<()> {
        let _lock = self.volume.guard().write();
        let info = self.volume.info();
        if block.vector_length() != info.vector_length {
            return Err(MhdError::VectorLengthMismatch(
                info.vector_length,
                block.vector_length(),
            ));
        }
        let region = self.clip(&info, block.region())?;
        if &region == block.region() {
            return self.volume.write_block_unlocked(&info, block);
        }
        let clipped = block.extract(&region)?;
        self.volume.write_block_unlocked(&info, &clipped)
    }

    fn write_region_bounds(&self, block: &InMemVolume<T>, bounds: &Bounds) -> Result<()> {
        let _lock = self.volume.guard().write();
        let info = self.volume.info();
        if block.vector_length() != info.vector_length {
            return Err(MhdError::VectorLengthMismatch(
                info.vector_length,
                block.vector_length(),
            ));
        }
        let requested = volume_region_from_bounds(bounds, &info.spacing)?;
        let requested = requested
            .intersect(block.region())
            .ok_or_else(|| MhdError::OutOfBounds(requested.clone(), block.region().clone()))?;
        let region = self.clip(&info, &requested)?;
        let clipped = block.extract(&region)?;
        self.volume.write_block_unlocked(&info, &clipped)
    }

    fn write_value(&self, index: &[i64], value: &[T]) -> Result<()> {
        let block = InMemVolume::filled(Region::voxel(index), value);
        self.write_region(&block)
    }

    fn write_constant(&self, region: &Region, value: &[T]) -> Result<()> {
        let _lock = self.volume.guard().write();
        let info = self.volume.info();
        Self::check_value(&info, value)?;
        let region = self.clip(&info, region)?;
        let block = InMemVolume::filled(region, value);
        self.volume.write_block_unlocked(&info, &block)
    }

    fn write_constant_bounds(&self, bounds: &Bounds, value: &[T]) -> Result<()> {
        let region = volume_region_from_bounds(bounds, &self.spacing())?;
        self.write_constant(&region, value)
    }

    fn write_masked(&self, mask: &BinaryMask, value: &[T]) -> Result<()> {
        self.paint(mask.region(), value, |index| mask.is_set(index))
    }

    fn write_brush(&self, brush: &dyn Fn(Vector3) -> f64, bounds: &Bounds, value: &[T]) -> Result<()> {
        let spacing = as_vector3("write_brush", &self.spacing())?;
        let region = volume_region_from_bounds(bounds, &spacing)?;
        self.paint(&region, value, |index| {
            let position = [
                index[0] as f64 * spacing[0],
                index[1] as f64 * spacing[1],
                index[2] as f64 * spacing[2],
            ];
            brush(position) <= 0.
        })
    }

    fn fill(&self, value: &[T]) -> Result<()> {
        let _lock = self.volume.guard().write();
        let info = self.volume.info();
        self.volume.fill_unlocked(&info, value)
    }

    fn set_origin(&self, origin: Vector3) -> Result<()> {
        let _lock = self.volume.guard().write();
        let mut info = self.volume.info();
        let _ = as_vector3("set_origin", &info.spacing)?;
        if origin.iter().any(|o| !o.is_finite()) {
            return Err(MhdError::InvalidVolume(
                self.file_name().to_path_buf(),
                "non-finite origin".to_string(),
            ));
        }
        let region = region_at_origin(&origin, &info.spacing, &info.region.size())
            .ok_or_else(|| {
                MhdError::InvalidVolume(
                    self.file_name().to_path_buf(),
                    format!("origin {:?} puts region indices out of range", origin),
                )
            })?;
        rewrite_header_field(self.file_name(), Field::Offset, &origin[..])?;
        info.region = region;
        info.disk_origin = origin.to_vec();
        debug!("Moved {} to {}", self.file_name().display(), info.region);
        self.volume.set_info(info);
        Ok(())
    }

    fn set_spacing(&self, spacing: Vector3) -> Result<()> {
        let _lock = self.volume.guard().write();
        let mut info = self.volume.info();
        let _ = as_vector3("set_spacing", &info.spacing)?;
        if spacing.iter().any(|s| *s == 0. || !s.is_finite()) {
            return Err(MhdError::EmptySpacing(self.file_name().to_path_buf()));
        }
        // the file must still open with the stored origin
        if region_at_origin(&info.disk_origin, &spacing, &info.region.size()).is_none() {
            return Err(MhdError::InvalidVolume(
                self.file_name().to_path_buf(),
                format!("spacing {:?} puts region indices out of range", spacing),
            ));
        }
        rewrite_header_field(self.file_name(), Field::ElementSpacing, &spacing[..])?;
        info.spacing = spacing.to_vec();
        self.volume.set_info(info);
        Ok(())
    }

    fn resize(&self, _region: &Region) -> Result<()> {
        Err(MhdError::UnsupportedOperation("resize a streamed volume"))
    }
}

/// Read-only handles reject every mutation.
impl<T> WritableVolume<T> for StreamedVolume<T>
where
    T: DataElement,
{
    fn write_region(&self, _block: &InMemVolume<T>) -> Result<()> {
        Err(MhdError::ReadOnly("write a region"))
    }

    fn write_region_clipped(&self, _block: &InMemVolume<T>) -> Result<()> {
        Err(MhdError::ReadOnly("write a region"))
    }

    fn write_region_bounds(&self, _block: &InMemVolume<T>, _bounds: &Bounds) -> Result<()> {
        Err(MhdError::ReadOnly("write a region"))
    }

    fn write_value(&self, _index: &[i64], _value: &[T]) -> Result<()> {
        Err(MhdError::ReadOnly("write a voxel"))
    }

    fn write_constant(&self, _region: &Region, _value: &[T]) -> Result<()> {
        Err(MhdError::ReadOnly("write a constant"))
    }

    fn write_constant_bounds(&self, _bounds: &Bounds, _value: &[T]) -> Result<()> {
        Err(MhdError::ReadOnly("write a constant"))
    }

    fn write_masked(&self, _mask: &BinaryMask, _value: &[T]) -> Result<()> {
        Err(MhdError::ReadOnly("write through a mask"))
    }

    fn write_brush(&self, _brush: &dyn Fn(Vector3) -> f64, _bounds: &Bounds, _value: &[T]) -> Result<()> {
        Err(MhdError::ReadOnly("paint a brush"))
    }

    fn fill(&self, _value: &[T]) -> Result<()> {
        Err(MhdError::ReadOnly("fill"))
    }

    fn set_origin(&self, _origin: Vector3) -> Result<()> {
        Err(MhdError::ReadOnly("set the origin"))
    }

    fn set_spacing(&self, _spacing: Vector3) -> Result<()> {
        Err(MhdError::ReadOnly("set the spacing"))
    }

    fn resize(&self, _region: &Region) -> Result<()> {
        Err(MhdError::ReadOnly("resize"))
    }
}

#[cfg(test)]
mod tests {
    use super::{WritableStreamedVolume, WritableVolume};
    use crate::error::MhdError;
    use crate::volume::region::Region;
    use crate::volume::streamed::ReadableVolume;
    use tempfile::tempdir;

    #[test]
    fn rejects_degenerate_parameters_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.mhd");
        let empty = Region::new(vec![0, 0, 0], vec![-1, 9, 9]);
        let good = Region::new(vec![0, 0, 0], vec![9, 9, 9]);

        let r = WritableStreamedVolume::<u8>::create_vector(&path, &empty, &[0., 0., 0.], 0);
        assert!(matches!(r, Err(MhdError::EmptySpacing(_))));
        let r = WritableStreamedVolume::<u8>::create_vector(&path, &empty, &[1., 1., 1.], 0);
        assert!(matches!(r, Err(MhdError::EmptyRegion(_))));
        let r = WritableStreamedVolume::<u8>::create_vector(&path, &good, &[1., 1., 1.], 0);
        assert!(matches!(r, Err(MhdError::InvalidVectorLength(_))));
        let r = WritableStreamedVolume::<u8>::create(dir.path().join("bad.raw"), &good, &[1., 1., 1.]);
        assert!(matches!(r, Err(MhdError::InvalidVolume(..))));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn clipped_write_outside_fails() {
        let dir = tempdir().unwrap();
        let region = Region::new(vec![0, 0], vec![3, 3]);
        let volume =
            WritableStreamedVolume::<u16>::create(dir.path().join("v.mhd"), &region, &[1., 1.])
                .unwrap();
        let r = volume.write_constant(&Region::new(vec![10, 10], vec![11, 11]), &[1]);
        assert!(matches!(r, Err(MhdError::OutOfBounds(..))));
        assert!(matches!(
            volume.resize(&region),
            Err(MhdError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            volume.set_origin([0., 0., 0.]),
            Err(MhdError::UnsupportedDimension("set_origin", 2))
        ));
        assert!(volume.can_write());
        assert!(!volume.as_readable().can_write());
        assert!(matches!(
            volume.as_readable().write_value(&[0, 0], &[1]),
            Err(MhdError::ReadOnly(_))
        ));

        let data_file = volume.data_file_name().to_path_buf();
        volume.remove_files();
        assert!(!dir.path().join("v.mhd").exists());
        assert!(!data_file.exists());
    }
}
