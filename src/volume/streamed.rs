//! Streamed, read-only access to a MetaImage volume on disk.
//!
//! Only the header is kept in memory. Each read opens the payload file,
//! seeks to every row of the requested region and reads it, so memory use
//! is proportional to the region and not to the volume.
//!
//! On open, the volume is re-indexed: the world origin reported by the
//! handle is always zero, and the header's origin is folded into the
//! starting index of the region, which becomes `round(offset / spacing)`
//! along each axis. Regions passed to reads are expressed in that index
//! frame.
//!
//! # Examples
//!
//! ```no_run
//! use mhd_stream::{open_for_reading, ReadableVolume, Region};
//! # use mhd_stream::Result;
//!
//! # fn run() -> Result<()> {
//! let volume = open_for_reading::<f32, _>("ct.mhd")?;
//! let full = volume.region();
//! let slab = Region::new(
//!     full.min().to_vec(),
//!     vec![full.max()[0], full.max()[1], full.min()[2] + 3],
//! );
//! let block = volume.read_region(&slab)?;
//! assert_eq!(block.region(), &slab);
//! # Ok(())
//! # }
//! ```

use super::element::DataElement;
use super::guard::ConcurrencyGuard;
use super::inmem::InMemVolume;
use super::options::VolumeOptions;
use super::region::{
    linear_offset, region_at_origin, volume_region_from_bounds, Bounds, Region, Vector3,
    VolumeBounds,
};
use crate::error::{MhdError, Result};
use crate::header::MhdHeader;
use crate::typedef::ElementType;
use crate::util::to_raw_file;
use byteordered::Endianness;
use log::debug;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::mem::size_of;
use std::path::{Path, PathBuf};

/// Upper bound on the bytes buffered by a whole-payload fill.
const FILL_CHUNK_BYTES: usize = 1 << 20;

/// Read access to a streamed volume.
///
/// Every read takes the handle's lock in shared mode.
pub trait ReadableVolume<T: DataElement> {
    /// Path of the header file.
    fn file_name(&self) -> &Path;

    /// Path of the payload file.
    fn data_file_name(&self) -> &Path;

    /// Number of components per voxel.
    fn vector_length(&self) -> usize;

    /// The full region of the volume, in the re-indexed frame.
    fn region(&self) -> Region;

    /// Voxel spacing.
    fn spacing(&self) -> Vec<f64>;

    /// World origin as stored in the header.
    fn disk_origin(&self) -> Vec<f64>;

    /// Number of dimensions.
    fn dimension(&self) -> usize {
        self.region().ndims()
    }

    /// Element type of the voxel components.
    fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    /// World origin of the handle, which is always zero.
    fn origin(&self) -> Vec<f64> {
        vec![0.; self.dimension()]
    }

    /// World bounds of a three-dimensional volume.
    ///
    /// # Errors
    ///
    /// - `MhdError::UnsupportedDimension` if the volume is not 3D.
    fn bounds(&self) -> Result<VolumeBounds> {
        let spacing = as_vector3("bounds", &self.spacing())?;
        Ok(VolumeBounds::new(&self.region(), [0.; 3], spacing))
    }

    /// Read the voxels of a region.
    ///
    /// The returned volume covers exactly `region`, reports a zero origin
    /// and the volume's spacing, and has the volume's vector length.
    ///
    /// # Errors
    ///
    /// - `MhdError::OutOfBounds` if `region` is empty or not fully inside
    /// the volume.
    /// - `MhdError::Seek` or `MhdError::Read` if the payload is shorter than
    /// the header declares.
    fn read_region(&self, region: &Region) -> Result<InMemVolume<T>>;

    /// Read the voxels within world bounds, rounding each bound to the
    /// nearest index.
    ///
    /// # Errors
    ///
    /// - `MhdError::DimensionMismatch` if `bounds` has another number of
    /// axes than the volume.
    fn read_bounds(&self, bounds: &Bounds) -> Result<InMemVolume<T>> {
        let region = volume_region_from_bounds(bounds, &self.spacing())?;
        self.read_region(&region)
    }

    /// Read the entire volume in memory.
    ///
    /// # Errors
    ///
    /// - `MhdError::UnsupportedOperation` unless the handle was opened with
    /// full loads allowed.
    fn read_whole_volume(&self) -> Result<InMemVolume<T>>;

    /// Whether the files backing this handle are present and consistent.
    fn is_valid(&self) -> bool;

    /// Whether this handle permits mutation.
    fn can_write(&self) -> bool;

    /// Bytes of voxel data held in memory by the handle.
    fn memory_usage(&self) -> usize {
        0
    }
}

/// Geometry and layout of a volume, as parsed from its header and
/// re-indexed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VolumeInfo {
    pub(crate) region: Region,
    pub(crate) disk_origin: Vec<f64>,
    pub(crate) spacing: Vec<f64>,
    pub(crate) vector_length: usize,
    pub(crate) endianness: Endianness,
}

impl VolumeInfo {
    pub(crate) fn from_header<T: DataElement>(path: &Path, header: &MhdHeader) -> Result<Self> {
        if header.compressed {
            return Err(MhdError::UnsupportedOperation("read a compressed payload"));
        }
        if header.element_type != T::ELEMENT_TYPE {
            return Err(MhdError::ElementTypeMismatch(
                T::ELEMENT_TYPE,
                header.element_type,
            ));
        }
        if header.channels == 0 {
            return Err(invalid(path, "vector length is 0"));
        }
        if header.dim_size.iter().any(|s| *s == 0) {
            return Err(invalid(path, "empty region"));
        }
        if header.dim_size.iter().any(|s| *s > i64::MAX as u64)
            || header.checked_payload_len().is_none()
        {
            return Err(invalid(path, "payload size overflows"));
        }
        if header
            .element_spacing
            .iter()
            .any(|s| *s == 0. || !s.is_finite())
        {
            return Err(invalid(path, "zero or non-finite spacing"));
        }
        if header.offset.iter().any(|o| !o.is_finite()) {
            return Err(invalid(path, "non-finite offset"));
        }
        let region = region_at_origin(&header.offset, &header.element_spacing, &header.dim_size)
            .ok_or_else(|| invalid(path, "region indices overflow"))?;
        Ok(VolumeInfo {
            region,
            disk_origin: header.offset.clone(),
            spacing: header.element_spacing.clone(),
            vector_length: header.channels,
            endianness: header.endianness,
        })
    }
}

fn invalid(path: &Path, reason: &str) -> MhdError {
    MhdError::InvalidVolume(path.to_path_buf(), reason.to_string())
}

pub(crate) fn as_vector3(operation: &'static str, values: &[f64]) -> Result<Vector3> {
    match *values {
        [x, y, z] => Ok([x, y, z]),
        _ => Err(MhdError::UnsupportedDimension(operation, values.len())),
    }
}

/// A read-only handle to a MetaImage volume.
///
/// See the [module-level documentation] for more details.
///
/// [module-level documentation]: ./index.html
#[derive(Debug)]
pub struct StreamedVolume<T> {
    file_name: PathBuf,
    data_file_name: PathBuf,
    info: RwLock<VolumeInfo>,
    guard: ConcurrencyGuard,
    options: VolumeOptions,
    phantom: PhantomData<T>,
}

impl<T> StreamedVolume<T>
where
    T: DataElement,
{
    /// Open an existing volume with the default options.
    ///
    /// # Errors
    ///
    /// - `MhdError::FileNotFound` if the header file does not exist.
    /// - `MhdError::MalformedHeader` if the header cannot be parsed.
    /// - `MhdError::ElementTypeMismatch` if the header declares an element
    /// type other than `T`'s.
    /// - `MhdError::InvalidVolume` if the header describes an empty region,
    /// a zero spacing or zero components per voxel.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &VolumeOptions::default())
    }

    pub(crate) fn open_with<P: AsRef<Path>>(path: P, options: &VolumeOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MhdError::FileNotFound(path.to_path_buf()));
        }
        let data_file_name = to_raw_file(path)?;
        let header = MhdHeader::from_file(path)?;
        let info = VolumeInfo::from_header::<T>(path, &header)?;
        debug!(
            "Opened {}: {} x{} over {}",
            path.display(),
            T::ELEMENT_TYPE,
            info.vector_length,
            info.region
        );
        Ok(Self::from_parts(
            path.to_path_buf(),
            data_file_name,
            info,
            options,
        ))
    }

    pub(crate) fn from_parts(
        file_name: PathBuf,
        data_file_name: PathBuf,
        info: VolumeInfo,
        options: &VolumeOptions,
    ) -> Self {
        let guard = options.guard_for(&file_name);
        StreamedVolume {
            file_name,
            data_file_name,
            info: RwLock::new(info),
            guard,
            options: options.clone(),
            phantom: PhantomData,
        }
    }

    pub(crate) fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    pub(crate) fn info(&self) -> VolumeInfo {
        self.info.read().clone()
    }

    pub(crate) fn set_info(&self, info: VolumeInfo) {
        *self.info.write() = info;
    }

    /// Re-read the header, if so configured. Must be called with the guard
    /// held.
    fn refresh(&self) -> Result<()> {
        if !self.options.rereads_header() {
            return Ok(());
        }
        if !self.file_name.is_file() {
            return Err(MhdError::FileNotFound(self.file_name.clone()));
        }
        let header = MhdHeader::from_file(&self.file_name)?;
        let info = VolumeInfo::from_header::<T>(&self.file_name, &header)?;
        self.set_info(info);
        Ok(())
    }

    fn open_payload(&self, write: bool) -> Result<(File, u64)> {
        let path = &self.data_file_name;
        let file = OpenOptions::new()
            .read(true)
            .write(write)
            .open(path)
            .map_err(|err| MhdError::FileIo {
                path: path.clone(),
                operation: "open payload",
                err,
            })?;
        let size = file
            .metadata()
            .map_err(|err| MhdError::FileIo {
                path: path.clone(),
                operation: "stat payload",
                err,
            })?
            .len();
        Ok((file, size))
    }

    /// Read a region, one row along axis 0 at a time. Must be called with
    /// the guard held.
    pub(crate) fn read_block_unlocked(
        &self,
        info: &VolumeInfo,
        region: &Region,
    ) -> Result<InMemVolume<T>> {
        if !info.region.contains(region) {
            return Err(MhdError::OutOfBounds(region.clone(), info.region.clone()));
        }
        let (mut file, file_size) = self.open_payload(false)?;
        let voxel_bytes = size_of::<T>() * info.vector_length;
        let full_size = info.region.size();
        let mut raw = vec![0u8; region.size()[0] as usize * voxel_bytes];
        let mut data = Vec::with_capacity(region.num_voxels() as usize * info.vector_length);
        for first in region.row_iter() {
            let offset = linear_offset(&first, info.region.min(), &full_size) * voxel_bytes as u64;
            let _ = file
                .seek(SeekFrom::Start(offset))
                .map_err(|err| self.seek_error(offset, file_size, err))?;
            file.read_exact(&mut raw).map_err(|err| MhdError::Read {
                path: self.data_file_name.clone(),
                offset,
                file_size,
                err,
            })?;
            data.extend(T::from_raw_slice(&raw, info.endianness)?);
        }
        let mut block = InMemVolume::from_data(region.clone(), info.vector_length, data)?;
        block.set_spacing(info.spacing.clone());
        Ok(block)
    }

    /// Write a block whose region lies inside the volume, one row along
    /// axis 0 at a time. Must be called with the guard held exclusively.
    pub(crate) fn write_block_unlocked(&self, info: &VolumeInfo, block: &InMemVolume<T>) -> Result<()> {
        if block.vector_length() != info.vector_length {
            return Err(MhdError::VectorLengthMismatch(
                info.vector_length,
                block.vector_length(),
            ));
        }
        if !info.region.contains(block.region()) {
            return Err(MhdError::OutOfBounds(
                block.region().clone(),
                info.region.clone(),
            ));
        }
        let (mut file, file_size) = self.open_payload(true)?;
        let voxel_bytes = size_of::<T>() * info.vector_length;
        let full_size = info.region.size();
        let row_len = block.region().size()[0] as usize * info.vector_length;
        let mut raw = Vec::with_capacity(row_len * size_of::<T>());
        for (first, row) in block.region().row_iter().zip(block.data().chunks(row_len)) {
            let offset = linear_offset(&first, info.region.min(), &full_size) * voxel_bytes as u64;
            raw.clear();
            T::extend_raw(row, info.endianness, &mut raw)?;
            self.write_at(&mut file, offset, file_size, &raw)?;
        }
        self.flush(&mut file)
    }

    /// Overwrite every voxel of the payload with `value`. Must be called
    /// with the guard held exclusively.
    pub(crate) fn fill_unlocked(&self, info: &VolumeInfo, value: &[T]) -> Result<()> {
        if value.len() != info.vector_length {
            return Err(MhdError::VectorLengthMismatch(
                info.vector_length,
                value.len(),
            ));
        }
        let (mut file, file_size) = self.open_payload(true)?;
        let voxel_bytes = (size_of::<T>() * info.vector_length) as u64;
        let total = info.region.num_voxels();
        let chunk_voxels = (FILL_CHUNK_BYTES as u64 / voxel_bytes).max(1).min(total);
        let mut raw = Vec::with_capacity((chunk_voxels * voxel_bytes) as usize);
        for _ in 0..chunk_voxels {
            T::extend_raw(value, info.endianness, &mut raw)?;
        }
        let mut written = 0;
        while written < total {
            let n = chunk_voxels.min(total - written);
            self.write_at(
                &mut file,
                written * voxel_bytes,
                file_size,
                &raw[..(n * voxel_bytes) as usize],
            )?;
            written += n;
        }
        self.flush(&mut file)
    }

    fn write_at(&self, file: &mut File, offset: u64, file_size: u64, raw: &[u8]) -> Result<()> {
        let _ = file
            .seek(SeekFrom::Start(offset))
            .map_err(|err| self.seek_error(offset, file_size, err))?;
        if offset + raw.len() as u64 > file_size {
            return Err(MhdError::Write {
                path: self.data_file_name.clone(),
                offset,
                file_size,
                err: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "payload is shorter than the header declares",
                ),
            });
        }
        file.write_all(raw).map_err(|err| MhdError::Write {
            path: self.data_file_name.clone(),
            offset,
            file_size,
            err,
        })
    }

    fn flush(&self, file: &mut File) -> Result<()> {
        file.flush().map_err(|err| MhdError::FileIo {
            path: self.data_file_name.clone(),
            operation: "flush payload",
            err,
        })
    }

    fn seek_error(&self, offset: u64, file_size: u64, err: io::Error) -> MhdError {
        MhdError::Seek {
            path: self.data_file_name.clone(),
            offset,
            file_size,
            err,
        }
    }
}

impl<T> ReadableVolume<T> for StreamedVolume<T>
where
    T: DataElement,
{
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn data_file_name(&self) -> &Path {
        &self.data_file_name
    }

    fn vector_length(&self) -> usize {
        self.info.read().vector_length
    }

    fn region(&self) -> Region {
        self.info.read().region.clone()
    }

    fn spacing(&self) -> Vec<f64> {
        self.info.read().spacing.clone()
    }

    fn disk_origin(&self) -> Vec<f64> {
        self.info.read().disk_origin.clone()
    }

    fn read_region(&self, region: &Region) -> Result<InMemVolume<T>> {
        let _lock = self.guard.read();
        self.refresh()?;
        let info = self.info();
        self.read_block_unlocked(&info, region)
    }

    fn read_whole_volume(&self) -> Result<InMemVolume<T>> {
        if !self.options.full_load_allowed() {
            return Err(MhdError::UnsupportedOperation(
                "load a whole streamed volume in memory",
            ));
        }
        let _lock = self.guard.read();
        self.refresh()?;
        let info = self.info();
        self.read_block_unlocked(&info, &info.region)
    }

    fn is_valid(&self) -> bool {
        self.file_name.is_file() && self.data_file_name.is_file() && self.vector_length() > 0
    }

    fn can_write(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{as_vector3, VolumeInfo};
    use crate::error::MhdError;
    use crate::header::MhdHeader;
    use crate::typedef::ElementType;
    use crate::volume::region::Region;
    use std::path::Path;

    fn header() -> MhdHeader {
        MhdHeader::new(
            vec![1000, 100, 10],
            vec![0., 2.2, 6.6],
            vec![1.1, 2.2, 3.3],
            1,
            ElementType::Uint8,
            "a.raw",
        )
    }

    #[test]
    fn reindexes_origin() {
        let info = VolumeInfo::from_header::<u8>(Path::new("a.mhd"), &header()).unwrap();
        assert_eq!(info.region, Region::new(vec![0, 1, 2], vec![999, 100, 11]));
        assert_eq!(info.disk_origin, vec![0., 2.2, 6.6]);
    }

    #[test]
    fn rejects_inconsistent_headers() {
        let path = Path::new("a.mhd");
        assert!(matches!(
            VolumeInfo::from_header::<f32>(path, &header()),
            Err(MhdError::ElementTypeMismatch(ElementType::Float32, ElementType::Uint8))
        ));

        let mut h = header();
        h.channels = 0;
        assert!(matches!(
            VolumeInfo::from_header::<u8>(path, &h),
            Err(MhdError::InvalidVolume(..))
        ));

        let mut h = header();
        h.element_spacing[1] = 0.;
        assert!(matches!(
            VolumeInfo::from_header::<u8>(path, &h),
            Err(MhdError::InvalidVolume(..))
        ));

        let mut h = header();
        h.dim_size[2] = 0;
        assert!(matches!(
            VolumeInfo::from_header::<u8>(path, &h),
            Err(MhdError::InvalidVolume(..))
        ));

        let mut h = header();
        h.offset[0] = 1e300;
        assert!(matches!(
            VolumeInfo::from_header::<u8>(path, &h),
            Err(MhdError::InvalidVolume(..))
        ));

        let mut h = header();
        h.offset[0] = 9_223_372_036_854_774_784.;
        h.element_spacing[0] = 1.;
        h.dim_size[0] = 2000;
        assert!(matches!(
            VolumeInfo::from_header::<u8>(path, &h),
            Err(MhdError::InvalidVolume(..))
        ));

        let mut h = header();
        h.compressed = true;
        assert!(matches!(
            VolumeInfo::from_header::<u8>(path, &h),
            Err(MhdError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn vector3_requires_three_values() {
        assert_eq!(as_vector3("op", &[1., 2., 3.]).unwrap(), [1., 2., 3.]);
        assert!(matches!(
            as_vector3("op", &[1., 2.]),
            Err(MhdError::UnsupportedDimension("op", 2))
        ));
    }
}
