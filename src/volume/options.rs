//! Options for opening and creating streamed volumes, plus the two entry
//! points used by most callers.
//!
//! # Examples
//!
//! ```no_run
//! use mhd_stream::{LockRegistry, VolumeOptions, ReadableVolume};
//! use std::sync::Arc;
//! # use mhd_stream::Result;
//!
//! # fn run() -> Result<()> {
//! let registry = Arc::new(LockRegistry::new());
//! let options = VolumeOptions::new()
//!     .allow_full_load(true)
//!     .lock_registry(registry);
//!
//! let volume = options.open::<u8, _>("labels.mhd")?;
//! let whole = volume.read_whole_volume()?;
//! println!("{} voxels", whole.region().num_voxels());
//! # Ok(())
//! # }
//! ```

use super::element::DataElement;
use super::guard::{ConcurrencyGuard, LockRegistry};
use super::region::Region;
use super::streamed::StreamedVolume;
use super::writable::WritableStreamedVolume;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Configuration of volume handles.
///
/// The defaults are: whole-volume reads disabled, header read once at
/// open, and a private lock per handle.
#[derive(Debug, Clone, Default)]
pub struct VolumeOptions {
    allow_full_load: bool,
    reread_header: bool,
    lock_registry: Option<Arc<LockRegistry>>,
}

impl VolumeOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit `read_whole_volume`, which loads the entire payload in memory.
    pub fn allow_full_load(mut self, allow: bool) -> Self {
        self.allow_full_load = allow;
        self
    }

    /// Re-read the header before every read, picking up origin and spacing
    /// changes made through other handles.
    pub fn reread_header(mut self, reread: bool) -> Self {
        self.reread_header = reread;
        self
    }

    /// Share locks with every other handle opened with the same registry.
    pub fn lock_registry(mut self, registry: Arc<LockRegistry>) -> Self {
        self.lock_registry = Some(registry);
        self
    }

    /// Whether whole-volume reads are permitted.
    pub fn full_load_allowed(&self) -> bool {
        self.allow_full_load
    }

    /// Whether the header is re-read before every read.
    pub fn rereads_header(&self) -> bool {
        self.reread_header
    }

    pub(crate) fn guard_for(&self, path: &Path) -> ConcurrencyGuard {
        match &self.lock_registry {
            Some(registry) => registry.guard_for(path),
            None => ConcurrencyGuard::new(),
        }
    }

    /// Open an existing volume for reading.
    pub fn open<T, P>(&self, path: P) -> Result<StreamedVolume<T>>
    where
        T: DataElement,
        P: AsRef<Path>,
    {
        StreamedVolume::open_with(path, self)
    }

    /// Open an existing volume for writing.
    pub fn open_writable<T, P>(&self, path: P) -> Result<WritableStreamedVolume<T>>
    where
        T: DataElement,
        P: AsRef<Path>,
    {
        WritableStreamedVolume::open_with(path, self)
    }

    /// Adopt the volume at `path` if it exists, otherwise create it with
    /// the given parameters.
    ///
    /// When the file exists, `region` and `spacing` are ignored, and
    /// `vector_length` is only checked against the file's. When it does
    /// not exist, a missing `region` or `spacing` is rejected like an empty
    /// one, and a missing `vector_length` means scalar voxels.
    pub fn open_or_create<T, P>(
        &self,
        path: P,
        region: Option<&Region>,
        spacing: Option<&[f64]>,
        vector_length: Option<usize>,
    ) -> Result<WritableStreamedVolume<T>>
    where
        T: DataElement,
        P: AsRef<Path>,
    {
        WritableStreamedVolume::open_or_create_with(path, region, spacing, vector_length, self)
    }
}

/// Open an existing volume for reading with the default options.
pub fn open_for_reading<T, P>(path: P) -> Result<StreamedVolume<T>>
where
    T: DataElement,
    P: AsRef<Path>,
{
    VolumeOptions::default().open(path)
}

/// Adopt or create a volume for writing with the default options.
///
/// See [`VolumeOptions::open_or_create`](struct.VolumeOptions.html#method.open_or_create).
pub fn open_or_create_for_writing<T, P>(
    path: P,
    region: Option<&Region>,
    spacing: Option<&[f64]>,
    vector_length: Option<usize>,
) -> Result<WritableStreamedVolume<T>>
where
    T: DataElement,
    P: AsRef<Path>,
{
    VolumeOptions::default().open_or_create(path, region, spacing, vector_length)
}

#[cfg(test)]
mod tests {
    use super::VolumeOptions;
    use crate::volume::guard::LockRegistry;
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn defaults() {
        let options = VolumeOptions::new();
        assert!(!options.full_load_allowed());
        assert!(!options.rereads_header());
        let a = options.guard_for(Path::new("a.mhd"));
        let b = options.guard_for(Path::new("a.mhd"));
        assert!(!a.is_shared_with(&b));
    }

    #[test]
    fn registry_is_shared_by_clones() {
        let options = VolumeOptions::new()
            .allow_full_load(true)
            .reread_header(true)
            .lock_registry(Arc::new(LockRegistry::new()));
        let other = options.clone();
        assert!(other.full_load_allowed());
        assert!(other.rereads_header());
        let a = options.guard_for(Path::new("a.mhd"));
        let b = other.guard_for(Path::new("a.mhd"));
        assert!(a.is_shared_with(&b));
    }
}
