//! File name conventions and file system helpers.
use crate::error::{MhdError, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Check whether the path points to a MetaImage header file, by extension.
pub fn is_header_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|e| e.eq_ignore_ascii_case("mhd"))
        .unwrap_or(false)
}

/// Convert a header file name to the name of its payload file, by
/// replacing the `.mhd` extension with `.raw`.
///
/// # Errors
///
/// - `MhdError::InvalidVolume` if the path does not name a `.mhd` file.
pub fn to_raw_file<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if !is_header_file(path) {
        return Err(MhdError::InvalidVolume(
            path.to_path_buf(),
            "file name must end with .mhd".to_string(),
        ));
    }
    Ok(path.with_extension("raw"))
}

/// Delete the header file and the payload file of a volume.
///
/// Failures are logged and otherwise ignored, so this can be called on
/// partially created or already deleted volumes.
pub fn remove_volume_files<P: AsRef<Path>>(path: P) {
    let path = path.as_ref();
    remove_file_or_warn(path);
    if let Ok(raw) = to_raw_file(path) {
        remove_file_or_warn(&raw);
    }
}

pub(crate) fn remove_file_or_warn(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::{is_header_file, remove_volume_files, to_raw_file};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn filenames() {
        assert!(is_header_file("volume.mhd"));
        assert!(is_header_file("/data/volume.MHD"));
        assert!(!is_header_file("volume.raw"));
        assert!(!is_header_file("volume"));
        assert_eq!(
            to_raw_file("/data/volume.mhd").unwrap(),
            PathBuf::from("/data/volume.raw")
        );
        assert_eq!(
            to_raw_file("a.b.mhd").unwrap(),
            PathBuf::from("a.b.raw")
        );
        assert!(to_raw_file("volume.nii").is_err());
    }

    #[test]
    fn remove_both_files() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("v.mhd");
        let raw = dir.path().join("v.raw");
        fs::write(&header, b"NDims = 1\n").unwrap();
        fs::write(&raw, [0u8; 4]).unwrap();
        remove_volume_files(&header);
        assert!(!header.exists());
        assert!(!raw.exists());
        // nothing left to remove, only warns
        remove_volume_files(&header);
    }
}
