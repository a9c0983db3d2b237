use mhd_stream::{ElementType, Endianness, MhdHeader, Region};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Known meta-data for the "big_endian.mhd" test file.
#[allow(dead_code)]
pub fn big_endian_header_gt() -> MhdHeader {
    MhdHeader {
        dim_size: vec![4, 3],
        offset: vec![1., 3.],
        element_spacing: vec![0.5, 1.5],
        channels: 1,
        element_type: ElementType::Int16,
        endianness: Endianness::Big,
        compressed: false,
        data_file: Some("big_endian.raw".to_string()),
    }
}

/// Expected value of the "big_endian.mhd" test file at a re-indexed voxel.
#[allow(dead_code)]
pub fn big_endian_value(index: &[i64]) -> i16 {
    ((index[0] - 2) + 10 * (index[1] - 2) - 5) as i16
}

/// A scratch directory with the path of a volume header inside it.
#[allow(dead_code)]
pub fn scratch(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    (dir, path)
}

/// Copy a test resource volume (header and payload) into `dir`.
#[allow(dead_code)]
pub fn copy_resource(name: &str, dir: &Path) -> PathBuf {
    let header = dir.join(format!("{}.mhd", name));
    std::fs::copy(format!("resources/{}.mhd", name), &header).unwrap();
    std::fs::copy(
        format!("resources/{}.raw", name),
        dir.join(format!("{}.raw", name)),
    )
    .unwrap();
    header
}

/// A 3D region from its inclusive corners.
#[allow(dead_code)]
pub fn region3(min: [i64; 3], max: [i64; 3]) -> Region {
    Region::new(min.to_vec(), max.to_vec())
}

/// The header file's text.
#[allow(dead_code)]
pub fn header_text(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
