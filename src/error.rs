//! Types for error handling go here.
use crate::typedef::ElementType;
use crate::volume::region::Region;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum MhdError {
        /// The header file of the volume does not exist.
        FileNotFound(path: PathBuf) {
            display("Header file not found: {}", path.display())
        }
        /// The header text does not follow the expected grammar.
        MalformedHeader(reason: String) {
            display("Malformed header: {}", reason)
        }
        /// A field line to be rewritten is not present in the header.
        FieldNotFound(field: &'static str) {
            display("Field `{}` not found in header", field)
        }
        /// The parsed header is internally inconsistent.
        InvalidVolume(path: PathBuf, reason: String) {
            display("Invalid volume {}: {}", path.display(), reason)
        }
        /// The operation requires a volume of another dimensionality.
        UnsupportedDimension(operation: &'static str, dim: usize) {
            display("`{}` requires a 3-dimensional volume, got {} dimensions", operation, dim)
        }
        /// World bounds have another number of axes than the volume.
        DimensionMismatch(expected: usize, got: usize) {
            display("Bounds of {} dimensions used on a {}-dimensional volume", got, expected)
        }
        /// Attempted to create a volume with a zero spacing vector.
        EmptySpacing(path: PathBuf) {
            display("Invalid parameters: empty spacing. File: {}", path.display())
        }
        /// Attempted to create a volume over a degenerate region.
        EmptyRegion(path: PathBuf) {
            display("Invalid parameters: empty region. File: {}", path.display())
        }
        /// Attempted to create a volume with zero components per voxel.
        InvalidVectorLength(path: PathBuf) {
            display("Invalid parameters: invalid vector length. File: {}", path.display())
        }
        /// Attempted to access a region which is not inside the volume.
        OutOfBounds(requested: Region, full: Region) {
            display("Region {} partially or completely outside of the volume region {}", requested, full)
        }
        /// A seek in the payload file failed.
        Seek { path: PathBuf, offset: u64, file_size: u64, err: IOError } {
            display("Unable to seek to pos {}, total file size is {}. File: {}", offset, file_size, path.display())
            source(err)
        }
        /// A write to the payload file did not fully succeed.
        Write { path: PathBuf, offset: u64, file_size: u64, err: IOError } {
            display("Unable to write in pos {}, total file size is {}. File: {}", offset, file_size, path.display())
            source(err)
        }
        /// A read from the payload file did not fully succeed.
        Read { path: PathBuf, offset: u64, file_size: u64, err: IOError } {
            display("Unable to read from pos {}, total file size is {}. File: {}", offset, file_size, path.display())
            source(err)
        }
        /// Any other file system operation failed.
        FileIo { path: PathBuf, operation: &'static str, err: IOError } {
            display("Failed to {} {}: {}", operation, path.display(), err)
            source(err)
        }
        /// The format cannot support the requested operation.
        UnsupportedOperation(operation: &'static str) {
            display("Unsupported operation: {}", operation)
        }
        /// A mutating operation was attempted on a read-only volume.
        ReadOnly(operation: &'static str) {
            display("Cannot {} on a read-only volume", operation)
        }
        /// The pixel value has a different number of components than the volume.
        VectorLengthMismatch(expected: usize, got: usize) {
            display("Pixel vector length {} differs from the volume's vector length {}", got, expected)
        }
        /// The header declares an element type other than the requested one.
        ElementTypeMismatch(expected: ElementType, got: ElementType) {
            display("Element type {} does not match the requested {}", got, expected)
        }
        /// A buffer's content does not agree with its declared shape.
        IncompatibleLength(expected: usize, got: usize) {
            display("Expected {} elements, got {}", expected, got)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, MhdError>;
