//! This module defines the `MhdHeader` struct, which describes a streamed
//! MetaImage volume: its dimensionality, size, origin, spacing and element
//! layout. The header is a small line-oriented text file of `Key = Value`
//! entries, so it is always read fully into memory, edited there and
//! written back in full.
//!
//! Only three fields are ever edited after creation (see [`Field`]); every
//! other byte of an existing header is left untouched by
//! [`rewrite_field`].
//!
//! [`Field`]: ./enum.Field.html
//! [`rewrite_field`]: ./fn.rewrite_field.html

use crate::error::{MhdError, Result};
use crate::typedef::ElementType;
use byteordered::Endianness;
use std::fmt::{Display, Write as _};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Header fields which may be rewritten in place once the file exists.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Field {
    /// Number of voxels along each axis.
    DimSize,
    /// World position of the first voxel.
    Offset,
    /// World size of one voxel step along each axis.
    ElementSpacing,
}

impl Field {
    /// The key of this field as written in the header.
    pub fn name(self) -> &'static str {
        match self {
            Field::DimSize => "DimSize",
            Field::Offset => "Offset",
            Field::ElementSpacing => "ElementSpacing",
        }
    }
}

/// The MetaImage header data type.
///
/// # Examples
///
/// ```
/// use mhd_stream::MhdHeader;
/// # use mhd_stream::Result;
///
/// # fn run() -> Result<()> {
/// let text = b"NDims = 2\nDimSize = 4 3\nElementSpacing = 0.5 0.5\n\
///              ElementType = MET_UCHAR\nElementDataFile = image.raw\n";
/// let header = MhdHeader::from_bytes(text)?;
/// assert_eq!(header.dim_size, vec![4, 3]);
/// assert_eq!(header.offset, vec![0., 0.]);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MhdHeader {
    /// Number of voxels along each axis; its length is the dimensionality.
    pub dim_size: Vec<u64>,
    /// World coordinates of the first voxel, as stored on disk.
    pub offset: Vec<f64>,
    /// Voxel size along each axis.
    pub element_spacing: Vec<f64>,
    /// Number of scalar components per voxel.
    pub channels: usize,
    /// Scalar type of each component.
    pub element_type: ElementType,
    /// Byte order of the payload.
    pub endianness: Endianness,
    /// Whether the payload is compressed.
    pub compressed: bool,
    /// Payload file name, relative to the header's directory.
    pub data_file: Option<String>,
}

impl MhdHeader {
    /// Build the header of a new uncompressed, little endian volume.
    pub fn new(
        dim_size: Vec<u64>,
        offset: Vec<f64>,
        element_spacing: Vec<f64>,
        channels: usize,
        element_type: ElementType,
        data_file: impl Into<String>,
    ) -> Self {
        MhdHeader {
            dim_size,
            offset,
            element_spacing,
            channels,
            element_type,
            endianness: Endianness::Little,
            compressed: false,
            data_file: Some(data_file.into()),
        }
    }

    /// Read and parse a header file from the file system.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<MhdHeader> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| MhdError::FileIo {
            path: path.to_owned(),
            operation: "read header",
            err,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a header from its text contents.
    ///
    /// `NDims`, `DimSize` and `ElementType` are required. The origin may be
    /// given as `Offset`, `Origin` or `Position` and defaults to zero, the
    /// spacing defaults to one and the number of channels to one.
    pub fn from_bytes(bytes: &[u8]) -> Result<MhdHeader> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| MhdError::MalformedHeader("header is not valid text".to_string()))?;

        let mut ndims: Option<usize> = None;
        let mut dim_size: Option<Vec<u64>> = None;
        let mut offset: Option<Vec<f64>> = None;
        let mut element_spacing: Option<Vec<f64>> = None;
        let mut channels = 1;
        let mut element_type: Option<ElementType> = None;
        let mut endianness = Endianness::Little;
        let mut compressed = false;
        let mut data_file = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = split_entry(line)?;
            match key {
                "NDims" => ndims = Some(parse_value(key, value)?),
                "DimSize" => dim_size = Some(parse_values(key, value)?),
                "Offset" | "Origin" | "Position" => offset = Some(parse_values(key, value)?),
                "ElementSpacing" => element_spacing = Some(parse_values(key, value)?),
                "ElementNumberOfChannels" => channels = parse_value(key, value)?,
                "ElementType" => element_type = Some(value.parse()?),
                "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => {
                    endianness = if parse_bool(key, value)? {
                        Endianness::Big
                    } else {
                        Endianness::Little
                    }
                }
                "CompressedData" => compressed = parse_bool(key, value)?,
                "ElementDataFile" => data_file = Some(value.to_string()),
                // everything else is carried by the file but irrelevant here
                _ => {}
            }
        }

        let ndims = ndims.ok_or_else(|| missing("NDims"))?;
        if ndims == 0 {
            return Err(MhdError::MalformedHeader("NDims must be positive".to_string()));
        }
        let dim_size = dim_size.ok_or_else(|| missing("DimSize"))?;
        let element_type = element_type.ok_or_else(|| missing("ElementType"))?;
        let offset = offset.unwrap_or_else(|| vec![0.; ndims]);
        let element_spacing = element_spacing.unwrap_or_else(|| vec![1.; ndims]);

        check_len("DimSize", ndims, dim_size.len())?;
        check_len("Offset", ndims, offset.len())?;
        check_len("ElementSpacing", ndims, element_spacing.len())?;

        Ok(MhdHeader {
            dim_size,
            offset,
            element_spacing,
            channels,
            element_type,
            endianness,
            compressed,
            data_file,
        })
    }

    /// Retrieve the volume's dimensionality.
    pub fn ndims(&self) -> usize {
        self.dim_size.len()
    }

    /// Number of bytes taken by a single voxel in the payload.
    pub fn bytes_per_voxel(&self) -> usize {
        self.element_type.size_of() * self.channels
    }

    /// Expected size of the payload file, in bytes, or `None` if it does
    /// not fit in 64 bits.
    pub fn checked_payload_len(&self) -> Option<u64> {
        self.dim_size
            .iter()
            .try_fold(self.bytes_per_voxel() as u64, |acc, d| acc.checked_mul(*d))
    }

    /// Expected size of the payload file, in bytes, saturating at
    /// `u64::MAX`.
    pub fn payload_len(&self) -> u64 {
        self.checked_payload_len().unwrap_or(u64::MAX)
    }

    /// Render the header text. Every field that may later be edited through
    /// [`rewrite_field`] is always present.
    ///
    /// [`rewrite_field`]: ./fn.rewrite_field.html
    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.ndims();
        let identity: Vec<u8> = (0..n * n)
            .map(|i| if i % (n + 1) == 0 { 1 } else { 0 })
            .collect();
        let msb = if self.endianness == Endianness::Big {
            "True"
        } else {
            "False"
        };
        let compressed = if self.compressed { "True" } else { "False" };

        let mut out = String::new();
        // writing to a String does not fail
        let _ = writeln!(out, "ObjectType = Image");
        let _ = writeln!(out, "NDims = {}", n);
        let _ = writeln!(out, "BinaryData = True");
        let _ = writeln!(out, "BinaryDataByteOrderMSB = {}", msb);
        let _ = writeln!(out, "CompressedData = {}", compressed);
        let _ = writeln!(out, "TransformMatrix = {}", join(&identity));
        let _ = writeln!(out, "{}", field_line(Field::Offset, &self.offset));
        let _ = writeln!(out, "CenterOfRotation = {}", join(&vec![0; n]));
        let _ = writeln!(
            out,
            "{}",
            field_line(Field::ElementSpacing, &self.element_spacing)
        );
        let _ = writeln!(out, "{}", field_line(Field::DimSize, &self.dim_size));
        if self.channels > 1 {
            let _ = writeln!(out, "ElementNumberOfChannels = {}", self.channels);
        }
        let _ = writeln!(out, "ElementType = {}", self.element_type);
        let _ = writeln!(
            out,
            "ElementDataFile = {}",
            self.data_file.as_deref().unwrap_or("LOCAL")
        );
        out.into_bytes()
    }
}

/// Replace the contents of a field line in the given header text.
///
/// The line starting with `"<field> ="` is replaced, up to (excluding) its
/// line terminator, by the field name followed by `values` joined by
/// spaces. All other bytes are preserved.
///
/// # Errors
///
/// - `MhdError::FieldNotFound` if the header has no line for `field`.
pub fn rewrite_field<V: Display>(bytes: &[u8], field: Field, values: &[V]) -> Result<Vec<u8>> {
    let begin = find_field_line(bytes, field).ok_or(MhdError::FieldNotFound(field.name()))?;
    let end = bytes[begin..]
        .iter()
        .position(|b| *b == b'\n' || *b == b'\r')
        .map(|p| begin + p)
        .unwrap_or_else(|| bytes.len());

    let replacement = field_line(field, values);
    let mut out = Vec::with_capacity(bytes.len() - (end - begin) + replacement.len());
    out.extend_from_slice(&bytes[..begin]);
    out.extend_from_slice(replacement.as_bytes());
    out.extend_from_slice(&bytes[end..]);
    Ok(out)
}

fn find_field_line(bytes: &[u8], field: Field) -> Option<usize> {
    let mut pattern = field.name().as_bytes().to_vec();
    pattern.extend_from_slice(b" =");
    let mut line_start = 0;
    while line_start < bytes.len() {
        if bytes[line_start..].starts_with(&pattern) {
            return Some(line_start);
        }
        match bytes[line_start..].iter().position(|b| *b == b'\n') {
            Some(p) => line_start += p + 1,
            None => break,
        }
    }
    None
}

fn field_line<V: Display>(field: Field, values: &[V]) -> String {
    let mut line = format!("{} =", field.name());
    for v in values {
        let _ = write!(line, " {}", v);
    }
    line
}

fn join<V: Display>(values: &[V]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_entry(line: &str) -> Result<(&str, &str)> {
    let eq = line
        .find('=')
        .ok_or_else(|| MhdError::MalformedHeader(format!("expected `key = value`, got `{}`", line)))?;
    Ok((line[..eq].trim(), line[eq + 1..].trim()))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| MhdError::MalformedHeader(format!("unparsable {} `{}`", key, value)))
}

fn parse_values<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split_whitespace()
        .map(|v| parse_value(key, v))
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(MhdError::MalformedHeader(format!(
            "expected True or False for {}, got `{}`",
            key, value
        )))
    }
}

fn check_len(key: &str, ndims: usize, got: usize) -> Result<()> {
    if ndims != got {
        return Err(MhdError::MalformedHeader(format!(
            "{} has {} entries, NDims is {}",
            key, got, ndims
        )));
    }
    Ok(())
}

fn missing(key: &str) -> MhdError {
    MhdError::MalformedHeader(format!("missing required field {}", key))
}

#[cfg(test)]
mod tests {
    use super::{rewrite_field, Field, MhdHeader};
    use crate::error::MhdError;
    use crate::typedef::ElementType;
    use byteordered::Endianness;

    const SAMPLE: &[u8] = b"ObjectType = Image\n\
NDims = 3\n\
BinaryData = True\n\
BinaryDataByteOrderMSB = False\n\
CompressedData = False\n\
TransformMatrix = 1 0 0 0 1 0 0 0 1\n\
Offset = 0 2.2 6.6\n\
CenterOfRotation = 0 0 0\n\
ElementSpacing = 1.1 2.2 3.3\n\
DimSize = 1000 100 10\n\
ElementType = MET_UCHAR\n\
ElementDataFile = test.raw\n";

    #[test]
    fn parse_sample() {
        let h = MhdHeader::from_bytes(SAMPLE).unwrap();
        assert_eq!(h.ndims(), 3);
        assert_eq!(h.dim_size, vec![1000, 100, 10]);
        assert_eq!(h.offset, vec![0., 2.2, 6.6]);
        assert_eq!(h.element_spacing, vec![1.1, 2.2, 3.3]);
        assert_eq!(h.channels, 1);
        assert_eq!(h.element_type, ElementType::Uint8);
        assert_eq!(h.endianness, Endianness::Little);
        assert!(!h.compressed);
        assert_eq!(h.data_file.as_deref(), Some("test.raw"));
        assert_eq!(h.payload_len(), 1_000_000);
    }

    #[test]
    fn render_then_parse() {
        let h = MhdHeader::new(
            vec![100, 100, 100],
            vec![0., 2.2, 6.6],
            vec![1.1, 2.2, 3.3],
            3,
            ElementType::Float32,
            "test.raw",
        );
        let bytes = h.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("ElementNumberOfChannels = 3\n"));
        assert!(text.contains("TransformMatrix = 1 0 0 0 1 0 0 0 1\n"));
        assert_eq!(MhdHeader::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn scalar_header_omits_channels() {
        let h = MhdHeader::new(vec![2, 2], vec![0., 0.], vec![1., 1.], 1, ElementType::Int16, "a.raw");
        let text = String::from_utf8(h.to_bytes()).unwrap();
        assert!(!text.contains("ElementNumberOfChannels"));
    }

    #[test]
    fn missing_fields() {
        let err = MhdHeader::from_bytes(b"NDims = 2\nElementType = MET_UCHAR\n").unwrap_err();
        assert!(matches!(err, MhdError::MalformedHeader(_)));
        let err = MhdHeader::from_bytes(b"NDims = 2\nDimSize = 2 2\n").unwrap_err();
        assert!(matches!(err, MhdError::MalformedHeader(_)));
        let err =
            MhdHeader::from_bytes(b"NDims = 2\nDimSize = 2 x\nElementType = MET_UCHAR\n").unwrap_err();
        assert!(matches!(err, MhdError::MalformedHeader(_)));
        let err =
            MhdHeader::from_bytes(b"NDims = 3\nDimSize = 2 2\nElementType = MET_UCHAR\n").unwrap_err();
        assert!(matches!(err, MhdError::MalformedHeader(_)));
    }

    #[test]
    fn origin_synonyms_and_defaults() {
        let h = MhdHeader::from_bytes(
            b"NDims = 2\nPosition = 1 2\nDimSize = 2 2\nElementType = MET_SHORT\nElementByteOrderMSB = True\n",
        )
        .unwrap();
        assert_eq!(h.offset, vec![1., 2.]);
        assert_eq!(h.element_spacing, vec![1., 1.]);
        assert_eq!(h.endianness, Endianness::Big);
        assert_eq!(h.data_file, None);
    }

    #[test]
    fn rewrite_touches_only_the_field() {
        let out = rewrite_field(SAMPLE, Field::Offset, &[1.5, 0., -3.]).unwrap();
        let expected = String::from_utf8(SAMPLE.to_vec())
            .unwrap()
            .replace("Offset = 0 2.2 6.6", "Offset = 1.5 0 -3");
        assert_eq!(String::from_utf8(out).unwrap(), expected);

        let out = rewrite_field(SAMPLE, Field::DimSize, &[1, 2, 3]).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\nDimSize = 1 2 3\nElementType"));
    }

    #[test]
    fn rewrite_keeps_crlf_and_last_line() {
        let out = rewrite_field(b"A = 1\r\nElementSpacing = 1 1\r\nB = 2", Field::ElementSpacing, &[2, 3])
            .unwrap();
        assert_eq!(out, b"A = 1\r\nElementSpacing = 2 3\r\nB = 2".to_vec());

        let out = rewrite_field(b"DimSize = 1 1", Field::DimSize, &[4, 4]).unwrap();
        assert_eq!(out, b"DimSize = 4 4".to_vec());
    }

    #[test]
    fn rewrite_missing_field() {
        // a key merely containing the field name does not count
        let err = rewrite_field(b"NotOffset = 1 2\n", Field::Offset, &[0, 0]).unwrap_err();
        assert!(matches!(err, MhdError::FieldNotFound("Offset")));
    }
}
