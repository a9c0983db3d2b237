//! This module contains the element types which a MetaImage payload may
//! hold. Each variant maps to the `ElementType` tag written in the header
//! (e.g. `MET_FLOAT`), and primitive Rust types are bound to them through
//! the [`DataElement`] trait.
//!
//! [`DataElement`]: ../volume/element/trait.DataElement.html

use crate::error::{MhdError, Result};
use std::fmt;
use std::str::FromStr;

/// Data type for representing the scalar type of a volume's voxels.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ElementType {
    /// unsigned char.
    // MET_UCHAR
    Uint8,
    /// signed char.
    // MET_CHAR
    Int8,
    /// unsigned short.
    // MET_USHORT
    Uint16,
    /// signed short.
    // MET_SHORT
    Int16,
    /// unsigned int.
    // MET_UINT
    Uint32,
    /// signed int.
    // MET_INT
    Int32,
    /// unsigned long long.
    // MET_ULONG_LONG
    Uint64,
    /// signed long long.
    // MET_LONG_LONG
    Int64,
    /// 32 bit float.
    // MET_FLOAT
    Float32,
    /// 64 bit float = double.
    // MET_DOUBLE
    Float64,
}

impl ElementType {
    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        use ElementType::*;
        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Int32 | Uint32 | Float32 => 4,
            Int64 | Uint64 | Float64 => 8,
        }
    }

    /// The tag identifying this type in a header's `ElementType` field.
    pub fn tag(self) -> &'static str {
        use ElementType::*;
        match self {
            Uint8 => "MET_UCHAR",
            Int8 => "MET_CHAR",
            Uint16 => "MET_USHORT",
            Int16 => "MET_SHORT",
            Uint32 => "MET_UINT",
            Int32 => "MET_INT",
            Uint64 => "MET_ULONG_LONG",
            Int64 => "MET_LONG_LONG",
            Float32 => "MET_FLOAT",
            Float64 => "MET_DOUBLE",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ElementType {
    type Err = MhdError;

    fn from_str(s: &str) -> Result<Self> {
        use ElementType::*;
        // `MET_LONG`/`MET_ULONG` are 32 bits wide in MetaIO
        match s {
            "MET_UCHAR" => Ok(Uint8),
            "MET_CHAR" => Ok(Int8),
            "MET_USHORT" => Ok(Uint16),
            "MET_SHORT" => Ok(Int16),
            "MET_UINT" | "MET_ULONG" => Ok(Uint32),
            "MET_INT" | "MET_LONG" => Ok(Int32),
            "MET_ULONG_LONG" => Ok(Uint64),
            "MET_LONG_LONG" => Ok(Int64),
            "MET_FLOAT" => Ok(Float32),
            "MET_DOUBLE" => Ok(Float64),
            _ => Err(MhdError::MalformedHeader(format!(
                "unsupported element type `{}`",
                s
            ))),
        }
    }
}
