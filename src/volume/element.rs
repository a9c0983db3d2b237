//! This module defines the data element API, which binds primitive Rust
//! types to the element types of a MetaImage payload and converts them
//! from and to raw bytes in either byte order.
use crate::error::Result;
use crate::typedef::ElementType;
use byteordered::{ByteOrdered, Endianness};
use bytemuck::Pod;
use num_traits::{AsPrimitive, Zero};
use std::fmt::Debug;
use std::io::{Read, Write};

/// Trait type for characterizing a MetaImage data element, implemented for
/// primitive numeric types which are used by the crate to represent voxel
/// components.
pub trait DataElement:
    'static + Sized + Copy + Send + Sync + Debug + PartialEq + Zero + Pod + AsPrimitive<f64>
{
    /// The `ElementType` mapped to the type T
    const ELEMENT_TYPE: ElementType;

    /// Read a single element from the given byte source.
    fn from_raw<R: Read>(src: R, endianness: Endianness) -> Result<Self>;

    /// Write a single element to the given byte sink.
    fn to_raw<W: Write>(self, dst: W, endianness: Endianness) -> Result<()>;

    /// Transform the given raw bytes into a vector of data elements.
    /// Trailing bytes which do not make up a whole element are ignored.
    fn from_raw_slice(bytes: &[u8], endianness: Endianness) -> Result<Vec<Self>> {
        let n = bytes.len() / std::mem::size_of::<Self>();
        let bytes = &bytes[..n * std::mem::size_of::<Self>()];
        if endianness == Endianness::native() {
            return Ok(bytemuck::pod_collect_to_vec(bytes));
        }
        let mut cursor = bytes;
        (0..n).map(|_| Self::from_raw(&mut cursor, endianness)).collect()
    }

    /// Append the raw byte representation of `values` to `out`.
    fn extend_raw(values: &[Self], endianness: Endianness, out: &mut Vec<u8>) -> Result<()> {
        if endianness == Endianness::native() {
            out.extend_from_slice(bytemuck::cast_slice(values));
            return Ok(());
        }
        out.reserve(std::mem::size_of_val(values));
        for v in values {
            v.to_raw(&mut *out, endianness)?;
        }
        Ok(())
    }
}

macro_rules! impl_data_element {
    ($t: ty, $variant: ident, $read: ident, $write: ident) => {
        impl DataElement for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn from_raw<R: Read>(src: R, endianness: Endianness) -> Result<Self> {
                ByteOrdered::runtime(src, endianness)
                    .$read()
                    .map_err(From::from)
            }

            fn to_raw<W: Write>(self, dst: W, endianness: Endianness) -> Result<()> {
                ByteOrdered::runtime(dst, endianness)
                    .$write(self)
                    .map_err(From::from)
            }
        }
    };
}

impl_data_element!(u8, Uint8, read_u8, write_u8);
impl_data_element!(i8, Int8, read_i8, write_i8);
impl_data_element!(u16, Uint16, read_u16, write_u16);
impl_data_element!(i16, Int16, read_i16, write_i16);
impl_data_element!(u32, Uint32, read_u32, write_u32);
impl_data_element!(i32, Int32, read_i32, write_i32);
impl_data_element!(u64, Uint64, read_u64, write_u64);
impl_data_element!(i64, Int64, read_i64, write_i64);
impl_data_element!(f32, Float32, read_f32, write_f32);
impl_data_element!(f64, Float64, read_f64, write_f64);
