use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{MiraMonError, Result};

/// Pixel data types exposed by MiraMon bands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DataType {
    /// Eight bit unsigned integer
    UInt8,
    /// Sixteen bit unsigned integer
    UInt16,
    /// Sixteen bit signed integer
    Int16,
    /// Thirty two bit signed integer
    Int32,
    /// Thirty two bit floating point
    Float32,
    /// Sixty four bit floating point
    Float64,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::UInt8 => "Byte",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }

    /// Get the type size in **bits**.
    pub fn bits(&self) -> u8 {
        self.bytes() * 8
    }

    /// Get the type size in **bytes**.
    pub fn bytes(&self) -> u8 {
        match self {
            DataType::UInt8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    /// Returns `true` if data type is integral (non-floating point)
    pub fn is_integer(&self) -> bool {
        !self.is_floating()
    }

    /// Returns `true` if data type is floating point (non-integral)
    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Returns `true` if data type supports negative values.
    pub fn is_signed(&self) -> bool {
        !matches!(self, DataType::UInt8 | DataType::UInt16)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage layout of a band's `.img` file, from `TipusCompressio`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MiraMonDataType {
    /// One bit per pixel, rows padded to whole bytes.
    Bit,
    Byte,
    ByteRle,
    Integer,
    IntegerRle,
    UInteger,
    UIntegerRle,
    Long,
    LongRle,
    Real,
    RealRle,
    Double,
    DoubleRle,
}

impl MiraMonDataType {
    /// Type pixels are exposed as.
    pub fn data_type(&self) -> DataType {
        use MiraMonDataType::*;
        match self {
            Bit | Byte | ByteRle => DataType::UInt8,
            Integer | IntegerRle => DataType::Int16,
            UInteger | UIntegerRle => DataType::UInt16,
            Long | LongRle => DataType::Int32,
            Real | RealRle => DataType::Float32,
            Double | DoubleRle => DataType::Float64,
        }
    }

    /// Bytes per pixel of the exposed type. `Bit` counts as one.
    pub fn bytes_per_pixel(&self) -> usize {
        self.data_type().bytes() as usize
    }

    pub fn is_rle(&self) -> bool {
        use MiraMonDataType::*;
        matches!(
            self,
            ByteRle | IntegerRle | UIntegerRle | LongRle | RealRle | DoubleRle
        )
    }

    pub fn is_bit(&self) -> bool {
        *self == MiraMonDataType::Bit
    }

    /// Size in bytes of one uncompressed row of `width` pixels.
    pub fn row_size(&self, width: usize) -> usize {
        if self.is_bit() {
            width.div_ceil(8)
        } else {
            width * self.bytes_per_pixel()
        }
    }
}

impl FromStr for MiraMonDataType {
    type Err = MiraMonError;

    fn from_str(s: &str) -> Result<Self> {
        use MiraMonDataType::*;
        let dt = match s.trim().to_ascii_lowercase().as_str() {
            "bit" => Bit,
            "byte" => Byte,
            "byte-rle" => ByteRle,
            "integer" => Integer,
            "integer-rle" => IntegerRle,
            "uinteger" => UInteger,
            "uinteger-rle" => UIntegerRle,
            "long" => Long,
            "long-rle" => LongRle,
            "real" => Real,
            "real-rle" => RealRle,
            "double" => Double,
            "double-rle" => DoubleRle,
            _ => return Err(MiraMonError::UnhandledDataType(s.to_string())),
        };
        Ok(dt)
    }
}

/// Type-level constraint for limiting which primitive numeric values can be
/// read out of a band.
pub trait PixelType: Copy + PartialEq + Default + 'static {
    fn datatype() -> DataType;

    /// Decode a little-endian value. `bytes` holds exactly
    /// `datatype().bytes()` bytes.
    fn from_le_bytes(bytes: &[u8]) -> Self;

    fn to_f64(self) -> f64;

    /// Convert, rounding to nearest and saturating for integer types.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_pixel_type {
    ($t:ty, $dt:expr, int) => {
        impl PixelType for $t {
            fn datatype() -> DataType {
                $dt
            }
            fn from_le_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(value: f64) -> Self {
                value.round() as $t
            }
        }
    };
    ($t:ty, $dt:expr, float) => {
        impl PixelType for $t {
            fn datatype() -> DataType {
                $dt
            }
            fn from_le_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_pixel_type!(u8, DataType::UInt8, int);
impl_pixel_type!(u16, DataType::UInt16, int);
impl_pixel_type!(i16, DataType::Int16, int);
impl_pixel_type!(i32, DataType::Int32, int);
impl_pixel_type!(f32, DataType::Float32, float);
impl_pixel_type!(f64, DataType::Float64, float);
