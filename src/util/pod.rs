//! Plain Old Data types as they appear in archive property headers.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

/// Storage type of a single scalar inside a property sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Boolean = 0,
    Uint8 = 1,
    Int8 = 2,
    Uint16 = 3,
    Int16 = 4,
    Uint32 = 5,
    Int32 = 6,
    Uint64 = 7,
    Int64 = 8,
    /// IEEE 754 half precision
    Float16 = 9,
    Float32 = 10,
    Float64 = 11,
    /// UTF-8 string
    String = 12,
    /// Wide string (carried as UTF-8)
    Wstring = 13,
    /// Unknown/invalid type
    #[default]
    Unknown = 127,
}

/// Coarse family of a POD type, which is all the decoder dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PodCategory {
    Bool,
    Signed,
    Unsigned,
    Float,
    String,
    Unknown,
}

impl PlainOldDataType {
    /// Size in bytes of a single scalar. Strings are not stored inline.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Boolean | Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
            Self::String | Self::Wstring | Self::Unknown => 0,
        }
    }

    /// Header name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool_t",
            Self::Uint8 => "uint8_t",
            Self::Int8 => "int8_t",
            Self::Uint16 => "uint16_t",
            Self::Int16 => "int16_t",
            Self::Uint32 => "uint32_t",
            Self::Int32 => "int32_t",
            Self::Uint64 => "uint64_t",
            Self::Int64 => "int64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
            Self::Wstring => "wstring",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse POD type from its header name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "bool_t" => Self::Boolean,
            "uint8_t" => Self::Uint8,
            "int8_t" => Self::Int8,
            "uint16_t" => Self::Uint16,
            "int16_t" => Self::Int16,
            "uint32_t" => Self::Uint32,
            "int32_t" => Self::Int32,
            "uint64_t" => Self::Uint64,
            "int64_t" => Self::Int64,
            "float16_t" => Self::Float16,
            "float32_t" => Self::Float32,
            "float64_t" => Self::Float64,
            "string" => Self::String,
            "wstring" => Self::Wstring,
            _ => Self::Unknown,
        }
    }

    #[inline]
    pub const fn category(self) -> PodCategory {
        match self {
            Self::Boolean => PodCategory::Bool,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => PodCategory::Signed,
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => PodCategory::Unsigned,
            Self::Float16 | Self::Float32 | Self::Float64 => PodCategory::Float,
            Self::String | Self::Wstring => PodCategory::String,
            Self::Unknown => PodCategory::Unknown,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::Wstring)
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === POD trait for typed sample buffers ===

/// Scalar types that can back a numeric property sample.
pub trait AlembicPod: Pod + Zeroable + Copy + Default {
    /// The corresponding PlainOldDataType enum value.
    const POD_TYPE: PlainOldDataType;
}

macro_rules! impl_alembic_pod {
    ($($ty:ty => $pod:ident),* $(,)?) => {
        $(impl AlembicPod for $ty {
            const POD_TYPE: PlainOldDataType = PlainOldDataType::$pod;
        })*
    };
}

impl_alembic_pod! {
    u8 => Uint8,
    i8 => Int8,
    u16 => Uint16,
    i16 => Int16,
    u32 => Uint32,
    i32 => Int32,
    u64 => Uint64,
    i64 => Int64,
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
}

/// Boolean with guaranteed 1-byte storage, matching archive `bool_t`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl AlembicPod for Bool {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Boolean;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_sizes() {
        assert_eq!(PlainOldDataType::Boolean.num_bytes(), 1);
        assert_eq!(PlainOldDataType::Int32.num_bytes(), 4);
        assert_eq!(PlainOldDataType::Float16.num_bytes(), 2);
        assert_eq!(PlainOldDataType::Float64.num_bytes(), 8);
        assert_eq!(PlainOldDataType::String.num_bytes(), 0);
    }

    #[test]
    fn test_pod_categories() {
        assert_eq!(PlainOldDataType::Int8.category(), PodCategory::Signed);
        assert_eq!(PlainOldDataType::Uint64.category(), PodCategory::Unsigned);
        assert_eq!(PlainOldDataType::Float16.category(), PodCategory::Float);
        assert_eq!(PlainOldDataType::Wstring.category(), PodCategory::String);
        assert_eq!(PlainOldDataType::Unknown.category(), PodCategory::Unknown);
    }

    #[test]
    fn test_pod_names() {
        assert_eq!(PlainOldDataType::from_name("int32_t"), PlainOldDataType::Int32);
        assert_eq!(PlainOldDataType::from_name("nope"), PlainOldDataType::Unknown);
        assert_eq!(<f16 as AlembicPod>::POD_TYPE, PlainOldDataType::Float16);
        assert_eq!(std::mem::size_of::<Bool>(), 1);
        assert!(Bool::new(true).get());
    }
}
