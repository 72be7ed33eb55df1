//! DataType - POD type plus extent, as carried by a property header.

use super::PlainOldDataType;
use std::fmt;

/// Layout of one element of a property sample.
///
/// A point array is `Float32` with extent 3, a matrix is `Float32` with extent 16.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub pod: PlainOldDataType,
    /// Scalars per element
    pub extent: u8,
}

impl DataType {
    #[inline]
    pub const fn new(pod: PlainOldDataType, extent: u8) -> Self {
        Self { pod, extent }
    }

    #[inline]
    pub const fn scalar(pod: PlainOldDataType) -> Self {
        Self { pod, extent: 1 }
    }

    /// Bytes per element (0 for strings).
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.pod.num_bytes() * self.extent as usize
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.pod, PlainOldDataType::Unknown) && self.extent > 0
    }

    pub const UNKNOWN: Self = Self::new(PlainOldDataType::Unknown, 0);

    pub const BOOL: Self = Self::scalar(PlainOldDataType::Boolean);
    pub const INT32: Self = Self::scalar(PlainOldDataType::Int32);
    pub const UINT32: Self = Self::scalar(PlainOldDataType::Uint32);
    pub const UINT64: Self = Self::scalar(PlainOldDataType::Uint64);
    pub const FLOAT16: Self = Self::scalar(PlainOldDataType::Float16);
    pub const FLOAT32: Self = Self::scalar(PlainOldDataType::Float32);
    pub const FLOAT64: Self = Self::scalar(PlainOldDataType::Float64);
    pub const STRING: Self = Self::scalar(PlainOldDataType::String);

    pub const VEC2F: Self = Self::new(PlainOldDataType::Float32, 2);
    pub const VEC3F: Self = Self::new(PlainOldDataType::Float32, 3);
    pub const VEC4F: Self = Self::new(PlainOldDataType::Float32, 4);
    pub const VEC3D: Self = Self::new(PlainOldDataType::Float64, 3);
    pub const VEC4D: Self = Self::new(PlainOldDataType::Float64, 4);
    pub const MAT44F: Self = Self::new(PlainOldDataType::Float32, 16);
    pub const MAT44D: Self = Self::new(PlainOldDataType::Float64, 16);
}

impl Default for DataType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extent == 1 {
            write!(f, "{}", self.pod.name())
        } else {
            write!(f, "{}[{}]", self.pod.name(), self.extent)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_size() {
        assert_eq!(DataType::VEC3F.num_bytes(), 12);
        assert_eq!(DataType::MAT44D.num_bytes(), 128);
        assert_eq!(DataType::STRING.num_bytes(), 0);
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(format!("{}", DataType::VEC3F), "float32_t[3]");
        assert_eq!(format!("{:?}", DataType::INT32), "int32_t");
        assert!(!DataType::UNKNOWN.is_valid());
    }
}
