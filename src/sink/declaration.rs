//! Renderer parameter declarations ("constant ARRAY FLOAT", "indexed VECTOR2").

use std::fmt;
use std::str::FromStr;

use crate::attr::{AttrScope, TypedValueVector, Usage, ValueType};
use crate::util::{Error, Result};

/// Renderer parameter type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    Int,
    UInt,
    Float,
    Vector2,
    Point,
    Vector,
    Rgb,
    Rgba,
    Matrix,
    String,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Int => "INT",
            Self::UInt => "UINT",
            Self::Float => "FLOAT",
            Self::Vector2 => "VECTOR2",
            Self::Point => "POINT",
            Self::Vector => "VECTOR",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
            Self::Matrix => "MATRIX",
            Self::String => "STRING",
        }
    }

    /// Scalars per element.
    pub fn dim(self) -> usize {
        match self {
            Self::Vector2 => 2,
            Self::Point | Self::Vector | Self::Rgb => 3,
            Self::Rgba => 4,
            Self::Matrix => 16,
            _ => 1,
        }
    }

    /// Renderer type for a vector's value type, dimension and usage.
    pub fn for_layout(value_type: ValueType, dim: usize, usage: Option<Usage>) -> Option<Self> {
        let t = match (value_type, dim) {
            (ValueType::Bool, 1) => Self::Bool,
            (ValueType::Int, 1) => Self::Int,
            (ValueType::UInt, 1) => Self::UInt,
            (ValueType::String, 1) => Self::String,
            (ValueType::Float, 1) => Self::Float,
            (ValueType::Float, 2) => Self::Vector2,
            (ValueType::Float, 3) => match usage {
                Some(Usage::Point) => Self::Point,
                Some(Usage::Color) => Self::Rgb,
                _ => Self::Vector,
            },
            (ValueType::Float, 4) => Self::Rgba,
            (ValueType::Float, 16) => Self::Matrix,
            _ => return None,
        };
        Some(t)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "BOOL" | "BOOLEAN" => Self::Bool,
            "INT" => Self::Int,
            "UINT" => Self::UInt,
            "FLOAT" => Self::Float,
            "VECTOR2" | "POINT2" => Self::Vector2,
            "POINT" => Self::Point,
            "VECTOR" => Self::Vector,
            "RGB" => Self::Rgb,
            "RGBA" => Self::Rgba,
            "MATRIX" => Self::Matrix,
            "STRING" => Self::String,
            _ => return Err(Error::InvalidDeclaration(s.to_owned())),
        })
    }
}

/// Scope, array-ness and type of a user parameter.
///
/// Only constant declarations distinguish arrays from scalars; the other
/// scopes are always arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub scope: AttrScope,
    pub is_array: bool,
    pub param_type: ParamType,
}

impl Declaration {
    pub fn new(scope: AttrScope, is_array: bool, param_type: ParamType) -> Self {
        Self {
            scope,
            is_array: scope == AttrScope::Constant && is_array,
            param_type,
        }
    }

    /// Declaration matching a vector, if the renderer can hold it.
    pub fn for_vector(vector: &TypedValueVector) -> Result<Self> {
        let param_type = ParamType::for_layout(vector.value_type(), vector.dim(), vector.usage()).ok_or_else(|| {
            Error::other(format!(
                "no renderer type for {}[{}] ({:?})",
                vector.value_type(),
                vector.dim(),
                vector.usage()
            ))
        })?;
        Ok(Self::new(vector.scope(), vector.is_array(), param_type))
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scope.as_str())?;
        if self.is_array {
            f.write_str(" ARRAY")?;
        }
        write!(f, " {}", self.param_type)
    }
}

impl FromStr for Declaration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDeclaration(s.to_owned());
        let mut words = s.split_whitespace();
        let scope = match words.next().ok_or_else(invalid)? {
            "constant" => AttrScope::Constant,
            "uniform" => AttrScope::Uniform,
            "varying" => AttrScope::Varying,
            "indexed" => AttrScope::Indexed,
            _ => return Err(invalid()),
        };
        let mut word = words.next().ok_or_else(invalid)?;
        let is_array = word == "ARRAY";
        if is_array {
            if scope != AttrScope::Constant {
                return Err(invalid());
            }
            word = words.next().ok_or_else(invalid)?;
        }
        let param_type = word.parse().map_err(|_| invalid())?;
        if words.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(scope, is_array, param_type))
    }
}
