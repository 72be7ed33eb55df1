//! Typed Value Vector: the runtime-typed buffer every attribute travels in.
//!
//! A vector owns its values, its optional index array and the string pool
//! backing string values. It is move-only; everything it owns is released when
//! it is dropped or explicitly [`release`](TypedValueVector::release)d.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::GeometryScope;
use crate::util::{DataType, Error, Result, Vec3};

/// Renderer-facing scalar type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    UInt,
    Float,
    String,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a float buffer is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Usage {
    Point,
    Vector,
    Normal,
    Color,
    Matrix,
}

/// Density of an attribute relative to the emitted primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttrScope {
    /// One value for the whole primitive.
    #[default]
    Constant,
    /// One value per face or curve.
    Uniform,
    /// One value per point.
    Varying,
    /// One value per face corner, optionally through an index array.
    Indexed,
}

impl AttrScope {
    /// Scope of a geometry parameter.
    pub fn from_geometry(scope: GeometryScope) -> Self {
        match scope {
            GeometryScope::FaceVarying => Self::Indexed,
            GeometryScope::Varying | GeometryScope::Vertex => Self::Varying,
            GeometryScope::Uniform => Self::Uniform,
            GeometryScope::Constant => Self::Constant,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Uniform => "uniform",
            Self::Varying => "varying",
            Self::Indexed => "indexed",
        }
    }
}

/// Deduplicating string storage.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: HashSet<Arc<str>>,
}

impl StringPool {
    /// Shared handle to `s`, inserting it on first use.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return existing.clone();
        }
        let handle: Arc<str> = Arc::from(s);
        self.strings.insert(handle.clone());
        handle
    }

    /// Number of unique strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn clear(&mut self) {
        self.strings.clear();
    }
}

/// Attribute values, one variant per renderer scalar type.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeData {
    Bool(Vec<bool>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Float(Vec<f32>),
    String(Vec<Arc<str>>),
}

impl AttributeData {
    pub fn empty(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Self::Bool(Vec::new()),
            ValueType::Int => Self::Int(Vec::new()),
            ValueType::UInt => Self::UInt(Vec::new()),
            ValueType::Float => Self::Float(Vec::new()),
            ValueType::String => Self::String(Vec::new()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::UInt(_) => ValueType::UInt,
            Self::Float(_) => ValueType::Float,
            Self::String(_) => ValueType::String,
        }
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn truncate(&mut self, n: usize) {
        match self {
            Self::Bool(v) => v.truncate(n),
            Self::Int(v) => v.truncate(n),
            Self::UInt(v) => v.truncate(n),
            Self::Float(v) => v.truncate(n),
            Self::String(v) => v.truncate(n),
        }
    }

    /// Resize to `n` scalars, filling with the type's default.
    fn resize_default(&mut self, n: usize, empty: &Arc<str>) {
        match self {
            Self::Bool(v) => v.resize(n, false),
            Self::Int(v) => v.resize(n, 0),
            Self::UInt(v) => v.resize(n, 0),
            Self::Float(v) => v.resize(n, 0.0),
            Self::String(v) => v.resize(n, empty.clone()),
        }
    }

    /// Gather scalar ranges: `out[k*dim..] = self[src[k]*dim..]`.
    fn gather(&self, dim: usize, src: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], dim: usize, src: &[usize]) -> Vec<T> {
            let mut out = Vec::with_capacity(src.len() * dim);
            for &s in src {
                out.extend_from_slice(&v[s * dim..(s + 1) * dim]);
            }
            out
        }
        match self {
            Self::Bool(v) => Self::Bool(pick(v, dim, src)),
            Self::Int(v) => Self::Int(pick(v, dim, src)),
            Self::UInt(v) => Self::UInt(pick(v, dim, src)),
            Self::Float(v) => Self::Float(pick(v, dim, src)),
            Self::String(v) => Self::String(pick(v, dim, src)),
        }
    }
}

/// Runtime-typed attribute buffer.
///
/// Holds `element_count * dim` scalars. Indexed vectors additionally carry an
/// index array whose entries all refer to existing elements.
pub struct TypedValueVector {
    data: AttributeData,
    pool: StringPool,
    usage: Option<Usage>,
    scope: AttrScope,
    dim: usize,
    is_array: bool,
    indices: Option<Vec<u32>>,
    source_type: DataType,
}

impl TypedValueVector {
    /// Empty constant vector.
    pub fn new(value_type: ValueType, dim: usize) -> Self {
        Self {
            data: AttributeData::empty(value_type),
            pool: StringPool::default(),
            usage: None,
            scope: AttrScope::Constant,
            dim: dim.max(1),
            is_array: false,
            indices: None,
            source_type: DataType::UNKNOWN,
        }
    }

    /// Wrap existing values. String values are re-interned into the new pool.
    pub fn from_data(data: AttributeData, dim: usize) -> Result<Self> {
        let dim = dim.max(1);
        if data.len() % dim != 0 {
            return Err(Error::other(format!(
                "{} scalars do not divide into elements of {dim}",
                data.len()
            )));
        }
        let mut v = Self::new(data.value_type(), dim);
        v.data = match data {
            AttributeData::String(strings) => {
                let interned = strings.iter().map(|s| v.pool.intern(s)).collect();
                AttributeData::String(interned)
            }
            other => other,
        };
        Ok(v)
    }

    pub fn from_floats(values: Vec<f32>, dim: usize) -> Result<Self> {
        Self::from_data(AttributeData::Float(values), dim)
    }

    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Self {
        let mut v = Self::new(ValueType::String, 1);
        let strings = values.iter().map(|s| v.pool.intern(s.as_ref())).collect();
        v.data = AttributeData::String(strings);
        v
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_scope(mut self, scope: AttrScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_array(mut self, is_array: bool) -> Self {
        self.is_array = is_array;
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Result<Self> {
        self.set_indices(Some(indices))?;
        Ok(self)
    }

    // === Accessors ===

    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.data.value_type()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Logical number of elements (not scalars).
    #[inline]
    pub fn element_count(&self) -> usize {
        self.data.len() / self.dim
    }

    #[inline]
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    pub fn set_usage(&mut self, usage: Option<Usage>) {
        self.usage = usage;
    }

    #[inline]
    pub fn scope(&self) -> AttrScope {
        self.scope
    }

    pub fn set_scope(&mut self, scope: AttrScope) {
        self.scope = scope;
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn set_array(&mut self, is_array: bool) {
        self.is_array = is_array;
    }

    /// Archive type the values were decoded from.
    pub fn source_type(&self) -> DataType {
        self.source_type
    }

    pub fn set_source_type(&mut self, data_type: DataType) {
        self.source_type = data_type;
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Number of indices, 0 when not indexed.
    pub fn indices_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    pub fn string_pool(&self) -> &StringPool {
        &self.pool
    }

    /// Replace the index array. Every index must refer to an existing element.
    pub fn set_indices(&mut self, indices: Option<Vec<u32>>) -> Result<()> {
        if let Some(idx) = &indices {
            let count = self.element_count();
            if let Some(&bad) = idx.iter().find(|&&i| i as usize >= count) {
                return Err(Error::InvalidIndex { index: bad, count });
            }
        }
        self.indices = indices;
        Ok(())
    }

    pub fn take_indices(&mut self) -> Option<Vec<u32>> {
        self.indices.take()
    }

    pub fn floats(&self) -> Option<&[f32]> {
        match &self.data {
            AttributeData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn ints(&self) -> Option<&[i32]> {
        match &self.data {
            AttributeData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn uints(&self) -> Option<&[u32]> {
        match &self.data {
            AttributeData::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn bools(&self) -> Option<&[bool]> {
        match &self.data {
            AttributeData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn strings(&self) -> Option<&[Arc<str>]> {
        match &self.data {
            AttributeData::String(v) => Some(v),
            _ => None,
        }
    }

    /// Element `i` of a 3-float vector.
    pub fn float3(&self, i: usize) -> Option<Vec3> {
        if self.dim != 3 {
            return None;
        }
        let v = self.floats()?.get(i * 3..i * 3 + 3)?;
        Some(Vec3::new(v[0], v[1], v[2]))
    }

    /// All elements of a 3-float vector.
    pub fn to_vec3s(&self) -> Option<Vec<Vec3>> {
        if self.dim != 3 {
            return None;
        }
        Some(crate::util::vec3s_from_flat(self.floats()?))
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.data.len() % self.dim != 0 {
            return Err(Error::other("value buffer is not a whole number of elements"));
        }
        if let Some(idx) = &self.indices {
            if self.scope == AttrScope::Constant {
                return Err(Error::other("constant attribute carries indices"));
            }
            let count = self.element_count();
            if let Some(&bad) = idx.iter().find(|&&i| i as usize >= count) {
                return Err(Error::InvalidIndex { index: bad, count });
            }
        }
        Ok(())
    }

    // === Mutation ===

    /// Replace all values. Strings are interned into this vector's pool.
    pub(crate) fn set_data(&mut self, data: AttributeData) {
        self.data = match data {
            AttributeData::String(strings) => {
                self.pool.clear();
                let interned = strings.iter().map(|s| self.pool.intern(s)).collect();
                AttributeData::String(interned)
            }
            other => other,
        };
    }

    pub(crate) fn intern(&mut self, s: &str) -> Arc<str> {
        self.pool.intern(s)
    }

    /// Resize to `count` elements, default-filling new ones.
    ///
    /// Indexed vectors cannot be resized.
    pub fn resize(&mut self, count: usize) -> Result<()> {
        if self.indices.is_some() {
            return Err(Error::IndexedResize);
        }
        let empty = self.pool.intern("");
        self.data.resize_default(count * self.dim, &empty);
        Ok(())
    }

    /// Copy `count` elements of `src` starting at `src_start` into this vector at `dst_start`.
    ///
    /// Both vectors must share value type and dimension, neither may be indexed,
    /// and both ranges must be in bounds.
    pub fn copy_range(&mut self, src: &TypedValueVector, src_start: usize, count: usize, dst_start: usize) -> Result<()> {
        if src.value_type() != self.value_type() || src.dim != self.dim {
            return Err(Error::TypeMismatch {
                expected: format!("{}[{}]", self.value_type(), self.dim),
                actual: format!("{}[{}]", src.value_type(), src.dim),
            });
        }
        if src.indices.is_some() || self.indices.is_some() {
            return Err(Error::other("cannot copy ranges of indexed attributes"));
        }
        if src_start + count > src.element_count() {
            return Err(Error::RangeOutOfBounds {
                start: src_start,
                end: src_start + count,
                count: src.element_count(),
            });
        }
        if dst_start + count > self.element_count() {
            return Err(Error::RangeOutOfBounds {
                start: dst_start,
                end: dst_start + count,
                count: self.element_count(),
            });
        }

        let (s0, s1) = (src_start * self.dim, (src_start + count) * self.dim);
        let d0 = dst_start * self.dim;
        let d1 = d0 + count * self.dim;
        match (&mut self.data, &src.data) {
            (AttributeData::Bool(d), AttributeData::Bool(s)) => d[d0..d1].copy_from_slice(&s[s0..s1]),
            (AttributeData::Int(d), AttributeData::Int(s)) => d[d0..d1].copy_from_slice(&s[s0..s1]),
            (AttributeData::UInt(d), AttributeData::UInt(s)) => d[d0..d1].copy_from_slice(&s[s0..s1]),
            (AttributeData::Float(d), AttributeData::Float(s)) => d[d0..d1].copy_from_slice(&s[s0..s1]),
            (AttributeData::String(d), AttributeData::String(s)) => {
                for (dst, src) in d[d0..d1].iter_mut().zip(&s[s0..s1]) {
                    *dst = self.pool.intern(src);
                }
            }
            _ => return Err(Error::other("value type mismatch")),
        }
        Ok(())
    }

    /// Collapse to a single constant element.
    ///
    /// Takes element 0 (through the index array when indexed) without checking
    /// that the other elements agree; differing values are silently dropped.
    pub fn promote_to_constant(&mut self) -> Result<()> {
        let first = match &self.indices {
            Some(idx) => idx.first().map(|&i| i as usize),
            None => (self.element_count() > 0).then_some(0),
        };
        let Some(first) = first else {
            return Err(Error::missing("cannot promote an empty attribute"));
        };
        self.data = self.data.gather(self.dim, &[first]);
        self.indices = None;
        self.scope = AttrScope::Constant;
        self.is_array = false;
        Ok(())
    }

    /// Resolve the index array into per-corner values.
    pub fn expand_indices(&mut self) {
        if let Some(idx) = self.indices.take() {
            let src: Vec<usize> = idx.iter().map(|&i| i as usize).collect();
            self.data = self.data.gather(self.dim, &src);
        }
    }

    /// Move element `i` to position `remap[i]`.
    ///
    /// `remap` must be a permutation of `0..element_count`.
    pub fn permute(&mut self, remap: &[usize]) -> Result<()> {
        let count = self.element_count();
        if remap.len() != count {
            return Err(Error::size_mismatch("remap", count, remap.len()));
        }
        let mut inverse = vec![usize::MAX; count];
        for (i, &r) in remap.iter().enumerate() {
            match inverse.get_mut(r) {
                Some(slot) if *slot == usize::MAX => *slot = i,
                _ => return Err(Error::other(format!("remap is not a permutation at {i}"))),
            }
        }
        self.data = self.data.gather(self.dim, &inverse);
        Ok(())
    }

    /// Release values, indices and strings. The vector stays usable but empty.
    pub fn release(&mut self) {
        self.data = AttributeData::empty(self.value_type());
        self.indices = None;
        self.pool.clear();
    }
}

impl fmt::Debug for TypedValueVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValueVector")
            .field("type", &self.value_type())
            .field("dim", &self.dim)
            .field("count", &self.element_count())
            .field("usage", &self.usage)
            .field("scope", &self.scope)
            .field("is_array", &self.is_array)
            .field("indices", &self.indices_count())
            .finish()
    }
}
