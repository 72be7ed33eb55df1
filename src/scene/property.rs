//! Property headers and raw samples, as handed over by the archive layer.

use bytemuck::Pod;
use half::f16;

use crate::core::{GeometryScope, SampledSource};
use crate::util::{AlembicPod, DataType, Error, PlainOldDataType, Result};

/// Storage kind of a property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PropertyKind {
    /// One element per sample.
    Scalar,
    /// Variable number of elements per sample.
    #[default]
    Array,
}

/// Everything the decoder needs to know about a property before reading it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyHeader {
    pub name: String,
    pub data_type: DataType,
    /// Semantic hint such as "point", "normal", "vector", "rgb", "rgba"
    pub interpretation: String,
    pub kind: PropertyKind,
    /// Present on geometry parameters only
    pub geometry_scope: Option<GeometryScope>,
    /// Array property that always holds exactly one element
    pub scalar_like: bool,
    /// 2D facevarying parameter flagged as not a UV set
    pub not_uv: bool,
}

impl PropertyHeader {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_geometry_param(&self) -> bool {
        self.geometry_scope.is_some()
    }

    /// Float32x2 facevarying geometry parameter not flagged `notUV`.
    pub fn is_uv(&self) -> bool {
        self.geometry_scope == Some(GeometryScope::FaceVarying)
            && self.data_type == DataType::VEC2F
            && !self.not_uv
    }
}

/// Raw scalars of one sample.
#[derive(Clone, Debug, PartialEq)]
pub enum PodBuffer {
    /// Little-endian packed scalars
    Bytes(Vec<u8>),
    Strings(Vec<String>),
}

/// One raw sample of a property: values, plus indices on indexed geometry params.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySample {
    pub data_type: DataType,
    pub values: PodBuffer,
    pub indices: Option<Vec<u32>>,
}

impl PropertySample {
    /// Sample from typed scalars.
    pub fn from_pod<T: AlembicPod>(extent: u8, values: &[T]) -> Self {
        Self {
            data_type: DataType::new(T::POD_TYPE, extent),
            values: PodBuffer::Bytes(bytemuck::cast_slice(values).to_vec()),
            indices: None,
        }
    }

    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            data_type: DataType::STRING,
            values: PodBuffer::Strings(values.iter().map(|s| s.as_ref().to_owned()).collect()),
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Number of scalars stored.
    pub fn num_scalars(&self) -> usize {
        match &self.values {
            PodBuffer::Bytes(b) => match self.data_type.pod.num_bytes() {
                0 => 0,
                n => b.len() / n,
            },
            PodBuffer::Strings(s) => s.len(),
        }
    }

    /// Number of elements (scalars / extent).
    pub fn num_elements(&self) -> usize {
        self.num_scalars() / (self.data_type.extent.max(1) as usize)
    }

    /// Copy the scalars out as `T`.
    ///
    /// `T` must match the sample's POD type exactly.
    pub fn scalars<T: AlembicPod>(&self) -> Result<Vec<T>> {
        if T::POD_TYPE != self.data_type.pod {
            return Err(Error::TypeMismatch {
                expected: T::POD_TYPE.name().to_owned(),
                actual: self.data_type.pod.name().to_owned(),
            });
        }
        self.collect_bytes::<T>()
    }

    fn collect_bytes<T: Pod>(&self) -> Result<Vec<T>> {
        match &self.values {
            PodBuffer::Bytes(b) if b.len() % std::mem::size_of::<T>() == 0 => {
                Ok(bytemuck::pod_collect_to_vec::<u8, T>(b))
            }
            PodBuffer::Bytes(b) => Err(Error::other(format!(
                "sample byte length {} is not a multiple of {}",
                b.len(),
                std::mem::size_of::<T>()
            ))),
            PodBuffer::Strings(_) => Err(Error::TypeMismatch {
                expected: "numeric".into(),
                actual: "string".into(),
            }),
        }
    }

    /// Numeric scalars widened to f64, whatever the source POD.
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        use PlainOldDataType as P;
        Ok(match self.data_type.pod {
            P::Boolean | P::Uint8 => self.collect_bytes::<u8>()?.into_iter().map(f64::from).collect(),
            P::Int8 => self.collect_bytes::<i8>()?.into_iter().map(f64::from).collect(),
            P::Uint16 => self.collect_bytes::<u16>()?.into_iter().map(f64::from).collect(),
            P::Int16 => self.collect_bytes::<i16>()?.into_iter().map(f64::from).collect(),
            P::Uint32 => self.collect_bytes::<u32>()?.into_iter().map(f64::from).collect(),
            P::Int32 => self.collect_bytes::<i32>()?.into_iter().map(f64::from).collect(),
            P::Uint64 => self.collect_bytes::<u64>()?.into_iter().map(|v| v as f64).collect(),
            P::Int64 => self.collect_bytes::<i64>()?.into_iter().map(|v| v as f64).collect(),
            P::Float16 => self.collect_bytes::<f16>()?.into_iter().map(f64::from).collect(),
            P::Float32 => self.collect_bytes::<f32>()?.into_iter().map(f64::from).collect(),
            P::Float64 => self.collect_bytes::<f64>()?,
            pod => return Err(Error::UnknownPod(pod)),
        })
    }

    /// Signed integers widened to i64.
    pub fn to_i64(&self) -> Result<Vec<i64>> {
        use PlainOldDataType as P;
        Ok(match self.data_type.pod {
            P::Int8 => self.collect_bytes::<i8>()?.into_iter().map(i64::from).collect(),
            P::Int16 => self.collect_bytes::<i16>()?.into_iter().map(i64::from).collect(),
            P::Int32 => self.collect_bytes::<i32>()?.into_iter().map(i64::from).collect(),
            P::Int64 => self.collect_bytes::<i64>()?,
            _ => self.to_u64()?.into_iter().map(|v| v as i64).collect(),
        })
    }

    /// Unsigned integers (and booleans) widened to u64.
    pub fn to_u64(&self) -> Result<Vec<u64>> {
        use PlainOldDataType as P;
        Ok(match self.data_type.pod {
            P::Boolean | P::Uint8 => self.collect_bytes::<u8>()?.into_iter().map(u64::from).collect(),
            P::Uint16 => self.collect_bytes::<u16>()?.into_iter().map(u64::from).collect(),
            P::Uint32 => self.collect_bytes::<u32>()?.into_iter().map(u64::from).collect(),
            P::Uint64 => self.collect_bytes::<u64>()?,
            pod => return Err(Error::UnknownPod(pod)),
        })
    }

    pub fn strings(&self) -> Option<&[String]> {
        match &self.values {
            PodBuffer::Strings(s) => Some(s),
            PodBuffer::Bytes(_) => None,
        }
    }

    /// Resolve the index array into per-element values.
    ///
    /// Samples without indices are returned unchanged.
    pub fn expanded(&self) -> Result<PropertySample> {
        let Some(indices) = &self.indices else {
            return Ok(self.clone());
        };

        let count = self.num_elements();
        let extent = self.data_type.extent.max(1) as usize;
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= count) {
            return Err(Error::InvalidIndex { index: bad, count });
        }

        let values = match &self.values {
            PodBuffer::Bytes(b) => {
                let stride = self.data_type.num_bytes();
                let mut out = Vec::with_capacity(indices.len() * stride);
                for &i in indices {
                    let start = i as usize * stride;
                    out.extend_from_slice(&b[start..start + stride]);
                }
                PodBuffer::Bytes(out)
            }
            PodBuffer::Strings(s) => {
                let mut out = Vec::with_capacity(indices.len() * extent);
                for &i in indices {
                    let start = i as usize * extent;
                    out.extend_from_slice(&s[start..start + extent]);
                }
                PodBuffer::Strings(out)
            }
        };

        Ok(PropertySample {
            data_type: self.data_type,
            values,
            indices: None,
        })
    }
}

/// Read access to one property of the scene.
///
/// Implementations wrap whatever archive reader the host uses; the crate only
/// ever sees headers, sample times and raw samples.
pub trait PropertyReader: SampledSource<Sample = PropertySample> + Send + Sync {
    fn header(&self) -> &PropertyHeader;

    fn name(&self) -> &str {
        &self.header().name
    }
}

/// Flat set of properties, e.g. a node's user properties or arbitrary geometry params.
#[derive(Default)]
pub struct PropertySet {
    properties: Vec<Box<dyn PropertyReader>>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: impl PropertyReader + 'static) {
        self.properties.push(Box::new(property));
    }

    pub fn with(mut self, property: impl PropertyReader + 'static) -> Self {
        self.push(property);
        self
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&dyn PropertyReader> {
        self.properties
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PropertyReader> {
        self.properties.iter().map(|p| p.as_ref())
    }
}

impl std::fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.properties.iter().map(|p| p.name()))
            .finish()
    }
}
