//! Attribute Decoder: raw property samples to [`TypedValueVector`]s.
//!
//! Decoding happens in two steps. [`classify`] maps a property's POD type,
//! extent and interpretation onto a renderer layout, then the samples
//! bracketing the target time are converted (and blended) into that layout.

use std::borrow::Cow;

use crate::core::{TimeSampleList, SampledSource};
use crate::scene::{PropertyHeader, PropertyKind, PropertyReader, PropertySample};
use crate::util::{Chrono, DataType, Error, PlainOldDataType, PodCategory, Result};

use super::{AttrScope, AttributeData, TypedValueVector, Usage, ValueType};

/// Renderer layout chosen for a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub value_type: ValueType,
    pub dim: usize,
    pub usage: Option<Usage>,
}

impl Layout {
    /// Texture coordinates: two plain floats, whatever the interpretation.
    pub const UV: Layout = Layout::new(ValueType::Float, 2, None);

    const fn new(value_type: ValueType, dim: usize, usage: Option<Usage>) -> Self {
        Self {
            value_type,
            dim,
            usage,
        }
    }
}

/// First of point / normal / vector found in the interpretation.
fn direction_usage(interpretation: &str) -> Option<Usage> {
    if interpretation.contains("point") {
        Some(Usage::Point)
    } else if interpretation.contains("normal") {
        Some(Usage::Normal)
    } else if interpretation.contains("vector") {
        Some(Usage::Vector)
    } else {
        None
    }
}

/// Map a property type onto a renderer layout.
///
/// Fails for combinations the renderer has no representation for; callers
/// treat that as "skip this attribute".
pub fn classify(data_type: DataType, interpretation: &str) -> Result<Layout> {
    use PlainOldDataType as P;

    let extent = data_type.extent as usize;
    let unsupported = || Error::unsupported(data_type, interpretation);
    let float = |dim, usage| Ok(Layout::new(ValueType::Float, dim, usage));

    match (data_type.pod.category(), data_type.pod) {
        (PodCategory::Bool, _) if extent == 1 => Ok(Layout::new(ValueType::Bool, 1, None)),
        (PodCategory::Signed, _) if extent == 1 => Ok(Layout::new(ValueType::Int, 1, None)),
        (PodCategory::Unsigned, _) if extent == 1 => Ok(Layout::new(ValueType::UInt, 1, None)),
        (PodCategory::String, _) if extent == 1 => Ok(Layout::new(ValueType::String, 1, None)),

        (PodCategory::Float, P::Float16) => match extent {
            1 => float(1, None),
            3 if interpretation.contains("rgb") => float(3, Some(Usage::Color)),
            4 if interpretation.contains("rgba") => float(4, Some(Usage::Color)),
            _ => Err(unsupported()),
        },

        (PodCategory::Float, P::Float32) => match extent {
            1 => float(1, None),
            2 => direction_usage(interpretation).map_or_else(|| Err(unsupported()), |u| float(2, Some(u))),
            3 => {
                if interpretation.contains("point") {
                    float(3, Some(Usage::Point))
                } else if interpretation.contains("rgb") {
                    float(3, Some(Usage::Color))
                } else if interpretation.contains("normal") {
                    float(3, Some(Usage::Normal))
                } else if interpretation.contains("vector") {
                    float(3, Some(Usage::Vector))
                } else {
                    Err(unsupported())
                }
            }
            4 if interpretation.contains("rgba") => float(4, Some(Usage::Color)),
            16 => float(16, Some(Usage::Matrix)),
            _ => Err(unsupported()),
        },

        (PodCategory::Float, P::Float64) => match extent {
            1 => float(1, None),
            2 | 3 => direction_usage(interpretation).map_or_else(|| Err(unsupported()), |u| float(extent, Some(u))),
            16 => float(16, Some(Usage::Matrix)),
            _ => Err(unsupported()),
        },

        (PodCategory::Unknown, pod) => Err(Error::UnknownPod(pod)),
        _ => Err(unsupported()),
    }
}

/// Boolean and string blends pick a side instead of mixing.
#[inline]
fn pick_upper(blend: f64) -> bool {
    blend >= 0.5
}

/// Sample scalars in a form every conversion can start from.
enum Column {
    Bool(Vec<bool>),
    Signed(Vec<i64>),
    Unsigned(Vec<u64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl Column {
    fn read(sample: &PropertySample, n: usize) -> Result<Self> {
        if sample.num_scalars() < n {
            return Err(Error::missing(format!(
                "sample holds {} scalars, {n} needed",
                sample.num_scalars()
            )));
        }
        let mut col = match sample.data_type.pod.category() {
            PodCategory::Bool => Self::Bool(sample.to_u64()?.into_iter().map(|v| v != 0).collect()),
            PodCategory::Signed => Self::Signed(sample.to_i64()?),
            PodCategory::Unsigned => Self::Unsigned(sample.to_u64()?),
            PodCategory::Float => Self::Float(sample.to_f64()?),
            PodCategory::String => Self::Str(sample.strings().map(<[String]>::to_vec).unwrap_or_default()),
            PodCategory::Unknown => return Err(Error::UnknownPod(sample.data_type.pod)),
        };
        col.truncate(n);
        Ok(col)
    }

    fn truncate(&mut self, n: usize) {
        match self {
            Self::Bool(v) => v.truncate(n),
            Self::Signed(v) => v.truncate(n),
            Self::Unsigned(v) => v.truncate(n),
            Self::Float(v) => v.truncate(n),
            Self::Str(v) => v.truncate(n),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Signed(v) => v.len(),
            Self::Unsigned(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    /// Numeric view; booleans read as 0/1.
    fn number(&self, i: usize) -> Option<f64> {
        match self {
            Self::Bool(v) => Some(if v[i] { 1.0 } else { 0.0 }),
            Self::Signed(v) => Some(v[i] as f64),
            Self::Unsigned(v) => Some(v[i] as f64),
            Self::Float(v) => Some(v[i]),
            Self::Str(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Signed(_) => "int",
            Self::Unsigned(_) => "uint",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

/// Convert `lower` (blended towards `upper` when given) into `dst`.
///
/// Numeric blends are linear in double precision. Booleans built from
/// booleans, and strings, pick one side; booleans built from numbers
/// threshold the blended value at 0.5.
fn convert(dst: ValueType, lower: &Column, upper: Option<(&Column, f64)>, out: &mut TypedValueVector) -> Result<AttributeData> {
    let n = lower.len();
    let mismatch = || Error::TypeMismatch {
        expected: dst.name().to_owned(),
        actual: lower.kind().to_owned(),
    };

    let numeric = |i: usize| -> Result<f64> {
        let v0 = lower.number(i).ok_or_else(mismatch)?;
        match upper {
            Some((up, b)) => {
                let v1 = up.number(i).ok_or_else(mismatch)?;
                Ok((1.0 - b) * v0 + b * v1)
            }
            None => Ok(v0),
        }
    };

    Ok(match dst {
        ValueType::Bool => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                let value = match (lower, upper) {
                    (Column::Bool(l), Some((Column::Bool(u), b))) => if pick_upper(b) { u[i] } else { l[i] },
                    (Column::Bool(l), _) => l[i],
                    (_, Some(_)) => numeric(i)? > 0.5,
                    (_, None) => numeric(i)? != 0.0,
                };
                v.push(value);
            }
            AttributeData::Bool(v)
        }
        ValueType::Int => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(match (lower, upper) {
                    (Column::Signed(l), None) => l[i] as i32,
                    (Column::Unsigned(l), None) => l[i] as i32,
                    _ => numeric(i)? as i32,
                });
            }
            AttributeData::Int(v)
        }
        ValueType::UInt => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(match (lower, upper) {
                    (Column::Unsigned(l), None) => l[i] as u32,
                    (Column::Signed(l), None) => l[i] as u32,
                    _ => numeric(i)? as u32,
                });
            }
            AttributeData::UInt(v)
        }
        ValueType::Float => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(numeric(i)? as f32);
            }
            AttributeData::Float(v)
        }
        ValueType::String => {
            let Column::Str(l) = lower else {
                return Err(mismatch());
            };
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                let s = match upper {
                    Some((Column::Str(u), b)) if pick_upper(b) => &u[i],
                    _ => &l[i],
                };
                v.push(out.intern(s));
            }
            AttributeData::String(v)
        }
    })
}

/// Drop indices from samples whose scope does not allow them.
fn scoped_sample<'a>(header: &PropertyHeader, sample: &'a PropertySample, scope: AttrScope) -> Result<Cow<'a, PropertySample>> {
    if sample.indices.is_none() || scope == AttrScope::Indexed {
        return Ok(Cow::Borrowed(sample));
    }
    tracing::warn!(
        "'{}': non-facevarying geometry parameter carries indices, expanding values",
        header.name
    );
    Ok(Cow::Owned(sample.expanded()?))
}

/// Decode already loaded samples at time `t`.
pub fn decode_samples(
    header: &PropertyHeader,
    samples: &TimeSampleList<PropertySample>,
    t: Chrono,
    is_geometry_param: bool,
    interpolate: bool,
) -> Result<TypedValueVector> {
    let layout = classify(header.data_type, &header.interpretation)?;
    decode_samples_as(header, samples, t, is_geometry_param, interpolate, layout)
}

/// Like [`decode_samples`] with a layout chosen by the caller.
pub fn decode_samples_as(
    header: &PropertyHeader,
    samples: &TimeSampleList<PropertySample>,
    t: Chrono,
    is_geometry_param: bool,
    interpolate: bool,
    layout: Layout,
) -> Result<TypedValueVector> {
    if header.data_type.pod.is_string() != (layout.value_type == ValueType::String) {
        return Err(Error::unsupported(header.data_type, &header.interpretation));
    }
    let bracket = samples.resolve(t)?;

    let scope = match (is_geometry_param, header.geometry_scope) {
        (true, Some(s)) => AttrScope::from_geometry(s),
        _ => AttrScope::Constant,
    };

    let lower = scoped_sample(header, &bracket.lower.data, scope)?;
    let available = lower.num_elements();

    let (count, is_array) = if is_geometry_param {
        (available, scope != AttrScope::Constant || available > 1)
    } else if header.kind == PropertyKind::Scalar || header.scalar_like {
        (1, false)
    } else {
        (available, true)
    };
    if count == 0 && !is_geometry_param && header.kind == PropertyKind::Scalar {
        return Err(Error::missing(format!("'{}' has an empty sample", header.name)));
    }

    let upper = match bracket.upper_if_blending() {
        Some(up) if interpolate => {
            let up = scoped_sample(header, &up.data, scope)?;
            (up.num_scalars() == lower.num_scalars()).then_some(up)
        }
        _ => None,
    };

    let n = count * layout.dim;
    let lower_col = Column::read(&lower, n)?;
    let upper_col = match &upper {
        Some(up) => Some(Column::read(up, n)?),
        None => None,
    };

    let mut out = TypedValueVector::new(layout.value_type, layout.dim)
        .with_scope(scope)
        .with_array(is_array);
    let data = convert(
        layout.value_type,
        &lower_col,
        upper_col.as_ref().map(|c| (c, bracket.blend)),
        &mut out,
    )?;
    out.set_data(data);
    out.set_usage(layout.usage);
    out.set_source_type(header.data_type);
    if scope == AttrScope::Indexed {
        out.set_indices(lower.indices.clone())?;
    }

    Ok(out)
}

/// Decode `property` at time `t`.
///
/// Loads the samples bracketing `t`, classifies the property, and converts the
/// lower sample (blended with the upper one when `interpolate` is set and both
/// have the same size). Plain properties always decode as constant.
#[tracing::instrument(level = "trace", skip_all, fields(name = %property.name()))]
pub fn decode(property: &dyn PropertyReader, t: Chrono, is_geometry_param: bool, interpolate: bool) -> Result<TypedValueVector> {
    if property.num_samples() == 0 {
        return Err(Error::missing(format!("'{}' has no samples", property.name())));
    }
    let mut samples = TimeSampleList::new();
    samples.update(property, t, t, false)?;
    decode_samples(property.header(), &samples, t, is_geometry_param, interpolate)
}

/// Decode `property` at time `t` into a fixed layout.
pub fn decode_as(
    property: &dyn PropertyReader,
    t: Chrono,
    is_geometry_param: bool,
    interpolate: bool,
    layout: Layout,
) -> Result<TypedValueVector> {
    if property.num_samples() == 0 {
        return Err(Error::missing(format!("'{}' has no samples", property.name())));
    }
    let mut samples = TimeSampleList::new();
    samples.update(property, t, t, false)?;
    decode_samples_as(property.header(), &samples, t, is_geometry_param, interpolate, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GeometryScope, TimeSampling};
    use crate::scene::MemoryProperty;
    use crate::util::Bool;
    use half::f16;

    fn dt(pod: PlainOldDataType, extent: u8) -> DataType {
        DataType::new(pod, extent)
    }

    #[test]
    fn test_classify_integers_and_strings() {
        use PlainOldDataType as P;
        assert_eq!(classify(dt(P::Boolean, 1), "").unwrap().value_type, ValueType::Bool);
        assert_eq!(classify(dt(P::Int8, 1), "").unwrap().value_type, ValueType::Int);
        assert_eq!(classify(dt(P::Int64, 1), "").unwrap().value_type, ValueType::Int);
        assert_eq!(classify(dt(P::Uint16, 1), "").unwrap().value_type, ValueType::UInt);
        assert_eq!(classify(dt(P::String, 1), "").unwrap().value_type, ValueType::String);
        for pod in [P::Boolean, P::Int32, P::Uint8, P::String] {
            assert!(classify(dt(pod, 2), "").is_err());
        }
        assert!(matches!(
            classify(dt(P::Unknown, 1), ""),
            Err(Error::UnknownPod(P::Unknown))
        ));
    }

    #[test]
    fn test_classify_floats() {
        use PlainOldDataType as P;
        let l = |pod, ext, interp: &str| classify(dt(pod, ext), interp).ok();

        assert_eq!(l(P::Float32, 3, "point"), Some(Layout::new(ValueType::Float, 3, Some(Usage::Point))));
        assert_eq!(l(P::Float32, 3, "rgb"), Some(Layout::new(ValueType::Float, 3, Some(Usage::Color))));
        assert_eq!(l(P::Float32, 3, "normal"), Some(Layout::new(ValueType::Float, 3, Some(Usage::Normal))));
        assert_eq!(l(P::Float32, 3, "vector"), Some(Layout::new(ValueType::Float, 3, Some(Usage::Vector))));
        assert_eq!(l(P::Float32, 3, ""), None);
        assert_eq!(l(P::Float32, 2, "vector"), Some(Layout::new(ValueType::Float, 2, Some(Usage::Vector))));
        assert_eq!(l(P::Float32, 2, ""), None);
        assert_eq!(l(P::Float32, 4, "rgba"), Some(Layout::new(ValueType::Float, 4, Some(Usage::Color))));
        assert_eq!(l(P::Float32, 4, "quat"), None);
        assert_eq!(l(P::Float32, 16, "anything"), Some(Layout::new(ValueType::Float, 16, Some(Usage::Matrix))));
        assert_eq!(l(P::Float32, 9, ""), None);

        assert_eq!(l(P::Float16, 1, ""), Some(Layout::new(ValueType::Float, 1, None)));
        assert_eq!(l(P::Float16, 3, "rgb"), Some(Layout::new(ValueType::Float, 3, Some(Usage::Color))));
        assert_eq!(l(P::Float16, 3, "point"), None);
        assert_eq!(l(P::Float16, 2, "vector"), None);

        assert_eq!(l(P::Float64, 3, "normal"), Some(Layout::new(ValueType::Float, 3, Some(Usage::Normal))));
        assert_eq!(l(P::Float64, 3, "rgb"), None);
        assert_eq!(l(P::Float64, 4, "rgba"), None);
        assert_eq!(l(P::Float64, 16, ""), Some(Layout::new(ValueType::Float, 16, Some(Usage::Matrix))));
    }

    fn two_samples() -> TimeSampling {
        TimeSampling::uniform(1.0, 0.0)
    }

    #[test]
    fn test_decode_point_array_roundtrip() {
        let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
        let p = MemoryProperty::new("rest", DataType::VEC3F)
            .interpretation("point")
            .sample(&values);
        let v = decode(&p, 0.0, false, true).unwrap();
        assert_eq!(v.value_type(), ValueType::Float);
        assert_eq!(v.usage(), Some(Usage::Point));
        assert_eq!(v.dim(), 3);
        assert_eq!(v.element_count(), 4);
        assert!(v.is_array());
        assert_eq!(v.scope(), AttrScope::Constant);
        assert_eq!(v.floats().unwrap(), values.as_slice());
    }

    #[test]
    fn test_decode_blend_numeric() {
        let p = MemoryProperty::new("w", DataType::FLOAT32)
            .geom_param(GeometryScope::Varying)
            .time_sampling(two_samples())
            .sample::<f32>(&[0.0, 10.0])
            .sample::<f32>(&[10.0, 20.0]);

        let v = decode(&p, 0.25, true, true).unwrap();
        assert_eq!(v.floats().unwrap(), &[2.5, 12.5]);
        assert_eq!(v.scope(), AttrScope::Varying);

        // interpolation off uses the lower sample only
        let v = decode(&p, 0.25, true, false).unwrap();
        assert_eq!(v.floats().unwrap(), &[0.0, 10.0]);
    }

    #[test]
    fn test_decode_blend_zero_is_exact() {
        let lower = [0.1f32, 0.2, 0.3];
        let p = MemoryProperty::new("x", DataType::FLOAT32)
            .geom_param(GeometryScope::Varying)
            .time_sampling(two_samples())
            .sample::<f32>(&lower)
            .sample::<f32>(&[7.0, 8.0, 9.0]);
        let v = decode(&p, 0.0, true, true).unwrap();
        assert_eq!(v.floats().unwrap(), &lower);
    }

    #[test]
    fn test_decode_size_change_skips_blend() {
        let p = MemoryProperty::new("x", DataType::FLOAT32)
            .geom_param(GeometryScope::Varying)
            .time_sampling(two_samples())
            .sample::<f32>(&[1.0, 1.0])
            .sample::<f32>(&[3.0, 3.0, 3.0]);
        let v = decode(&p, 0.5, true, true).unwrap();
        assert_eq!(v.floats().unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn test_bool_blend_tie_break() {
        let p = MemoryProperty::new("flag", DataType::BOOL)
            .scalar()
            .time_sampling(two_samples())
            .sample(&[Bool::FALSE])
            .sample(&[Bool::TRUE]);
        assert_eq!(decode(&p, 0.49999, false, true).unwrap().bools().unwrap(), &[false]);
        assert_eq!(decode(&p, 0.50001, false, true).unwrap().bools().unwrap(), &[true]);
        assert_eq!(decode(&p, 0.5, false, true).unwrap().bools().unwrap(), &[true]);
    }

    #[test]
    fn test_string_blend_tie_break() {
        let p = MemoryProperty::new("label", DataType::STRING)
            .scalar()
            .time_sampling(two_samples())
            .string_sample(&["before"])
            .string_sample(&["after"]);
        let lo = decode(&p, 0.49999, false, true).unwrap();
        let hi = decode(&p, 0.50001, false, true).unwrap();
        assert_eq!(&*lo.strings().unwrap()[0], "before");
        assert_eq!(&*hi.strings().unwrap()[0], "after");
        assert_eq!(hi.string_pool().len(), 1);
    }

    #[test]
    fn test_numeric_to_bool_threshold() {
        let lower = Column::Float(vec![0.0, 0.0]);
        let upper = Column::Float(vec![1.0, 1.0]);
        let mut out = TypedValueVector::new(ValueType::Bool, 1);
        let d = convert(ValueType::Bool, &lower, Some((&upper, 0.6)), &mut out).unwrap();
        assert_eq!(d, AttributeData::Bool(vec![true, true]));
        let d = convert(ValueType::Bool, &lower, Some((&upper, 0.4)), &mut out).unwrap();
        assert_eq!(d, AttributeData::Bool(vec![false, false]));
        let d = convert(ValueType::Bool, &upper, None, &mut out).unwrap();
        assert_eq!(d, AttributeData::Bool(vec![true, true]));
        assert!(convert(ValueType::String, &lower, None, &mut out).is_err());
    }

    #[test]
    fn test_decode_integers() {
        let p = MemoryProperty::new("id", DataType::new(PlainOldDataType::Int16, 1))
            .time_sampling(two_samples())
            .sample::<i16>(&[-4, 10])
            .sample::<i16>(&[4, 20]);
        let v = decode(&p, 0.5, false, true).unwrap();
        assert_eq!(v.ints().unwrap(), &[0, 15]);

        let p = MemoryProperty::new("n", DataType::UINT64).sample::<u64>(&[7]).scalar();
        let v = decode(&p, 0.0, false, true).unwrap();
        assert_eq!(v.uints().unwrap(), &[7]);
        assert!(!v.is_array());
    }

    #[test]
    fn test_decode_half_and_double() {
        let p = MemoryProperty::new("Cd", DataType::new(PlainOldDataType::Float16, 3))
            .interpretation("rgb")
            .sample(&[f16::from_f32(0.5), f16::from_f32(0.25), f16::from_f32(1.0)]);
        let v = decode(&p, 0.0, false, false).unwrap();
        assert_eq!(v.floats().unwrap(), &[0.5, 0.25, 1.0]);
        assert_eq!(v.usage(), Some(Usage::Color));

        let p = MemoryProperty::new("xf", DataType::MAT44D)
            .scalar()
            .sample(&[1.0f64; 16]);
        let v = decode(&p, 0.0, false, false).unwrap();
        assert_eq!(v.dim(), 16);
        assert_eq!(v.usage(), Some(Usage::Matrix));
        assert!(!v.is_array());
    }

    #[test]
    fn test_scalar_like_array() {
        let p = MemoryProperty::new("s", DataType::FLOAT32)
            .scalar_like()
            .sample::<f32>(&[3.0]);
        let v = decode(&p, 0.0, false, false).unwrap();
        assert_eq!(v.element_count(), 1);
        assert!(!v.is_array());
    }

    #[test]
    fn test_geom_param_scopes_and_arrays() {
        let con = MemoryProperty::new("c", DataType::FLOAT32)
            .geom_param(GeometryScope::Constant)
            .sample::<f32>(&[1.0]);
        let v = decode(&con, 0.0, true, false).unwrap();
        assert_eq!(v.scope(), AttrScope::Constant);
        assert!(!v.is_array());

        let con2 = MemoryProperty::new("c2", DataType::FLOAT32)
            .geom_param(GeometryScope::Constant)
            .sample::<f32>(&[1.0, 2.0]);
        assert!(decode(&con2, 0.0, true, false).unwrap().is_array());

        let uni = MemoryProperty::new("u", DataType::FLOAT32)
            .geom_param(GeometryScope::Uniform)
            .sample::<f32>(&[1.0]);
        let v = decode(&uni, 0.0, true, false).unwrap();
        assert_eq!(v.scope(), AttrScope::Uniform);
        assert!(v.is_array());

        let vtx = MemoryProperty::new("v", DataType::FLOAT32)
            .geom_param(GeometryScope::Vertex)
            .sample::<f32>(&[1.0]);
        assert_eq!(decode(&vtx, 0.0, true, false).unwrap().scope(), AttrScope::Varying);

        // plain properties ignore the geometry scope
        assert_eq!(decode(&uni, 0.0, false, false).unwrap().scope(), AttrScope::Constant);
    }

    #[test]
    fn test_indices_kept_only_for_facevarying() {
        let fv = MemoryProperty::new("st", DataType::VEC2F)
            .geom_param(GeometryScope::FaceVarying)
            .interpretation("vector")
            .indexed_sample::<f32>(&[0.0, 0.0, 1.0, 1.0], &[0, 1, 1, 0]);
        let v = decode(&fv, 0.0, true, false).unwrap();
        assert_eq!(v.scope(), AttrScope::Indexed);
        assert_eq!(v.element_count(), 2);
        assert_eq!(v.indices().unwrap(), &[0, 1, 1, 0]);

        let var = MemoryProperty::new("w", DataType::FLOAT32)
            .geom_param(GeometryScope::Varying)
            .indexed_sample::<f32>(&[5.0, 6.0], &[1, 1, 0]);
        let v = decode(&var, 0.0, true, false).unwrap();
        assert!(v.indices().is_none());
        assert_eq!(v.floats().unwrap(), &[6.0, 6.0, 5.0]);
    }

    #[test]
    fn test_decode_failures() {
        let p = MemoryProperty::new("q", DataType::VEC4D).sample(&[0.0f64; 4]);
        assert!(matches!(decode(&p, 0.0, false, false), Err(Error::UnsupportedType { .. })));

        let empty = MemoryProperty::new("e", DataType::FLOAT32);
        assert!(matches!(decode(&empty, 0.0, false, false), Err(Error::MissingData(_))));
    }

    #[test]
    fn test_decode_uv_layout() {
        let uv = MemoryProperty::new("uv", DataType::VEC2F)
            .geom_param(GeometryScope::FaceVarying)
            .indexed_sample::<f32>(&[0.0, 0.5, 1.0, 1.0], &[1, 0, 1]);
        assert!(decode(&uv, 0.0, true, false).is_err());
        let v = decode_as(&uv, 0.0, true, false, Layout::UV).unwrap();
        assert_eq!(v.dim(), 2);
        assert_eq!(v.usage(), None);
        assert_eq!(v.indices().unwrap(), &[1, 0, 1]);

        let names = MemoryProperty::new("n", DataType::STRING).string_sample(&["a"]);
        assert!(decode_as(&names, 0.0, false, false, Layout::UV).is_err());
    }
}
