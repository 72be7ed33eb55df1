//! User attribute collection.
//!
//! Walks a shape's plain user properties and geometry parameters, decodes
//! each one and routes it to the level it will be emitted at. Failures are
//! logged and the attribute skipped; collection itself never fails.

use std::collections::BTreeMap;

use crate::config::ProceduralConfig;
use crate::core::GeometryScope;
use crate::scene::{PropertyReader, PropertySet};
use crate::topology::PrimitiveTopology;
use crate::util::Chrono;

use super::decode::{decode, decode_as, Layout};
use super::scope::{promote, reconcile};
use super::TypedValueVector;

/// Attributes keyed by their cleaned name.
pub type UserAttributes = BTreeMap<String, TypedValueVector>;

/// Level an attribute is emitted at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeLevel {
    Object,
    Primitive,
    Point,
    Vertex,
}

impl AttributeLevel {
    /// Natural level of a geometry parameter.
    pub fn from_scope(scope: GeometryScope) -> Self {
        match scope {
            GeometryScope::FaceVarying => Self::Vertex,
            GeometryScope::Varying | GeometryScope::Vertex => Self::Point,
            GeometryScope::Uniform => Self::Primitive,
            GeometryScope::Constant => Self::Object,
        }
    }

    fn enabled(self, config: &ProceduralConfig) -> bool {
        match self {
            Self::Object => config.read_object_attribs,
            Self::Primitive => config.read_primitive_attribs,
            Self::Point => config.read_point_attribs,
            Self::Vertex => config.read_vertex_attribs,
        }
    }
}

/// Decoded attributes of one shape, split by level.
#[derive(Debug, Default)]
pub struct AttributeLevels {
    pub object: UserAttributes,
    pub primitive: UserAttributes,
    pub point: UserAttributes,
    pub vertex: UserAttributes,
    /// Face-varying texture coordinate sets
    pub uv_sets: UserAttributes,
}

impl AttributeLevels {
    pub fn level(&self, level: AttributeLevel) -> &UserAttributes {
        match level {
            AttributeLevel::Object => &self.object,
            AttributeLevel::Primitive => &self.primitive,
            AttributeLevel::Point => &self.point,
            AttributeLevel::Vertex => &self.vertex,
        }
    }

    pub fn level_mut(&mut self, level: AttributeLevel) -> &mut UserAttributes {
        match level {
            AttributeLevel::Object => &mut self.object,
            AttributeLevel::Primitive => &mut self.primitive,
            AttributeLevel::Point => &mut self.point,
            AttributeLevel::Vertex => &mut self.vertex,
        }
    }

    pub fn len(&self) -> usize {
        self.object.len() + self.primitive.len() + self.point.len() + self.vertex.len() + self.uv_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every attribute with its level, UV sets excluded.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeLevel, &str, &TypedValueVector)> {
        [
            AttributeLevel::Object,
            AttributeLevel::Primitive,
            AttributeLevel::Point,
            AttributeLevel::Vertex,
        ]
        .into_iter()
        .flat_map(move |lvl| self.level(lvl).iter().map(move |(k, v)| (lvl, k.as_str(), v)))
    }
}

/// Pref and Nref are only read from the shape when the reference pose comes
/// from attributes; Nref is a corner attribute and Pref a point one.
fn is_unwanted_reference(name: &str, level: AttributeLevel, config: &ProceduralConfig) -> bool {
    if config.reads_reference_attributes() {
        return false;
    }
    match level {
        AttributeLevel::Point => name == config.pref_name || name == config.nref_name,
        AttributeLevel::Vertex => name == config.nref_name,
        _ => false,
    }
}

fn collect_one(
    property: &dyn PropertyReader,
    is_geometry_param: bool,
    t: Chrono,
    interpolate: bool,
    config: &ProceduralConfig,
    levels: &mut AttributeLevels,
) {
    let header = property.header();
    if config.is_ignored(&header.name) {
        return;
    }
    let name = config.clean_name(&header.name);
    if config.is_ignored(&name) {
        return;
    }

    let forced = config.is_forced_constant(&name);
    let natural = match (is_geometry_param, header.geometry_scope) {
        (true, Some(scope)) => AttributeLevel::from_scope(scope),
        _ => AttributeLevel::Object,
    };
    let level = if forced { AttributeLevel::Object } else { natural };
    if !level.enabled(config) || is_unwanted_reference(&name, natural, config) {
        return;
    }

    let uv = is_geometry_param && header.is_uv() && !forced;
    let decoded = if uv {
        decode_as(property, t, true, interpolate, Layout::UV)
    } else {
        decode(property, t, is_geometry_param, interpolate)
    };
    let mut vector = match decoded {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Skipping attribute '{}': {e}", header.name);
            return;
        }
    };

    if forced && natural != AttributeLevel::Object {
        if let Err(e) = promote(&name, &mut vector) {
            tracing::warn!("Skipping attribute '{name}': {e}");
            return;
        }
    }

    let target = if uv { &mut levels.uv_sets } else { levels.level_mut(level) };
    if target.contains_key(&name) {
        tracing::warn!("Duplicate attribute '{name}' (from '{}'), keeping the first", header.name);
        return;
    }
    target.insert(name, vector);
}

/// Decode and route every user property and geometry parameter of a shape.
///
/// Plain user properties land at object level. Geometry parameters go to
/// the level of their scope unless their name is forced constant, in which
/// case they are promoted and land at object level.
pub fn collect_user_attributes(
    user_props: Option<&PropertySet>,
    geom_params: Option<&PropertySet>,
    t: Chrono,
    interpolate: bool,
    config: &ProceduralConfig,
) -> AttributeLevels {
    let mut levels = AttributeLevels::default();
    if let Some(props) = user_props {
        for p in props.iter() {
            collect_one(p, false, t, interpolate, config, &mut levels);
        }
    }
    if let Some(params) = geom_params {
        for p in params.iter() {
            collect_one(p, true, t, interpolate, config, &mut levels);
        }
    }
    if config.verbose {
        tracing::debug!(
            "Collected {} object, {} primitive, {} point, {} vertex attributes and {} uv sets",
            levels.object.len(),
            levels.primitive.len(),
            levels.point.len(),
            levels.vertex.len(),
            levels.uv_sets.len()
        );
    }
    levels
}

/// Drop user attributes that would shadow built-in shape parameters.
pub fn remove_conflicting(levels: &mut AttributeLevels, reserved: &[&str]) {
    for name in reserved {
        for lvl in [
            AttributeLevel::Object,
            AttributeLevel::Primitive,
            AttributeLevel::Point,
            AttributeLevel::Vertex,
        ] {
            if levels.level_mut(lvl).remove(*name).is_some() {
                tracing::warn!("User attribute '{name}' conflicts with a built-in parameter, ignored");
            }
        }
        levels.uv_sets.remove(*name);
    }
}

/// Check every non-object attribute against `topology`, dropping the ones
/// that do not fit.
pub fn reconcile_levels(levels: &mut AttributeLevels, topology: &PrimitiveTopology) {
    let maps = [&mut levels.primitive, &mut levels.point, &mut levels.vertex, &mut levels.uv_sets];
    for map in maps {
        map.retain(|name, vector| match reconcile(name, vector, topology) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropping attribute '{name}': {e}");
                false
            }
        });
    }
}
