//! Scene node hierarchy: parents, transforms, visibility and instancing.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::core::SampledSource;
use crate::util::{Chrono, DMat4, Error, Result};

use super::{
    CurvesSample, MeshSample, PointsSample, PropertyReader, PropertySet, SchemaSamples,
    XformSample,
};

/// Index of a node inside its [`SceneGraph`].
pub type NodeId = usize;

/// Polygon or subdivision mesh data of a node.
pub struct MeshNode {
    pub samples: SchemaSamples<MeshSample>,
    /// Built-in normals geometry parameter
    pub normals: Option<Box<dyn PropertyReader>>,
    /// Built-in UV geometry parameter
    pub uvs: Option<Box<dyn PropertyReader>>,
}

impl MeshNode {
    pub fn new(samples: SchemaSamples<MeshSample>) -> Self {
        Self {
            samples,
            normals: None,
            uvs: None,
        }
    }

    pub fn with_normals(mut self, normals: impl PropertyReader + 'static) -> Self {
        self.normals = Some(Box::new(normals));
        self
    }

    pub fn with_uvs(mut self, uvs: impl PropertyReader + 'static) -> Self {
        self.uvs = Some(Box::new(uvs));
        self
    }
}

/// What a node holds.
pub enum NodeKind {
    Group,
    Xform(SchemaSamples<XformSample>),
    PolyMesh(MeshNode),
    SubD(MeshNode),
    Points(SchemaSamples<PointsSample>),
    Curves(SchemaSamples<CurvesSample>),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Xform(_) => "xform",
            Self::PolyMesh(_) => "polymesh",
            Self::SubD(_) => "subd",
            Self::Points(_) => "points",
            Self::Curves(_) => "curves",
        }
    }

    pub fn is_shape(&self) -> bool {
        !matches!(self, Self::Group | Self::Xform(_))
    }
}

/// One node of the hierarchy.
pub struct SceneNode {
    pub name: String,
    /// Full path, e.g. `/root/geo/body`
    pub path: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub visible: bool,
    /// Arbitrary user properties (always object level)
    pub user_properties: PropertySet,
    /// Arbitrary geometry parameters
    pub geom_params: PropertySet,
    /// Node this one instances, if any
    pub instance_source: Option<NodeId>,
}

/// Node arena with path lookup. Node 0 is the root.
pub struct SceneGraph {
    name: String,
    nodes: Vec<SceneNode>,
    by_path: HashMap<String, NodeId>,
}

impl SceneGraph {
    pub const ROOT: NodeId = 0;

    pub fn new(name: impl Into<String>) -> Self {
        let root = SceneNode {
            name: String::new(),
            path: "/".into(),
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Group,
            visible: true,
            user_properties: PropertySet::new(),
            geom_params: PropertySet::new(),
            instance_source: None,
        };
        Self {
            name: name.into(),
            nodes: vec![root],
            by_path: HashMap::from([("/".to_owned(), Self::ROOT)]),
        }
    }

    /// Archive name or path this graph was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Add a child node and return its id.
    pub fn add(&mut self, parent: NodeId, name: impl Into<String>, kind: NodeKind) -> Result<NodeId> {
        let name = name.into();
        let parent_path = &self
            .nodes
            .get(parent)
            .ok_or_else(|| Error::NodeNotFound(format!("#{parent}")))?
            .path;
        let path = if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        };
        if self.by_path.contains_key(&path) {
            return Err(Error::other(format!("duplicate node path {path}")));
        }

        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            name,
            path: path.clone(),
            parent: Some(parent),
            children: Vec::new(),
            kind,
            visible: true,
            user_properties: PropertySet::new(),
            geom_params: PropertySet::new(),
            instance_source: None,
        });
        self.nodes[parent].children.push(id);
        self.by_path.insert(path, id);
        Ok(id)
    }

    /// Add a node instancing `source`.
    pub fn add_instance(&mut self, parent: NodeId, name: impl Into<String>, source: NodeId) -> Result<NodeId> {
        if source >= self.nodes.len() {
            return Err(Error::NodeNotFound(format!("#{source}")));
        }
        let id = self.add(parent, name, NodeKind::Group)?;
        self.nodes[id].instance_source = Some(source);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// Follow instance links down to the node that owns the data.
    pub fn resolve_instance(&self, mut id: NodeId) -> NodeId {
        // bounded in case of a cyclic instance chain
        for _ in 0..self.nodes.len() {
            match self.nodes.get(id).and_then(|n| n.instance_source) {
                Some(src) => id = src,
                None => break,
            }
        }
        id
    }

    /// A node is visible when it and all of its ancestors are.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur.and_then(|i| self.nodes.get(i)) {
            if !n.visible {
                return false;
            }
            cur = n.parent;
        }
        true
    }

    /// Inherits flag of an xform node, taken from its first sample.
    ///
    /// The flag is not animatable; when samples disagree the first one wins.
    pub fn inherits_xforms(&self, id: NodeId) -> bool {
        let Some(NodeKind::Xform(samples)) = self.nodes.get(id).map(|n| &n.kind) else {
            return true;
        };
        let Some(first) = samples.get(0) else {
            return true;
        };
        let animated = (1..samples.num_samples())
            .filter_map(|i| samples.get(i))
            .any(|s| s.inherits != first.inherits);
        if animated {
            tracing::warn!(
                "Animated inherits flag on '{}', using first sample",
                self.nodes[id].path
            );
        }
        first.inherits
    }

    /// Local matrix of an xform node at `time` (nearest sample).
    pub fn local_matrix(&self, id: NodeId, time: Chrono) -> Option<DMat4> {
        let NodeKind::Xform(samples) = &self.nodes.get(id)?.kind else {
            return None;
        };
        let n = samples.num_samples();
        if n == 0 {
            return None;
        }
        let (index, _) = samples.time_sampling().near_index(time, n);
        samples.get(index).map(|s| s.matrix)
    }

    /// World matrix of `id` at `time`.
    ///
    /// Walks up the ancestry multiplying xform matrices; a node that does not
    /// inherit stops the walk after contributing its own matrix.
    pub fn world_matrix(&self, id: NodeId, time: Chrono) -> Result<DMat4> {
        if id >= self.nodes.len() {
            return Err(Error::NodeNotFound(format!("#{id}")));
        }

        let mut chain: SmallVec<[DMat4; 8]> = SmallVec::new();
        let mut cur = Some(id);
        while let Some(i) = cur {
            if let Some(m) = self.local_matrix(i, time) {
                chain.push(m);
                if !self.inherits_xforms(i) {
                    break;
                }
            }
            cur = self.nodes[i].parent;
        }

        Ok(chain.iter().fold(DMat4::IDENTITY, |world, local| *local * world))
    }

    /// World matrix of the transform a shape hangs under.
    pub fn parent_world_matrix(&self, id: NodeId, time: Chrono) -> Result<DMat4> {
        match self.nodes.get(id).and_then(|n| n.parent) {
            Some(parent) => self.world_matrix(parent, time),
            None => Ok(DMat4::IDENTITY),
        }
    }
}
