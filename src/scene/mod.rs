//! Inbound interface: what the archive layer hands to the converter.
//!
//! Properties are read through the [`PropertyReader`] trait. Shapes, transforms
//! and the hierarchy are held in a [`SceneGraph`] of [`SceneNode`]s.

mod property;
mod memory;
mod schema;
mod graph;

pub use property::{
    PodBuffer, PropertyHeader, PropertyKind, PropertyReader, PropertySample, PropertySet,
};
pub use memory::MemoryProperty;
pub use schema::{
    BasisType, CurvePeriodicity, CurveType, CurvesSample, MeshSample, PointsSample,
    SchemaSamples, XformSample,
};
pub use graph::{MeshNode, NodeId, NodeKind, SceneGraph, SceneNode};
