//! # Alembic procedural core
//!
//! Attribute resampling and resolution for turning Alembic scene data into
//! renderer-native geometry. Given a scene (read through the [`scene`]
//! interfaces) and a render time, it decodes every attribute at the right
//! time, checks it against the emitted primitive, builds motion keyed
//! positions and a reference pose, then writes everything to a renderer
//! node through an [`sink::AttributeSink`].
//!
//! ## Modules
//!
//! - [`util`] - POD types, errors, math
//! - [`core`] - time sampling and the bracketing sample lookup
//! - [`scene`] - inbound property and scene graph interfaces
//! - [`attr`] - typed value vectors, decoding, scope checks, attribute collection
//! - [`topology`] - primitive counts and winding remap
//! - [`motion`] - motion keys, point unions, reference pose
//! - [`sink`] - renderer parameter surface and declaration policy
//! - [`shapes`] - mesh, subdivision, points and curves builders
//! - [`session`] - state shared by concurrent expansions
//! - [`config`] - converter settings
//! - [`logging`] - tracing subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use alembic_procedural::prelude::*;
//!
//! let config = ProceduralConfig::load("procedural.json")?;
//! let ctx = ShapeContext::new(&graph, &config);
//! let mut sink = MemorySink::new();
//!
//! if let Some(shape) = build_shape(&ctx, node_id, &mut sink)? {
//!     println!("{} -> {} points", shape.path, shape.point_count);
//! }
//!
//! // instances resolve to the node their source was first emitted as
//! let mut memo = FrameMemo::new(config.render_time);
//! match visit_shape(&ctx, instance_id, "copy", &mut memo, &mut sink)? {
//!     Some(ShapeVisit::Instance { master, .. }) => println!("instance of {master}"),
//!     Some(ShapeVisit::Built { name, .. }) => println!("built {name}"),
//!     None => {}
//! }
//! ```

pub mod util;
pub mod core;
pub mod scene;
pub mod attr;
pub mod topology;
pub mod motion;
pub mod sink;
pub mod shapes;
pub mod session;
pub mod config;
pub mod logging;

pub use util::{DataType, Error, PlainOldDataType, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::attr::{AttrScope, AttributeData, TypedValueVector, Usage, ValueType};
    pub use crate::config::{ProceduralConfig, ReferenceSource};
    pub use crate::core::{GeometryScope, TimeSampleList, TimeSampling};
    pub use crate::scene::{MemoryProperty, NodeKind, PropertyReader, PropertySet, SceneGraph};
    pub use crate::session::{FrameMemo, RenderSession};
    pub use crate::shapes::{build_shape, visit_shape, BsplineResampler, ShapeContext, ShapeSummary, ShapeVisit};
    pub use crate::sink::{write_attribute, AttributeSink, MemorySink, WriteOutcome};
    pub use crate::topology::PrimitiveTopology;
    pub use crate::util::{DataType, Error, PlainOldDataType, Result};
}
