//! Motion blur keys and reference pose.
//!
//! - [`positions`] - per-key positions from blended samples or motion vectors
//! - [`points`] - point sets whose membership changes between samples
//! - [`normals`] - smooth per-point normals
//! - [`reference`] - Pref / Nref resolution

pub mod normals;
pub mod points;
pub mod positions;
pub mod reference;

pub use normals::smooth_normals;
pub use points::{extend_point_attributes, union_positions, IdUnion, PointSide};
pub use positions::{
    blend_keys, extrapolate, extrapolate_keys, flatten_keys, motion_vectors, MotionVectors, PositionKeys,
    ACCELERATION_NAMES, VELOCITY_NAMES,
};
pub use reference::{resolve_reference, shape_positions, ReferenceInputs, ReferenceOrigin, ReferencePose};
