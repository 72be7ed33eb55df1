//! Utility types shared by every layer of the crate.
//!
//! - [`PlainOldDataType`] - scalar storage types
//! - [`DataType`] - POD + extent
//! - [`Error`] / [`Result`] - error handling
//! - Math re-exports from glam

mod pod;
mod data_type;
mod error;
mod math;

pub use pod::*;
pub use data_type::*;
pub use error::*;
pub use math::*;
