//! Sink Adapter: pushes finished attribute vectors into a renderer node.
//!
//! The renderer side is abstracted behind [`AttributeSink`], a name-keyed
//! declare/set surface. [`write_attribute`] owns the declaration and conflict
//! policy so every sink behaves the same way.

pub mod declaration;
pub mod memory;

pub use declaration::{Declaration, ParamType};
pub use memory::{MemorySink, StoredParam};

use crate::attr::{AttrScope, AttributeData, TypedValueVector};
use crate::util::{Error, Result};

/// Renderer node parameter surface.
///
/// Implementations never see the core's vectors, only plain value arrays
/// tagged with a renderer type.
pub trait AttributeSink {
    /// Existing user parameter declaration, if any.
    fn lookup(&self, name: &str) -> Option<Declaration>;

    /// Declare a user parameter.
    fn declare(&mut self, name: &str, declaration: Declaration) -> Result<()>;

    /// Set an array parameter holding `keys` motion keys of equal size.
    fn set_array(&mut self, name: &str, param_type: ParamType, keys: usize, values: &AttributeData) -> Result<()>;

    /// Set a single-valued parameter from the first element of `values`.
    fn set_scalar(&mut self, name: &str, param_type: ParamType, values: &AttributeData) -> Result<()>;
}

/// Result of [`write_attribute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// An existing declaration disagrees; nothing was changed.
    Rejected,
}

/// Value and index parameter names of an indexed attribute.
pub fn indexed_names(name: &str) -> (String, String) {
    (format!("{name}list"), format!("{name}idxs"))
}

/// Index array to emit for an indexed vector.
///
/// Missing indices are synthesized as `0..n`; a corner remap moves entry `i`
/// to `remap[i]`.
fn emitted_indices(vector: &TypedValueVector, remap: Option<&[usize]>) -> Result<Vec<u32>> {
    let source: Vec<u32> = match vector.indices() {
        Some(idx) => idx.to_vec(),
        None => (0..vector.element_count() as u32).collect(),
    };
    let Some(remap) = remap else {
        return Ok(source);
    };
    if remap.len() != source.len() {
        return Err(Error::size_mismatch("index remap", source.len(), remap.len()));
    }
    let mut out = vec![0u32; source.len()];
    for (i, &idx) in source.iter().enumerate() {
        *out.get_mut(remap[i]).ok_or_else(|| Error::other("remap target out of range"))? = idx;
    }
    Ok(out)
}

/// Write `vector` as user parameter `name`.
///
/// Declares the parameter when the node does not have it yet. When it does
/// and scope, type or array-ness differ, the write is skipped and
/// [`WriteOutcome::Rejected`] returned. Indexed attributes are written as
/// `<name>list` and `<name>idxs`; `remap` reorders their corners.
pub fn write_attribute(
    sink: &mut dyn AttributeSink,
    name: &str,
    vector: &TypedValueVector,
    remap: Option<&[usize]>,
) -> Result<WriteOutcome> {
    let declaration = Declaration::for_vector(vector)?;
    let indexed = vector.scope() == AttrScope::Indexed;
    let (list_name, idxs_name) = indexed_names(name);

    let existing = sink
        .lookup(name)
        .or_else(|| indexed.then(|| sink.lookup(&list_name)).flatten());
    match existing {
        None => sink.declare(name, declaration)?,
        Some(d) if d != declaration => {
            tracing::debug!("'{name}' already declared as '{d}', skipping '{declaration}' write");
            return Ok(WriteOutcome::Rejected);
        }
        Some(_) => {}
    }

    let param_type = declaration.param_type;
    match vector.scope() {
        AttrScope::Indexed => {
            let indices = emitted_indices(vector, remap)?;
            sink.set_array(&list_name, param_type, 1, vector.data())?;
            sink.set_array(&idxs_name, ParamType::UInt, 1, &AttributeData::UInt(indices))?;
        }
        AttrScope::Constant if !vector.is_array() => {
            if vector.element_count() == 0 {
                return Err(Error::missing(format!("'{name}' has no value")));
            }
            sink.set_scalar(name, param_type, vector.data())?;
        }
        _ => sink.set_array(name, param_type, 1, vector.data())?,
    }
    Ok(WriteOutcome::Written)
}

/// Write every attribute of a map, logging rejections and failures.
pub fn write_attributes<'a>(
    sink: &mut dyn AttributeSink,
    attributes: impl IntoIterator<Item = (&'a String, &'a TypedValueVector)>,
    remap: Option<&[usize]>,
) -> usize {
    let mut written = 0;
    for (name, vector) in attributes {
        match write_attribute(sink, name, vector, remap) {
            Ok(WriteOutcome::Written) => written += 1,
            Ok(WriteOutcome::Rejected) => tracing::warn!("Attribute '{name}' conflicts with an existing declaration"),
            Err(e) => tracing::warn!("Could not write attribute '{name}': {e}"),
        }
    }
    written
}
