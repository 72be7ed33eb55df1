//! Scope/Topology Resolver: checks attributes against the emitted primitive.

use crate::topology::PrimitiveTopology;
use crate::util::{Error, Result};

use super::{AttrScope, TypedValueVector};

/// Element count an attribute of `scope` must have on `topology`.
///
/// `None` for constant attributes, which are never size-checked.
pub fn expected_count(scope: AttrScope, topology: &PrimitiveTopology) -> Option<usize> {
    match scope {
        AttrScope::Constant => None,
        AttrScope::Uniform => Some(topology.primitive_count),
        AttrScope::Varying => Some(topology.point_count),
        AttrScope::Indexed => Some(topology.vertex_count),
    }
}

/// Check `vector` against `topology` and bring indexed data into target corner order.
///
/// - constant: always accepted
/// - uniform: one element per primitive
/// - varying: one element per point
/// - indexed: one index per corner, or one element per corner when not indexed
///
/// Accepted indexed vectors are remapped when the topology reordered corners.
pub fn reconcile(name: &str, vector: &mut TypedValueVector, topology: &PrimitiveTopology) -> Result<()> {
    let Some(expected) = expected_count(vector.scope(), topology) else {
        return Ok(());
    };

    let actual = match (vector.scope(), vector.indices()) {
        (AttrScope::Indexed, Some(idx)) => idx.len(),
        _ => vector.element_count(),
    };
    if actual != expected {
        return Err(Error::size_mismatch(name, expected, actual));
    }

    if vector.scope() == AttrScope::Indexed {
        if let Some(remap) = topology.source_to_target() {
            remap_indexed(vector, remap)?;
        }
    }
    Ok(())
}

/// Rewrite an indexed vector for a new corner order.
///
/// With indices: `new[remap[i]] = old[i]`. Without: the values themselves are
/// permuted and a `0..n` index array is synthesized.
pub fn remap_indexed(vector: &mut TypedValueVector, remap: &[usize]) -> Result<()> {
    match vector.take_indices() {
        Some(old) => {
            if old.len() != remap.len() {
                let count = old.len();
                vector.set_indices(Some(old))?;
                return Err(Error::size_mismatch("index remap", count, remap.len()));
            }
            let mut new = vec![0u32; old.len()];
            for (i, &idx) in old.iter().enumerate() {
                let slot = new.get_mut(remap[i]).ok_or_else(|| Error::other("remap target out of range"))?;
                *slot = idx;
            }
            vector.set_indices(Some(new))
        }
        None => {
            vector.permute(remap)?;
            let n = vector.element_count() as u32;
            vector.set_indices(Some((0..n).collect()))
        }
    }
}

/// Collapse to a constant, logging the promotion.
///
/// Element 0 is kept whatever the other elements hold.
pub fn promote(name: &str, vector: &mut TypedValueVector) -> Result<()> {
    vector.promote_to_constant()?;
    tracing::debug!("'{name}' promoted to constant attribute");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_tri(reverse: bool) -> PrimitiveTopology {
        // 2 faces, 5 points, 7 corners
        PrimitiveTopology::mesh(&[3, 4], &[0, 1, 2, 2, 1, 3, 4], 5, reverse).unwrap()
    }

    fn floats(n: usize, scope: AttrScope) -> TypedValueVector {
        TypedValueVector::from_floats((0..n).map(|i| i as f32).collect(), 1)
            .unwrap()
            .with_scope(scope)
    }

    #[test]
    fn test_reconcile_counts() {
        let topo = quad_tri(false);
        assert!(reconcile("c", &mut floats(42, AttrScope::Constant), &topo).is_ok());
        assert!(reconcile("u", &mut floats(2, AttrScope::Uniform), &topo).is_ok());
        assert!(reconcile("u", &mut floats(3, AttrScope::Uniform), &topo).is_err());
        assert!(reconcile("v", &mut floats(5, AttrScope::Varying), &topo).is_ok());
        assert!(matches!(
            reconcile("v", &mut floats(4, AttrScope::Varying), &topo),
            Err(Error::SizeMismatch { expected: 5, actual: 4, .. })
        ));
        assert!(reconcile("i", &mut floats(7, AttrScope::Indexed), &topo).is_ok());
        assert!(reconcile("i", &mut floats(6, AttrScope::Indexed), &topo).is_err());

        let mut indexed = floats(2, AttrScope::Indexed)
            .with_indices(vec![0, 1, 0, 1, 0, 1, 0])
            .unwrap();
        assert!(reconcile("i", &mut indexed, &topo).is_ok());
        let mut short = floats(7, AttrScope::Indexed).with_indices(vec![0, 1]).unwrap();
        assert!(reconcile("i", &mut short, &topo).is_err());
    }

    #[test]
    fn test_remap_indices() {
        let topo = quad_tri(true);
        let remap = topo.source_to_target().unwrap().to_vec();
        let old = vec![0, 1, 2, 3, 4, 5, 6];
        let mut v = floats(7, AttrScope::Indexed).with_indices(old.clone()).unwrap();
        reconcile("uv", &mut v, &topo).unwrap();
        let new = v.indices().unwrap();
        for i in 0..old.len() {
            assert_eq!(new[remap[i]], old[i]);
        }
    }

    #[test]
    fn test_remap_expanded_values_is_permutation() {
        let topo = quad_tri(true);
        let mut v = floats(7, AttrScope::Indexed);
        reconcile("n", &mut v, &topo).unwrap();
        assert_eq!(v.indices().unwrap(), &[0, 1, 2, 3, 4, 5, 6]);

        let mut values = v.floats().unwrap().to_vec();
        assert_eq!(values, vec![0.0, 2.0, 1.0, 3.0, 6.0, 5.0, 4.0]);
        values.sort_by(f32::total_cmp);
        assert_eq!(values, (0..7).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_promote() {
        let mut v = floats(3, AttrScope::Varying);
        promote("x", &mut v).unwrap();
        assert_eq!(v.scope(), AttrScope::Constant);
        assert_eq!(v.floats().unwrap(), &[0.0]);
        assert!(reconcile("x", &mut v, &quad_tri(false)).is_ok());
    }
}
