//! Smooth per-point normals.

use crate::topology::PrimitiveTopology;
use crate::util::{Error, Result, Vec3};

/// Area-weighted smooth normals, one per point.
///
/// Face normals are summed from the centroid fan of each face and
/// accumulated on the face's points unnormalized, so larger faces weigh more.
/// A reversed corner order flips the cross product so normals keep facing
/// the same side.
pub fn smooth_normals(positions: &[Vec3], topology: &PrimitiveTopology) -> Result<Vec<Vec3>> {
    let reversed = topology.is_reordered();
    if positions.len() != topology.point_count {
        return Err(Error::size_mismatch("smooth normal positions", topology.point_count, positions.len()));
    }
    let corners = topology.vertex_to_point();
    let mut normals = vec![Vec3::ZERO; positions.len()];

    let mut start = 0usize;
    for &nv in topology.face_counts() {
        let nv = nv as usize;
        if nv == 0 {
            continue;
        }
        let face = &corners[start..start + nv];
        start += nv;

        let centroid = face.iter().map(|&p| positions[p as usize]).sum::<Vec3>() / nv as f32;
        let mut face_normal = Vec3::ZERO;
        for k in 0..nv {
            let e0 = positions[face[k] as usize] - centroid;
            let e1 = positions[face[(k + 1) % nv] as usize] - centroid;
            face_normal += if reversed { e0.cross(e1) } else { e1.cross(e0) };
        }
        for &p in face {
            normals[p as usize] += face_normal;
        }
    }

    for n in &mut normals {
        if n.length_squared() > 0.0 {
            *n = n.normalize();
        }
    }
    Ok(normals)
}
