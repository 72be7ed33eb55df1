//! Primitive Topology Descriptor.
//!
//! Counts every varying or indexed attribute is checked against, plus the
//! vertex maps used when the renderer's corner order differs from the archive's.

use crate::util::{Error, Result};

/// Point, corner and primitive counts of one emitted shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimitiveTopology {
    pub point_count: usize,
    /// Face corners (sum of per-face vertex counts)
    pub vertex_count: usize,
    /// Faces or curves
    pub primitive_count: usize,
    face_counts: Vec<u32>,
    /// Point index of each corner, in target order
    vertex_to_point: Vec<u32>,
    /// Target position of each source corner, when the order changed
    source_to_target: Option<Vec<usize>>,
}

impl PrimitiveTopology {
    /// Point cloud: one primitive per point, no corners.
    pub fn points(point_count: usize) -> Self {
        Self {
            point_count,
            vertex_count: 0,
            primitive_count: point_count,
            ..Default::default()
        }
    }

    /// Curves: one primitive per curve, corners are the control points.
    pub fn curves(num_vertices: &[i32], point_count: usize) -> Result<Self> {
        let mut total = 0usize;
        for &nv in num_vertices {
            total += usize::try_from(nv).map_err(|_| Error::other(format!("negative curve vertex count {nv}")))?;
        }
        if total != point_count {
            return Err(Error::size_mismatch("curve points", total, point_count));
        }
        Ok(Self {
            point_count,
            vertex_count: point_count,
            primitive_count: num_vertices.len(),
            face_counts: num_vertices.iter().map(|&n| n as u32).collect(),
            vertex_to_point: (0..point_count as u32).collect(),
            source_to_target: None,
        })
    }

    /// Polygon mesh.
    ///
    /// With `reverse_winding`, each face keeps its first corner and lists the
    /// rest backwards; the corner remap is recorded so face-varying data can
    /// follow.
    pub fn mesh(face_counts: &[i32], face_indices: &[i32], point_count: usize, reverse_winding: bool) -> Result<Self> {
        let mut counts = Vec::with_capacity(face_counts.len());
        for &nv in face_counts {
            counts.push(u32::try_from(nv).map_err(|_| Error::other(format!("negative face vertex count {nv}")))?);
        }
        let vertex_count: usize = counts.iter().map(|&n| n as usize).sum();
        if vertex_count != face_indices.len() {
            return Err(Error::size_mismatch("face indices", vertex_count, face_indices.len()));
        }
        for &pi in face_indices {
            if pi < 0 || pi as usize >= point_count {
                return Err(Error::InvalidIndex {
                    index: pi as u32,
                    count: point_count,
                });
            }
        }

        let source_to_target = reverse_winding.then(|| {
            let mut remap = Vec::with_capacity(vertex_count);
            let mut start = 0usize;
            for &nv in &counts {
                let nv = nv as usize;
                if nv == 0 {
                    continue;
                }
                remap.push(start);
                for k in 1..nv {
                    remap.push(start + nv - k);
                }
                start += nv;
            }
            remap
        });

        let mut vertex_to_point = vec![0u32; vertex_count];
        match &source_to_target {
            Some(remap) => {
                for (i, &pi) in face_indices.iter().enumerate() {
                    vertex_to_point[remap[i]] = pi as u32;
                }
            }
            None => {
                for (dst, &pi) in vertex_to_point.iter_mut().zip(face_indices) {
                    *dst = pi as u32;
                }
            }
        }

        let mut start = 0usize;
        for (f, &nv) in counts.iter().enumerate() {
            let corners = &face_indices[start..start + nv as usize];
            if corners.iter().enumerate().any(|(i, a)| corners[i + 1..].contains(a)) {
                tracing::warn!("Face {f} references the same point more than once");
            }
            start += nv as usize;
        }

        Ok(Self {
            point_count,
            vertex_count,
            primitive_count: counts.len(),
            face_counts: counts,
            vertex_to_point,
            source_to_target,
        })
    }

    /// Per-primitive corner counts (faces or curves).
    pub fn face_counts(&self) -> &[u32] {
        &self.face_counts
    }

    /// Point index of every corner, in target order.
    pub fn vertex_to_point(&self) -> &[u32] {
        &self.vertex_to_point
    }

    /// `remap[source_corner] = target_corner`, when the order changed.
    pub fn source_to_target(&self) -> Option<&[usize]> {
        self.source_to_target.as_deref()
    }

    /// Corner order differs from the archive's.
    pub fn is_reordered(&self) -> bool {
        self.source_to_target.is_some()
    }

    /// Offset of each primitive's first corner.
    pub fn face_starts(&self) -> Vec<usize> {
        let mut starts = Vec::with_capacity(self.face_counts.len());
        let mut acc = 0usize;
        for &n in &self.face_counts {
            starts.push(acc);
            acc += n as usize;
        }
        starts
    }
}
