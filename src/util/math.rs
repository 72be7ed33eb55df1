//! Math type re-exports and the small helpers the motion code leans on.
//!
//! Matrices follow glam's column-vector convention: a node's world matrix is
//! `parent_world * local`, and points are transformed with `transform_point3`.

pub use glam::{DMat4, DVec3, Mat4, Vec2, Vec3};

/// Time value in seconds.
pub type Chrono = f64;

/// Two sample times closer than this are considered the same sample.
pub const TIME_EPSILON: Chrono = 0.0001;

/// Returns true when two times refer to the same sample.
#[inline]
pub fn same_time(a: Chrono, b: Chrono) -> bool {
    (a - b).abs() <= TIME_EPSILON
}

/// `(1 - blend) * a + blend * b`, evaluated in double precision.
#[inline]
pub fn lerp_vec3(a: Vec3, b: Vec3, blend: f64) -> Vec3 {
    let w0 = 1.0 - blend;
    DVec3::new(
        w0 * a.x as f64 + blend * b.x as f64,
        w0 * a.y as f64 + blend * b.y as f64,
        w0 * a.z as f64 + blend * b.z as f64,
    )
    .as_vec3()
}

/// Reinterpret a flat float slice as `Vec3`s.
///
/// Trailing scalars that do not fill a whole vector are ignored.
pub fn vec3s_from_flat(values: &[f32]) -> Vec<Vec3> {
    values
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect()
}

/// Flatten `Vec3`s back into scalars.
pub fn flat_from_vec3s(values: &[Vec3]) -> Vec<f32> {
    bytemuck::cast_slice::<Vec3, f32>(values).to_vec()
}

/// Build a matrix from 16 column-major scalars.
pub fn mat4_from_slice(values: &[f64]) -> Option<DMat4> {
    let arr: &[f64; 16] = values.get(..16)?.try_into().ok()?;
    Some(DMat4::from_cols_array(arr))
}

/// Transform positions in place.
pub fn transform_points(points: &mut [Vec3], m: &DMat4) {
    for p in points.iter_mut() {
        *p = m.transform_point3(p.as_dvec3()).as_vec3();
    }
}

/// Transform directions in place and renormalize them.
pub fn transform_normals(normals: &mut [Vec3], m: &DMat4) {
    for n in normals.iter_mut() {
        *n = m.transform_vector3(n.as_dvec3()).as_vec3().normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_vec3() {
        let a = Vec3::ZERO;
        let b = Vec3::new(10.0, 0.0, -10.0);
        assert_eq!(lerp_vec3(a, b, 0.0), a);
        assert_eq!(lerp_vec3(a, b, 0.25), Vec3::new(2.5, 0.0, -2.5));
    }

    #[test]
    fn test_same_time() {
        assert!(same_time(1.0, 1.00005));
        assert!(!same_time(1.0, 1.001));
    }

    #[test]
    fn test_flat_roundtrip() {
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let v = vec3s_from_flat(&flat);
        assert_eq!(v.len(), 2);
        assert_eq!(flat_from_vec3s(&v), flat[..6].to_vec());
    }

    #[test]
    fn test_transform_points() {
        let m = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let mut p = vec![Vec3::ZERO, Vec3::X];
        transform_points(&mut p, &m);
        assert_eq!(p[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p[1], Vec3::new(2.0, 2.0, 3.0));

        let mut n = vec![Vec3::new(0.0, 2.0, 0.0)];
        transform_normals(&mut n, &m);
        assert_eq!(n[0], Vec3::Y);
    }
}
