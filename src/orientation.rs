//! Orientation helpers shared by the agents.
//!
//! All functions are pure and never return NaN: degenerate inputs fall back to
//! the identity rotation or a normalized linear blend.

use glam::{Mat3, Quat, Vec3};

/// Above this quaternion dot product `sin(theta)` is too small to divide by,
/// and [`slerp`] blends linearly instead.
pub const SLERP_LINEAR_THRESHOLD: f32 = 0.9995;

/// Shortest rotation taking `reference` onto the direction of `direction`.
///
/// The rotation axis is `reference × direction` and the angle is the arccos of
/// the clamped dot product. A zero `direction` gives the identity; an
/// anti-parallel one gives a half turn about an axis perpendicular to
/// `reference`.
pub fn rotation_between(reference: Vec3, direction: Vec3) -> Quat {
    let Some(from) = reference.try_normalize() else {
        return Quat::IDENTITY;
    };
    let Some(to) = direction.try_normalize() else {
        return Quat::IDENTITY;
    };

    let cos_angle = from.dot(to).clamp(-1.0, 1.0);
    let axis = from.cross(to);
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, cos_angle.acos()),
        None if cos_angle > 0.0 => Quat::IDENTITY,
        None => Quat::from_axis_angle(from.any_orthonormal_vector(), std::f32::consts::PI),
    }
}

/// Spherical interpolation from `from` toward `to` by fraction `t`.
///
/// Takes the short path and blends linearly when the two orientations are
/// nearly coincident.
pub fn slerp(from: Quat, to: Quat, t: f32) -> Quat {
    let mut to = to;
    let mut dot = from.dot(to);
    if dot < 0.0 {
        to = -to;
        dot = -dot;
    }

    if dot > SLERP_LINEAR_THRESHOLD {
        return (from + (to - from) * t).normalize();
    }

    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let w_from = ((1.0 - t) * theta).sin() / sin_theta;
    let w_to = (t * theta).sin() / sin_theta;
    (from * w_from + to * w_to).normalize()
}

/// Quaternion for the rotation part of `m`.
pub fn from_matrix(m: Mat3) -> Quat {
    Quat::from_mat3(&m).normalize()
}

/// Signed angle in the XZ plane from `heading` to `direction`, in radians,
/// positive counter-clockwise about +Y. Zero when either has no horizontal
/// extent.
pub fn yaw_between(heading: Vec3, direction: Vec3) -> f32 {
    let h = glam::Vec2::new(heading.x, heading.z);
    let d = glam::Vec2::new(direction.x, direction.z);
    if h.length_squared() < f32::EPSILON || d.length_squared() < f32::EPSILON {
        return 0.0;
    }
    // Rotation about +Y maps z toward x, so measure in (z, x) order.
    let h = glam::Vec2::new(h.y, h.x);
    let d = glam::Vec2::new(d.y, d.x);
    h.perp_dot(d).atan2(h.dot(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quat_close(a: Quat, b: Quat, eps: f32) -> bool {
        a.dot(b).abs() > 1.0 - eps
    }

    #[test]
    fn test_rotation_between_maps_reference() {
        let dir = Vec3::new(1.0, 2.0, -0.5);
        let q = rotation_between(Vec3::Z, dir);
        let mapped = q * Vec3::Z;
        assert!(mapped.distance(dir.normalize()) < 1e-5);
    }

    #[test]
    fn test_rotation_between_degenerate_inputs() {
        assert_eq!(rotation_between(Vec3::Z, Vec3::ZERO), Quat::IDENTITY);
        assert_eq!(rotation_between(Vec3::Z, Vec3::Z * 4.0), Quat::IDENTITY);

        let flipped = rotation_between(Vec3::Z, -Vec3::Z);
        assert!((flipped * Vec3::Z).distance(-Vec3::Z) < 1e-5);
        assert!(!flipped.is_nan());
    }

    #[test]
    fn test_slerp_endpoints() {
        let a = Quat::from_rotation_y(0.2);
        let b = Quat::from_rotation_y(1.4);
        assert!(quat_close(slerp(a, b, 0.0), a, 1e-6));
        assert!(quat_close(slerp(a, b, 1.0), b, 1e-6));
    }

    #[test]
    fn test_slerp_halfway_angle() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_x(1.0);
        let mid = slerp(a, b, 0.5);
        assert!(quat_close(mid, Quat::from_rotation_x(0.5), 1e-6));
    }

    #[test]
    fn test_slerp_coincident_falls_back_to_linear() {
        let a = Quat::from_rotation_z(0.5);
        let b = Quat::from_rotation_z(0.5 + 1e-4);
        let q = slerp(a, b, 0.3);
        assert!(!q.is_nan());
        assert!((q.length() - 1.0).abs() < 1e-5);

        let same = slerp(a, a, 0.7);
        assert!(quat_close(same, a, 1e-6));
    }

    #[test]
    fn test_slerp_takes_short_path() {
        let a = Quat::from_rotation_y(0.1);
        let b = -Quat::from_rotation_y(0.3);
        let q = slerp(a, b, 0.5);
        assert!(quat_close(q, Quat::from_rotation_y(0.2), 1e-5));
    }

    #[test]
    fn test_from_matrix_returns_new_quat() {
        let q = Quat::from_rotation_y(0.75);
        let back = from_matrix(Mat3::from_quat(q));
        assert!(quat_close(back, q, 1e-6));
    }

    #[test]
    fn test_yaw_between() {
        let yaw = yaw_between(Vec3::Z, Vec3::X);
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        // The yaw rotation takes the heading onto the direction.
        let rotated = Quat::from_rotation_y(yaw) * Vec3::Z;
        assert!(rotated.distance(Vec3::X) < 1e-5);

        assert_eq!(yaw_between(Vec3::Z, Vec3::Y), 0.0);
    }
}
