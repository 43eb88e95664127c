//! Heading-relative pointing math.
//!
//! The indicator yaw is heading-relative. It lives in a gravity-aligned
//! frame whose +Y is up, whose -Z is the direction the device faces (the
//! heading `h`) and whose +X is the device's right. A yaw of zero points
//! straight ahead; the target's absolute azimuth only enters through
//! `t - h`. The session's gravity-and-heading alignment supplies the
//! vertical axis and makes `h` a true-north heading.
//!
//! Bearings turn clockwise when viewed from above, while a right-handed
//! rotation about +Y is counter-clockwise, so the yaw is the negated bearing.

use glam::{Quat, Vec3};

/// Polaris sits within a degree of the celestial pole, so true north.
pub const POLARIS_AZIMUTH_DEG: f64 = 0.0;

/// Direction the indicator mesh points before any rotation (device forward).
pub const INDICATOR_FORWARD: Vec3 = Vec3::NEG_Z;

/// Wrap any angle into [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap any angle into (-180, 180].
pub fn normalize_signed_degrees(angle: f64) -> f64 {
    let wrapped = normalize_degrees(angle);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Shortest signed turn from `heading_deg` to `target_azimuth_deg`,
/// clockwise positive, in (-180, 180].
pub fn relative_bearing(target_azimuth_deg: f64, heading_deg: f64) -> f64 {
    normalize_signed_degrees(target_azimuth_deg - heading_deg)
}

/// Yaw about the vertical axis in radians, right-handed (CCW positive).
pub fn bearing_to_yaw_radians(bearing_deg: f64) -> f32 {
    (-bearing_deg).to_radians() as f32
}

/// Absolute indicator orientation for a clockwise bearing. Pitch and roll
/// are always zero.
pub fn indicator_rotation(bearing_deg: f64) -> Quat {
    Quat::from_rotation_y(bearing_to_yaw_radians(bearing_deg))
}

/// Recover the clockwise bearing encoded in a yaw-only rotation.
pub fn rotation_to_bearing(rotation: Quat) -> f64 {
    let pointing = rotation * INDICATOR_FORWARD;
    // atan2(right, forward) is clockwise from forward
    let bearing = (pointing.x as f64).atan2(-(pointing.z as f64)).to_degrees();
    normalize_signed_degrees(bearing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-15) < 360.0);
    }

    #[test]
    fn test_signed_range() {
        assert_eq!(normalize_signed_degrees(180.0), 180.0);
        assert_eq!(normalize_signed_degrees(-180.0), 180.0);
        assert_eq!(normalize_signed_degrees(190.0), -170.0);
        assert_eq!(normalize_signed_degrees(-350.0), 10.0);
    }

    #[test]
    fn test_bearing_zero_when_facing_target() {
        for h in [0.0, 45.0, 123.4, 359.0] {
            assert_eq!(relative_bearing(h, h), 0.0);
        }
        assert_eq!(relative_bearing(POLARIS_AZIMUTH_DEG, 0.0), 0.0);
    }

    #[test]
    fn test_shortest_path_across_north() {
        assert_relative_eq!(relative_bearing(0.0, 350.0), 10.0, epsilon = 1e-9);
        assert_relative_eq!(relative_bearing(0.0, 10.0), -10.0, epsilon = 1e-9);
        assert_relative_eq!(relative_bearing(350.0, 10.0), -20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_periodic_and_shift_invariant() {
        let target = 37.0;
        for step in 0..36 {
            let h = step as f64 * 10.0;
            let base = relative_bearing(target, h);
            assert_relative_eq!(relative_bearing(target, h + 360.0), base, epsilon = 1e-9);
            assert_relative_eq!(relative_bearing(target, h - 720.0), base, epsilon = 1e-9);

            for delta in [15.0, 90.0, 270.0] {
                let shifted = relative_bearing(
                    normalize_degrees(target + delta),
                    normalize_degrees(h + delta),
                );
                assert_relative_eq!(shifted, base, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_rotation_points_clockwise_for_positive_bearing() {
        // A target 90° clockwise of where the device faces swings the arrow
        // from forward (-Z) to the right (+X)
        let right = indicator_rotation(90.0) * INDICATOR_FORWARD;
        assert_relative_eq!(right.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(right.z, 0.0, epsilon = 1e-6);

        let left = indicator_rotation(-90.0) * INDICATOR_FORWARD;
        assert_relative_eq!(left.x, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_is_yaw_only() {
        let q = indicator_rotation(63.0);
        let up = q * Vec3::Y;
        assert_relative_eq!(up.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(rotation_to_bearing(q), 63.0, epsilon = 1e-4);
    }

    #[test]
    fn test_zero_bearing_is_identity() {
        let q = indicator_rotation(0.0);
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }
}
