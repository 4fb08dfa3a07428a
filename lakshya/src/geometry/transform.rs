//! Frame transform resolution.
//!
//! Transforms are looked up fresh for every point. The source publishes
//! live transforms (the base moves), so nothing here is cached.

use nalgebra::Vector4;
use tracing::{debug, error};

use crate::devices::TransformSource;
use crate::error::{ApproachError, Result};
use crate::types::{Point3, Transform4x4};

/// Apply a homogeneous transform to a point (w = 1).
#[inline]
pub fn apply_transform(transform: &Transform4x4, point: Point3) -> Point3 {
    let p = transform * Vector4::new(point.x, point.y, point.z, 1.0);
    Point3::new(p.x, p.y, p.z)
}

/// Express `point`, given in `from`, in frame `to`.
///
/// Fails with [`ApproachError::TransformUnavailable`] when the source knows
/// no path between the frames.
pub fn resolve(
    source: &mut dyn TransformSource,
    point: Point3,
    from: &str,
    to: &str,
) -> Result<Point3> {
    let Some(transform) = source.transform(from, to) else {
        error!("Unable to find transform from '{}' to '{}'", from, to);
        return Err(ApproachError::TransformUnavailable {
            from: from.to_string(),
            to: to.to_string(),
        });
    };

    let resolved = apply_transform(&transform, point);
    debug!(
        "Resolved ({:.3}, {:.3}, {:.3}) in '{}' -> ({:.3}, {:.3}, {:.3}) in '{}'",
        point.x, point.y, point.z, from, resolved.x, resolved.y, resolved.z, to
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mock::MockTransforms;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Rotation3, Translation3, Vector3};

    #[test]
    fn test_identity_transform() {
        let p = Point3::new(1.0, -2.0, 3.0);
        assert_eq!(apply_transform(&Transform4x4::identity(), p), p);
    }

    #[test]
    fn test_translation_and_rotation() {
        // Rotate 90° about z, then shift by (1, 0, 0.5)
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let transform =
            Translation3::new(1.0, 0.0, 0.5).to_homogeneous() * rotation.to_homogeneous();

        let p = apply_transform(&transform, Point3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_resolve_missing_transform() {
        let mut source = MockTransforms::new();
        let err = resolve(&mut source, Point3::default(), "camera", "base").unwrap_err();
        assert_eq!(
            err,
            ApproachError::TransformUnavailable {
                from: "camera".to_string(),
                to: "base".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_queries_every_time() {
        let source = MockTransforms::new();
        source.set("camera", "base", Translation3::new(0.0, 0.0, 1.0).to_homogeneous());
        let mut handle = source.clone();

        let first = resolve(&mut handle, Point3::default(), "camera", "base").unwrap();
        assert_eq!(first, Point3::new(0.0, 0.0, 1.0));

        // The frame moved between two lookups
        source.set("camera", "base", Translation3::new(2.0, 0.0, 1.0).to_homogeneous());
        let second = resolve(&mut handle, Point3::default(), "camera", "base").unwrap();
        assert_eq!(second, Point3::new(2.0, 0.0, 1.0));
        assert_eq!(source.lookups(), 2);
    }
}
