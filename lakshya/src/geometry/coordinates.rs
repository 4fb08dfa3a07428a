//! Object pose resolution.
//!
//! An observation is either a pixel in the depth camera image or an
//! absolute world position. Pixels are back-projected with the depth
//! sample at that pixel and chained camera → base → world. Only x and y of
//! the world point are kept; objects are treated as planar.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::transform::resolve;
use crate::devices::{DepthSensor, TransformSource};
use crate::error::{ApproachError, Result};
use crate::types::{CameraIntrinsics, ObjectObservation, ObservedPoint, Pose2D};

/// Names of the frames used to place a pixel in the world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameIds {
    /// Depth camera optical frame (default: depth_center)
    #[serde(default = "default_camera_frame")]
    pub camera: String,

    /// Robot base frame (default: base_link)
    #[serde(default = "default_base_frame")]
    pub base: String,

    /// Map frame (default: map)
    #[serde(default = "default_world_frame")]
    pub world: String,
}

impl Default for FrameIds {
    fn default() -> Self {
        Self {
            camera: default_camera_frame(),
            base: default_base_frame(),
            world: default_world_frame(),
        }
    }
}

fn default_camera_frame() -> String {
    "depth_center".to_string()
}
fn default_base_frame() -> String {
    "base_link".to_string()
}
fn default_world_frame() -> String {
    "map".to_string()
}

/// Converts observations into world-frame object poses.
#[derive(Clone, Debug)]
pub struct CoordinateResolver {
    intrinsics: CameraIntrinsics,
    frames: FrameIds,
}

impl CoordinateResolver {
    pub fn new(intrinsics: CameraIntrinsics, frames: FrameIds) -> Self {
        Self { intrinsics, frames }
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    pub fn frames(&self) -> &FrameIds {
        &self.frames
    }

    /// Resolve the world pose of an observed object.
    ///
    /// `map_id` is copied onto the result; the heading is left at zero.
    pub fn resolve_object_pose(
        &self,
        observation: &ObjectObservation,
        depth: &mut dyn DepthSensor,
        transforms: &mut dyn TransformSource,
        map_id: &str,
    ) -> Result<Pose2D> {
        match observation.point {
            ObservedPoint::Absolute { x, y } => {
                debug!("Absolute object position ({:.2}, {:.2})", x, y);
                Ok(Pose2D::new(x, y, 0.0, map_id))
            }
            ObservedPoint::Pixel { u, v } => {
                let Some(image) = depth.depth_image() else {
                    error!("Depth image unavailable");
                    return Err(ApproachError::Sensor("depth image unavailable".to_string()));
                };
                let Some(depth_m) = image.sample(u, v) else {
                    error!("Invalid depth sample at pixel ({:.0}, {:.0})", u, v);
                    return Err(ApproachError::Sensor(format!(
                        "invalid depth at pixel ({:.0}, {:.0})",
                        u, v
                    )));
                };

                let in_camera = self.intrinsics.back_project(u, v, depth_m);
                let in_base = resolve(transforms, in_camera, &self.frames.camera, &self.frames.base)?;
                let in_world = resolve(transforms, in_base, &self.frames.base, &self.frames.world)?;

                debug!(
                    "Pixel ({:.0}, {:.0}) at {:.2}m -> world ({:.2}, {:.2})",
                    u, v, depth_m, in_world.x, in_world.y
                );
                Ok(Pose2D::new(in_world.x, in_world.y, 0.0, map_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mock::{MockDepthSensor, MockTransforms};
    use crate::types::{DepthImage, Transform4x4};
    use approx::assert_abs_diff_eq;
    use nalgebra::Translation3;

    fn make_intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            focal_x: 525.0,
            focal_y: 525.0,
            principal_x: 319.5,
            principal_y: 239.5,
        }
    }

    fn make_resolver() -> CoordinateResolver {
        CoordinateResolver::new(make_intrinsics(), FrameIds::default())
    }

    #[test]
    fn test_absolute_mode_skips_sensors() {
        let depth = MockDepthSensor::new(make_intrinsics());
        let transforms = MockTransforms::new();
        let obs = ObjectObservation::from_values("cup", &[2.0, 3.0, 0.7]).unwrap();

        let pose = make_resolver()
            .resolve_object_pose(&obs, &mut depth.clone(), &mut transforms.clone(), "map")
            .unwrap();

        assert_eq!(pose, Pose2D::new(2.0, 3.0, 0.0, "map"));
        assert_eq!(depth.frames_requested(), 0);
        assert_eq!(transforms.lookups(), 0);
    }

    #[test]
    fn test_pixel_mode_chains_transforms() {
        let depth = MockDepthSensor::new(make_intrinsics());
        depth.set_image(Some(DepthImage::filled(640, 480, 2.0)));
        let transforms = MockTransforms::new();
        transforms.set(
            "depth_center",
            "base_link",
            Translation3::new(0.1, 0.0, 1.2).to_homogeneous(),
        );
        transforms.set(
            "base_link",
            "map",
            Translation3::new(5.0, -1.0, 0.0).to_homogeneous(),
        );

        let obs = ObjectObservation::from_values("cup", &[319.5, 239.5]).unwrap();
        let pose = make_resolver()
            .resolve_object_pose(&obs, &mut depth.clone(), &mut transforms.clone(), "map")
            .unwrap();

        assert_abs_diff_eq!(pose.x, 5.1, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y, -1.0, epsilon = 1e-9);
        assert_eq!(transforms.lookups(), 2);
    }

    #[test]
    fn test_pixel_mode_matches_absolute_under_identity() {
        // Unit focal length, zero principal point and unit depth make the
        // back-projection the identity on (u, v)
        let intrinsics = CameraIntrinsics {
            focal_x: 1.0,
            focal_y: 1.0,
            principal_x: 0.0,
            principal_y: 0.0,
        };
        let resolver = CoordinateResolver::new(intrinsics, FrameIds::default());
        let depth = MockDepthSensor::new(intrinsics);
        depth.set_image(Some(DepthImage::filled(16, 16, 1.0)));
        let transforms = MockTransforms::new();
        transforms.set("depth_center", "base_link", Transform4x4::identity());
        transforms.set("base_link", "map", Transform4x4::identity());

        let pixel = ObjectObservation::from_values("cup", &[3.0, 7.0]).unwrap();
        let absolute = ObjectObservation::from_values("cup", &[3.0, 7.0, 0.0]).unwrap();

        let from_pixel = resolver
            .resolve_object_pose(&pixel, &mut depth.clone(), &mut transforms.clone(), "map")
            .unwrap();
        let from_absolute = resolver
            .resolve_object_pose(&absolute, &mut depth.clone(), &mut transforms.clone(), "map")
            .unwrap();

        assert_abs_diff_eq!(from_pixel.x, from_absolute.x, epsilon = 1e-12);
        assert_abs_diff_eq!(from_pixel.y, from_absolute.y, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_depth_image() {
        let depth = MockDepthSensor::new(make_intrinsics());
        let obs = ObjectObservation::from_values("cup", &[10.0, 10.0]).unwrap();

        let err = make_resolver()
            .resolve_object_pose(&obs, &mut depth.clone(), &mut MockTransforms::new(), "map")
            .unwrap_err();
        assert!(matches!(err, ApproachError::Sensor(_)));
    }

    #[test]
    fn test_invalid_depth_sample() {
        let depth = MockDepthSensor::new(make_intrinsics());
        depth.set_image(Some(DepthImage::filled(640, 480, 0.0)));
        let obs = ObjectObservation::from_values("cup", &[10.0, 10.0]).unwrap();

        let err = make_resolver()
            .resolve_object_pose(&obs, &mut depth.clone(), &mut MockTransforms::new(), "map")
            .unwrap_err();
        assert!(matches!(err, ApproachError::Sensor(_)));
    }

    #[test]
    fn test_missing_world_transform() {
        let depth = MockDepthSensor::new(make_intrinsics());
        depth.set_image(Some(DepthImage::filled(640, 480, 1.0)));
        let transforms = MockTransforms::new();
        transforms.set("depth_center", "base_link", Transform4x4::identity());

        let obs = ObjectObservation::from_values("cup", &[320.0, 240.0]).unwrap();
        let err = make_resolver()
            .resolve_object_pose(&obs, &mut depth.clone(), &mut transforms.clone(), "map")
            .unwrap_err();
        assert_eq!(
            err,
            ApproachError::TransformUnavailable {
                from: "base_link".to_string(),
                to: "map".to_string(),
            }
        );
    }
}
