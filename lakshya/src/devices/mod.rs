//! Capability interfaces consumed by the approach pipeline.
//!
//! Each external service is a narrow trait injected into the controller at
//! construction, so the core never depends on how a device is opened or
//! reached. All calls are blocking from the caller's point of view.

pub mod mock;

use crate::error::Result;
use crate::types::{
    ApproachOutput, CameraIntrinsics, DepthImage, NavigationStatus, ObjectObservation, Pose2D,
    Transform4x4,
};

/// 2D navigation server.
pub trait Navigation: Send {
    /// Current robot pose in the navigation map.
    fn current_position(&mut self) -> Result<Pose2D>;

    /// Send the base to an absolute pose.
    fn goto_absolute(&mut self, target: &Pose2D) -> Result<()>;

    fn status(&mut self) -> Result<NavigationStatus>;

    fn stop(&mut self) -> Result<()>;
}

/// Source of live frame transforms.
pub trait TransformSource: Send {
    /// Transform taking points expressed in `from` into `to`, or `None` when
    /// no chain between the two frames is known.
    fn transform(&mut self, from: &str, to: &str) -> Option<Transform4x4>;
}

/// RGB-D camera, depth stream only.
pub trait DepthSensor: Send {
    /// Latest depth frame, or `None` when no frame is available.
    fn depth_image(&mut self) -> Option<DepthImage>;

    /// Intrinsics of the depth stream, queried once at startup.
    fn intrinsics(&mut self) -> Result<CameraIntrinsics>;
}

/// Head gaze controller.
pub trait Gaze: Send {
    /// Fire-and-forget angular positioning command.
    fn set_angular_target(&mut self, pan_deg: f64, tilt_deg: f64);
}

/// Reply to a synchronous presence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinderReply {
    NotFound,
    /// Anything other than "not found"; the payload is the raw reply.
    Seen(String),
}

/// External object finder.
pub trait ObjectFinder: Send {
    /// Synchronous "where is `label`" query.
    ///
    /// `Err` means the finder could not be reached, not that the object is
    /// absent.
    fn query(&mut self, label: &str) -> Result<FinderReply>;

    /// Non-blocking read of the next detection batch from the result channel.
    fn take_detections(&mut self) -> Option<Vec<ObjectObservation>>;
}

/// Downstream consumer of approach results.
pub trait OutputSink: Send {
    fn emit(&mut self, output: ApproachOutput);
}

/// The full set of collaborators the controller needs.
pub struct Devices {
    pub navigation: Box<dyn Navigation>,
    pub transforms: Box<dyn TransformSource>,
    pub depth: Box<dyn DepthSensor>,
    pub gaze: Box<dyn Gaze>,
    pub finder: Box<dyn ObjectFinder>,
    pub output: Box<dyn OutputSink>,
}
