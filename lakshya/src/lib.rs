//! # Lakshya
//!
//! Object approach behavior for a mobile robot with a depth camera and a
//! movable head.
//!
//! Given an object label and where it was seen (a depth-image pixel or an
//! absolute map position), the robot:
//!
//! 1. resolves the object's position in the map frame,
//! 2. drives to a standoff pose `safe_distance` away from it, facing it,
//!    trying other poses around the object when navigation aborts,
//! 3. scans with its head until the object finder sees the object again,
//! 4. reports the object's image coordinates, or "object lost".
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lakshya::{ApproachController, ApproachThread, LakshyaConfig};
//!
//! let config = LakshyaConfig::default();
//! let (controller, handle) = ApproachController::with_handle(&config, devices)?;
//! let thread = ApproachThread::spawn(controller, config.period(), running)?;
//!
//! handle.start("cup", &[320.0, 240.0])?;
//! ```
//!
//! ## Coordinate System
//!
//! Map poses use x/y in meters and headings in degrees, CCW positive from +X.

pub mod approach;
pub mod config;
pub mod control;
pub mod devices;
pub mod error;
pub mod geometry;
pub mod search;
pub mod status;
pub mod types;
pub mod utils;

pub use approach::{ApproachPoseGenerator, RetryState};
pub use config::LakshyaConfig;
pub use control::{
    ApproachController, ApproachThread, ControlCommand, ControlHandle, TickOutcome,
    create_control_channel,
};
pub use devices::Devices;
pub use error::{ApproachError, Result};
pub use geometry::{CoordinateResolver, FrameIds};
pub use search::{ObjectLocator, ScanOutcome};
pub use status::{ControllerState, SharedStatus};
pub use types::{
    ApproachOutput, CameraIntrinsics, DepthImage, GazePosition, NavigationStatus,
    ObjectObservation, ObservedPoint, Pose2D,
};
