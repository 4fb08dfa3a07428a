//! Standoff pose generation around a target object.

mod pose_generator;

pub use pose_generator::{ApproachPoseGenerator, RetryState};
