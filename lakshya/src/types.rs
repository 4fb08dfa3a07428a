//! Core data types shared by the approach pipeline.
//!
//! Angles on [`Pose2D`] are in degrees, 0° along +x of the map, the same
//! convention the navigation server uses for absolute goals.

use serde::{Deserialize, Serialize};

use crate::error::{ApproachError, Result};

/// A location in a named 2D map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position (meters)
    pub x: f64,
    /// Y position (meters)
    pub y: f64,
    /// Heading (degrees)
    pub theta_deg: f64,
    /// Map the pose is expressed in
    pub map_id: String,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, theta_deg: f64, map_id: impl Into<String>) -> Self {
        Self {
            x,
            y,
            theta_deg,
            map_id: map_id.into(),
        }
    }

    /// Euclidean distance between the positions of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl std::fmt::Display for Pose2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.1}°) in '{}'",
            self.x, self.y, self.theta_deg, self.map_id
        )
    }
}

/// A 3D point in some reference frame (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Homogeneous transform mapping points of one frame into another.
pub type Transform4x4 = nalgebra::Matrix4<f64>;

/// Where an object was seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObservedPoint {
    /// Pixel coordinate in the depth camera image.
    Pixel { u: f64, v: f64 },
    /// World-frame position; the third value of the command is dropped.
    Absolute { x: f64, y: f64 },
}

/// A detected (or commanded) object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectObservation {
    pub label: String,
    pub confidence: f64,
    pub point: ObservedPoint,
}

impl ObjectObservation {
    /// Detection reported by the object finder in pixel coordinates.
    pub fn detection(label: impl Into<String>, confidence: f64, u: f64, v: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
            point: ObservedPoint::Pixel { u, v },
        }
    }

    /// Build an observation from the raw coordinate list of a start command.
    ///
    /// Two values are a pixel `(u, v)`, three values an absolute `(x, y, z)`.
    /// Anything else is rejected.
    pub fn from_values(label: &str, values: &[f64]) -> Result<Self> {
        if label.trim().is_empty() {
            return Err(ApproachError::InvalidObservation(
                "object label is empty".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ApproachError::InvalidObservation(format!(
                "non-finite coordinate in {:?}",
                values
            )));
        }

        let point = match *values {
            [u, v] => ObservedPoint::Pixel { u, v },
            [x, y, _] => ObservedPoint::Absolute { x, y },
            _ => {
                return Err(ApproachError::InvalidObservation(format!(
                    "expected 2 or 3 coordinates, got {}",
                    values.len()
                )));
            }
        };

        Ok(Self {
            label: label.to_string(),
            confidence: 1.0,
            point,
        })
    }
}

/// Pinhole intrinsics of the depth camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub focal_x: f64,
    pub focal_y: f64,
    pub principal_x: f64,
    pub principal_y: f64,
}

impl CameraIntrinsics {
    /// Back-project pixel `(u, v)` at `depth` into the camera frame.
    #[inline]
    pub fn back_project(&self, u: f64, v: f64, depth: f64) -> Point3 {
        Point3::new(
            (u - self.principal_x) / self.focal_x * depth,
            (v - self.principal_y) / self.focal_y * depth,
            depth,
        )
    }
}

/// Row-major depth frame in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl DepthImage {
    /// Create a frame filled with a constant depth.
    pub fn filled(width: usize, height: usize, depth: f32) -> Self {
        Self {
            width,
            height,
            data: vec![depth; width * height],
        }
    }

    /// Depth at pixel `(u, v)`, truncated to integer coordinates.
    ///
    /// Returns `None` outside the frame and for non-positive or non-finite
    /// samples.
    pub fn sample(&self, u: f64, v: f64) -> Option<f64> {
        if !(u >= 0.0 && v >= 0.0) {
            return None;
        }
        let (col, row) = (u as usize, v as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        let depth = *self.data.get(row * self.width + col)?;
        (depth.is_finite() && depth > 0.0).then_some(depth as f64)
    }
}

/// Status reported by the navigation server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NavigationStatus {
    #[default]
    Idle,
    Moving,
    GoalReached,
    Aborted,
}

impl NavigationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationStatus::Idle => "IDLE",
            NavigationStatus::Moving => "MOVING",
            NavigationStatus::GoalReached => "GOAL_REACHED",
            NavigationStatus::Aborted => "ABORTED",
        }
    }
}

/// One head orientation visited during a gaze scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazePosition {
    pub name: String,
    pub pan_deg: f64,
    pub tilt_deg: f64,
}

impl GazePosition {
    pub fn new(name: impl Into<String>, pan_deg: f64, tilt_deg: f64) -> Self {
        Self {
            name: name.into(),
            pan_deg,
            tilt_deg,
        }
    }

    /// Front, left, right, up, down.
    pub fn default_scan() -> Vec<GazePosition> {
        vec![
            GazePosition::new("front", 0.0, 0.0),
            GazePosition::new("left", 35.0, 0.0),
            GazePosition::new("right", -35.0, 0.0),
            GazePosition::new("up", 0.0, 20.0),
            GazePosition::new("down", 0.0, -20.0),
        ]
    }
}

/// Message written to the downstream output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApproachOutput {
    /// Coordinates of the re-acquired object.
    Coordinates { x: f64, y: f64 },
    /// The object could not be found again.
    ObjectLost,
}

impl std::fmt::Display for ApproachOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApproachOutput::Coordinates { x, y } => write!(f, "{:.1} {:.1}", x, y),
            ApproachOutput::ObjectLost => write!(f, "object lost"),
        }
    }
}
