//! Scripted mock devices for testing and offline runs.
//!
//! Every mock is a cheap handle around shared state: clone it, hand one
//! clone to the controller and keep the other to script replies and inspect
//! the calls that were made.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    DepthSensor, Devices, FinderReply, Gaze, Navigation, ObjectFinder, OutputSink,
    TransformSource,
};
use crate::error::{ApproachError, Result};
use crate::types::{
    ApproachOutput, CameraIntrinsics, DepthImage, NavigationStatus, ObjectObservation, Pose2D,
    Transform4x4,
};

// ============================================================================
// Navigation
// ============================================================================

/// Mock navigation server.
///
/// Each goal consumes one scripted status sequence. Status queries walk the
/// sequence and stay on its last entry. Goals without a script reach their
/// target immediately.
#[derive(Clone, Default)]
pub struct MockNavigation {
    inner: Arc<Mutex<MockNavigationInner>>,
}

#[derive(Default)]
struct MockNavigationInner {
    pose: Pose2D,
    script: VecDeque<Vec<NavigationStatus>>,
    active: VecDeque<NavigationStatus>,
    status: NavigationStatus,
    goals: Vec<Pose2D>,
    stops: usize,
    position_queries: usize,
}

impl MockNavigation {
    pub fn new(pose: Pose2D) -> Self {
        let nav = Self::default();
        nav.inner.lock().pose = pose;
        nav
    }

    /// Move the robot (e.g. between retries).
    pub fn set_pose(&self, pose: Pose2D) {
        self.inner.lock().pose = pose;
    }

    /// Override the current status (before any goal is sent).
    pub fn set_status(&self, status: NavigationStatus) {
        self.inner.lock().status = status;
    }

    /// Script the final status of the next goal.
    pub fn push_outcome(&self, status: NavigationStatus) {
        self.push_sequence(vec![status]);
    }

    /// Script the statuses reported, in order, for the next goal.
    pub fn push_sequence(&self, statuses: Vec<NavigationStatus>) {
        self.inner.lock().script.push_back(statuses);
    }

    /// Goals sent so far.
    pub fn goals(&self) -> Vec<Pose2D> {
        self.inner.lock().goals.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.inner.lock().stops
    }

    pub fn position_queries(&self) -> usize {
        self.inner.lock().position_queries
    }
}

impl Navigation for MockNavigation {
    fn current_position(&mut self) -> Result<Pose2D> {
        let mut inner = self.inner.lock();
        inner.position_queries += 1;
        Ok(inner.pose.clone())
    }

    fn goto_absolute(&mut self, target: &Pose2D) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.goals.push(target.clone());
        let sequence = inner
            .script
            .pop_front()
            .unwrap_or_else(|| vec![NavigationStatus::GoalReached]);
        inner.active = sequence.into();
        inner.status = NavigationStatus::Moving;
        Ok(())
    }

    fn status(&mut self) -> Result<NavigationStatus> {
        let mut inner = self.inner.lock();
        if inner.active.len() > 1 {
            if let Some(status) = inner.active.pop_front() {
                inner.status = status;
            }
        } else if let Some(&status) = inner.active.front() {
            inner.status = status;
        }
        Ok(inner.status)
    }

    fn stop(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.stops += 1;
        inner.active.clear();
        inner.status = NavigationStatus::Idle;
        Ok(())
    }
}

// ============================================================================
// Transforms
// ============================================================================

/// Mock transform server holding a fixed table of frame pairs.
#[derive(Clone, Default)]
pub struct MockTransforms {
    inner: Arc<Mutex<MockTransformsInner>>,
}

#[derive(Default)]
struct MockTransformsInner {
    table: HashMap<(String, String), Transform4x4>,
    lookups: usize,
}

impl MockTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, from: &str, to: &str, transform: Transform4x4) {
        self.inner
            .lock()
            .table
            .insert((from.to_string(), to.to_string()), transform);
    }

    pub fn remove(&self, from: &str, to: &str) {
        self.inner
            .lock()
            .table
            .remove(&(from.to_string(), to.to_string()));
    }

    pub fn lookups(&self) -> usize {
        self.inner.lock().lookups
    }
}

impl TransformSource for MockTransforms {
    fn transform(&mut self, from: &str, to: &str) -> Option<Transform4x4> {
        let mut inner = self.inner.lock();
        inner.lookups += 1;
        inner
            .table
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }
}

// ============================================================================
// Depth sensor
// ============================================================================

/// Mock depth camera.
#[derive(Clone)]
pub struct MockDepthSensor {
    inner: Arc<Mutex<MockDepthInner>>,
}

struct MockDepthInner {
    intrinsics: Option<CameraIntrinsics>,
    image: Option<DepthImage>,
    frames_requested: usize,
}

impl MockDepthSensor {
    /// Sensor with the given intrinsics and no depth frame yet.
    pub fn new(intrinsics: CameraIntrinsics) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockDepthInner {
                intrinsics: Some(intrinsics),
                image: None,
                frames_requested: 0,
            })),
        }
    }

    /// Sensor whose intrinsics query fails.
    pub fn without_intrinsics() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockDepthInner {
                intrinsics: None,
                image: None,
                frames_requested: 0,
            })),
        }
    }

    pub fn set_image(&self, image: Option<DepthImage>) {
        self.inner.lock().image = image;
    }

    pub fn frames_requested(&self) -> usize {
        self.inner.lock().frames_requested
    }
}

impl DepthSensor for MockDepthSensor {
    fn depth_image(&mut self) -> Option<DepthImage> {
        let mut inner = self.inner.lock();
        inner.frames_requested += 1;
        inner.image.clone()
    }

    fn intrinsics(&mut self) -> Result<CameraIntrinsics> {
        self.inner
            .lock()
            .intrinsics
            .ok_or_else(|| ApproachError::Config("depth intrinsics unavailable".to_string()))
    }
}

// ============================================================================
// Gaze
// ============================================================================

type GazeHook = Box<dyn FnMut(usize) + Send>;

/// Mock gaze controller recording every angular target.
#[derive(Clone, Default)]
pub struct MockGaze {
    inner: Arc<Mutex<MockGazeInner>>,
}

#[derive(Default)]
struct MockGazeInner {
    targets: Vec<(f64, f64)>,
    hook: Option<GazeHook>,
}

impl MockGaze {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` after every command with the number of commands so far.
    pub fn on_command(&self, hook: impl FnMut(usize) + Send + 'static) {
        self.inner.lock().hook = Some(Box::new(hook));
    }

    /// Angular targets commanded so far, as (pan, tilt).
    pub fn targets(&self) -> Vec<(f64, f64)> {
        self.inner.lock().targets.clone()
    }
}

impl Gaze for MockGaze {
    fn set_angular_target(&mut self, pan_deg: f64, tilt_deg: f64) {
        let mut inner = self.inner.lock();
        inner.targets.push((pan_deg, tilt_deg));
        let count = inner.targets.len();
        if let Some(hook) = inner.hook.as_mut() {
            hook(count);
        }
    }
}

// ============================================================================
// Object finder
// ============================================================================

/// Mock object finder.
///
/// Queries consume scripted replies and answer "not found" once the script
/// is empty.
#[derive(Clone, Default)]
pub struct MockFinder {
    inner: Arc<Mutex<MockFinderInner>>,
}

#[derive(Default)]
struct MockFinderInner {
    replies: VecDeque<Result<FinderReply>>,
    batches: VecDeque<Vec<ObjectObservation>>,
    queries: Vec<String>,
}

impl MockFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: FinderReply) {
        self.inner.lock().replies.push_back(Ok(reply));
    }

    /// Script a query that fails to reach the finder.
    pub fn push_unreachable(&self) {
        self.inner.lock().replies.push_back(Err(ApproachError::Communication(
            "object finder unreachable".to_string(),
        )));
    }

    pub fn push_detections(&self, batch: Vec<ObjectObservation>) {
        self.inner.lock().batches.push_back(batch);
    }

    /// Labels queried so far.
    pub fn queries(&self) -> Vec<String> {
        self.inner.lock().queries.clone()
    }
}

impl ObjectFinder for MockFinder {
    fn query(&mut self, label: &str) -> Result<FinderReply> {
        let mut inner = self.inner.lock();
        inner.queries.push(label.to_string());
        inner.replies.pop_front().unwrap_or(Ok(FinderReply::NotFound))
    }

    fn take_detections(&mut self) -> Option<Vec<ObjectObservation>> {
        self.inner.lock().batches.pop_front()
    }
}

// ============================================================================
// Output
// ============================================================================

/// Mock output channel collecting everything emitted.
#[derive(Clone, Default)]
pub struct MockOutput {
    inner: Arc<Mutex<Vec<ApproachOutput>>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<ApproachOutput> {
        self.inner.lock().clone()
    }
}

impl OutputSink for MockOutput {
    fn emit(&mut self, output: ApproachOutput) {
        self.inner.lock().push(output);
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// One mock of every collaborator, wired together.
#[derive(Clone)]
pub struct MockRobot {
    pub navigation: MockNavigation,
    pub transforms: MockTransforms,
    pub depth: MockDepthSensor,
    pub gaze: MockGaze,
    pub finder: MockFinder,
    pub output: MockOutput,
}

impl MockRobot {
    /// Robot at the origin of `map` with identity camera → base → world
    /// transforms and a 640x480 depth frame at 1m.
    pub fn new() -> Self {
        let intrinsics = CameraIntrinsics {
            focal_x: 525.0,
            focal_y: 525.0,
            principal_x: 320.0,
            principal_y: 240.0,
        };
        let depth = MockDepthSensor::new(intrinsics);
        depth.set_image(Some(DepthImage::filled(640, 480, 1.0)));

        let transforms = MockTransforms::new();
        transforms.set("depth_center", "base_link", Transform4x4::identity());
        transforms.set("base_link", "map", Transform4x4::identity());

        Self {
            navigation: MockNavigation::new(Pose2D::new(0.0, 0.0, 0.0, "map")),
            transforms,
            depth,
            gaze: MockGaze::new(),
            finder: MockFinder::new(),
            output: MockOutput::new(),
        }
    }

    /// Boxed clones for the controller.
    pub fn devices(&self) -> Devices {
        Devices {
            navigation: Box::new(self.navigation.clone()),
            transforms: Box::new(self.transforms.clone()),
            depth: Box::new(self.depth.clone()),
            gaze: Box::new(self.gaze.clone()),
            finder: Box::new(self.finder.clone()),
            output: Box::new(self.output.clone()),
        }
    }
}

impl Default for MockRobot {
    fn default() -> Self {
        Self::new()
    }
}
