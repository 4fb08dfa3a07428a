//! Approach controller: one tick of the approach state machine.
//!
//! ```text
//! Idle ──start──► Approaching ──reached───► ReacquiringAfterSuccess ──► Idle
//!                     │      └─exhausted─► ReacquiringAfterAbort ────► Idle
//!                     └──stop──► Stopped ──► Idle
//! Idle/Stopped ──resume──► ResumingSearch ──found──► (start next tick)
//! ```
//!
//! Every external call blocks the tick. The controller only sleeps in the
//! navigation poll and in the gaze scan, and both waits wake up on stop.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{CommandInbox, ControlHandle, Pacer, create_control_channel};
use crate::approach::{ApproachPoseGenerator, RetryState};
use crate::config::LakshyaConfig;
use crate::devices::Devices;
use crate::error::{ApproachError, Result};
use crate::geometry::CoordinateResolver;
use crate::search::{ObjectLocator, ScanOutcome, select_best_detection};
use crate::status::ControllerState;
use crate::types::{ApproachOutput, NavigationStatus, ObjectObservation, ObservedPoint, Pose2D};

/// Consecutive `Idle` polls after a goal before it is treated as aborted.
const IDLE_POLLS_BEFORE_ABORT: u32 = 5;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing was requested.
    Idle,
    /// A stop request ended the tick (or arrived while idle).
    Stopped,
    /// The object was found again; its coordinates were emitted.
    Delivered { x: f64, y: f64 },
    /// The object was not found again; "object lost" was emitted.
    ObjectLost,
    /// Resume found the object; an approach starts on the next tick.
    Resumed,
    /// The cycle was aborted by an error; the controller is ready again.
    Failed(ApproachError),
}

/// How the navigation phase of a cycle ended.
enum Arrival {
    Reached,
    Exhausted,
    Stopped,
}

pub struct ApproachController {
    devices: Devices,
    inbox: CommandInbox,
    resolver: CoordinateResolver,
    generator: ApproachPoseGenerator,
    locator: ObjectLocator,
    retry: RetryState,
    poll_interval: Duration,
    requery_robot_pose: bool,
    last_label: Option<String>,
}

impl ApproachController {
    /// Build a controller around `devices`.
    ///
    /// Fails with [`ApproachError::Config`] if the configuration is invalid or
    /// the depth camera intrinsics cannot be read.
    pub fn new(config: &LakshyaConfig, mut devices: Devices, inbox: CommandInbox) -> Result<Self> {
        config.validate()?;

        let intrinsics = devices.depth.intrinsics().map_err(|e| {
            error!("Unable to get depth camera intrinsics: {}", e);
            ApproachError::Config(format!("depth intrinsics unavailable: {}", e))
        })?;
        debug!(
            "Depth intrinsics: fx={:.1} fy={:.1} cx={:.1} cy={:.1}",
            intrinsics.focal_x, intrinsics.focal_y, intrinsics.principal_x, intrinsics.principal_y
        );

        Ok(Self {
            devices,
            inbox,
            resolver: CoordinateResolver::new(intrinsics, config.frames.clone()),
            generator: ApproachPoseGenerator::new(
                config.approach.safe_distance,
                config.approach.increase_degrees,
            ),
            locator: ObjectLocator::new(
                config.search.positions.clone(),
                config.settle_delay(),
                config.confirm_delay(),
            ),
            retry: RetryState::new(),
            poll_interval: config.poll_interval(),
            requery_robot_pose: config.approach.requery_robot_pose,
            last_label: None,
        })
    }

    /// Build a controller together with the handle that commands it.
    pub fn with_handle(config: &LakshyaConfig, devices: Devices) -> Result<(Self, ControlHandle)> {
        let (handle, inbox) = create_control_channel();
        let controller = Self::new(config, devices, inbox)?;
        Ok((controller, handle))
    }

    pub fn state(&self) -> ControllerState {
        self.inbox.status().state()
    }

    /// Run one iteration of the control loop.
    ///
    /// Per-cycle errors are absorbed here: they are logged, returned as
    /// [`TickOutcome::Failed`] and leave the controller ready for the next
    /// command.
    pub fn tick(&mut self) -> TickOutcome {
        self.inbox.drain();
        let flags = self.inbox.flags();

        let outcome = if flags.stop_requested {
            self.handle_stop()
        } else if flags.start_requested {
            match self.inbox.take_start() {
                Some(observation) => {
                    self.inbox.set_busy(true);
                    self.run_cycle(observation)
                }
                None => TickOutcome::Idle,
            }
        } else if flags.resume_requested {
            self.inbox.set_busy(true);
            self.resume_search()
        } else {
            TickOutcome::Idle
        };

        self.finish_tick(&outcome);
        outcome
    }

    /// Stop seen at the start of a tick: nothing of ours is running, so the
    /// base is only halted if it is actually moving.
    fn handle_stop(&mut self) -> TickOutcome {
        match self.devices.navigation.status() {
            Ok(NavigationStatus::Moving) => self.halt_navigation(),
            Ok(_) => {}
            Err(e) => warn!("Unable to read navigation status: {}", e),
        }
        TickOutcome::Stopped
    }

    fn run_cycle(&mut self, observation: ObjectObservation) -> TickOutcome {
        info!("Approaching '{}'", observation.label);
        self.last_label = Some(observation.label.clone());
        self.inbox.status().set_object(observation.clone());
        self.set_state(ControllerState::Approaching);

        let outcome = match self.approach(&observation) {
            Ok(Arrival::Reached) => {
                info!("Approaching location reached. Looking for object again");
                self.reacquire(&observation.label, ControllerState::ReacquiringAfterSuccess)
            }
            Ok(Arrival::Exhausted) => {
                warn!("Looking for object again from current position");
                self.reacquire(&observation.label, ControllerState::ReacquiringAfterAbort)
            }
            Ok(Arrival::Stopped) => TickOutcome::Stopped,
            Err(e) => {
                error!("Approach of '{}' failed: {}", observation.label, e);
                TickOutcome::Failed(e)
            }
        };

        self.inbox.status().increment_cycles();
        outcome
    }

    /// Drive to a standoff pose, retrying around the object on abort.
    fn approach(&mut self, observation: &ObjectObservation) -> Result<Arrival> {
        let robot = self.devices.navigation.current_position()?;
        info!("Current location: {}", robot);

        let object = self.resolver.resolve_object_pose(
            observation,
            &mut *self.devices.depth,
            &mut *self.devices.transforms,
            &robot.map_id,
        )?;
        info!("Object location: ({:.2}, {:.2})", object.x, object.y);

        if self.inbox.stop_requested() {
            return Ok(Arrival::Stopped);
        }

        let target = self.generator.next_candidate(&robot, &object, &mut self.retry)?;
        self.send_goal(&target)?;
        let mut status = self.devices.navigation.status()?;
        let mut idle_polls = 0;

        while status != NavigationStatus::GoalReached {
            if self.inbox.pause(self.poll_interval) {
                self.halt_navigation();
                return Ok(Arrival::Stopped);
            }
            status = self.devices.navigation.status()?;

            if status == NavigationStatus::Idle {
                idle_polls += 1;
                if idle_polls >= IDLE_POLLS_BEFORE_ABORT {
                    warn!("Navigation went idle without reaching the goal");
                    status = NavigationStatus::Aborted;
                }
            } else {
                idle_polls = 0;
            }

            if status == NavigationStatus::Aborted {
                warn!("Navigation aborted");
                idle_polls = 0;
                self.devices.navigation.stop()?;

                let anchor = if self.requery_robot_pose {
                    self.devices.navigation.current_position()?
                } else {
                    robot.clone()
                };
                match self.generator.next_candidate(&anchor, &object, &mut self.retry) {
                    Ok(target) => {
                        self.send_goal(&target)?;
                        status = self.devices.navigation.status()?;
                    }
                    Err(ApproachError::RetryExhausted { attempts }) => {
                        warn!("Cannot find a reachable approach location ({} tried)", attempts);
                        return Ok(Arrival::Exhausted);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(Arrival::Reached)
    }

    /// Scan for `label` and report the result downstream.
    fn reacquire(&mut self, label: &str, state: ControllerState) -> TickOutcome {
        self.set_state(state);

        let scan = self.locator.reacquire(
            label,
            &mut *self.devices.gaze,
            &mut *self.devices.finder,
            &mut self.inbox,
        );
        match scan {
            Ok(ScanOutcome::Found { .. }) => {
                if self.inbox.stop_requested() {
                    return TickOutcome::Stopped;
                }
                match self.best_detection(label) {
                    Ok(best) => {
                        let (x, y) = point_coordinates(&best.point);
                        info!("Object approached");
                        self.emit(ApproachOutput::Coordinates { x, y });
                        TickOutcome::Delivered { x, y }
                    }
                    Err(e) => {
                        warn!("{}", e);
                        TickOutcome::Failed(e)
                    }
                }
            }
            Ok(ScanOutcome::Cancelled) => TickOutcome::Stopped,
            Ok(ScanOutcome::NotFound) => self.object_lost(),
            Err(e) => {
                error!("Scan for '{}' failed: {}", label, e);
                self.object_lost()
            }
        }
    }

    /// Scan for the last object without approaching it first.
    fn resume_search(&mut self) -> TickOutcome {
        let Some(label) = self.last_label.clone() else {
            warn!("Resume requested but no object was ever approached");
            return TickOutcome::Failed(ApproachError::InvalidObservation(
                "no object to resume".to_string(),
            ));
        };

        info!("Looking for object again");
        self.set_state(ControllerState::ResumingSearch);

        let scan = self.locator.reacquire(
            &label,
            &mut *self.devices.gaze,
            &mut *self.devices.finder,
            &mut self.inbox,
        );
        match scan {
            Ok(ScanOutcome::Found { .. }) => match self.best_detection(&label) {
                Ok(best) => {
                    info!("Found '{}' again, approaching on next tick", label);
                    self.inbox.chain_start(best);
                    TickOutcome::Resumed
                }
                Err(e) => {
                    warn!("{}", e);
                    TickOutcome::Failed(e)
                }
            },
            Ok(ScanOutcome::Cancelled) => TickOutcome::Stopped,
            Ok(ScanOutcome::NotFound) => self.object_lost(),
            Err(e) => {
                error!("Scan for '{}' failed: {}", label, e);
                self.object_lost()
            }
        }
    }

    /// Most confident detection of `label` in the finder's next batch.
    fn best_detection(&mut self, label: &str) -> Result<ObjectObservation> {
        let no_match = || ApproachError::NoMatchingDetection {
            label: label.to_string(),
        };
        let Some(batch) = self.devices.finder.take_detections() else {
            error!("Error getting new object coordinates");
            return Err(no_match());
        };
        select_best_detection(label, &batch)
            .cloned()
            .ok_or_else(no_match)
    }

    fn send_goal(&mut self, target: &Pose2D) -> Result<()> {
        info!("Approach location: {}", target);
        self.devices.navigation.goto_absolute(target)?;
        self.inbox.status().record_goal(target.clone());
        Ok(())
    }

    fn halt_navigation(&mut self) {
        info!("Stopping navigation");
        if let Err(e) = self.devices.navigation.stop() {
            warn!("Failed to stop navigation: {}", e);
        }
    }

    fn object_lost(&mut self) -> TickOutcome {
        error!("I cannot find the object again");
        self.emit(ApproachOutput::ObjectLost);
        TickOutcome::ObjectLost
    }

    fn emit(&mut self, output: ApproachOutput) {
        self.inbox.status().record_output(output.clone());
        self.devices.output.emit(output);
    }

    fn set_state(&self, state: ControllerState) {
        let status = self.inbox.status();
        let previous = status.state();
        if previous != state {
            debug!("State {} -> {}", previous.as_str(), state.as_str());
            status.set_state(state);
        }
    }

    fn finish_tick(&mut self, outcome: &TickOutcome) {
        self.inbox.clear();
        self.retry.reset();
        self.set_state(match outcome {
            TickOutcome::Stopped => ControllerState::Stopped,
            _ => ControllerState::Idle,
        });
    }
}

fn point_coordinates(point: &ObservedPoint) -> (f64, f64) {
    match *point {
        ObservedPoint::Pixel { u, v } => (u, v),
        ObservedPoint::Absolute { x, y } => (x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::FinderReply;
    use crate::devices::mock::MockRobot;

    fn make_config() -> LakshyaConfig {
        let mut config = LakshyaConfig::default();
        config.search.wait_for_search_secs = 0.0;
        config.search.confirm_delay_secs = 0.0;
        config.timing.poll_interval_ms = 1;
        config
    }

    fn make_controller(robot: &MockRobot) -> (ApproachController, ControlHandle) {
        ApproachController::with_handle(&make_config(), robot.devices()).unwrap()
    }

    #[test]
    fn test_missing_intrinsics_is_config_error() {
        let mut robot = MockRobot::new();
        robot.depth = crate::devices::mock::MockDepthSensor::without_intrinsics();
        let err = ApproachController::with_handle(&make_config(), robot.devices())
            .err()
            .unwrap();
        assert!(matches!(err, ApproachError::Config(_)));
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let robot = MockRobot::new();
        let (mut controller, _handle) = make_controller(&robot);

        assert_eq!(controller.tick(), TickOutcome::Idle);
        assert!(robot.navigation.goals().is_empty());
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_absolute_start_delivers_coordinates() {
        let robot = MockRobot::new();
        robot.finder.push_reply(FinderReply::Seen("ok".to_string()));
        robot
            .finder
            .push_detections(vec![ObjectObservation::detection("cup", 0.9, 300.0, 200.0)]);
        let (mut controller, handle) = make_controller(&robot);

        handle.start("cup", &[3.0, 0.0, 0.0]).unwrap();
        assert_eq!(
            controller.tick(),
            TickOutcome::Delivered { x: 300.0, y: 200.0 }
        );

        let goals = robot.navigation.goals();
        assert_eq!(goals.len(), 1);
        assert!((goals[0].x - 2.0).abs() < 1e-9);
        assert_eq!(
            robot.output.outputs(),
            [ApproachOutput::Coordinates { x: 300.0, y: 200.0 }]
        );
        assert_eq!(handle.status().cycles_completed(), 1);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_not_found_emits_object_lost() {
        let robot = MockRobot::new();
        let (mut controller, handle) = make_controller(&robot);

        handle.start("cup", &[3.0, 0.0, 0.0]).unwrap();
        assert_eq!(controller.tick(), TickOutcome::ObjectLost);
        assert_eq!(robot.output.outputs(), [ApproachOutput::ObjectLost]);
        assert_eq!(robot.gaze.targets().len(), 5);
    }

    #[test]
    fn test_no_matching_detection_emits_nothing() {
        let robot = MockRobot::new();
        robot.finder.push_reply(FinderReply::Seen("ok".to_string()));
        robot
            .finder
            .push_detections(vec![ObjectObservation::detection("mug", 0.9, 1.0, 1.0)]);
        let (mut controller, handle) = make_controller(&robot);

        handle.start("cup", &[3.0, 0.0, 0.0]).unwrap();
        assert_eq!(
            controller.tick(),
            TickOutcome::Failed(ApproachError::NoMatchingDetection {
                label: "cup".to_string()
            })
        );
        assert!(robot.output.outputs().is_empty());
    }

    #[test]
    fn test_sensor_error_absorbed() {
        let robot = MockRobot::new();
        robot.depth.set_image(None);
        let (mut controller, handle) = make_controller(&robot);

        handle.start("cup", &[320.0, 240.0]).unwrap();
        assert!(matches!(
            controller.tick(),
            TickOutcome::Failed(ApproachError::Sensor(_))
        ));
        assert!(robot.navigation.goals().is_empty());

        // Ready for the next command
        robot.depth.set_image(Some(crate::types::DepthImage::filled(640, 480, 1.0)));
        handle.start("cup", &[320.0, 240.0]).unwrap();
        assert_eq!(controller.tick(), TickOutcome::ObjectLost);
        assert_eq!(robot.navigation.goals().len(), 1);
    }

    #[test]
    fn test_idle_stop_only_halts_moving_base() {
        let robot = MockRobot::new();
        let (mut controller, handle) = make_controller(&robot);

        handle.stop().unwrap();
        assert_eq!(controller.tick(), TickOutcome::Stopped);
        assert_eq!(robot.navigation.stop_count(), 0);
        assert_eq!(controller.state(), ControllerState::Stopped);

        robot.navigation.set_status(NavigationStatus::Moving);
        handle.stop().unwrap();
        assert_eq!(controller.tick(), TickOutcome::Stopped);
        assert_eq!(robot.navigation.stop_count(), 1);

        assert_eq!(controller.tick(), TickOutcome::Idle);
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_resume_without_label_fails_without_scanning() {
        let robot = MockRobot::new();
        let (mut controller, handle) = make_controller(&robot);

        handle.resume().unwrap();
        assert!(matches!(controller.tick(), TickOutcome::Failed(_)));
        assert!(robot.gaze.targets().is_empty());
        assert!(robot.output.outputs().is_empty());
    }

    #[test]
    fn test_goal_dropped_to_idle_counts_as_abort() {
        let robot = MockRobot::new();
        robot.navigation.push_outcome(NavigationStatus::Idle);
        let (mut controller, handle) = make_controller(&robot);

        handle.start("cup", &[3.0, 0.0, 0.0]).unwrap();
        assert_eq!(controller.tick(), TickOutcome::ObjectLost);

        let goals = robot.navigation.goals();
        assert_eq!(goals.len(), 2);
        assert_eq!(robot.navigation.stop_count(), 1);
        assert!((goals[1].theta_deg - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_retry_state_reset_between_cycles() {
        let robot = MockRobot::new();
        robot.navigation.push_outcome(NavigationStatus::Aborted);
        let (mut controller, handle) = make_controller(&robot);

        handle.start("cup", &[3.0, 0.0, 0.0]).unwrap();
        controller.tick();
        assert_eq!(robot.navigation.goals().len(), 2);

        handle.start("cup", &[3.0, 0.0, 0.0]).unwrap();
        controller.tick();
        let goals = robot.navigation.goals();
        assert_eq!(goals.len(), 3);
        // Second cycle starts again from the direct bearing
        assert!(goals[2].theta_deg.abs() < 1e-9);
    }
}
