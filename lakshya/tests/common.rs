//! Test utilities for driving the approach controller against mock devices.

#![allow(dead_code)]

use lakshya::devices::mock::MockRobot;
use lakshya::{ApproachController, ControlHandle, LakshyaConfig};

/// Default configuration with waits shrunk to keep tests fast.
pub fn fast_config() -> LakshyaConfig {
    let mut config = LakshyaConfig::default();
    config.search.wait_for_search_secs = 0.005;
    config.search.confirm_delay_secs = 0.0;
    config.timing.poll_interval_ms = 2;
    config.timing.period_ms = 5;
    config
}

/// Mock robot plus a controller wired to it.
pub fn setup(config: &LakshyaConfig) -> (MockRobot, ApproachController, ControlHandle) {
    let robot = MockRobot::new();
    let (controller, handle) =
        ApproachController::with_handle(config, robot.devices()).expect("controller setup");
    (robot, controller, handle)
}
