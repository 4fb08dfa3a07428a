//! Candidate approach poses on a circle around the object.
//!
//! The first candidate sits on the line from the robot to the object, at
//! `safe_distance` from the object and facing it. Each retry rotates the
//! candidate by a growing angle, alternating sides:
//!
//! ```text
//! count:   0    1      2       3      4 ...
//! offset:  0  +step  -2·step +3·step -4·step
//! ```
//!
//! The sweep stops once `count` exceeds `ceil(180 / step)`, i.e. both half
//! circles have been covered.

use tracing::{debug, error};

use crate::error::{ApproachError, Result};
use crate::types::Pose2D;

/// Progress of the alternating sweep for one approach cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    count: u32,
    sign: i8,
}

impl RetryState {
    pub fn new() -> Self {
        Self { count: 0, sign: -1 }
    }

    /// Restart the sweep from the direct bearing.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Candidates produced so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn sign(&self) -> i8 {
        self.sign
    }

    fn advance(&mut self) {
        self.sign = -self.sign;
        self.count += 1;
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates standoff poses on the circle of radius `safe_distance`.
#[derive(Debug, Clone)]
pub struct ApproachPoseGenerator {
    safe_distance: f64,
    angle_step_deg: f64,
}

impl ApproachPoseGenerator {
    /// `angle_step_deg` must lie in `(0, 180]`; the config layer checks it.
    pub fn new(safe_distance: f64, angle_step_deg: f64) -> Self {
        Self {
            safe_distance,
            angle_step_deg,
        }
    }

    pub fn safe_distance(&self) -> f64 {
        self.safe_distance
    }

    /// Highest sweep index still allowed.
    pub fn max_count(&self) -> u32 {
        (180.0 / self.angle_step_deg).ceil() as u32
    }

    /// Produce the next candidate and advance `state`.
    pub fn next_candidate(
        &self,
        robot: &Pose2D,
        object: &Pose2D,
        state: &mut RetryState,
    ) -> Result<Pose2D> {
        if state.count > self.max_count() {
            error!("Cannot find a reachable approach location");
            return Err(ApproachError::RetryExhausted {
                attempts: state.count,
            });
        }

        let bearing_deg = (object.y - robot.y).atan2(object.x - robot.x).to_degrees();
        let theta_deg =
            bearing_deg + f64::from(state.sign) * f64::from(state.count) * self.angle_step_deg;
        let theta = theta_deg.to_radians();

        let candidate = Pose2D {
            x: object.x - self.safe_distance * theta.cos(),
            y: object.y - self.safe_distance * theta.sin(),
            theta_deg,
            map_id: robot.map_id.clone(),
        };
        debug!(
            "Approach candidate #{}: bearing {:.1}°, heading {:.1}° -> {}",
            state.count, bearing_deg, theta_deg, candidate
        );

        state.advance();
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn robot() -> Pose2D {
        Pose2D::new(0.0, 0.0, 0.0, "map")
    }

    #[test]
    fn test_first_candidate_on_direct_line() {
        let generator = ApproachPoseGenerator::new(1.0, 30.0);
        let mut state = RetryState::new();
        let object = Pose2D::new(3.0, 0.0, 0.0, "map");

        let c = generator.next_candidate(&robot(), &object, &mut state).unwrap();
        assert_abs_diff_eq!(c.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.theta_deg, 0.0, epsilon = 1e-12);
        assert_eq!(c.map_id, "map");
        assert_eq!(state.count(), 1);
        assert_eq!(state.sign(), 1);
    }

    #[test]
    fn test_offsets_alternate_sides() {
        let generator = ApproachPoseGenerator::new(1.0, 30.0);
        let mut state = RetryState::new();
        let object = Pose2D::new(0.0, 4.0, 0.0, "map");

        let offsets: Vec<f64> = (0..5)
            .map(|_| {
                generator
                    .next_candidate(&robot(), &object, &mut state)
                    .unwrap()
                    .theta_deg
                    - 90.0
            })
            .collect();

        let expected = [0.0, 30.0, -60.0, 90.0, -120.0];
        for (got, want) in offsets.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_candidates_bounded_for_all_steps() {
        let object = Pose2D::new(2.0, -1.0, 0.0, "map");
        for step in [1.0, 7.5, 29.0, 30.0, 45.0, 90.0, 100.0, 179.0, 180.0] {
            let generator = ApproachPoseGenerator::new(0.8, step);
            let mut state = RetryState::new();
            let mut produced = 0u32;
            let err = loop {
                match generator.next_candidate(&robot(), &object, &mut state) {
                    Ok(_) => produced += 1,
                    Err(e) => break e,
                }
            };

            let bound = (180.0_f64 / step).ceil() as u32 + 1;
            assert_eq!(produced, bound, "step {}", step);
            assert!(matches!(err, ApproachError::RetryExhausted { .. }));
        }
    }

    #[test]
    fn test_candidate_stays_on_circle() {
        let generator = ApproachPoseGenerator::new(1.25, 20.0);
        let poses = [
            (Pose2D::new(0.0, 0.0, 0.0, "map"), Pose2D::new(3.0, 4.0, 0.0, "map")),
            (Pose2D::new(-2.0, 5.0, 10.0, "map"), Pose2D::new(-7.0, -1.0, 0.0, "map")),
            (Pose2D::new(1.0, 1.0, 0.0, "map"), Pose2D::new(1.0, 1.5, 0.0, "map")),
        ];

        for (robot, object) in &poses {
            let mut state = RetryState::new();
            while let Ok(candidate) = generator.next_candidate(robot, object, &mut state) {
                assert_abs_diff_eq!(candidate.distance(object), 1.25, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_candidate_faces_object() {
        let generator = ApproachPoseGenerator::new(1.0, 45.0);
        let mut state = RetryState::new();
        let object = Pose2D::new(5.0, 5.0, 0.0, "map");

        for _ in 0..4 {
            let c = generator.next_candidate(&robot(), &object, &mut state).unwrap();
            let facing = (object.y - c.y).atan2(object.x - c.x).to_degrees();
            let diff = (facing - c.theta_deg).rem_euclid(360.0);
            assert!(diff < 1e-9 || (360.0 - diff) < 1e-9, "diff {}", diff);
        }
    }

    #[test]
    fn test_reset_restarts_sweep() {
        let generator = ApproachPoseGenerator::new(1.0, 90.0);
        let mut state = RetryState::new();
        let object = Pose2D::new(2.0, 0.0, 0.0, "map");

        while generator.next_candidate(&robot(), &object, &mut state).is_ok() {}
        state.reset();
        assert_eq!(state, RetryState::new());

        let c = generator.next_candidate(&robot(), &object, &mut state).unwrap();
        assert_abs_diff_eq!(c.x, 1.0, epsilon = 1e-12);
    }
}
