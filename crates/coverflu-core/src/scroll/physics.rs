//! L4 Atomic Layer: Constant-deceleration fling math
//!
//! A fling decelerates at a fixed `friction` (tiles/s²). The landing point is
//! estimated from the release speed, snapped to an integer tile and clamped,
//! then the start speed is solved again so the curve stops exactly there.

use std::time::Duration;

use super::range::{round_offset, OffsetRange};

/// Resolved fling toward an integer tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapPlan {
    /// Integer offset the animation ends on
    pub target: f64,
    /// Signed start speed in tiles/s that reaches `target` exactly
    pub initial_speed: f64,
    /// Time until the speed reaches zero
    pub duration: Duration,
}

impl SnapPlan {
    /// Whether there is any distance to travel
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Plan a fling from `start_offset` released at `release_speed` (tiles/s)
///
/// Without positive friction there is no curve to follow; the plan jumps
/// to the nearest tile.
pub fn snap_plan(
    start_offset: f64,
    release_speed: f64,
    friction: f64,
    range: OffsetRange,
) -> SnapPlan {
    if !(friction > 0.0 && friction.is_finite()) {
        return SnapPlan {
            target: range.clamp(round_offset(start_offset) as f64),
            initial_speed: 0.0,
            duration: Duration::ZERO,
        };
    }

    // Pass 1: where would free deceleration stop?
    let distance = (release_speed * release_speed / (2.0 * friction)).copysign(release_speed);
    let raw = start_offset + distance;
    let target = range.clamp(round_offset(raw) as f64);

    // Pass 2: the speed that stops exactly on the snapped target
    let travel = target - start_offset;
    let initial_speed = (2.0 * friction * travel.abs()).sqrt().copysign(travel);
    let seconds = initial_speed.abs() / friction;

    SnapPlan {
        target,
        initial_speed,
        duration: Duration::try_from_secs_f64(seconds).unwrap_or_default(),
    }
}

/// Offset reached `elapsed` into a fling, clamped to the valid range
pub fn offset_at(
    start_offset: f64,
    initial_speed: f64,
    friction: f64,
    elapsed: Duration,
    duration: Duration,
    range: OffsetRange,
) -> f64 {
    let t = elapsed.min(duration).as_secs_f64();
    let displacement =
        (initial_speed.abs() * t - friction * t * t / 2.0).copysign(initial_speed);
    range.clamp(start_offset + displacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-6;

    #[test]
    fn test_reference_fling_lands_on_tile_one() {
        let range = OffsetRange::new(10);
        let plan = snap_plan(2.0, -3.0, 5.0, range);

        assert_eq!(plan.target, 1.0);
        assert!((plan.initial_speed - (-(10.0_f64).sqrt())).abs() < EPSILON);
        assert!((plan.duration.as_secs_f64() - 0.632_455_5).abs() < 1e-6);

        let end = offset_at(2.0, plan.initial_speed, 5.0, plan.duration, plan.duration, range);
        assert!((end - 1.0).abs() < EPSILON, "ended at {}", end);
    }

    #[test]
    fn test_zero_speed_snaps_to_nearest() {
        let range = OffsetRange::new(10);
        let plan = snap_plan(3.4, 0.0, 5.0, range);
        assert_eq!(plan.target, 3.0);
        assert!(plan.initial_speed < 0.0);

        let plan = snap_plan(4.0, 0.0, 5.0, range);
        assert_eq!(plan.target, 4.0);
        assert!(plan.is_stationary());
        assert_eq!(plan.initial_speed, 0.0);
    }

    #[test]
    fn test_target_is_clamped_to_last_tile() {
        let range = OffsetRange::new(4);
        let plan = snap_plan(2.5, 6.0, 5.0, range);
        assert_eq!(plan.target, 3.0);
        assert!(plan.initial_speed > 0.0);
    }

    #[test]
    fn test_unusable_friction_jumps_to_nearest_tile() {
        let range = OffsetRange::new(10);
        for friction in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let plan = snap_plan(2.3, 3.0, friction, range);
            assert!(plan.is_stationary(), "friction {}", friction);
            assert_eq!(plan.target, 2.0);
            assert_eq!(plan.initial_speed, 0.0);
        }
    }

    #[test]
    fn test_elapsed_past_duration_is_capped() {
        let range = OffsetRange::new(10);
        let plan = snap_plan(5.0, 4.0, 5.0, range);
        let late = plan.duration + Duration::from_secs(3);
        let end = offset_at(5.0, plan.initial_speed, 5.0, late, plan.duration, range);
        assert!((end - plan.target).abs() < EPSILON);
    }

    proptest! {
        #[test]
        fn prop_lands_exactly_on_clamped_integer(
            start in 0.0f64..20.0,
            speed in -6.0f64..6.0,
            friction in 0.5f64..20.0,
            count in 1usize..30,
        ) {
            let range = OffsetRange::new(count);
            let start = range.clamp(start);
            let plan = snap_plan(start, speed, friction, range);

            prop_assert_eq!(plan.target.fract(), 0.0);
            prop_assert!(plan.target >= 0.0 && plan.target <= (count - 1) as f64);

            let end = offset_at(start, plan.initial_speed, friction, plan.duration, plan.duration, range);
            prop_assert!((end - plan.target).abs() < EPSILON, "end {} target {}", end, plan.target);
        }

        #[test]
        fn prop_moves_monotonically_toward_target(
            start in 0.0f64..20.0,
            speed in -6.0f64..6.0,
            friction in 0.5f64..20.0,
            count in 1usize..30,
        ) {
            let range = OffsetRange::new(count);
            let start = range.clamp(start);
            let plan = snap_plan(start, speed, friction, range);
            let direction = (plan.target - start).signum();

            let mut previous = start;
            for step in 0..=50u32 {
                let elapsed = plan.duration.mul_f64(f64::from(step) / 50.0);
                let offset = offset_at(start, plan.initial_speed, friction, elapsed, plan.duration, range);
                prop_assert!((offset - previous) * direction >= -EPSILON);
                prop_assert!((plan.target - offset) * direction >= -EPSILON, "overshoot at {}", offset);
                previous = offset;
            }
        }
    }
}
