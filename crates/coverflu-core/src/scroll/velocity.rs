//! L4 Atomic Layer: Release velocity over a trailing sample window
//!
//! Only the last few samples of a drag are used so a final flick is not
//! averaged away by the slower start of the gesture.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Horizontal pointer samples for one gesture
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    window: Duration,
    samples: VecDeque<(Instant, f32)>,
}

impl VelocityTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Forget all samples (start of a new gesture)
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn add_sample(&mut self, at: Instant, x: f32) {
        // Out-of-order timestamps restart the window instead of producing a negative dt
        if let Some(&(last, _)) = self.samples.back() {
            if at < last {
                self.samples.clear();
            }
        }
        self.samples.push_back((at, x));

        while let Some(&(first, _)) = self.samples.front() {
            if at.duration_since(first) > self.window && self.samples.len() > 2 {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Horizontal velocity in pixels/s across the trailing window
    pub fn velocity(&self) -> f32 {
        let (Some(&(last_at, last_x)), Some(&(first_at, first_x))) =
            (self.samples.back(), self.window_start())
        else {
            return 0.0;
        };

        let dt = last_at.duration_since(first_at).as_secs_f32();
        if dt <= f32::EPSILON {
            return 0.0;
        }
        (last_x - first_x) / dt
    }

    /// Oldest sample still inside the window relative to the newest one
    fn window_start(&self) -> Option<&(Instant, f32)> {
        let &(last_at, _) = self.samples.back()?;
        self.samples
            .iter()
            .find(|(at, _)| last_at.duration_since(*at) <= self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_constant_motion() {
        let t0 = Instant::now();
        let mut tracker = VelocityTracker::new(ms(100));
        for i in 0..5u64 {
            tracker.add_sample(t0 + ms(i * 10), i as f32 * 10.0);
        }
        // 10px every 10ms
        assert!((tracker.velocity() - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_final_flick_is_not_averaged_away() {
        let t0 = Instant::now();
        let mut tracker = VelocityTracker::new(ms(100));
        // slow drag for a second
        for i in 0..=10u64 {
            tracker.add_sample(t0 + ms(i * 100), i as f32);
        }
        // fast flick in the last 50ms
        tracker.add_sample(t0 + ms(1025), 60.0);
        tracker.add_sample(t0 + ms(1050), 110.0);

        assert!(tracker.velocity() > 1000.0, "velocity {}", tracker.velocity());
    }

    #[test]
    fn test_single_sample_has_no_velocity() {
        let mut tracker = VelocityTracker::new(ms(100));
        tracker.add_sample(Instant::now(), 42.0);
        assert_eq!(tracker.velocity(), 0.0);

        tracker.reset();
        assert_eq!(tracker.velocity(), 0.0);
    }

    #[test]
    fn test_leftward_motion_is_negative() {
        let t0 = Instant::now();
        let mut tracker = VelocityTracker::new(ms(100));
        tracker.add_sample(t0, 300.0);
        tracker.add_sample(t0 + ms(20), 200.0);
        assert!(tracker.velocity() < 0.0);
    }
}
