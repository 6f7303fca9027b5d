//! Frame timing for the headless driver.
//!
//! Provides a simulated millisecond clock advanced in fixed steps, plus the
//! wall-clock accumulator and frame limiter used in real-time mode.

use std::time::{Duration, Instant};

/// Frame timing manager.
#[derive(Debug)]
pub struct FrameTiming {
    /// Time budget per frame
    frame_budget: Duration,
    /// Time of last frame start
    last_frame: Instant,
    /// Accumulator for fixed timestep
    accumulator: f32,
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Maximum delta time to prevent spiral of death
    max_dt: f32,
    /// Simulated time in seconds
    sim_time: f64,
    /// Fixed steps taken
    steps: u64,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTiming {
    /// Create a new frame timing manager.
    ///
    /// # Arguments
    /// * `target_fps` - Target frames per second for frame limiting
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            last_frame: Instant::now(),
            accumulator: 0.0,
            fixed_dt: 1.0 / 60.0,
            max_dt: 0.25,
            sim_time: 0.0,
            steps: 0,
        }
    }

    /// Set the fixed timestep.
    #[must_use]
    pub fn with_fixed_dt(mut self, dt: f32) -> Self {
        self.fixed_dt = dt.max(0.001);
        self
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Calculate wall-clock delta time since last frame.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(self.max_dt)
    }

    /// Accumulate time for fixed timestep updates.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt;
        let mut count = 0;

        let max_updates = 10;
        while self.accumulator >= self.fixed_dt && count < max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Advances the simulated clock by one fixed step and returns the new
    /// time in whole milliseconds.
    pub fn advance(&mut self) -> u64 {
        self.steps += 1;
        self.sim_time += f64::from(self.fixed_dt);
        self.now_ms()
    }

    /// Simulated time in whole milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        (self.sim_time * 1000.0).round() as u64
    }

    /// Fixed steps taken so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Sleep for the remainder of the frame budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_milliseconds() {
        let mut timing = FrameTiming::new(60).with_fixed_dt(1.0 / 60.0);
        let mut last = 0;
        for _ in 0..60 {
            let now = timing.advance();
            assert!(now > last);
            last = now;
        }
        assert_eq!(timing.now_ms(), 1000);
        assert_eq!(timing.steps(), 60);
    }

    #[test]
    fn test_accumulate_caps_updates() {
        let mut timing = FrameTiming::new(60).with_fixed_dt(0.01);
        assert_eq!(timing.accumulate(0.035), 3);
        assert_eq!(timing.accumulate(1.0), 10);
    }

    #[test]
    fn test_fixed_dt_floor() {
        let timing = FrameTiming::new(60).with_fixed_dt(0.0);
        assert!((timing.fixed_dt() - 0.001).abs() < f32::EPSILON);
    }
}
