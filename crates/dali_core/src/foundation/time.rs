//! Time management utilities

use std::time::{Duration, Instant};

/// Frame clock driving the update loop
///
/// `tick` returns the seconds elapsed since the previous tick, which is the
/// value handed to `UpdateManager::update`.
pub struct FrameClock {
    last_tick: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a new clock starting now
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance the clock, returning the elapsed seconds since the last tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_tick).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_tick = now;
        self.frame_count += 1;
        self.delta_time
    }

    /// Sleep for whatever remains of `interval` since the last tick
    pub fn pace(&self, interval: Duration) {
        let spent = self.last_tick.elapsed();
        if spent < interval {
            std::thread::sleep(interval - spent);
        }
    }

    /// Time since the previous tick in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total time accumulated by `tick`
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average ticks per second since creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_accumulates() {
        let mut clock = FrameClock::new();
        std::thread::sleep(Duration::from_millis(2));
        let dt = clock.tick();
        assert!(dt > 0.0);
        clock.tick();
        assert_eq!(clock.frame_count(), 2);
        assert!(clock.total_time() >= dt);
    }
}
