//! Fixed-tick redraw scheduling.
//!
//! The application ticks at a fixed rate. A tick redraws only when something
//! asked for it since the last redraw, or continuously while animating.
//! Requests made between two ticks collapse into one redraw, and ticks missed
//! while the application was busy are skipped rather than replayed.

use std::time::{Duration, Instant};

/// Shortest tick the scheduler accepts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Rate used when the requested one is not a positive number.
pub const DEFAULT_RATE_HZ: f32 = 60.0;

#[derive(Clone, Debug)]
pub struct RedrawScheduler {
    interval: Duration,
    next_tick: Instant,
    needs_redraw: bool,
    animating: bool,
}

impl RedrawScheduler {
    /// Scheduler ticking every `interval`, starting at `now`. The first tick
    /// always redraws. Intervals below [`MIN_INTERVAL`] are raised to it.
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            next_tick: now + interval,
            needs_redraw: true,
            animating: false,
        }
    }

    /// Scheduler ticking `hz` times per second.
    ///
    /// A rate that is zero, negative or not finite falls back to
    /// [`DEFAULT_RATE_HZ`].
    pub fn with_rate(hz: f32, now: Instant) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 {
            hz
        } else {
            log::warn!("invalid tick rate {}, using {} Hz", hz, DEFAULT_RATE_HZ);
            DEFAULT_RATE_HZ
        };
        let interval = Duration::try_from_secs_f32(1.0 / hz).unwrap_or(MIN_INTERVAL);
        Self::new(interval, now)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw || self.animating
    }

    pub fn set_animating(&mut self, animating: bool) {
        self.animating = animating;
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// When the next tick is due.
    pub fn next_deadline(&self) -> Instant {
        self.next_tick
    }

    /// Runs the tick due at `now`, if any. Returns whether a frame should be
    /// drawn; the pending request is consumed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        // skip ticks that were missed instead of queueing them
        let behind = now.duration_since(self.next_tick).as_nanos() / self.interval.as_nanos();
        let skipped = u32::try_from(behind + 1).unwrap_or(u32::MAX);
        self.next_tick += self.interval * skipped;
        let redraw = self.needs_redraw();
        self.needs_redraw = false;
        redraw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn requests_between_ticks_coalesce() {
        let start = Instant::now();
        let mut s = RedrawScheduler::new(TICK, start);
        assert!(s.poll(start + TICK));
        s.request_redraw();
        s.request_redraw();
        s.request_redraw();
        assert!(!s.poll(start + TICK + TICK / 2));
        assert!(s.poll(start + TICK * 2));
        assert!(!s.poll(start + TICK * 3));
    }

    #[test]
    fn missed_ticks_are_not_replayed() {
        let start = Instant::now();
        let mut s = RedrawScheduler::new(TICK, start);
        s.set_animating(true);
        assert!(s.poll(start + TICK * 5 + TICK / 2));
        assert_eq!(s.next_deadline(), start + TICK * 6);
        assert!(!s.poll(start + TICK * 5 + TICK * 3 / 4));
    }

    #[test]
    fn degenerate_intervals_are_clamped() {
        let start = Instant::now();
        let s = RedrawScheduler::new(Duration::ZERO, start);
        assert_eq!(s.interval(), MIN_INTERVAL);

        let mut s = RedrawScheduler::with_rate(f32::INFINITY, start);
        assert_eq!(s.interval(), Duration::from_secs_f32(1.0 / DEFAULT_RATE_HZ));
        assert!(s.poll(start + Duration::from_secs(3600)));
        assert!(s.next_deadline() > start + Duration::from_secs(3600));
    }

    #[test]
    fn invalid_rates_fall_back_to_the_default() {
        let start = Instant::now();
        let default = Duration::from_secs_f32(1.0 / DEFAULT_RATE_HZ);
        for hz in [0.0, -5.0, f32::NAN, f32::NEG_INFINITY] {
            assert_eq!(RedrawScheduler::with_rate(hz, start).interval(), default, "{hz}");
        }
        assert_eq!(RedrawScheduler::with_rate(1e9, start).interval(), MIN_INTERVAL);
        let hundred = RedrawScheduler::with_rate(100.0, start).interval();
        assert!(hundred.abs_diff(Duration::from_millis(10)) < Duration::from_micros(1));
    }

    #[test]
    fn animation_redraws_every_tick() {
        let start = Instant::now();
        let mut s = RedrawScheduler::new(TICK, start);
        s.poll(start + TICK);
        s.set_animating(true);
        assert!(s.poll(start + TICK * 2));
        assert!(s.poll(start + TICK * 3));
        s.set_animating(false);
        assert!(!s.poll(start + TICK * 4));
    }
}
