use std::time::{Duration, Instant};

/// Playback clock the session samples once per frame.
pub trait TimeSource {
    /// Seconds since track start, or `None` while nothing is playing.
    fn elapsed(&self) -> Option<f32>;
}

/// Monotonic wall clock for interval-only play without a track.
#[derive(Clone, Debug, Default)]
pub struct WallClock {
    started_at: Option<Instant>,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Starts the clock as if it had been running for `preroll` already.
    pub fn start_at_offset(&mut self, preroll: Duration) {
        let now = Instant::now();
        self.started_at = Some(now.checked_sub(preroll).unwrap_or(now));
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }
}

impl TimeSource for WallClock {
    fn elapsed(&self) -> Option<f32> {
        self.started_at.map(|t| t.elapsed().as_secs_f32())
    }
}

/// Synthetic clock driven by hand, for tests and headless runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManualClock {
    now: Option<f32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(seconds: f32) -> Self {
        Self { now: Some(seconds) }
    }

    pub fn set(&mut self, seconds: f32) {
        self.now = Some(seconds);
    }

    pub fn advance(&mut self, delta: f32) {
        self.now = Some(self.now.unwrap_or(0.0) + delta);
    }

    pub fn stop(&mut self) {
        self.now = None;
    }
}

impl TimeSource for ManualClock {
    fn elapsed(&self) -> Option<f32> {
        self.now
    }
}
