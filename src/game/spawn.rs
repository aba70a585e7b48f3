use crate::game::beatmap::Beatmap;
use crate::game::lane::{Lane, NUM_LANES};
use log::{debug, info};
use rand::Rng;

pub const DEFAULT_SPAWN_DECAY: f32 = 0.99;
pub const DEFAULT_LOOP_TOLERANCE: f32 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpawnSource {
    Beatmap,
    Interval,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    pub lane: Lane,
    pub source: SpawnSource,
    /// Scheduled time for beatmap spawns, the tick time for interval spawns.
    pub time: f32,
}

#[inline(always)]
pub fn random_lane<R: Rng + ?Sized>(rng: &mut R) -> Lane {
    Lane::ALL[rng.random_range(0..NUM_LANES)]
}

/// Walks a beatmap with a cursor that only moves forward, except when the
/// playback clock jumps back by more than `loop_tolerance`.
#[derive(Clone, Debug)]
pub struct BeatmapCursor {
    beatmap: Beatmap,
    cursor: usize,
    last_elapsed: Option<f32>,
    loop_tolerance: f32,
}

impl BeatmapCursor {
    pub fn new(beatmap: Beatmap, loop_tolerance: f32) -> Self {
        Self {
            beatmap,
            cursor: 0,
            last_elapsed: None,
            loop_tolerance: loop_tolerance.max(0.0),
        }
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn beatmap(&self) -> &Beatmap {
        &self.beatmap
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.beatmap.len()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last_elapsed = None;
    }

    /// Returns true when `elapsed` looks like a track restart.
    fn detect_loop(&mut self, elapsed: f32) -> bool {
        let looped = match self.last_elapsed {
            Some(last) => elapsed < last - self.loop_tolerance,
            None => false,
        };
        self.last_elapsed = Some(elapsed);
        looped
    }

    pub fn poll<R: Rng + ?Sized>(
        &mut self,
        elapsed: f32,
        rng: &mut R,
        out: &mut Vec<SpawnRequest>,
    ) {
        if self.detect_loop(elapsed) {
            info!(
                "Playback clock jumped back to {:.3}s; restarting beatmap from the top.",
                elapsed
            );
            self.cursor = 0;
        }

        while let Some(entry) = self.beatmap.get(self.cursor) {
            if entry.time > elapsed {
                break;
            }
            let lane = entry.lane.unwrap_or_else(|| random_lane(rng));
            out.push(SpawnRequest {
                lane,
                source: SpawnSource::Beatmap,
                time: entry.time,
            });
            self.cursor += 1;
        }
    }
}

/// Fixed-cadence spawner whose interval shrinks multiplicatively after every
/// spawn, never going below `min`.
#[derive(Clone, Debug)]
pub struct IntervalSpawner {
    start: f32,
    min: f32,
    decay: f32,
    current: f32,
    since_last: f32,
}

impl IntervalSpawner {
    pub fn new(start: f32, min: f32, decay: f32) -> Self {
        let min = min.max(0.0);
        let start = start.max(min);
        Self {
            start,
            min,
            decay: decay.clamp(0.0, 1.0),
            current: start,
            since_last: 0.0,
        }
    }

    #[inline(always)]
    pub fn current_interval(&self) -> f32 {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.start;
        self.since_last = 0.0;
    }

    /// Shrinks the interval by one decay step.
    pub fn decay_once(&mut self) {
        self.current = (self.current * self.decay).max(self.min);
    }

    /// Accumulates `delta_time` and fires at most once per call.
    pub fn advance(&mut self, delta_time: f32) -> bool {
        self.since_last += delta_time.max(0.0);
        if self.since_last > self.current {
            self.since_last = 0.0;
            self.decay_once();
            debug!("Interval spawn; next interval {:.3}s", self.current);
            true
        } else {
            false
        }
    }

    pub fn poll<R: Rng + ?Sized>(
        &mut self,
        elapsed: f32,
        delta_time: f32,
        rng: &mut R,
        out: &mut Vec<SpawnRequest>,
    ) {
        if self.advance(delta_time) {
            out.push(SpawnRequest {
                lane: random_lane(rng),
                source: SpawnSource::Interval,
                time: elapsed,
            });
        }
    }
}

/// Spawn cadence for one session: a beatmap, an interval generator, or both.
#[derive(Clone, Debug)]
pub struct SpawnSchedule {
    beatmap: Option<BeatmapCursor>,
    interval: Option<IntervalSpawner>,
}

impl SpawnSchedule {
    /// An empty beatmap always enables the interval spawner.
    pub fn new(
        beatmap: Beatmap,
        interval: IntervalSpawner,
        loop_tolerance: f32,
        supplementary_interval: bool,
    ) -> Self {
        if beatmap.is_empty() {
            return Self {
                beatmap: None,
                interval: Some(interval),
            };
        }
        Self {
            beatmap: Some(BeatmapCursor::new(beatmap, loop_tolerance)),
            interval: supplementary_interval.then_some(interval),
        }
    }

    pub fn interval_only(interval: IntervalSpawner) -> Self {
        Self {
            beatmap: None,
            interval: Some(interval),
        }
    }

    pub fn has_beatmap(&self) -> bool {
        self.beatmap.is_some()
    }

    pub fn beatmap_cursor(&self) -> Option<&BeatmapCursor> {
        self.beatmap.as_ref()
    }

    pub fn interval(&self) -> Option<&IntervalSpawner> {
        self.interval.as_ref()
    }

    pub fn reset(&mut self) {
        if let Some(cursor) = self.beatmap.as_mut() {
            cursor.reset();
        }
        if let Some(interval) = self.interval.as_mut() {
            interval.reset();
        }
    }

    pub fn poll<R: Rng + ?Sized>(
        &mut self,
        elapsed: f32,
        delta_time: f32,
        rng: &mut R,
    ) -> Vec<SpawnRequest> {
        let mut out = Vec::new();
        if let Some(cursor) = self.beatmap.as_mut() {
            cursor.poll(elapsed, rng, &mut out);
        }
        if let Some(interval) = self.interval.as_mut() {
            interval.poll(elapsed, delta_time, rng, &mut out);
        }
        out
    }
}
