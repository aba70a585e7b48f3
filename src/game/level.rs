use crate::config::{self, ConfigError};
use crate::game::judgment::TimingWindows;
use crate::game::lane::{Lane, NUM_LANES};
use crate::game::life::{DEFAULT_INITIAL_HEALTH, DEFAULT_MAX_HEALTH, DEFAULT_MISS_PENALTY};
use crate::game::spawn::{DEFAULT_LOOP_TOLERANCE, DEFAULT_SPAWN_DECAY};

/// Seconds before the end of the track at which a track-completion level is won.
pub const TRACK_END_MARGIN: f32 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WinCondition {
    ScoreThreshold(u32),
    TrackCompletion { track_length: f32, end_margin: f32 },
}

impl WinCondition {
    pub fn track(track_length: f32) -> Self {
        WinCondition::TrackCompletion {
            track_length,
            end_margin: TRACK_END_MARGIN,
        }
    }

    pub fn is_met(&self, score: u32, elapsed: f32) -> bool {
        match *self {
            WinCondition::ScoreThreshold(threshold) => score >= threshold,
            WinCondition::TrackCompletion {
                track_length,
                end_margin,
            } => elapsed >= track_length - end_margin,
        }
    }

    /// Fraction of the way to the win, in `[0, 1]`.
    pub fn progress(&self, score: u32, elapsed: f32) -> f32 {
        let ratio = match *self {
            WinCondition::ScoreThreshold(0) => 1.0,
            WinCondition::ScoreThreshold(threshold) => score as f32 / threshold as f32,
            WinCondition::TrackCompletion {
                track_length,
                end_margin,
            } => {
                let goal = track_length - end_margin;
                if goal <= 0.0 { 1.0 } else { elapsed / goal }
            }
        };
        ratio.clamp(0.0, 1.0)
    }
}

/// Screen-space geometry. Notes rise from `spawn_y` towards `target_y`
/// (y decreases over time).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Playfield {
    pub spawn_y: f32,
    pub target_y: f32,
    /// How far past the target line a falling note may travel before it is missed.
    pub miss_distance: f32,
    /// Resolved notes above this line are pruned.
    pub exit_y: f32,
    pub lane_x: [f32; NUM_LANES],
}

impl Playfield {
    #[inline(always)]
    pub fn lane_x(&self, lane: Lane) -> f32 {
        self.lane_x[lane.index()]
    }

    #[inline(always)]
    pub fn miss_line(&self) -> f32 {
        self.target_y - self.miss_distance
    }
}

impl Default for Playfield {
    fn default() -> Self {
        let center = config::PLAYFIELD_WIDTH / 2.0;
        let spacing = config::LANE_SPACING;
        Self {
            spawn_y: config::PLAYFIELD_HEIGHT,
            target_y: config::TARGET_Y,
            miss_distance: config::MISS_DISTANCE,
            exit_y: 0.0,
            lane_x: [
                center - 1.5 * spacing,
                center - 0.5 * spacing,
                center + 0.5 * spacing,
                center + 1.5 * spacing,
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelConfig {
    pub name: String,
    /// Units per second.
    pub note_speed: f32,
    pub spawn_interval_start: f32,
    pub spawn_interval_min: f32,
    pub spawn_interval_decay: f32,
    pub win_condition: WinCondition,
    pub max_health: u32,
    pub initial_health: u32,
    pub miss_penalty: u32,
    pub timing_windows: TimingWindows,
    pub playfield: Playfield,
    pub loop_tolerance: f32,
    /// Keep the interval spawner running even when a beatmap drives spawns.
    pub supplementary_interval: bool,
    /// Most a single tick may add to the interval spawn timer.
    pub max_frame_delta: f32,
}

impl LevelConfig {
    fn base(name: &str, per_tick_speed: f32, interval_min: f32, perfect_health: u32) -> Self {
        Self {
            name: name.to_string(),
            note_speed: per_tick_speed * config::REFERENCE_TICK_RATE,
            spawn_interval_start: 1.5,
            spawn_interval_min: interval_min,
            spawn_interval_decay: DEFAULT_SPAWN_DECAY,
            win_condition: WinCondition::ScoreThreshold(2000),
            max_health: DEFAULT_MAX_HEALTH,
            initial_health: DEFAULT_INITIAL_HEALTH,
            miss_penalty: DEFAULT_MISS_PENALTY,
            timing_windows: TimingWindows::standard(perfect_health),
            playfield: Playfield::default(),
            loop_tolerance: DEFAULT_LOOP_TOLERANCE,
            supplementary_interval: false,
            max_frame_delta: config::MAX_DELTA_TIME,
        }
    }

    /// Built-in levels 1..=3. Anything else yields `None`.
    pub fn preset(level: u32) -> Option<Self> {
        match level {
            1 => Some(Self::base("Level 1", 5.0, 0.35, 10)),
            2 => Some(Self::base("Level 2", 8.0, 0.3, 5)),
            3 => Some(Self::base("Level 3", 10.0, 0.3, 2)),
            _ => None,
        }
    }

    /// Seconds a note takes from spawn to the target line.
    pub fn travel_time(&self) -> f32 {
        (self.playfield.spawn_y - self.playfield.target_y) / self.note_speed
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field,
                    value: value.to_string(),
                })
            }
        }

        positive("note_speed", self.note_speed)?;
        positive("spawn_interval_start", self.spawn_interval_start)?;
        positive("spawn_interval_min", self.spawn_interval_min)?;
        positive("spawn_interval_decay", self.spawn_interval_decay)?;
        positive("max_frame_delta", self.max_frame_delta)?;
        if self.spawn_interval_min > self.spawn_interval_start {
            return Err(ConfigError::InvalidValue {
                field: "spawn_interval_min",
                value: format!(
                    "{} (greater than start {})",
                    self.spawn_interval_min, self.spawn_interval_start
                ),
            });
        }
        if self.spawn_interval_decay > 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "spawn_interval_decay",
                value: self.spawn_interval_decay.to_string(),
            });
        }
        if self.max_health == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_health",
                value: "0".to_string(),
            });
        }
        if !(self.loop_tolerance.is_finite() && self.loop_tolerance >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "loop_tolerance",
                value: self.loop_tolerance.to_string(),
            });
        }
        if self.playfield.spawn_y <= self.playfield.target_y {
            return Err(ConfigError::InvalidValue {
                field: "spawn_y",
                value: format!(
                    "{} (must be below target line {})",
                    self.playfield.spawn_y, self.playfield.target_y
                ),
            });
        }
        if !(self.playfield.miss_distance.is_finite() && self.playfield.miss_distance >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "miss_distance",
                value: self.playfield.miss_distance.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self::base("Level 1", 5.0, 0.35, 10)
    }
}
