use crate::game::input::KeyBindings;
use crate::game::judgment::{JudgeGrade, JudgmentTier, TimingWindows};
use crate::game::lane::Lane;
use crate::game::level::{LevelConfig, WinCondition};
use configparser::ini::Ini;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use thiserror::Error;

// Playfield reference (1280x720)
pub const PLAYFIELD_WIDTH: f32 = 1280.0;
pub const PLAYFIELD_HEIGHT: f32 = 720.0;
pub const TARGET_Y: f32 = 100.0;
pub const LANE_SPACING: f32 = 100.0;
pub const MISS_DISTANCE: f32 = 50.0;

// Timing
pub const REFERENCE_TICK_RATE: f32 = 60.0;
pub const MAX_DELTA_TIME: f32 = 0.25;

const LEVEL_SECTION_PREFIX: &str = "level.";
const KEYS_SECTION: &str = "keys";

// (grade, window key, score key, health key)
const TIER_KEYS: [(JudgeGrade, &str, &str, &str); 3] = [
    (JudgeGrade::Perfect, "perfect_window", "perfect_score", "perfect_health"),
    (JudgeGrade::Good, "good_window", "good_score", "good_health"),
    (JudgeGrade::Bad, "bad_window", "bad_score", "bad_health"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid judgment tiers: {0}")]
    InvalidTiers(String),

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Failed to read config: {0}")]
    Ini(String),
}

static PRESETS: Lazy<Vec<LevelConfig>> =
    Lazy::new(|| (1..=3).filter_map(LevelConfig::preset).collect());

/// Built-in level table.
pub fn default_levels() -> Vec<LevelConfig> {
    PRESETS.clone()
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub levels: Vec<LevelConfig>,
    pub key_bindings: KeyBindings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl GameConfig {
    /// Level by 1-based number, as shown in the level menu.
    pub fn level(&self, number: usize) -> Option<&LevelConfig> {
        number.checked_sub(1).and_then(|i| self.levels.get(i))
    }
}

/// Reads `path`, falling back to built-in defaults for anything missing or
/// invalid. Never fails.
pub fn load_levels(path: &Path) -> GameConfig {
    let mut ini = Ini::new_cs();
    if let Err(e) = ini.load(path) {
        warn!(
            "Failed to load '{}' ({}), using default levels and key bindings.",
            path.display(),
            e
        );
        return GameConfig::default();
    }
    info!("Loaded config from '{}'.", path.display());
    from_ini(&ini)
}

pub fn parse_levels(text: &str) -> Result<GameConfig, ConfigError> {
    let mut ini = Ini::new_cs();
    ini.read(text.to_string()).map_err(ConfigError::Ini)?;
    Ok(from_ini(&ini))
}

fn from_ini(ini: &Ini) -> GameConfig {
    let mut levels = default_levels();

    let mut sections: Vec<(u32, String)> = ini
        .sections()
        .into_iter()
        .filter_map(|s| {
            let number = s.strip_prefix(LEVEL_SECTION_PREFIX)?.parse::<u32>().ok()?;
            Some((number, s))
        })
        .collect();
    sections.sort_by_key(|(n, _)| *n);

    for (number, section) in sections {
        if number == 0 {
            warn!("Ignoring section [{}]: levels are numbered from 1.", section);
            continue;
        }
        let index = (number - 1) as usize;
        let base = levels
            .get(index)
            .cloned()
            .unwrap_or_else(|| LevelConfig {
                name: format!("Level {}", number),
                ..LevelConfig::default()
            });

        match apply_level_overrides(ini, &section, base) {
            Ok(level) => {
                debug!("Configured {} from [{}].", level.name, section);
                if index < levels.len() {
                    levels[index] = level;
                } else if index == levels.len() {
                    levels.push(level);
                } else {
                    warn!(
                        "Ignoring [{}]: level {} is missing, levels must be contiguous.",
                        section,
                        levels.len() + 1
                    );
                }
            }
            Err(e) => warn!("Ignoring [{}]: {}", section, e),
        }
    }

    GameConfig {
        levels,
        key_bindings: key_bindings_from_ini(ini),
    }
}

fn key_bindings_from_ini(ini: &Ini) -> KeyBindings {
    let Some(section) = ini.get_map_ref().get(KEYS_SECTION) else {
        return KeyBindings::default();
    };

    let mut bindings = KeyBindings::empty();
    for (key, value) in section {
        let Some(value) = value else {
            continue;
        };
        match value.parse::<Lane>() {
            Ok(lane) => bindings.bind(key, lane),
            Err(e) => warn!("Ignoring key binding '{}': {}", key, e),
        }
    }

    if bindings.is_empty() {
        warn!("[keys] has no usable bindings, using defaults.");
        return KeyBindings::default();
    }
    bindings
}

fn get_f32(ini: &Ini, section: &str, key: &'static str) -> Result<Option<f32>, ConfigError> {
    ini.getfloat(section, key)
        .map(|v| v.map(|f| f as f32))
        .map_err(|_| invalid(ini, section, key))
}

fn get_u32(ini: &Ini, section: &str, key: &'static str) -> Result<Option<u32>, ConfigError> {
    match ini.getuint(section, key) {
        Ok(Some(v)) => u32::try_from(v)
            .map(Some)
            .map_err(|_| invalid(ini, section, key)),
        Ok(None) => Ok(None),
        Err(_) => Err(invalid(ini, section, key)),
    }
}

fn get_bool(ini: &Ini, section: &str, key: &'static str) -> Result<Option<bool>, ConfigError> {
    ini.getboolcoerce(section, key)
        .map_err(|_| invalid(ini, section, key))
}

fn invalid(ini: &Ini, section: &str, key: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        field: key,
        value: ini.get(section, key).unwrap_or_default(),
    }
}

fn apply_level_overrides(
    ini: &Ini,
    section: &str,
    mut level: LevelConfig,
) -> Result<LevelConfig, ConfigError> {
    if let Some(name) = ini.get(section, "name") {
        level.name = name;
    }
    if let Some(v) = get_f32(ini, section, "note_speed")? {
        level.note_speed = v;
    }
    if let Some(v) = get_f32(ini, section, "spawn_interval_start")? {
        level.spawn_interval_start = v;
    }
    if let Some(v) = get_f32(ini, section, "spawn_interval_min")? {
        level.spawn_interval_min = v;
    }
    if let Some(v) = get_f32(ini, section, "spawn_interval_decay")? {
        level.spawn_interval_decay = v;
    }
    if let Some(v) = get_u32(ini, section, "max_health")? {
        level.max_health = v;
    }
    if let Some(v) = get_u32(ini, section, "initial_health")? {
        level.initial_health = v;
    }
    if let Some(v) = get_u32(ini, section, "miss_penalty")? {
        level.miss_penalty = v;
    }
    if let Some(v) = get_f32(ini, section, "loop_tolerance")? {
        level.loop_tolerance = v;
    }
    if let Some(v) = get_bool(ini, section, "supplementary_interval")? {
        level.supplementary_interval = v;
    }
    if let Some(v) = get_f32(ini, section, "max_frame_delta")? {
        level.max_frame_delta = v;
    }
    if let Some(v) = get_f32(ini, section, "target_y")? {
        level.playfield.target_y = v;
    }
    if let Some(v) = get_f32(ini, section, "spawn_y")? {
        level.playfield.spawn_y = v;
    }
    if let Some(v) = get_f32(ini, section, "miss_distance")? {
        level.playfield.miss_distance = v;
    }

    // A track length switches the level to track-completion wins.
    if let Some(length) = get_f32(ini, section, "track_length")? {
        if !(length.is_finite() && length > 0.0) {
            return Err(invalid(ini, section, "track_length"));
        }
        level.win_condition = WinCondition::track(length);
    } else if let Some(score) = get_u32(ini, section, "win_score")? {
        level.win_condition = WinCondition::ScoreThreshold(score);
    }

    let mut tiers: Vec<JudgmentTier> = level.timing_windows.tiers().to_vec();
    for (grade, window_key, score_key, health_key) in TIER_KEYS {
        let Some(tier) = tiers.iter_mut().find(|t| t.grade == grade) else {
            continue;
        };
        if let Some(v) = get_f32(ini, section, window_key)? {
            tier.cutoff = v;
        }
        if let Some(v) = get_u32(ini, section, score_key)? {
            tier.score = v;
        }
        if let Some(v) = get_u32(ini, section, health_key)? {
            tier.health = v;
        }
    }
    level.timing_windows = TimingWindows::new(tiers)?;

    level.validate()?;
    Ok(level)
}
