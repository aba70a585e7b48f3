use crate::game::lane::Lane;
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeatmapError {
    #[error("Failed to read beatmap file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse beatmap JSON")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timestamp {time} at index {index}")]
    InvalidTimestamp { index: usize, time: f32 },

    #[error("Timestamp {time} at index {index} does not increase on the previous one")]
    NotIncreasing { index: usize, time: f32 },
}

/// One scheduled spawn. `lane` is fixed for recorded charts and `None` for
/// beat-tracked ones, where the engine picks a lane at random.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BeatEntry {
    pub time: f32,
    pub lane: Option<Lane>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Time(f32),
    Recorded { time: f32, direction: Lane },
}

impl From<RawEntry> for BeatEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Time(time) => BeatEntry { time, lane: None },
            RawEntry::Recorded { time, direction } => BeatEntry {
                time,
                lane: Some(direction),
            },
        }
    }
}

/// Immutable, strictly increasing list of spawn timestamps (seconds from
/// track start).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Beatmap {
    entries: Vec<BeatEntry>,
}

impl Beatmap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<BeatEntry>) -> Result<Self, BeatmapError> {
        let mut previous: Option<f32> = None;
        for (index, entry) in entries.iter().enumerate() {
            if !entry.time.is_finite() || entry.time < 0.0 {
                return Err(BeatmapError::InvalidTimestamp {
                    index,
                    time: entry.time,
                });
            }
            if previous.is_some_and(|p| entry.time <= p) {
                return Err(BeatmapError::NotIncreasing {
                    index,
                    time: entry.time,
                });
            }
            previous = Some(entry.time);
        }
        Ok(Self { entries })
    }

    pub fn from_times(times: &[f32]) -> Result<Self, BeatmapError> {
        Self::from_entries(
            times
                .iter()
                .map(|&time| BeatEntry { time, lane: None })
                .collect(),
        )
    }

    /// Accepts either a bare array of seconds or an array of
    /// `{ "time": .., "direction": .. }` records.
    pub fn from_json(text: &str) -> Result<Self, BeatmapError> {
        let raw: Vec<RawEntry> = serde_json::from_str(text)?;
        Self::from_entries(raw.into_iter().map(BeatEntry::from).collect())
    }

    pub fn load(path: &Path) -> Result<Self, BeatmapError> {
        let text = fs::read_to_string(path).map_err(|source| BeatmapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Missing or malformed beatmaps degrade to an empty one, which puts the
    /// session in interval-only spawning.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(beatmap) => {
                info!(
                    "Loaded beatmap '{}' with {} beats.",
                    path.display(),
                    beatmap.len()
                );
                beatmap
            }
            Err(e) => {
                warn!(
                    "Beatmap '{}' unusable ({}); falling back to interval spawning.",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BeatEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[BeatEntry] {
        &self.entries
    }

    pub fn last_time(&self) -> Option<f32> {
        self.entries.last().map(|e| e.time)
    }
}
