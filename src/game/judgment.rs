use crate::config::ConfigError;
use crate::game::lane::Lane;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JudgeGrade {
    Perfect,
    Good,
    Bad,
    Miss,
}

impl JudgeGrade {
    /// Perfect and Good extend the combo; Bad and Miss break it.
    #[inline(always)]
    pub fn keeps_combo(self) -> bool {
        matches!(self, JudgeGrade::Perfect | JudgeGrade::Good)
    }

    pub fn label(self) -> &'static str {
        match self {
            JudgeGrade::Perfect => "PERFECT",
            JudgeGrade::Good => "GOOD",
            JudgeGrade::Bad => "BAD",
            JudgeGrade::Miss => "MISS",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Judgment {
    pub grade: JudgeGrade,
    /// Absolute distance from the target line; `None` for misses without a note.
    pub distance: Option<f32>,
    pub lane: Lane,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JudgmentTier {
    pub grade: JudgeGrade,
    /// Exclusive upper bound on distance from the target line.
    pub cutoff: f32,
    pub score: u32,
    pub health: u32,
    pub combo_gain: u32,
}

impl JudgmentTier {
    pub const fn new(grade: JudgeGrade, cutoff: f32, score: u32, health: u32) -> Self {
        Self {
            grade,
            cutoff,
            score,
            health,
            combo_gain: if matches!(grade, JudgeGrade::Perfect | JudgeGrade::Good) {
                1
            } else {
                0
            },
        }
    }
}

/// Ordered, non-overlapping distance windows. Cutoffs are strictly increasing,
/// so the first tier whose cutoff exceeds the distance is the tightest match.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingWindows {
    tiers: Vec<JudgmentTier>,
}

impl TimingWindows {
    pub fn new(tiers: Vec<JudgmentTier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::InvalidTiers("no tiers defined".to_string()));
        }

        let mut last_cutoff = 0.0_f32;
        for tier in &tiers {
            if tier.grade == JudgeGrade::Miss {
                return Err(ConfigError::InvalidTiers(
                    "Miss cannot be a hit tier".to_string(),
                ));
            }
            if !tier.cutoff.is_finite() || tier.cutoff <= last_cutoff {
                return Err(ConfigError::InvalidTiers(format!(
                    "cutoff {} for {:?} must be finite and greater than {}",
                    tier.cutoff, tier.grade, last_cutoff
                )));
            }
            last_cutoff = tier.cutoff;
        }

        Ok(Self { tiers })
    }

    /// Per-level variant: health bonus on a perfect differs between levels.
    pub fn standard(perfect_health: u32) -> Self {
        Self {
            tiers: vec![
                JudgmentTier::new(JudgeGrade::Perfect, 15.0, 100, perfect_health),
                JudgmentTier::new(JudgeGrade::Good, 35.0, 50, 5),
                JudgmentTier::new(JudgeGrade::Bad, 55.0, 10, 2),
            ],
        }
    }

    pub fn tiers(&self) -> &[JudgmentTier] {
        &self.tiers
    }

    /// Widest cutoff; anything at or beyond it is not a hit.
    pub fn max_window(&self) -> f32 {
        self.tiers.last().map_or(0.0, |t| t.cutoff)
    }

    pub fn tier_for(&self, grade: JudgeGrade) -> Option<&JudgmentTier> {
        self.tiers.iter().find(|t| t.grade == grade)
    }

    pub fn classify(&self, distance: f32) -> Option<&JudgmentTier> {
        if !distance.is_finite() {
            return None;
        }
        let distance = distance.abs();
        self.tiers.iter().find(|t| distance < t.cutoff)
    }
}

impl Default for TimingWindows {
    fn default() -> Self {
        Self::standard(10)
    }
}
