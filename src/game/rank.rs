use std::fmt;

/// Reference score that rank ratios are measured against.
pub const DEFAULT_MAX_SCORE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Sss,
    Ss,
    S,
    A,
    B,
    C,
    Unranked,
}

impl Rank {
    pub fn label(&self) -> &'static str {
        match self {
            Rank::Sss => "SSS",
            Rank::Ss => "SS",
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::Unranked => "",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn performance_rank(score: u32, max_score: u32) -> Rank {
    if max_score == 0 {
        return Rank::Unranked;
    }
    let ratio = score as f64 / max_score as f64;
    if ratio >= 0.95 { Rank::Sss }
    else if ratio >= 0.85 { Rank::Ss }
    else if ratio >= 0.70 { Rank::S }
    else if ratio >= 0.55 { Rank::A }
    else if ratio >= 0.40 { Rank::B }
    else if ratio >= 0.20 { Rank::C }
    else { Rank::Unranked }
}
