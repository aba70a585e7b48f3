pub mod beatmap;
pub mod clock;
pub mod input;
pub mod judgment;
pub mod lane;
pub mod level;
pub mod life;
pub mod note;
pub mod rank;
pub mod session;
pub mod spawn;

pub use beatmap::Beatmap;
pub use judgment::JudgeGrade;
pub use lane::Lane;
pub use level::{LevelConfig, WinCondition};
pub use session::{Session, SessionOutcome, Snapshot, TickReport};
