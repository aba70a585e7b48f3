use beatdrop::config::{self, REFERENCE_TICK_RATE};
use beatdrop::game::clock::{ManualClock, TimeSource};
use beatdrop::game::input::InputEdge;
use beatdrop::game::judgment::JudgeGrade;
use beatdrop::game::rank::DEFAULT_MAX_SCORE;
use beatdrop::game::lane::NUM_LANES;
use beatdrop::game::{Beatmap, Lane, Session, SessionOutcome};
use log::{LevelFilter, error, info};
use std::error::Error;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "levels.ini";
const INTERVAL_ONLY_RUN_SECONDS: f32 = 120.0;
const RUN_TAIL_SECONDS: f32 = 2.0;

fn main() -> Result<(), Box<dyn Error>> {
    // RUST_LOG overrides these defaults.
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("beatdrop::game::spawn", LevelFilter::Warn)
        .parse_default_env()
        .init();

    info!("beatdrop starting (headless autoplay).");

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let level_number: usize = match args.next() {
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("Level number '{}' is not valid: {}", raw, e))?,
        None => 1,
    };
    let beatmap = match args.next() {
        Some(path) => Beatmap::load_or_empty(Path::new(&path)),
        None => Beatmap::empty(),
    };

    let game_config = config::load_levels(Path::new(&config_path));
    let Some(level) = game_config.level(level_number).cloned() else {
        error!(
            "Level {} does not exist ({} configured).",
            level_number,
            game_config.levels.len()
        );
        return Err(format!("unknown level {}", level_number).into());
    };

    let run_seconds = match beatmap.last_time() {
        Some(last) => last + level.travel_time() + RUN_TAIL_SECONDS,
        None => INTERVAL_ONLY_RUN_SECONDS,
    };
    let perfect_window = level
        .timing_windows
        .tier_for(JudgeGrade::Perfect)
        .map_or(level.timing_windows.max_window(), |t| t.cutoff);

    let mut autoplay = Autoplay::new(perfect_window);
    let mut session = Session::new(level, beatmap);
    let mut clock = ManualClock::at(0.0);
    let frame = 1.0 / REFERENCE_TICK_RATE;

    while session.outcome() == SessionOutcome::Playing {
        let Some(now) = clock.elapsed() else {
            break;
        };
        if now > run_seconds {
            break;
        }
        session.tick_from(&clock);
        autoplay.frame(&mut session, now);
        clock.advance(frame);
    }

    let snapshot = session.snapshot();
    let judgement = snapshot.judgement;
    info!(
        "Finished at {:.2}s: {:?}, score {}, max combo {}, misses {}, health {}/{}.",
        snapshot.elapsed,
        snapshot.outcome,
        judgement.score,
        judgement.max_combo,
        judgement.misses,
        judgement.health.value(),
        judgement.health.max()
    );
    info!(
        "Perfect {} / Good {} / Bad {} / Miss {}, rank '{}'.",
        session.judgment_count(JudgeGrade::Perfect),
        session.judgment_count(JudgeGrade::Good),
        session.judgment_count(JudgeGrade::Bad),
        session.judgment_count(JudgeGrade::Miss),
        session.rank(DEFAULT_MAX_SCORE)
    );

    Ok(())
}

/// Presses a lane when its closest falling note is inside the perfect window.
/// A lane pressed last frame is released first, so back-to-back notes in the
/// same lane each get a fresh key-down edge.
struct Autoplay {
    perfect_window: f32,
    held: [bool; NUM_LANES],
}

impl Autoplay {
    fn new(perfect_window: f32) -> Self {
        Self {
            perfect_window,
            held: [false; NUM_LANES],
        }
    }

    fn frame(&mut self, session: &mut Session, now: f32) {
        let target_y = session.level().playfield.target_y;
        for lane in Lane::ALL {
            let due = session
                .notes()
                .iter()
                .filter(|n| n.lane == lane && n.is_falling())
                .any(|n| n.distance_to(target_y) < self.perfect_window);
            let press = due && !self.held[lane.index()];
            self.held[lane.index()] = press;
            session.handle_edge(InputEdge {
                lane,
                pressed: press,
                timestamp: now,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatdrop::game::level::Playfield;
    use beatdrop::game::{LevelConfig, WinCondition};

    #[test]
    fn back_to_back_notes_in_one_lane_are_both_hit() {
        let level = LevelConfig {
            note_speed: 60.0,
            win_condition: WinCondition::ScoreThreshold(u32::MAX),
            playfield: Playfield {
                spawn_y: 110.0,
                ..Playfield::default()
            },
            spawn_interval_start: 1000.0,
            spawn_interval_min: 1000.0,
            ..LevelConfig::default()
        };
        let mut session = Session::with_seed(level, Beatmap::empty(), 7);
        let mut autoplay = Autoplay::new(15.0);
        let frame = 1.0 / REFERENCE_TICK_RATE;

        session.tick(0.0);
        session.spawn(Lane::Left);
        autoplay.frame(&mut session, 0.0);
        assert_eq!(session.judgment_count(JudgeGrade::Perfect), 1);

        session.tick(frame);
        session.spawn(Lane::Left);
        autoplay.frame(&mut session, frame);
        session.tick(2.0 * frame);
        autoplay.frame(&mut session, 2.0 * frame);

        assert_eq!(session.judgment_count(JudgeGrade::Perfect), 2);
        assert_eq!(session.judgment_count(JudgeGrade::Miss), 0);
    }
}
