use crate::game::beatmap::Beatmap;
use crate::game::clock::TimeSource;
use crate::game::input::{InputEdge, KeyBindings, LaneEdges};
use crate::game::judgment::{JudgeGrade, Judgment, JudgmentTier};
use crate::game::lane::Lane;
use crate::game::level::LevelConfig;
use crate::game::life::Health;
use crate::game::note::{Note, NoteState};
use crate::game::rank::{self, Rank};
use crate::game::spawn::{IntervalSpawner, SpawnRequest, SpawnSchedule};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Playing,
    Won,
    Lost,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JudgementState {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub misses: u32,
    pub health: Health,
}

impl JudgementState {
    pub fn new(level: &LevelConfig) -> Self {
        Self {
            score: 0,
            combo: 0,
            max_combo: 0,
            misses: 0,
            health: Health::new(level.initial_health, level.max_health),
        }
    }
}

/// A falling note that crossed the miss line this tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MissEvent {
    pub lane: Lane,
    pub y: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub spawned: Vec<SpawnRequest>,
    pub missed: Vec<MissEvent>,
}

/// Read-only view published after each tick for renderers and decorations.
#[derive(Clone, Debug)]
pub struct Snapshot<'a> {
    pub notes: &'a [Note],
    pub judgement: JudgementState,
    pub last_judgment: Option<&'a Judgment>,
    pub outcome: SessionOutcome,
    pub elapsed: f32,
}

pub struct Session {
    level: LevelConfig,
    notes: Vec<Note>,
    judgement: JudgementState,
    judgment_counts: HashMap<JudgeGrade, u32>,
    schedule: SpawnSchedule,
    rng: StdRng,
    outcome: SessionOutcome,
    outcome_time: Option<f32>,
    last_judgment: Option<Judgment>,
    current_time: f32,
    last_elapsed: Option<f32>,
    lane_edges: LaneEdges,
}

fn empty_counts() -> HashMap<JudgeGrade, u32> {
    HashMap::from_iter([
        (JudgeGrade::Perfect, 0),
        (JudgeGrade::Good, 0),
        (JudgeGrade::Bad, 0),
        (JudgeGrade::Miss, 0),
    ])
}

impl Session {
    pub fn new(level: LevelConfig, beatmap: Beatmap) -> Self {
        Self::with_rng(level, beatmap, StdRng::from_os_rng())
    }

    /// Deterministic lane choice for replays and tests.
    pub fn with_seed(level: LevelConfig, beatmap: Beatmap, seed: u64) -> Self {
        Self::with_rng(level, beatmap, StdRng::seed_from_u64(seed))
    }

    fn with_rng(level: LevelConfig, beatmap: Beatmap, rng: StdRng) -> Self {
        let beats = beatmap.len();
        let interval = IntervalSpawner::new(
            level.spawn_interval_start,
            level.spawn_interval_min,
            level.spawn_interval_decay,
        );
        let schedule = SpawnSchedule::new(
            beatmap,
            interval,
            level.loop_tolerance,
            level.supplementary_interval,
        );

        info!(
            "Starting '{}' ({} units/s, travel {:.2}s, win {:?}).",
            level.name,
            level.note_speed,
            level.travel_time(),
            level.win_condition
        );
        if schedule.has_beatmap() {
            info!(
                "Spawning from beatmap with {} beats{}.",
                beats,
                if schedule.interval().is_some() {
                    " plus interval spawns"
                } else {
                    ""
                }
            );
        } else {
            info!(
                "No beatmap; interval spawning from {:.2}s down to {:.2}s.",
                level.spawn_interval_start, level.spawn_interval_min
            );
        }

        Self {
            judgement: JudgementState::new(&level),
            level,
            notes: Vec::new(),
            judgment_counts: empty_counts(),
            schedule,
            rng,
            outcome: SessionOutcome::Playing,
            outcome_time: None,
            last_judgment: None,
            current_time: 0.0,
            last_elapsed: None,
            lane_edges: LaneEdges::new(),
        }
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn judgement(&self) -> &JudgementState {
        &self.judgement
    }

    pub fn judgment_count(&self, grade: JudgeGrade) -> u32 {
        self.judgment_counts.get(&grade).copied().unwrap_or(0)
    }

    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    /// Playback time at which the session was won or lost.
    pub fn outcome_time(&self) -> Option<f32> {
        self.outcome_time
    }

    pub fn last_judgment(&self) -> Option<&Judgment> {
        self.last_judgment.as_ref()
    }

    pub fn schedule(&self) -> &SpawnSchedule {
        &self.schedule
    }

    pub fn elapsed(&self) -> f32 {
        self.current_time
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            notes: &self.notes,
            judgement: self.judgement,
            last_judgment: self.last_judgment.as_ref(),
            outcome: self.outcome,
            elapsed: self.current_time,
        }
    }

    pub fn progress(&self) -> f32 {
        self.level
            .win_condition
            .progress(self.judgement.score, self.current_time)
    }

    pub fn rank(&self, max_score: u32) -> Rank {
        rank::performance_rank(self.judgement.score, max_score)
    }

    /// Back to `Playing` with fresh judgement state and a rewound schedule.
    pub fn restart(&mut self) {
        info!("Restarting '{}'.", self.level.name);
        self.notes.clear();
        self.judgement = JudgementState::new(&self.level);
        self.judgment_counts = empty_counts();
        self.schedule.reset();
        self.outcome = SessionOutcome::Playing;
        self.outcome_time = None;
        self.last_judgment = None;
        self.current_time = 0.0;
        self.last_elapsed = None;
        self.lane_edges.release_all();
    }

    /// Samples `clock` and ticks. Returns `None` while the clock is not playing.
    pub fn tick_from(&mut self, clock: &dyn TimeSource) -> Option<TickReport> {
        clock.elapsed().map(|elapsed| self.tick(elapsed))
    }

    /// Advances the session to `elapsed` seconds of playback.
    pub fn tick(&mut self, elapsed: f32) -> TickReport {
        let mut report = TickReport::default();
        if self.outcome != SessionOutcome::Playing || !elapsed.is_finite() {
            return report;
        }

        let previous = self.last_elapsed;
        let raw_delta = match previous {
            Some(last) if elapsed > last => elapsed - last,
            _ => 0.0,
        };
        self.last_elapsed = Some(elapsed);
        self.current_time = elapsed;

        match previous {
            // Track loop: notes on the field keep their height.
            Some(last) if elapsed < last - self.level.loop_tolerance => {
                for note in &mut self.notes {
                    note.rebase(elapsed - last);
                }
            }
            _ => {
                for note in &mut self.notes {
                    note.sync_to(elapsed);
                }
            }
        }

        let miss_line = self.level.playfield.miss_line();
        for note in &mut self.notes {
            if note.is_falling() && note.y < miss_line && note.mark_missed() {
                report.missed.push(MissEvent {
                    lane: note.lane,
                    y: note.y,
                });
            }
        }
        for event in &report.missed {
            self.apply_expired_miss(event.lane);
        }

        let exit_y = self.level.playfield.exit_y;
        self.notes.retain(|n| match n.state {
            NoteState::Falling => true,
            NoteState::Hit => false,
            NoteState::Missed => n.y >= exit_y,
        });

        let spawn_delta = raw_delta.min(self.level.max_frame_delta);
        report.spawned = self.schedule.poll(elapsed, spawn_delta, &mut self.rng);
        for request in &report.spawned {
            self.spawn_at(request.lane, request.time);
        }

        self.update_outcome();
        report
    }

    /// Puts a new falling note at the bottom of `lane`.
    pub fn spawn(&mut self, lane: Lane) {
        self.spawn_at(lane, self.current_time);
    }

    /// Spawns a note that entered the field at playback time `time`, already
    /// moved up to where the clock puts it now.
    fn spawn_at(&mut self, lane: Lane, time: f32) {
        let field = &self.level.playfield;
        let mut note = Note::new(
            lane,
            field.lane_x(lane),
            field.spawn_y,
            self.level.note_speed,
            time,
        );
        note.sync_to(self.current_time);
        self.notes.push(note);
    }

    /// Feeds one raw input edge. Only fresh key-down edges are judged.
    pub fn handle_edge(&mut self, edge: InputEdge) -> Option<JudgeGrade> {
        if !self.lane_edges.accept(&edge) {
            return None;
        }
        self.resolve_press(edge.lane)
    }

    /// Looks `key` up in `bindings`; unbound keys are ignored.
    pub fn handle_key(
        &mut self,
        bindings: &KeyBindings,
        key: &str,
        pressed: bool,
        timestamp: f32,
    ) -> Option<JudgeGrade> {
        let lane = bindings.lane_for(key)?;
        self.handle_edge(InputEdge {
            lane,
            pressed,
            timestamp,
        })
    }

    /// Judges a press in `lane` against the closest falling note there.
    ///
    /// Returns the tier that was awarded, `Some(Miss)` when nothing in the lane
    /// was close enough, or `None` when the session is no longer playing.
    pub fn resolve_press(&mut self, lane: Lane) -> Option<JudgeGrade> {
        if self.outcome != SessionOutcome::Playing {
            return None;
        }

        let target_y = self.level.playfield.target_y;
        let candidate = self
            .notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.lane == lane && n.is_falling())
            .map(|(i, n)| (i, n.distance_to(target_y)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let judged = candidate.and_then(|(index, distance)| {
            self.level
                .timing_windows
                .classify(distance)
                .map(|tier| (index, distance, *tier))
        });

        let grade = match judged {
            Some((index, distance, tier)) => {
                self.notes[index].mark_hit();
                self.apply_hit(lane, distance, tier);
                tier.grade
            }
            None => {
                self.apply_press_miss(lane);
                JudgeGrade::Miss
            }
        };

        self.update_outcome();
        Some(grade)
    }

    fn apply_hit(&mut self, lane: Lane, distance: f32, tier: JudgmentTier) {
        let state = &mut self.judgement;
        state.score = state.score.saturating_add(tier.score);
        if tier.grade.keeps_combo() {
            state.combo = state.combo.saturating_add(tier.combo_gain);
            state.max_combo = state.max_combo.max(state.combo);
        } else {
            state.combo = 0;
        }
        state.health.gain(tier.health);
        *self.judgment_counts.entry(tier.grade).or_insert(0) += 1;

        debug!(
            "{} on {} at {:.1} units (score {}, combo {}).",
            tier.grade.label(),
            lane,
            distance,
            state.score,
            state.combo
        );
        self.last_judgment = Some(Judgment {
            grade: tier.grade,
            distance: Some(distance),
            lane,
        });
    }

    fn apply_expired_miss(&mut self, lane: Lane) {
        self.judgement.misses = self.judgement.misses.saturating_add(1);
        self.apply_penalty(lane);
    }

    /// Empty press: breaks combo and costs health, but no note is consumed.
    fn apply_press_miss(&mut self, lane: Lane) {
        self.apply_penalty(lane);
    }

    fn apply_penalty(&mut self, lane: Lane) {
        self.judgement.combo = 0;
        self.judgement.health.lose(self.level.miss_penalty);
        *self.judgment_counts.entry(JudgeGrade::Miss).or_insert(0) += 1;
        debug!(
            "MISS on {} (health {}/{}).",
            lane,
            self.judgement.health.value(),
            self.judgement.health.max()
        );
        self.last_judgment = Some(Judgment {
            grade: JudgeGrade::Miss,
            distance: None,
            lane,
        });
    }

    fn update_outcome(&mut self) {
        if self.outcome != SessionOutcome::Playing {
            return;
        }
        if self.judgement.health.is_empty() {
            self.outcome = SessionOutcome::Lost;
        } else if self
            .level
            .win_condition
            .is_met(self.judgement.score, self.current_time)
        {
            self.outcome = SessionOutcome::Won;
        } else {
            return;
        }
        self.outcome_time = Some(self.current_time);
        info!(
            "'{}' {:?} at {:.2}s with score {} (max combo {}, misses {}).",
            self.level.name,
            self.outcome,
            self.current_time,
            self.judgement.score,
            self.judgement.max_combo,
            self.judgement.misses
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::WinCondition;

    fn level() -> LevelConfig {
        LevelConfig {
            win_condition: WinCondition::ScoreThreshold(1_000_000),
            ..LevelConfig::default()
        }
    }

    fn session() -> Session {
        Session::with_seed(level(), Beatmap::empty(), 1)
    }

    /// Spawns a note in `lane` backdated so it sits `distance` above the
    /// target line at the current time.
    fn place(session: &mut Session, lane: Lane, distance: f32) {
        let now = session.current_time;
        let target_y = session.level.playfield.target_y;
        session.spawn(lane);
        if let Some(note) = session.notes.last_mut() {
            note.spawned_at = now - (note.spawn_y - (target_y + distance)) / note.speed;
            note.y = target_y + distance;
        }
    }

    #[test]
    fn perfect_hit_scores_and_extends_combo() {
        let mut s = session();
        place(&mut s, Lane::Left, 3.0);
        assert_eq!(s.resolve_press(Lane::Left), Some(JudgeGrade::Perfect));
        let j = s.judgement();
        assert_eq!(j.score, 100);
        assert_eq!(j.combo, 1);
        assert_eq!(j.health.value(), 110);
        assert_eq!(s.notes()[0].state, NoteState::Hit);
        assert_eq!(s.judgment_count(JudgeGrade::Perfect), 1);
    }

    #[test]
    fn boundary_distance_is_judged_good() {
        let mut s = session();
        place(&mut s, Lane::Up, 15.0);
        assert_eq!(s.resolve_press(Lane::Up), Some(JudgeGrade::Good));
        assert_eq!(s.judgement().score, 50);
    }

    #[test]
    fn notes_below_the_target_line_judge_by_absolute_distance() {
        let mut s = session();
        place(&mut s, Lane::Down, -20.0);
        assert_eq!(s.resolve_press(Lane::Down), Some(JudgeGrade::Good));
    }

    #[test]
    fn bad_hit_resets_combo_without_counting_a_miss() {
        let mut s = session();
        place(&mut s, Lane::Right, 0.0);
        place(&mut s, Lane::Left, 40.0);
        s.resolve_press(Lane::Right);
        assert_eq!(s.judgement().combo, 1);
        assert_eq!(s.resolve_press(Lane::Left), Some(JudgeGrade::Bad));
        assert_eq!(s.judgement().combo, 0);
        assert_eq!(s.judgement().misses, 0);
        assert_eq!(s.judgement().score, 110);
        assert_eq!(s.judgement().max_combo, 1);
    }

    #[test]
    fn press_picks_the_nearest_note_in_lane() {
        let mut s = session();
        place(&mut s, Lane::Up, 50.0);
        place(&mut s, Lane::Up, 5.0);
        place(&mut s, Lane::Down, 0.0);
        assert_eq!(s.resolve_press(Lane::Up), Some(JudgeGrade::Perfect));
        assert_eq!(s.notes()[0].state, NoteState::Falling);
        assert_eq!(s.notes()[1].state, NoteState::Hit);
        assert_eq!(s.notes()[2].state, NoteState::Falling);
    }

    #[test]
    fn empty_press_penalises_without_touching_notes() {
        let mut s = session();
        place(&mut s, Lane::Left, 0.0);
        place(&mut s, Lane::Up, 200.0);
        s.resolve_press(Lane::Left);
        let before: Vec<NoteState> = s.notes().iter().map(|n| n.state).collect();

        assert_eq!(s.resolve_press(Lane::Up), Some(JudgeGrade::Miss));
        assert_eq!(s.resolve_press(Lane::Right), Some(JudgeGrade::Miss));

        let after: Vec<NoteState> = s.notes().iter().map(|n| n.state).collect();
        assert_eq!(before, after);
        assert_eq!(s.judgement().combo, 0);
        assert_eq!(s.judgement().health.value(), 110 - 10);
        assert_eq!(s.judgement().misses, 0);
        assert_eq!(s.last_judgment().map(|j| j.grade), Some(JudgeGrade::Miss));
    }

    #[test]
    fn auto_repeat_presses_are_judged_once() {
        let mut s = session();
        place(&mut s, Lane::Down, 0.0);
        let down = InputEdge {
            lane: Lane::Down,
            pressed: true,
            timestamp: 0.0,
        };
        assert_eq!(s.handle_edge(down), Some(JudgeGrade::Perfect));
        assert_eq!(s.handle_edge(down), None);
        assert_eq!(s.judgement().health.value(), 110);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut s = session();
        let bindings = KeyBindings::default();
        assert_eq!(s.handle_key(&bindings, "Space", true, 0.0), None);
        assert_eq!(s.judgement(), &JudgementState::new(s.level()));
        assert_eq!(
            s.handle_key(&bindings, "KeyA", true, 0.0),
            Some(JudgeGrade::Miss)
        );
    }

    #[test]
    fn expired_note_is_missed_once_and_pruned_off_screen() {
        let mut s = session();
        s.tick(0.0);
        place(&mut s, Lane::Left, -48.5);
        let speed = s.level.note_speed;

        let report = s.tick(1.0 / speed);
        assert!(report.missed.is_empty());
        let report = s.tick(2.0 / speed);
        assert_eq!(report.missed.len(), 1);
        assert_eq!(s.judgement().misses, 1);

        let report = s.tick(3.0 / speed);
        assert!(report.missed.is_empty());
        assert_eq!(s.judgement().misses, 1);
        assert_eq!(s.notes().len(), 1);

        s.tick(0.25);
        assert!(s.notes().is_empty());
        assert_eq!(s.judgement().misses, 1);
    }

    #[test]
    fn hit_notes_are_pruned_on_next_tick_without_losing_score() {
        let mut s = session();
        s.tick(0.0);
        place(&mut s, Lane::Right, 0.0);
        s.resolve_press(Lane::Right);
        s.tick(0.01);
        assert!(s.notes().iter().all(|n| n.is_falling()));
        assert_eq!(s.judgement().score, 100);
    }

    #[test]
    fn score_threshold_wins_and_freezes_session() {
        let mut level = level();
        level.win_condition = WinCondition::ScoreThreshold(200);
        let mut s = Session::with_seed(level, Beatmap::empty(), 3);
        place(&mut s, Lane::Left, 0.0);
        place(&mut s, Lane::Down, 0.0);
        s.resolve_press(Lane::Left);
        assert_eq!(s.outcome(), SessionOutcome::Playing);
        s.resolve_press(Lane::Down);
        assert_eq!(s.outcome(), SessionOutcome::Won);
        assert_eq!(s.resolve_press(Lane::Up), None);
        assert_eq!(s.tick(5.0), TickReport::default());
    }

    #[test]
    fn empty_health_loses() {
        let mut level = level();
        level.initial_health = 10;
        let mut s = Session::with_seed(level, Beatmap::empty(), 3);
        s.resolve_press(Lane::Left);
        assert_eq!(s.outcome(), SessionOutcome::Playing);
        s.resolve_press(Lane::Left);
        assert_eq!(s.outcome(), SessionOutcome::Lost);
        assert_eq!(s.judgement().health.value(), 0);
    }

    #[test]
    fn restart_returns_to_playing_with_fresh_state() {
        let mut level = level();
        level.initial_health = 5;
        let mut s = Session::with_seed(level, Beatmap::from_times(&[0.1]).unwrap(), 3);
        s.tick(0.0);
        s.tick(0.2);
        s.resolve_press(Lane::Left);
        s.resolve_press(Lane::Down);
        assert_eq!(s.outcome(), SessionOutcome::Lost);

        s.restart();
        assert_eq!(s.outcome(), SessionOutcome::Playing);
        assert!(s.notes().is_empty());
        assert_eq!(s.judgement().health.value(), 5);
        let report = s.tick(0.2);
        assert_eq!(report.spawned.len(), 1);
    }

    #[test]
    fn movement_follows_elapsed_time_not_tick_count() {
        let mut a = session();
        let mut b = session();
        a.tick(0.0);
        b.tick(0.0);
        a.spawn(Lane::Up);
        b.spawn(Lane::Up);
        a.tick(0.1);
        for i in 1..=4 {
            b.tick(0.025 * i as f32);
        }
        assert!((a.notes()[0].y - b.notes()[0].y).abs() < 1e-3);
    }

    #[test]
    fn long_frames_and_clock_jitter_keep_notes_on_the_clock() {
        let mut stalled = session();
        stalled.tick(0.0);
        stalled.spawn(Lane::Left);
        stalled.tick(1.0);
        assert_eq!(stalled.notes()[0].y, 420.0);

        let mut jittery = session();
        jittery.tick(0.0);
        jittery.spawn(Lane::Left);
        for t in [0.5, 0.4, 0.5] {
            jittery.tick(t);
        }
        assert_eq!(jittery.notes()[0].y, 570.0);
    }

    #[test]
    fn beatmap_notes_start_from_their_own_timestamp() {
        let beatmap = Beatmap::from_times(&[0.5, 1.0]).unwrap();
        let mut s = Session::with_seed(level(), beatmap, 4);
        s.tick(0.0);
        assert_eq!(s.tick(1.5).spawned.len(), 2);
        let heights: Vec<f32> = s.notes().iter().map(|n| n.y).collect();
        assert_eq!(heights, vec![420.0, 570.0]);
    }

    #[test]
    fn equidistant_notes_resolve_to_the_earlier_one() {
        let mut s = session();
        place(&mut s, Lane::Up, 6.0);
        place(&mut s, Lane::Up, -6.0);
        assert_eq!(s.notes()[0].distance_to(100.0), s.notes()[1].distance_to(100.0));
        assert_eq!(s.resolve_press(Lane::Up), Some(JudgeGrade::Perfect));
        assert_eq!(s.notes()[0].state, NoteState::Hit);
        assert_eq!(s.notes()[1].state, NoteState::Falling);

        let mut s = session();
        s.tick(0.0);
        s.spawn(Lane::Right);
        s.spawn(Lane::Right);
        s.tick(2.1);
        assert_eq!(s.notes()[0].y, s.notes()[1].y);
        assert_eq!(s.resolve_press(Lane::Right), Some(JudgeGrade::Perfect));
        assert_eq!(s.notes()[0].state, NoteState::Hit);
        assert_eq!(s.notes()[1].state, NoteState::Falling);
    }

    #[test]
    fn snapshot_mirrors_session_state() {
        let mut s = session();
        place(&mut s, Lane::Left, 0.0);
        s.resolve_press(Lane::Left);
        let snap = s.snapshot();
        assert_eq!(snap.notes.len(), 1);
        assert_eq!(snap.judgement.score, 100);
        assert_eq!(snap.outcome, SessionOutcome::Playing);
        assert_eq!(snap.last_judgment.map(|j| j.grade), Some(JudgeGrade::Perfect));
    }
}
