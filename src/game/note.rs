use crate::game::lane::Lane;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteState {
    Falling,
    Hit,
    Missed,
}

impl NoteState {
    #[inline(always)]
    pub fn is_terminal(self) -> bool {
        !matches!(self, NoteState::Falling)
    }
}

#[derive(Clone, Debug)]
pub struct Note {
    pub lane: Lane,
    pub lane_x: f32,
    pub spawn_y: f32,
    pub y: f32,
    /// Units per second, fixed for the level.
    pub speed: f32,
    pub state: NoteState,
    /// Playback time at which the note entered the field.
    pub spawned_at: f32,
}

impl Note {
    pub fn new(lane: Lane, lane_x: f32, spawn_y: f32, speed: f32, spawned_at: f32) -> Self {
        Self {
            lane,
            lane_x,
            spawn_y,
            y: spawn_y,
            speed,
            state: NoteState::Falling,
            spawned_at,
        }
    }

    #[inline(always)]
    pub fn is_falling(&self) -> bool {
        self.state == NoteState::Falling
    }

    #[inline(always)]
    pub fn distance_to(&self, target_y: f32) -> f32 {
        (self.y - target_y).abs()
    }

    /// Height at playback time `elapsed`; never below the spawn point.
    pub fn y_at(&self, elapsed: f32) -> f32 {
        let travelled = (elapsed - self.spawned_at).max(0.0);
        self.spawn_y - self.speed * travelled
    }

    pub fn sync_to(&mut self, elapsed: f32) {
        self.y = self.y_at(elapsed);
    }

    /// Shifts the spawn time by `offset` so the note keeps its height when the
    /// playback clock is rewound.
    pub fn rebase(&mut self, offset: f32) {
        self.spawned_at += offset;
    }

    /// Falling -> Hit. Returns false if the note was already resolved.
    pub fn mark_hit(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = NoteState::Hit;
        true
    }

    /// Falling -> Missed. Returns false if the note was already resolved.
    pub fn mark_missed(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = NoteState::Missed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_follows_the_playback_clock() {
        let mut note = Note::new(Lane::Up, 300.0, 720.0, 300.0, 0.0);
        note.sync_to(0.5);
        assert_eq!(note.y, 570.0);
        assert_eq!(note.distance_to(100.0), 470.0);

        note.sync_to(1.0);
        note.sync_to(0.5);
        assert_eq!(note.y, 570.0);
    }

    #[test]
    fn clock_before_spawn_time_keeps_the_note_at_the_bottom() {
        let note = Note::new(Lane::Down, 200.0, 720.0, 300.0, 2.0);
        assert_eq!(note.y_at(1.5), 720.0);
        assert_eq!(note.y_at(2.5), 570.0);
    }

    #[test]
    fn rebase_preserves_height_across_a_rewind() {
        let mut note = Note::new(Lane::Left, 100.0, 720.0, 100.0, 4.0);
        note.sync_to(5.0);
        assert_eq!(note.y, 620.0);
        note.rebase(-5.0);
        assert_eq!(note.y_at(0.0), 620.0);
        assert_eq!(note.y_at(0.5), 570.0);
    }

    #[test]
    fn resolved_notes_never_change_state_again() {
        let mut note = Note::new(Lane::Left, 100.0, 720.0, 300.0, 0.0);
        assert!(note.mark_hit());
        assert!(!note.mark_missed());
        assert!(!note.mark_hit());
        assert_eq!(note.state, NoteState::Hit);

        let mut note = Note::new(Lane::Left, 100.0, 720.0, 300.0, 0.0);
        assert!(note.mark_missed());
        assert!(!note.mark_hit());
        assert_eq!(note.state, NoteState::Missed);
    }
}
