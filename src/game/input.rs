use crate::game::lane::{Lane, NUM_LANES};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEdge {
    pub lane: Lane,
    pub pressed: bool,
    /// Playback time of the edge, in seconds.
    pub timestamp: f32,
}

/// Maps key names (winit `KeyCode` spellings) to lanes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    map: HashMap<String, Lane>,
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn bind(&mut self, key: &str, lane: Lane) {
        self.map.insert(key.to_string(), lane);
    }

    /// Unbound keys yield `None` and must be ignored by the caller.
    #[inline(always)]
    pub fn lane_for(&self, key: &str) -> Option<Lane> {
        self.map.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();
        for (key, lane) in [
            ("ArrowLeft", Lane::Left),
            ("KeyA", Lane::Left),
            ("ArrowDown", Lane::Down),
            ("KeyS", Lane::Down),
            ("ArrowUp", Lane::Up),
            ("KeyW", Lane::Up),
            ("ArrowRight", Lane::Right),
            ("KeyD", Lane::Right),
        ] {
            bindings.bind(key, lane);
        }
        bindings
    }
}

/// Tracks held lanes so only a key-down edge produces a press. OS auto-repeat
/// sends repeated "pressed" events without a release in between.
#[derive(Clone, Debug, Default)]
pub struct LaneEdges {
    held: [bool; NUM_LANES],
}

impl LaneEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this edge is a fresh press that should be judged.
    pub fn accept(&mut self, edge: &InputEdge) -> bool {
        let slot = &mut self.held[edge.lane.index()];
        let fresh = edge.pressed && !*slot;
        *slot = edge.pressed;
        fresh
    }

    pub fn is_held(&self, lane: Lane) -> bool {
        self.held[lane.index()]
    }

    pub fn release_all(&mut self) {
        self.held = [false; NUM_LANES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(lane: Lane, pressed: bool) -> InputEdge {
        InputEdge {
            lane,
            pressed,
            timestamp: 0.0,
        }
    }

    #[test]
    fn default_bindings_cover_arrows_and_wasd() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.lane_for("ArrowLeft"), Some(Lane::Left));
        assert_eq!(bindings.lane_for("KeyW"), Some(Lane::Up));
        assert_eq!(bindings.lane_for("Space"), None);
        assert_eq!(bindings.len(), 8);
    }

    #[test]
    fn auto_repeat_is_swallowed_until_release() {
        let mut edges = LaneEdges::new();
        assert!(edges.accept(&edge(Lane::Down, true)));
        assert!(!edges.accept(&edge(Lane::Down, true)));
        assert!(edges.is_held(Lane::Down));
        assert!(!edges.accept(&edge(Lane::Down, false)));
        assert!(edges.accept(&edge(Lane::Down, true)));
    }

    #[test]
    fn lanes_are_tracked_independently() {
        let mut edges = LaneEdges::new();
        assert!(edges.accept(&edge(Lane::Left, true)));
        assert!(edges.accept(&edge(Lane::Right, true)));
        edges.release_all();
        assert!(!edges.is_held(Lane::Left));
    }
}
