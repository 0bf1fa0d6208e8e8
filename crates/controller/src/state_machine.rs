use actuator::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Absent,
    Present,
}

impl PresenceState {
    pub fn is_present(self) -> bool {
        self == PresenceState::Present
    }
}

/// An edge of the presence signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Appeared,
    Vanished,
}

impl Transition {
    /// Command the actuator receives for this edge.
    pub fn command(self) -> Command {
        match self {
            Transition::Appeared => Command::Activate,
            Transition::Vanished => Command::Deactivate,
        }
    }
}

/// Two-state edge detector over the per-frame presence boolean.
#[derive(Debug)]
pub struct PresenceTracker {
    current_state: PresenceState,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            current_state: PresenceState::Absent,
        }
    }

    /// Feed one frame's presence. Returns the transition only when the
    /// state actually changes.
    pub fn update(&mut self, present_this_frame: bool) -> Option<Transition> {
        match (self.current_state, present_this_frame) {
            (PresenceState::Absent, true) => {
                self.current_state = PresenceState::Present;
                Some(Transition::Appeared)
            }
            (PresenceState::Present, false) => {
                self.current_state = PresenceState::Absent;
                Some(Transition::Vanished)
            }
            _ => None,
        }
    }

    pub fn current_state(&self) -> PresenceState {
        self.current_state
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Initial State Tests ==========

    #[test]
    fn new_starts_absent() {
        let tracker = PresenceTracker::new();
        assert_eq!(tracker.current_state(), PresenceState::Absent);
        assert!(!tracker.current_state().is_present());
    }

    // ========== Absent State Transitions ==========

    #[test]
    fn absent_no_person_stays_absent() {
        let mut tracker = PresenceTracker::new();
        let result = tracker.update(false);

        assert_eq!(tracker.current_state(), PresenceState::Absent);
        assert!(result.is_none(), "No state change should return None");
    }

    #[test]
    fn absent_person_transitions_to_present() {
        let mut tracker = PresenceTracker::new();
        let result = tracker.update(true);

        assert_eq!(tracker.current_state(), PresenceState::Present);
        assert_eq!(result, Some(Transition::Appeared));
    }

    // ========== Present State Transitions ==========

    #[test]
    fn present_person_stays_present() {
        let mut tracker = PresenceTracker::new();
        tracker.update(true);

        let result = tracker.update(true);

        assert_eq!(tracker.current_state(), PresenceState::Present);
        assert!(result.is_none(), "Repeated presence must not re-trigger");
    }

    #[test]
    fn present_no_person_transitions_to_absent() {
        let mut tracker = PresenceTracker::new();
        tracker.update(true);

        let result = tracker.update(false);

        assert_eq!(tracker.current_state(), PresenceState::Absent);
        assert_eq!(result, Some(Transition::Vanished));
    }

    // ========== Commands ==========

    #[test]
    fn transitions_map_to_actuator_commands() {
        assert_eq!(Transition::Appeared.command(), Command::Activate);
        assert_eq!(Transition::Vanished.command(), Command::Deactivate);
    }

    // ========== Sequences ==========

    #[test]
    fn sequence_emits_only_on_edges() {
        let mut tracker = PresenceTracker::new();
        let results: Vec<_> = [false, false, true, true, false]
            .into_iter()
            .map(|present| tracker.update(present))
            .collect();

        assert_eq!(
            results,
            vec![
                None,
                None,
                Some(Transition::Appeared),
                None,
                Some(Transition::Vanished),
            ]
        );
        assert_eq!(tracker.current_state(), PresenceState::Absent);
    }

    #[test]
    fn flicker_alternates_every_frame() {
        let mut tracker = PresenceTracker::new();
        for _ in 0..3 {
            assert_eq!(tracker.update(true), Some(Transition::Appeared));
            assert_eq!(tracker.update(false), Some(Transition::Vanished));
        }
    }

    #[test]
    fn long_presence_emits_single_activation() {
        let mut tracker = PresenceTracker::new();
        let activations = (0..100)
            .filter_map(|_| tracker.update(true))
            .filter(|t| *t == Transition::Appeared)
            .count();
        assert_eq!(activations, 1);
    }
}
