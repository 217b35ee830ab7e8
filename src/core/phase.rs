use crate::core::events::Phase;

/// Forward-only phase state machine:
/// NotStarted -> Downloading -> [Merging] -> [EmbeddingMetadata] -> Completed.
/// `CleaningUp` is informational and never entered.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: Phase,
    merge_observed: bool,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self { current: Phase::NotStarted, merge_observed: false }
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn merge_observed(&self) -> bool {
        self.merge_observed
    }

    /// Moves to `next` if it lies strictly ahead. Returns whether it moved.
    pub fn advance(&mut self, next: Phase) -> bool {
        if next == Phase::CleaningUp || next <= self.current {
            return false;
        }
        if next == Phase::Merging {
            self.merge_observed = true;
        }
        self.current = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_forward_and_skips_optional() {
        let mut t = PhaseTracker::new();
        assert!(t.advance(Phase::Downloading));
        assert!(t.advance(Phase::EmbeddingMetadata));
        assert!(!t.merge_observed());
        assert!(t.advance(Phase::Completed));
        assert_eq!(t.current(), Phase::Completed);
    }

    #[test]
    fn never_moves_backwards_or_repeats() {
        let mut t = PhaseTracker::new();
        t.advance(Phase::Merging);
        assert!(t.merge_observed());
        assert!(!t.advance(Phase::Merging));
        assert!(!t.advance(Phase::Downloading));
        assert_eq!(t.current(), Phase::Merging);
    }

    #[test]
    fn cleanup_is_not_a_state() {
        let mut t = PhaseTracker::new();
        t.advance(Phase::Downloading);
        assert!(!t.advance(Phase::CleaningUp));
        assert_eq!(t.current(), Phase::Downloading);
    }
}
