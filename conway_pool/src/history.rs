// history.rs - Recent grid fingerprints, for spotting still lifes and oscillators

const HISTORY_LEN: usize = 10;

#[derive(Debug, Default)]
pub struct CycleDetector {
    grid_history: [Option<u64>; HISTORY_LEN],
    history_count: usize,
}

impl CycleDetector {
    /// Record a fingerprint; true if it was already among the last ten.
    pub fn check_for_cycle(&mut self, fingerprint: u64) -> bool {
        if self.grid_history.contains(&Some(fingerprint)) { return true; }
        self.grid_history[self.history_count % HISTORY_LEN] = Some(fingerprint);
        self.history_count += 1;
        false
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_within_the_window_are_cycles() {
        let mut history = CycleDetector::default();
        assert!(!history.check_for_cycle(1));
        assert!(!history.check_for_cycle(2));
        assert!(history.check_for_cycle(1));
    }

    #[test]
    fn old_entries_fall_out_of_the_window() {
        let mut history = CycleDetector::default();
        for fingerprint in 0..=HISTORY_LEN as u64 {
            assert!(!history.check_for_cycle(fingerprint));
        }
        assert!(!history.check_for_cycle(0));
        assert!(history.check_for_cycle(HISTORY_LEN as u64));
    }

    #[test]
    fn zero_is_not_assumed_seen() {
        let mut history = CycleDetector::default();
        assert!(!history.check_for_cycle(0));

        history.reset();
        assert!(!history.check_for_cycle(0));
    }
}
