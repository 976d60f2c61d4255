//! Simulated progress: clamped increments from an injectable step source.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Advance `current` by `step`, never exceeding 100.
#[must_use]
pub fn next_progress(current: u8, step: u8) -> u8 {
    current.saturating_add(step).min(100)
}

/// Source of per-tick progress increments.
///
/// Shared across every running pipeline, hence `&self`.
pub trait StepSource: Send + Sync {
    /// Next increment, in `0..=max_step`.
    fn next_step(&self, max_step: u8) -> u8;
}

/// Uniformly random increments.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSteps;

impl StepSource for RandomSteps {
    fn next_step(&self, max_step: u8) -> u8 {
        rand::random_range(0..=max_step)
    }
}

/// A fixed, cycling sequence of increments (each still capped at `max_step`).
#[derive(Debug)]
pub struct FixedSteps {
    steps: Vec<u8>,
    cursor: AtomicUsize,
}

impl FixedSteps {
    /// Cycle through `steps`. An empty sequence always yields 0.
    pub fn new(steps: impl Into<Vec<u8>>) -> Self {
        Self {
            steps: steps.into(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Always step by `value`.
    pub fn constant(value: u8) -> Self {
        Self::new(vec![value])
    }
}

impl StepSource for FixedSteps {
    fn next_step(&self, max_step: u8) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.steps.len();
        self.steps[i].min(max_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn next_progress_clamps_at_100() {
        assert_eq!(next_progress(0, 20), 20);
        assert_eq!(next_progress(95, 20), 100);
        assert_eq!(next_progress(100, 0), 100);
        assert_eq!(next_progress(250, 10), 100);
    }

    #[test]
    fn fixed_steps_cycle_and_cap() {
        let s = FixedSteps::new([5, 30]);
        assert_eq!(s.next_step(20), 5);
        assert_eq!(s.next_step(20), 20);
        assert_eq!(s.next_step(20), 5);
    }

    #[test]
    fn empty_fixed_steps_yield_zero() {
        assert_eq!(FixedSteps::new(Vec::new()).next_step(10), 0);
    }

    proptest! {
        #[test]
        fn next_progress_is_bounded_and_monotone(current in 0u8..=100, step in any::<u8>()) {
            let next = next_progress(current, step);
            prop_assert!(next <= 100);
            prop_assert!(next >= current);
        }

        #[test]
        fn random_steps_respect_max(max in 0u8..=100) {
            let step = RandomSteps.next_step(max);
            prop_assert!(step <= max);
        }

        #[test]
        fn any_step_sequence_stays_in_range(steps in proptest::collection::vec(any::<u8>(), 0..50)) {
            let mut p = 0u8;
            for s in steps {
                p = next_progress(p, s);
                prop_assert!(p <= 100);
            }
        }
    }
}
