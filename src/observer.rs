//! A thread-local toggle that lets `ComponentInstance` bind props onto a child without the deep
//! `observe()` walk re-wrapping values that are already observed: prop binding must not re-observe
//! an already-reactive value.

use std::cell::Cell;

thread_local! {
    static DEEP_OBSERVATION_SUPPRESSED: Cell<bool> = Cell::new(false);
}

pub fn deep_observation_suppressed() -> bool {
    DEEP_OBSERVATION_SUPPRESSED.with(|c| c.get())
}

/// RAII guard: while held, `value::observe` degrades to a shallow wrap. Restores the previous
/// state on drop so nested suppression scopes compose correctly.
pub struct SuppressDeepObservation {
    previous: bool,
}

impl SuppressDeepObservation {
    pub fn enter() -> Self {
        let previous = DEEP_OBSERVATION_SUPPRESSED.with(|c| c.replace(true));
        Self { previous }
    }
}

impl Drop for SuppressDeepObservation {
    fn drop(&mut self) {
        DEEP_OBSERVATION_SUPPRESSED.with(|c| c.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_nests_and_restores() {
        assert!(!deep_observation_suppressed());
        {
            let _outer = SuppressDeepObservation::enter();
            assert!(deep_observation_suppressed());
            {
                let _inner = SuppressDeepObservation::enter();
                assert!(deep_observation_suppressed());
            }
            assert!(deep_observation_suppressed());
        }
        assert!(!deep_observation_suppressed());
    }
}
