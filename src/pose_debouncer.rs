use std::collections::VecDeque;

use crate::finger::{FingerMap, HandState};

pub const DEFAULT_WINDOW: usize = 5;

/// Majority vote over the last `window` raw poses, evaluated once every `window` samples.  Cuts
/// down on the flicker coming out of frame-by-frame gesture detection so the hand only gets a
/// command when the pose really changed.
#[derive(Debug)]
pub struct PoseDebouncer {
    window: usize,
    history: FingerMap<VecDeque<bool>>,
    samples: usize,
    current: HandState,
}

impl PoseDebouncer {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            history: FingerMap::from_fn(|_| VecDeque::from(vec![false; window])),
            samples: 0,
            current: HandState::all_extended(),
        }
    }

    pub fn current(&self) -> HandState {
        self.current
    }

    /// Feeds one raw pose.  Returns the new debounced pose when a vote changed at least one
    /// finger.
    pub fn push(&mut self, raw: HandState) -> Option<HandState> {
        for (finger, flexed) in raw.iter() {
            let history = &mut self.history[finger];
            history.pop_front();
            history.push_back(*flexed);
        }
        self.samples += 1;
        if self.samples % self.window != 0 {
            return None;
        }

        let threshold = self.window / 2;
        let voted = HandState::from_fn(|finger| {
            self.history[finger].iter().filter(|flexed| **flexed).count() > threshold
        });
        if voted == self.current {
            return None;
        }
        self.current = voted;
        Some(voted)
    }
}

impl Default for PoseDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
