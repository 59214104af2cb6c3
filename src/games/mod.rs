//! Per-game state machines.
//!
//! Every machine here is a pure, timer-free state machine over a small input
//! alphabet. "Waiting" is modeled by *emitting* a [`Schedule`] (a delay plus
//! an epoch [`TimerToken`]); the embedding arms exactly one pending timer per
//! machine and hands the token back through the machine's `on_timer`. A token
//! minted before the machine last changed course no longer matches and the
//! delivery is ignored, so stale callbacks can neither crash a machine nor
//! double-transition it.
//!
//! The stimulus-onset timestamp is captured inside the `on_timer` call that
//! fires the stimulus, never deferred; reaction samples are measured against
//! that captured onset.

pub mod click_tracker;
pub mod direction_react;
pub mod number_flash;
pub mod reaction;
pub mod sequence_memory;

/// Countdown lead-in shared by every game: 3 ticks, one second apart.
pub const COUNTDOWN_TICKS: u32 = 3;
pub const COUNTDOWN_TICK_MS: u64 = 1000;

/// Epoch token identifying one armed timer. Only the most recently minted
/// token is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(pub(crate) u64);

/// A request to the embedding: call `on_timer(token)` after `wait_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub token: TimerToken,
    pub wait_ms: u64,
}

/// Mint-and-match helper each machine embeds. Arming bumps the epoch, so any
/// previously issued token goes stale; an explicit `cancel` does the same
/// without arming anything (false start, teardown).
#[derive(Debug, Default)]
pub(crate) struct TimerEpoch(u64);

impl TimerEpoch {
    pub(crate) fn arm(&mut self, wait_ms: u64) -> Schedule {
        self.0 += 1;
        Schedule {
            token: TimerToken(self.0),
            wait_ms,
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.0 += 1;
    }

    pub(crate) fn matches(&self, token: TimerToken) -> bool {
        token.0 == self.0
    }
}

/// Reaction-time samples for one run: count, mean, extremes.
#[derive(Debug, Clone, Default)]
pub struct ReactionSamples {
    times_ms: Vec<f64>,
}

impl ReactionSamples {
    pub fn push(&mut self, sample_ms: f64) {
        self.times_ms.push(sample_ms);
    }

    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.times_ms.is_empty() {
            None
        } else {
            Some(self.times_ms.iter().sum::<f64>() / self.times_ms.len() as f64)
        }
    }

    pub fn fastest(&self) -> Option<f64> {
        self.times_ms.iter().copied().reduce(f64::min)
    }

    pub fn slowest(&self) -> Option<f64> {
        self.times_ms.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_invalidates_older_tokens() {
        let mut epoch = TimerEpoch::default();
        let first = epoch.arm(100);
        let second = epoch.arm(200);
        assert!(!epoch.matches(first.token));
        assert!(epoch.matches(second.token));

        epoch.cancel();
        assert!(!epoch.matches(second.token));
    }

    #[test]
    fn samples_aggregate() {
        let mut s = ReactionSamples::default();
        for t in [100.0, 200.0, 300.0] {
            s.push(t);
        }
        assert_eq!(s.len(), 3);
        assert_eq!(s.mean(), Some(200.0));
        assert_eq!(s.fastest(), Some(100.0));
        assert_eq!(s.slowest(), Some(300.0));

        let empty = ReactionSamples::default();
        assert_eq!(empty.mean(), None);
    }
}
