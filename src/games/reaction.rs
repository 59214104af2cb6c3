//! Stimulus-delay reaction test: the shared machine behind the color-change
//! and audio-react games.
//!
//! Round lifecycle: `Countdown` (3 ticks) → `Waiting` (uniform random delay,
//! any press is a false start) → `Ready` (press is the reaction) → next
//! round or `Finished`. The two games differ only in configuration: delay
//! range, onset grace window, and what a false start does to the run.

use crate::games::{
    ReactionSamples, Schedule, TimerEpoch, TimerToken, COUNTDOWN_TICKS, COUNTDOWN_TICK_MS,
};
use crate::prng::Prng;
use crate::result::{TestKind, TestResult};
use crate::time::Instant;

/// What a false start means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FalseStartPolicy {
    /// The whole test fails; the aborted run is still recorded.
    FailTest,
    /// Only the round restarts; completed samples are kept.
    RetryRound,
}

#[derive(Debug, Clone)]
pub struct ReactionConfig {
    pub kind: TestKind,
    pub total_rounds: u32,
    /// Uniform stimulus delay, inclusive bounds in milliseconds.
    pub delay_range_ms: (u64, u64),
    /// Presses within this window after onset still count as false starts;
    /// nobody reacts to a tone in under 100 ms, they anticipated it.
    pub onset_grace_ms: u64,
    pub false_start: FalseStartPolicy,
}

impl ReactionConfig {
    pub fn color_change() -> Self {
        Self {
            kind: TestKind::ColorChange,
            total_rounds: 5,
            delay_range_ms: (1000, 5000),
            onset_grace_ms: 0,
            false_start: FalseStartPolicy::FailTest,
        }
    }

    pub fn audio_react() -> Self {
        Self {
            kind: TestKind::AudioReact,
            total_rounds: 5,
            delay_range_ms: (1000, 4000),
            onset_grace_ms: 100,
            false_start: FalseStartPolicy::RetryRound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    Idle,
    Countdown { remaining: u32 },
    Waiting,
    Ready,
    Finished,
    Failed,
}

/// Outcome of a press delivered to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressOutcome {
    /// A valid reaction; `next` is `None` once the run is finished.
    Reaction {
        reaction_ms: f64,
        next: Option<Schedule>,
    },
    /// Pressed before (or too soon after) the stimulus. `terminal` follows
    /// the configured policy; on retry `next` re-arms the countdown.
    FalseStart {
        terminal: bool,
        next: Option<Schedule>,
    },
    /// Press arrived in a state that accepts no input; dropped.
    Ignored,
}

#[derive(Debug)]
pub struct ReactionTest {
    config: ReactionConfig,
    state: ReactionState,
    round: u32,
    samples: ReactionSamples,
    last_reaction_ms: Option<f64>,
    onset: Option<Instant>,
    epoch: TimerEpoch,
    prng: Prng,
    result_taken: bool,
}

impl ReactionTest {
    pub fn new(config: ReactionConfig, seed: u64) -> Self {
        Self {
            config,
            state: ReactionState::Idle,
            round: 0,
            samples: ReactionSamples::default(),
            last_reaction_ms: None,
            onset: None,
            epoch: TimerEpoch::default(),
            prng: Prng::new(seed),
            result_taken: false,
        }
    }

    pub fn kind(&self) -> TestKind {
        self.config.kind
    }

    pub fn state(&self) -> ReactionState {
        self.state
    }

    /// Current round, 1-based; 0 before `start`.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn total_rounds(&self) -> u32 {
        self.config.total_rounds
    }

    pub fn last_reaction_ms(&self) -> Option<f64> {
        self.last_reaction_ms
    }

    pub fn samples(&self) -> &ReactionSamples {
        &self.samples
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ReactionState::Finished | ReactionState::Failed)
    }

    /// Begin the first round. Idempotent only from `Idle`.
    pub fn start(&mut self) -> Schedule {
        self.round = 1;
        self.state = ReactionState::Countdown {
            remaining: COUNTDOWN_TICKS,
        };
        self.epoch.arm(COUNTDOWN_TICK_MS)
    }

    /// Timer delivery. Returns the next schedule to arm, if any. Stale
    /// tokens are ignored.
    pub fn on_timer(&mut self, token: TimerToken, now: Instant) -> Option<Schedule> {
        if !self.epoch.matches(token) {
            return None;
        }

        match self.state {
            ReactionState::Countdown { remaining } => {
                if remaining > 1 {
                    self.state = ReactionState::Countdown {
                        remaining: remaining - 1,
                    };
                    Some(self.epoch.arm(COUNTDOWN_TICK_MS))
                } else {
                    self.state = ReactionState::Waiting;
                    let (lo, hi) = self.config.delay_range_ms;
                    Some(self.epoch.arm(self.prng.gen_range_u64(lo, hi + 1)))
                }
            }
            ReactionState::Waiting => {
                // Stimulus onset: recorded here, before any input can be
                // interpreted against it.
                self.onset = Some(now);
                self.state = ReactionState::Ready;
                None
            }
            _ => None,
        }
    }

    /// Player press (click, tap, keypress; the binding is the embedding's
    /// concern).
    pub fn press(&mut self, now: Instant) -> PressOutcome {
        match self.state {
            ReactionState::Waiting => self.false_start(),
            ReactionState::Ready => {
                let onset = match self.onset {
                    Some(onset) => onset,
                    None => return PressOutcome::Ignored,
                };
                let reaction_ms = now.duration_since(onset).as_secs_f64() * 1000.0;
                if reaction_ms < self.config.onset_grace_ms as f64 {
                    return self.false_start();
                }

                self.samples.push(reaction_ms);
                self.last_reaction_ms = Some(reaction_ms);
                self.onset = None;

                if self.round >= self.config.total_rounds {
                    self.state = ReactionState::Finished;
                    self.epoch.cancel();
                    PressOutcome::Reaction {
                        reaction_ms,
                        next: None,
                    }
                } else {
                    self.round += 1;
                    self.state = ReactionState::Countdown {
                        remaining: COUNTDOWN_TICKS,
                    };
                    PressOutcome::Reaction {
                        reaction_ms,
                        next: Some(self.epoch.arm(COUNTDOWN_TICK_MS)),
                    }
                }
            }
            _ => PressOutcome::Ignored,
        }
    }

    fn false_start(&mut self) -> PressOutcome {
        // Whatever timer was pending is dead either way.
        self.epoch.cancel();
        self.onset = None;
        match self.config.false_start {
            FalseStartPolicy::FailTest => {
                self.state = ReactionState::Failed;
                PressOutcome::FalseStart {
                    terminal: true,
                    next: None,
                }
            }
            FalseStartPolicy::RetryRound => {
                self.state = ReactionState::Countdown {
                    remaining: COUNTDOWN_TICKS,
                };
                PressOutcome::FalseStart {
                    terminal: false,
                    next: Some(self.epoch.arm(COUNTDOWN_TICK_MS)),
                }
            }
        }
    }

    /// Build the result record, exactly once, after the machine is terminal.
    ///
    /// A failed run keeps its informational stats but omits the key metric,
    /// so it never outranks a completed run.
    pub fn take_result(&mut self, id: String, timestamp: u64) -> Option<TestResult> {
        if self.result_taken {
            return None;
        }

        let mut result = TestResult::new(id, self.config.kind, timestamp);
        match self.state {
            ReactionState::Finished => {
                result.average_time = self.samples.mean();
                result.total_clicks = Some(self.samples.len() as u32);
                result.fastest_time = self.samples.fastest();
                result.slowest_time = self.samples.slowest();
            }
            ReactionState::Failed => {
                result.success = false;
                result.total_clicks = Some(self.samples.len() as u32);
                result.fastest_time = self.samples.fastest();
                result.slowest_time = self.samples.slowest();
            }
            _ => return None,
        }

        self.result_taken = true;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Duration;

    /// Run the countdown and return the stimulus schedule.
    fn through_countdown(game: &mut ReactionTest, schedule: Schedule, now: Instant) -> Schedule {
        let mut schedule = schedule;
        for _ in 0..COUNTDOWN_TICKS {
            schedule = game.on_timer(schedule.token, now).expect("countdown tick");
        }
        assert_eq!(game.state(), ReactionState::Waiting);
        schedule
    }

    #[test]
    fn completes_five_rounds_and_aggregates() {
        let mut game = ReactionTest::new(ReactionConfig::color_change(), 1);
        let t0 = Instant::now();
        let mut schedule = game.start();
        assert_eq!(game.round(), 1);

        let reactions = [180.0, 220.0, 200.0, 160.0, 240.0];
        for (i, rt) in reactions.iter().enumerate() {
            let stimulus = through_countdown(&mut game, schedule, t0);
            assert!(game.on_timer(stimulus.token, t0).is_none());
            assert_eq!(game.state(), ReactionState::Ready);

            let pressed_at = t0 + Duration::from_micros((rt * 1000.0) as u64);
            match game.press(pressed_at) {
                PressOutcome::Reaction { reaction_ms, next } => {
                    assert!((reaction_ms - rt).abs() < 0.01);
                    if i + 1 < reactions.len() {
                        schedule = next.expect("next round countdown");
                    } else {
                        assert!(next.is_none());
                    }
                }
                other => panic!("expected reaction, got {other:?}"),
            }
        }

        assert_eq!(game.state(), ReactionState::Finished);
        let result = game.take_result("id".into(), 7).expect("result");
        assert_eq!(result.average_time, Some(200.0));
        assert_eq!(result.total_clicks, Some(5));
        assert_eq!(result.fastest_time, Some(160.0));
        assert_eq!(result.slowest_time, Some(240.0));
        assert!(result.success);

        // Exactly-once construction.
        assert!(game.take_result("id2".into(), 8).is_none());
    }

    #[test]
    fn color_change_false_start_fails_the_whole_test() {
        let mut game = ReactionTest::new(ReactionConfig::color_change(), 2);
        let t0 = Instant::now();
        let schedule = game.start();
        let stimulus = through_countdown(&mut game, schedule, t0);

        match game.press(t0) {
            PressOutcome::FalseStart { terminal, next } => {
                assert!(terminal);
                assert!(next.is_none());
            }
            other => panic!("expected false start, got {other:?}"),
        }
        assert_eq!(game.state(), ReactionState::Failed);

        // The cancelled stimulus timer may still fire in the embedding; its
        // token is stale and must change nothing.
        assert!(game.on_timer(stimulus.token, t0).is_none());
        assert_eq!(game.state(), ReactionState::Failed);

        let result = game.take_result("id".into(), 1).expect("failed result");
        assert!(!result.success);
        assert_eq!(result.average_time, None);
        assert_eq!(result.total_clicks, Some(0));
    }

    #[test]
    fn audio_false_start_retries_the_round() {
        let mut game = ReactionTest::new(ReactionConfig::audio_react(), 3);
        let t0 = Instant::now();
        let schedule = game.start();
        let _stimulus = through_countdown(&mut game, schedule, t0);

        let retry = match game.press(t0) {
            PressOutcome::FalseStart { terminal, next } => {
                assert!(!terminal);
                next.expect("retry countdown")
            }
            other => panic!("expected false start, got {other:?}"),
        };
        assert_eq!(game.round(), 1);
        assert_eq!(
            game.state(),
            ReactionState::Countdown {
                remaining: COUNTDOWN_TICKS
            }
        );

        // The retried round plays out normally.
        let stimulus = through_countdown(&mut game, retry, t0);
        game.on_timer(stimulus.token, t0);
        assert_eq!(game.state(), ReactionState::Ready);
    }

    #[test]
    fn audio_grace_window_rejects_anticipation() {
        let mut game = ReactionTest::new(ReactionConfig::audio_react(), 4);
        let t0 = Instant::now();
        let schedule = game.start();
        let stimulus = through_countdown(&mut game, schedule, t0);
        game.on_timer(stimulus.token, t0);

        // 99 ms after onset: inside the grace window, rejected.
        let retry = match game.press(t0 + Duration::from_millis(99)) {
            PressOutcome::FalseStart { terminal, next } => {
                assert!(!terminal);
                next.expect("retry countdown")
            }
            other => panic!("expected false start, got {other:?}"),
        };

        // Replay the round and react just past the window.
        let stimulus = through_countdown(&mut game, retry, t0);
        game.on_timer(stimulus.token, t0);
        assert_eq!(game.state(), ReactionState::Ready);

        match game.press(t0 + Duration::from_millis(101)) {
            PressOutcome::Reaction { reaction_ms, .. } => {
                assert!((reaction_ms - 101.0).abs() < 0.5);
            }
            other => panic!("expected reaction, got {other:?}"),
        }
    }

    #[test]
    fn presses_outside_the_window_are_ignored() {
        let mut game = ReactionTest::new(ReactionConfig::color_change(), 5);
        let t0 = Instant::now();
        assert_eq!(game.press(t0), PressOutcome::Ignored);

        let _ = game.start();
        // Countdown accepts no player input.
        assert_eq!(game.press(t0), PressOutcome::Ignored);
    }
}
