//! Direction-react: match the shown direction on the keyboard for a fixed
//! run. Wrong keys still advance the prompt but add a fixed time penalty to
//! the sample; the ranked metric is accuracy, reaction time breaks ties.

use crate::games::{
    ReactionSamples, Schedule, TimerEpoch, TimerToken, COUNTDOWN_TICKS, COUNTDOWN_TICK_MS,
};
use crate::prng::Prng;
use crate::result::{TestKind, TestResult};
use crate::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

#[derive(Debug, Clone)]
pub struct DirectionReactConfig {
    pub duration_s: u32,
    /// Added to the reaction sample on a wrong key.
    pub penalty_ms: f64,
}

impl Default for DirectionReactConfig {
    fn default() -> Self {
        Self {
            duration_s: 30,
            penalty_ms: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionReactState {
    Idle,
    Countdown { remaining: u32 },
    Running { seconds_left: u32 },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyOutcome {
    Scored { correct: bool, sample_ms: f64 },
    Ignored,
}

#[derive(Debug)]
pub struct DirectionReactTest {
    config: DirectionReactConfig,
    state: DirectionReactState,
    current: Option<Direction>,
    shown_at: Option<Instant>,
    correct: u32,
    wrong: u32,
    samples: ReactionSamples,
    last_reaction_ms: Option<f64>,
    last_was_penalty: bool,
    epoch: TimerEpoch,
    prng: Prng,
    result_taken: bool,
}

impl DirectionReactTest {
    pub fn new(config: DirectionReactConfig, seed: u64) -> Self {
        Self {
            config,
            state: DirectionReactState::Idle,
            current: None,
            shown_at: None,
            correct: 0,
            wrong: 0,
            samples: ReactionSamples::default(),
            last_reaction_ms: None,
            last_was_penalty: false,
            epoch: TimerEpoch::default(),
            prng: Prng::new(seed),
            result_taken: false,
        }
    }

    pub fn state(&self) -> DirectionReactState {
        self.state
    }

    pub fn current(&self) -> Option<Direction> {
        self.current
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    pub fn last_reaction_ms(&self) -> Option<f64> {
        self.last_reaction_ms
    }

    /// True when the most recent sample carried the wrong-key penalty.
    pub fn last_was_penalty(&self) -> bool {
        self.last_was_penalty
    }

    pub fn seconds_left(&self) -> u32 {
        match self.state {
            DirectionReactState::Running { seconds_left } => seconds_left,
            DirectionReactState::Idle | DirectionReactState::Countdown { .. } => {
                self.config.duration_s
            }
            DirectionReactState::Finished => 0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.correct + self.wrong;
        if total == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / total as f64
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == DirectionReactState::Finished
    }

    pub fn start(&mut self) -> Schedule {
        self.state = DirectionReactState::Countdown {
            remaining: COUNTDOWN_TICKS,
        };
        self.epoch.arm(COUNTDOWN_TICK_MS)
    }

    pub fn on_timer(&mut self, token: TimerToken, now: Instant) -> Option<Schedule> {
        if !self.epoch.matches(token) {
            return None;
        }

        match self.state {
            DirectionReactState::Countdown { remaining } => {
                if remaining > 1 {
                    self.state = DirectionReactState::Countdown {
                        remaining: remaining - 1,
                    };
                } else {
                    self.state = DirectionReactState::Running {
                        seconds_left: self.config.duration_s,
                    };
                    self.show_next(now);
                }
                Some(self.epoch.arm(COUNTDOWN_TICK_MS))
            }
            DirectionReactState::Running { seconds_left } => {
                if seconds_left > 1 {
                    self.state = DirectionReactState::Running {
                        seconds_left: seconds_left - 1,
                    };
                    Some(self.epoch.arm(COUNTDOWN_TICK_MS))
                } else {
                    self.state = DirectionReactState::Finished;
                    self.current = None;
                    self.shown_at = None;
                    self.epoch.cancel();
                    None
                }
            }
            _ => None,
        }
    }

    pub fn key(&mut self, pressed: Direction, now: Instant) -> KeyOutcome {
        let (DirectionReactState::Running { .. }, Some(current), Some(shown_at)) =
            (self.state, self.current, self.shown_at)
        else {
            return KeyOutcome::Ignored;
        };

        let reaction_ms = now.duration_since(shown_at).as_secs_f64() * 1000.0;
        let correct = pressed == current;
        let sample_ms = if correct {
            self.correct += 1;
            reaction_ms
        } else {
            self.wrong += 1;
            reaction_ms + self.config.penalty_ms
        };

        self.samples.push(sample_ms);
        self.last_reaction_ms = Some(reaction_ms);
        self.last_was_penalty = !correct;

        // Immediately show the next prompt, never repeating the current one.
        self.show_next(now);

        KeyOutcome::Scored { correct, sample_ms }
    }

    fn show_next(&mut self, now: Instant) {
        let next = loop {
            let candidate = Direction::ALL[self.prng.gen_range_usize(0, Direction::ALL.len())];
            if Some(candidate) != self.current {
                break candidate;
            }
        };
        self.current = Some(next);
        self.shown_at = Some(now);
    }

    pub fn take_result(&mut self, id: String, timestamp: u64) -> Option<TestResult> {
        if self.result_taken || self.state != DirectionReactState::Finished {
            return None;
        }

        let mut result = TestResult::new(id, TestKind::DirectionReact, timestamp);
        result.average_time = self.samples.mean();
        result.accuracy = Some(self.accuracy());

        self.result_taken = true;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Duration;

    fn into_running(game: &mut DirectionReactTest, now: Instant) -> Schedule {
        let mut schedule = game.start();
        for _ in 0..COUNTDOWN_TICKS {
            schedule = game.on_timer(schedule.token, now).expect("tick");
        }
        assert!(matches!(game.state(), DirectionReactState::Running { .. }));
        schedule
    }

    fn wrong_direction(current: Direction) -> Direction {
        Direction::ALL
            .into_iter()
            .find(|&d| d != current)
            .unwrap()
    }

    #[test]
    fn prompts_never_repeat() {
        let mut game = DirectionReactTest::new(DirectionReactConfig::default(), 1);
        let t0 = Instant::now();
        into_running(&mut game, t0);

        let mut prev = game.current().expect("prompt shown");
        for i in 0..100 {
            let now = t0 + Duration::from_millis(i * 10);
            game.key(prev, now);
            let next = game.current().expect("prompt shown");
            assert_ne!(next, prev, "prompt repeated at step {i}");
            prev = next;
        }
        assert_eq!(game.correct(), 100);
        assert_eq!(game.wrong(), 0);
    }

    #[test]
    fn wrong_keys_add_the_penalty_to_the_sample() {
        let mut game = DirectionReactTest::new(
            DirectionReactConfig {
                duration_s: 1,
                penalty_ms: 1000.0,
            },
            2,
        );
        let t0 = Instant::now();
        let schedule = into_running(&mut game, t0);

        let current = game.current().unwrap();
        match game.key(current, t0 + Duration::from_millis(300)) {
            KeyOutcome::Scored { correct, sample_ms } => {
                assert!(correct);
                assert!((sample_ms - 300.0).abs() < 0.01);
            }
            other => panic!("expected scored, got {other:?}"),
        }

        let current = game.current().unwrap();
        let at = t0 + Duration::from_millis(300) + Duration::from_millis(400);
        match game.key(wrong_direction(current), at) {
            KeyOutcome::Scored { correct, sample_ms } => {
                assert!(!correct);
                assert!((sample_ms - 1400.0).abs() < 0.01);
            }
            other => panic!("expected scored, got {other:?}"),
        }
        assert!(game.last_was_penalty());

        // Expire the run and check the aggregates.
        assert!(game.on_timer(schedule.token, t0).is_none());
        let result = game.take_result("id".into(), 1).expect("result");
        assert_eq!(result.accuracy, Some(50.0));
        // Mean of 300 and 1400.
        assert_eq!(result.average_time, Some(850.0));
        assert_eq!(result.score, None);
    }

    #[test]
    fn keys_outside_the_run_are_ignored() {
        let mut game = DirectionReactTest::new(DirectionReactConfig::default(), 3);
        let t0 = Instant::now();
        assert_eq!(game.key(Direction::Up, t0), KeyOutcome::Ignored);

        let _ = game.start();
        assert_eq!(game.key(Direction::Up, t0), KeyOutcome::Ignored);
    }

    #[test]
    fn zero_input_run_reports_zero_accuracy() {
        let mut game = DirectionReactTest::new(
            DirectionReactConfig {
                duration_s: 1,
                penalty_ms: 1000.0,
            },
            4,
        );
        let t0 = Instant::now();
        let schedule = into_running(&mut game, t0);
        game.on_timer(schedule.token, t0);

        let result = game.take_result("id".into(), 1).expect("result");
        assert_eq!(result.accuracy, Some(0.0));
        assert_eq!(result.average_time, None);
    }
}
