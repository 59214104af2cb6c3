//! Number-flash: a fixed-width random number is flashed for a duration that
//! shrinks round over round; the exact digits must be typed back. First
//! wrong entry ends the test; the score is the number of rounds passed.

use crate::games::{Schedule, TimerEpoch, TimerToken, COUNTDOWN_TICKS, COUNTDOWN_TICK_MS};
use crate::prng::Prng;
use crate::result::{TestKind, TestResult};

pub const DIGITS_PER_ROUND: usize = 5;
pub const INITIAL_FLASH_MS: u64 = 500;
pub const MIN_FLASH_MS: u64 = 10;
pub const FLASH_DECREMENT_MS: u64 = 50;
pub const FLASH_DECREMENT_SLOW_MS: u64 = 10;
/// At or below this the decay switches to the slow decrement.
pub const SLOW_THRESHOLD_MS: u64 = 50;

/// Two-phase flash decay: −50 ms per round while above 50 ms, then −10 ms
/// per round, floored at 10 ms. Round is 1-based.
pub fn flash_duration_ms(round: u32) -> u64 {
    let mut duration = INITIAL_FLASH_MS;
    for _ in 1..round {
        if duration > SLOW_THRESHOLD_MS {
            duration -= FLASH_DECREMENT_MS;
        } else {
            duration = duration.saturating_sub(FLASH_DECREMENT_SLOW_MS);
        }
    }
    duration.max(MIN_FLASH_MS)
}

#[derive(Debug, Clone)]
pub struct NumberFlashConfig {
    pub digits_per_round: usize,
    /// How long the tick/cross feedback stays up after a correct entry.
    pub feedback_ok_ms: u64,
    /// Longer on a miss, so the right answer can be read.
    pub feedback_fail_ms: u64,
}

impl Default for NumberFlashConfig {
    fn default() -> Self {
        Self {
            digits_per_round: DIGITS_PER_ROUND,
            feedback_ok_ms: 800,
            feedback_fail_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFlashState {
    Idle,
    Countdown { remaining: u32 },
    /// Digits on screen for the round's flash duration.
    Showing,
    Input,
    Feedback { correct: bool },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryOutcome {
    /// Entry judged; the feedback display is armed either way.
    Judged { correct: bool, next: Schedule },
    Ignored,
}

#[derive(Debug)]
pub struct NumberFlashTest {
    config: NumberFlashConfig,
    state: NumberFlashState,
    round: u32,
    digits: String,
    epoch: TimerEpoch,
    prng: Prng,
    result_taken: bool,
}

impl NumberFlashTest {
    pub fn new(config: NumberFlashConfig, seed: u64) -> Self {
        Self {
            config,
            state: NumberFlashState::Idle,
            round: 0,
            digits: String::new(),
            epoch: TimerEpoch::default(),
            prng: Prng::new(seed),
            result_taken: false,
        }
    }

    pub fn state(&self) -> NumberFlashState {
        self.state
    }

    /// Current round, 1-based; 0 before `start`.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Rounds passed so far.
    pub fn score(&self) -> u32 {
        self.round.saturating_sub(1)
    }

    /// The digits being flashed (or judged against).
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// This round's flash duration.
    pub fn current_flash_ms(&self) -> u64 {
        flash_duration_ms(self.round.max(1))
    }

    pub fn is_terminal(&self) -> bool {
        self.state == NumberFlashState::Finished
    }

    pub fn start(&mut self) -> Schedule {
        self.round = 1;
        self.state = NumberFlashState::Countdown {
            remaining: COUNTDOWN_TICKS,
        };
        self.epoch.arm(COUNTDOWN_TICK_MS)
    }

    pub fn on_timer(&mut self, token: TimerToken) -> Option<Schedule> {
        if !self.epoch.matches(token) {
            return None;
        }

        match self.state {
            NumberFlashState::Countdown { remaining } => {
                if remaining > 1 {
                    self.state = NumberFlashState::Countdown {
                        remaining: remaining - 1,
                    };
                    Some(self.epoch.arm(COUNTDOWN_TICK_MS))
                } else {
                    self.generate_digits();
                    self.state = NumberFlashState::Showing;
                    Some(self.epoch.arm(self.current_flash_ms()))
                }
            }
            NumberFlashState::Showing => {
                self.state = NumberFlashState::Input;
                self.epoch.cancel();
                None
            }
            NumberFlashState::Feedback { correct } => {
                if correct {
                    self.round += 1;
                    self.state = NumberFlashState::Countdown {
                        remaining: COUNTDOWN_TICKS,
                    };
                    Some(self.epoch.arm(COUNTDOWN_TICK_MS))
                } else {
                    self.state = NumberFlashState::Finished;
                    self.epoch.cancel();
                    None
                }
            }
            _ => None,
        }
    }

    /// Judge a typed entry against the flashed digits.
    pub fn submit(&mut self, entry: &str) -> EntryOutcome {
        if self.state != NumberFlashState::Input {
            return EntryOutcome::Ignored;
        }

        let correct = entry == self.digits;
        self.state = NumberFlashState::Feedback { correct };
        let wait = if correct {
            self.config.feedback_ok_ms
        } else {
            self.config.feedback_fail_ms
        };
        EntryOutcome::Judged {
            correct,
            next: self.epoch.arm(wait),
        }
    }

    fn generate_digits(&mut self) {
        self.digits = (0..self.config.digits_per_round)
            .map(|_| char::from(b'0' + self.prng.digit()))
            .collect();
    }

    pub fn take_result(&mut self, id: String, timestamp: u64) -> Option<TestResult> {
        if self.result_taken || self.state != NumberFlashState::Finished {
            return None;
        }

        let mut result = TestResult::new(id, TestKind::NumberFlash, timestamp);
        result.score = Some(self.score());

        self.result_taken = true;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_matches_the_reference_table() {
        let expected: [u64; 15] = [
            500, 450, 400, 350, 300, 250, 200, 150, 100, 50, 40, 30, 20, 10, 10,
        ];
        for (i, &want) in expected.iter().enumerate() {
            let round = i as u32 + 1;
            assert_eq!(flash_duration_ms(round), want, "round {round}");
        }
        // Floor holds forever.
        assert_eq!(flash_duration_ms(100), MIN_FLASH_MS);
    }

    fn into_input(game: &mut NumberFlashTest, mut schedule: Schedule) {
        loop {
            match game.on_timer(schedule.token) {
                Some(next) => schedule = next,
                None => break,
            }
        }
        assert_eq!(game.state(), NumberFlashState::Input);
    }

    #[test]
    fn correct_entries_advance_wrong_entry_ends() {
        let mut game = NumberFlashTest::new(NumberFlashConfig::default(), 5);
        let schedule = game.start();
        assert_eq!(game.round(), 1);
        into_input(&mut game, schedule);

        let digits = game.digits().to_string();
        assert_eq!(digits.len(), DIGITS_PER_ROUND);
        assert!(digits.bytes().all(|b| b.is_ascii_digit()));

        // Round 1 passes.
        let next = match game.submit(&digits) {
            EntryOutcome::Judged { correct, next } => {
                assert!(correct);
                assert_eq!(next.wait_ms, 800);
                next
            }
            other => panic!("expected judged, got {other:?}"),
        };
        into_input(&mut game, next);
        assert_eq!(game.round(), 2);

        // Fresh digits each round (and a shorter flash).
        assert_eq!(game.current_flash_ms(), 450);

        // Round 2 fails.
        let wrong = "99999x";
        let next = match game.submit(wrong) {
            EntryOutcome::Judged { correct, next } => {
                assert!(!correct);
                assert_eq!(next.wait_ms, 1500);
                next
            }
            other => panic!("expected judged, got {other:?}"),
        };
        assert!(game.on_timer(next.token).is_none());
        assert_eq!(game.state(), NumberFlashState::Finished);

        let result = game.take_result("id".into(), 1).expect("result");
        assert_eq!(result.score, Some(1));
        assert!(result.success);
    }

    #[test]
    fn entries_outside_input_are_ignored() {
        let mut game = NumberFlashTest::new(NumberFlashConfig::default(), 6);
        assert_eq!(game.submit("12345"), EntryOutcome::Ignored);

        let schedule = game.start();
        assert_eq!(game.submit("12345"), EntryOutcome::Ignored);

        // During the flash itself, typing is ignored too.
        let mut s = schedule;
        for _ in 0..COUNTDOWN_TICKS {
            s = game.on_timer(s.token).expect("tick");
        }
        assert_eq!(game.state(), NumberFlashState::Showing);
        assert_eq!(game.submit("12345"), EntryOutcome::Ignored);
    }

    #[test]
    fn flash_timer_is_single_shot() {
        let mut game = NumberFlashTest::new(NumberFlashConfig::default(), 7);
        let mut s = game.start();
        for _ in 0..COUNTDOWN_TICKS {
            s = game.on_timer(s.token).expect("tick");
        }
        // The flash expiry hands over to input exactly once.
        assert!(game.on_timer(s.token).is_none());
        assert_eq!(game.state(), NumberFlashState::Input);
        assert!(game.on_timer(s.token).is_none());
        assert_eq!(game.state(), NumberFlashState::Input);
    }
}
