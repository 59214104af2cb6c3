//! Sequence-memory: an ever-growing sequence of grid cells is played back,
//! then must be reproduced by clicking in order. No reaction times here; the
//! score is the highest level fully reproduced, and the first wrong cell
//! ends the test.

use crate::games::{Schedule, TimerEpoch, TimerToken, COUNTDOWN_TICKS, COUNTDOWN_TICK_MS};
use crate::prng::Prng;
use crate::result::{TestKind, TestResult};

#[derive(Debug, Clone)]
pub struct SequenceMemoryConfig {
    pub grid_cells: u8,
    pub highlight_ms: u64,
    pub gap_ms: u64,
    /// Breather between a completed round and the next countdown.
    pub pause_ms: u64,
}

impl Default for SequenceMemoryConfig {
    fn default() -> Self {
        Self {
            grid_cells: 9,
            highlight_ms: 500,
            gap_ms: 200,
            pause_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMemoryState {
    Idle,
    Countdown { remaining: u32 },
    /// Playing the sequence back: `step` indexes it, `lit` is the highlight
    /// half of the step (the other half is the dark gap).
    Showing { step: usize, lit: bool },
    Input,
    /// Round reproduced; waiting out the breather before the next level.
    Pause,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellOutcome {
    /// Right cell, sequence not yet complete.
    Correct { position: usize },
    /// Whole sequence reproduced; the pause before the next level is armed.
    RoundComplete { next: Schedule },
    /// Wrong cell: test over.
    Wrong,
    Ignored,
}

#[derive(Debug)]
pub struct SequenceMemoryTest {
    config: SequenceMemoryConfig,
    state: SequenceMemoryState,
    level: u32,
    sequence: Vec<u8>,
    input_pos: usize,
    epoch: TimerEpoch,
    prng: Prng,
    result_taken: bool,
}

impl SequenceMemoryTest {
    pub fn new(config: SequenceMemoryConfig, seed: u64) -> Self {
        Self {
            config,
            state: SequenceMemoryState::Idle,
            level: 1,
            sequence: Vec::new(),
            input_pos: 0,
            epoch: TimerEpoch::default(),
            prng: Prng::new(seed),
            result_taken: false,
        }
    }

    pub fn state(&self) -> SequenceMemoryState {
        self.state
    }

    /// Current level == length of the sequence being attempted.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// How much of the current sequence has been reproduced.
    pub fn input_progress(&self) -> (usize, usize) {
        (self.input_pos, self.sequence.len())
    }

    /// The cell currently lit during playback.
    pub fn highlighted_cell(&self) -> Option<u8> {
        match self.state {
            SequenceMemoryState::Showing { step, lit: true } => self.sequence.get(step).copied(),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == SequenceMemoryState::Finished
    }

    pub fn start(&mut self) -> Schedule {
        self.level = 1;
        self.state = SequenceMemoryState::Countdown {
            remaining: COUNTDOWN_TICKS,
        };
        self.epoch.arm(COUNTDOWN_TICK_MS)
    }

    pub fn on_timer(&mut self, token: TimerToken) -> Option<Schedule> {
        if !self.epoch.matches(token) {
            return None;
        }

        match self.state {
            SequenceMemoryState::Countdown { remaining } => {
                if remaining > 1 {
                    self.state = SequenceMemoryState::Countdown {
                        remaining: remaining - 1,
                    };
                    Some(self.epoch.arm(COUNTDOWN_TICK_MS))
                } else {
                    self.generate_sequence();
                    self.state = SequenceMemoryState::Showing {
                        step: 0,
                        lit: true,
                    };
                    Some(self.epoch.arm(self.config.highlight_ms))
                }
            }
            SequenceMemoryState::Showing { step, lit } => {
                if lit {
                    if step + 1 < self.sequence.len() {
                        // Dark gap before the next cell.
                        self.state = SequenceMemoryState::Showing { step, lit: false };
                        Some(self.epoch.arm(self.config.gap_ms))
                    } else {
                        // Last cell went dark: hand over to the player.
                        self.input_pos = 0;
                        self.state = SequenceMemoryState::Input;
                        self.epoch.cancel();
                        None
                    }
                } else {
                    self.state = SequenceMemoryState::Showing {
                        step: step + 1,
                        lit: true,
                    };
                    Some(self.epoch.arm(self.config.highlight_ms))
                }
            }
            SequenceMemoryState::Pause => {
                self.state = SequenceMemoryState::Countdown {
                    remaining: COUNTDOWN_TICKS,
                };
                Some(self.epoch.arm(COUNTDOWN_TICK_MS))
            }
            _ => None,
        }
    }

    pub fn cell_click(&mut self, cell: u8) -> CellOutcome {
        if self.state != SequenceMemoryState::Input {
            return CellOutcome::Ignored;
        }

        if self.sequence.get(self.input_pos) != Some(&cell) {
            self.state = SequenceMemoryState::Finished;
            self.epoch.cancel();
            return CellOutcome::Wrong;
        }

        self.input_pos += 1;
        if self.input_pos == self.sequence.len() {
            self.level += 1;
            self.state = SequenceMemoryState::Pause;
            CellOutcome::RoundComplete {
                next: self.epoch.arm(self.config.pause_ms),
            }
        } else {
            CellOutcome::Correct {
                position: self.input_pos,
            }
        }
    }

    fn generate_sequence(&mut self) {
        self.sequence = (0..self.level)
            .map(|_| self.prng.gen_range_usize(0, self.config.grid_cells as usize) as u8)
            .collect();
        self.input_pos = 0;
    }

    /// Score is the highest level fully reproduced: one less than the level
    /// being attempted when the wrong cell was clicked.
    pub fn take_result(&mut self, id: String, timestamp: u64) -> Option<TestResult> {
        if self.result_taken || self.state != SequenceMemoryState::Finished {
            return None;
        }

        let mut result = TestResult::new(id, TestKind::SequenceMemory, timestamp);
        result.score = Some(self.level.saturating_sub(1));

        self.result_taken = true;
        Some(result)
    }
}
