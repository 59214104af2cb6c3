//! Click-tracker: hit a randomly placed target as many times as possible
//! inside a fixed run. Terminal by wall-clock expiry, not round count; every
//! hit is one reaction sample and respawns the target.

use crate::games::{
    ReactionSamples, Schedule, TimerEpoch, TimerToken, COUNTDOWN_TICKS, COUNTDOWN_TICK_MS,
};
use crate::prng::{random_position, Prng};
use crate::result::{TestKind, TestResult};
use crate::time::Instant;

#[derive(Debug, Clone)]
pub struct ClickTrackerConfig {
    pub duration_s: u32,
    /// Square target edge, pixels.
    pub target_size: u32,
    /// Clearance kept from every arena edge when placing the target.
    pub padding: u32,
}

impl Default for ClickTrackerConfig {
    fn default() -> Self {
        Self {
            duration_s: 30,
            target_size: 50,
            padding: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTrackerState {
    Idle,
    Countdown { remaining: u32 },
    Running { seconds_left: u32 },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    /// Target hit; a fresh target is already placed.
    Hit { reaction_ms: f64 },
    Ignored,
}

#[derive(Debug)]
pub struct ClickTrackerTest {
    config: ClickTrackerConfig,
    state: ClickTrackerState,
    arena: (u32, u32),
    target: Option<Target>,
    appeared: Option<Instant>,
    samples: ReactionSamples,
    last_reaction_ms: Option<f64>,
    epoch: TimerEpoch,
    prng: Prng,
    result_taken: bool,
}

impl ClickTrackerTest {
    pub fn new(config: ClickTrackerConfig, seed: u64) -> Self {
        Self {
            config,
            state: ClickTrackerState::Idle,
            arena: (0, 0),
            target: None,
            appeared: None,
            samples: ReactionSamples::default(),
            last_reaction_ms: None,
            epoch: TimerEpoch::default(),
            prng: Prng::new(seed),
            result_taken: false,
        }
    }

    pub fn state(&self) -> ClickTrackerState {
        self.state
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn clicks(&self) -> u32 {
        self.samples.len() as u32
    }

    pub fn last_reaction_ms(&self) -> Option<f64> {
        self.last_reaction_ms
    }

    pub fn seconds_left(&self) -> u32 {
        match self.state {
            ClickTrackerState::Running { seconds_left } => seconds_left,
            ClickTrackerState::Idle | ClickTrackerState::Countdown { .. } => self.config.duration_s,
            ClickTrackerState::Finished => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == ClickTrackerState::Finished
    }

    /// Begin the countdown; the arena size fixes where targets may land.
    pub fn start(&mut self, arena_w: u32, arena_h: u32) -> Schedule {
        self.arena = (arena_w, arena_h);
        self.state = ClickTrackerState::Countdown {
            remaining: COUNTDOWN_TICKS,
        };
        self.epoch.arm(COUNTDOWN_TICK_MS)
    }

    /// Countdown tick or run-clock tick. One pending timer at a time: the
    /// run clock re-arms itself every second until expiry.
    pub fn on_timer(&mut self, token: TimerToken, now: Instant) -> Option<Schedule> {
        if !self.epoch.matches(token) {
            return None;
        }

        match self.state {
            ClickTrackerState::Countdown { remaining } => {
                if remaining > 1 {
                    self.state = ClickTrackerState::Countdown {
                        remaining: remaining - 1,
                    };
                } else {
                    self.state = ClickTrackerState::Running {
                        seconds_left: self.config.duration_s,
                    };
                    self.spawn_target(now);
                }
                Some(self.epoch.arm(COUNTDOWN_TICK_MS))
            }
            ClickTrackerState::Running { seconds_left } => {
                if seconds_left > 1 {
                    self.state = ClickTrackerState::Running {
                        seconds_left: seconds_left - 1,
                    };
                    Some(self.epoch.arm(COUNTDOWN_TICK_MS))
                } else {
                    self.state = ClickTrackerState::Finished;
                    self.target = None;
                    self.appeared = None;
                    self.epoch.cancel();
                    None
                }
            }
            _ => None,
        }
    }

    /// The embedding reports a click that landed on the target.
    pub fn hit(&mut self, now: Instant) -> HitOutcome {
        let (ClickTrackerState::Running { .. }, Some(appeared)) = (self.state, self.appeared)
        else {
            return HitOutcome::Ignored;
        };

        let reaction_ms = now.duration_since(appeared).as_secs_f64() * 1000.0;
        self.samples.push(reaction_ms);
        self.last_reaction_ms = Some(reaction_ms);
        self.spawn_target(now);
        HitOutcome::Hit { reaction_ms }
    }

    fn spawn_target(&mut self, now: Instant) {
        let (w, h) = self.arena;
        let (x, y) = random_position(&mut self.prng, w, h, self.config.target_size, self.config.padding);
        self.target = Some(Target { x, y });
        self.appeared = Some(now);
    }

    pub fn take_result(&mut self, id: String, timestamp: u64) -> Option<TestResult> {
        if self.result_taken || self.state != ClickTrackerState::Finished {
            return None;
        }

        let mut result = TestResult::new(id, TestKind::ClickTracker, timestamp);
        result.average_time = self.samples.mean();
        result.total_clicks = Some(self.samples.len() as u32);
        result.fastest_time = self.samples.fastest();
        result.accuracy = Some(if self.samples.is_empty() { 0.0 } else { 100.0 });

        self.result_taken = true;
        Some(result)
    }
}
