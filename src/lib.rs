//! # reflex
//!
//! Headless core for a suite of reaction/cognition mini-games: per-game state
//! machines, grading and score comparison, percentile ranking against a shared
//! population, and a persistent result history.
//!
//! The crate owns no timers and no rendering. Each game machine emits
//! [`games::Schedule`] values (a delay plus an epoch token) and the embedding
//! arms exactly one pending timer per machine; a fired callback is handed back
//! via `on_timer` and is discarded unless its token still matches. The daemon
//! in `reflexd/` is one such embedding, a test harness is another.
//!
//! ## Quick start
//!
//! ```
//! use reflex::prelude::*;
//! use reflex::time::Instant;
//!
//! let mut game = ReactionTest::new(ReactionConfig::color_change(), 0x5EED);
//! let schedule = game.start();
//! // ...arm a timer for `schedule.wait_ms`, then feed it back:
//! let next = game.on_timer(schedule.token, Instant::now());
//! assert!(next.is_some());
//! ```
//!
//! ## Feature flags
//!
//! - `std` (default): clocks, games, history, snapshot i/o
//!
//! Without `std` only the grading tiers remain available.

// no_std support
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod grading;

// WASM-safe monotonic time shim for the reaction-time measurements.
#[cfg(feature = "std")]
pub mod time;

#[cfg(feature = "std")]
pub mod prng;

#[cfg(feature = "std")]
pub mod result;

#[cfg(feature = "std")]
pub mod percentile;

#[cfg(feature = "std")]
pub mod history;

#[cfg(feature = "std")]
pub mod storage;

#[cfg(feature = "std")]
pub mod games;

/// Prelude module for convenient imports.
///
/// ```
/// use reflex::prelude::*;
/// ```
#[cfg(feature = "std")]
pub mod prelude {
    pub use crate::grading::{compare_scores, grade_from_time, is_new_personal_best, GradeTier};
    pub use crate::games::click_tracker::ClickTrackerTest;
    pub use crate::games::direction_react::{Direction, DirectionReactTest};
    pub use crate::games::number_flash::NumberFlashTest;
    pub use crate::games::reaction::{ReactionConfig, ReactionTest};
    pub use crate::games::sequence_memory::SequenceMemoryTest;
    pub use crate::games::{Schedule, TimerToken};
    pub use crate::history::{HistoryStore, RecordSync};
    pub use crate::result::{MetricKey, TestKind, TestResult};
}
