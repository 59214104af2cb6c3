//! Reflex daemon - local session host for the reaction-test suite
//!
//! Runs one game session at a time, owns the result history and the shared
//! record pool, and serves a JSON-lines IPC protocol for thin clients
//! (`reflex-cli`, a future UI):
//! - game machines stay pure; this daemon is the timer substrate. Every
//!   `Schedule` a machine emits becomes one `tokio::time::sleep` task whose
//!   delivery is double-checked against the session generation and the
//!   machine's own epoch token, so replaced or torn-down games ignore
//!   whatever is still in flight.
//!
//! Storage locations:
//! - Linux: ~/.local/share/reflex/
//! - Windows: %APPDATA%\reflex\
//! - MacOS: ~/Library/Application Support/reflex/

use std::sync::Arc;

use reflex::games::click_tracker::{ClickTrackerConfig, ClickTrackerState, ClickTrackerTest, HitOutcome};
use reflex::games::direction_react::{
    Direction, DirectionReactConfig, DirectionReactState, DirectionReactTest, KeyOutcome,
};
use reflex::games::number_flash::{EntryOutcome, NumberFlashConfig, NumberFlashState, NumberFlashTest};
use reflex::games::reaction::{PressOutcome, ReactionConfig, ReactionState, ReactionTest};
use reflex::games::sequence_memory::{
    CellOutcome, SequenceMemoryConfig, SequenceMemoryState, SequenceMemoryTest,
};
use reflex::games::{Schedule, TimerToken};
use reflex::grading::{format_time, grade_from_time};
use reflex::history::{HistoryStore, PopulationRecord, RecordSync};
use reflex::percentile::{histogram, percentile_among, Bucket, DEFAULT_PERCENTILE, HISTOGRAM_BINS};
use reflex::prng::Prng;
use reflex::result::{generate_id, TestKind, TestResult};
use reflex::time::{epoch_millis, Instant};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

mod config;
mod paths;
mod store;

use config::DaemonConfig;
use paths::AppPaths;
use store::{FileHistory, FileRecordStore};

// ─────────────────────────────────────────────────────────────────────────
// Wire protocol: one JSON value per line, request in, response out.
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Request {
    GetState,
    StartTest { kind: TestKind },
    /// Reaction press (color-change, audio-react).
    Press,
    /// Click that landed on the click-tracker target.
    Hit,
    Key { direction: Direction },
    Cell { index: u8 },
    Entry { digits: String },
    /// Tear the active game down mid-round.
    AbortTest,
    History,
    HistoryByKind { kind: TestKind },
    BestResult { kind: TestKind },
    DeleteResult { id: String },
    ClearHistory,
    Percentile { kind: TestKind, value: f64 },
    Distribution { kind: TestKind },
    OwnerRecords,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Response {
    State(SessionSnapshot),
    Results(Vec<TestResult>),
    Best(Option<TestResult>),
    Records(Vec<PopulationRecord>),
    Percentile { value: f64 },
    Distribution {
        total: usize,
        buckets: Vec<BucketDto>,
    },
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketDto {
    lo: f64,
    hi: f64,
    count: usize,
}

impl From<Bucket> for BucketDto {
    fn from(b: Bucket) -> Self {
        Self {
            lo: b.lo,
            hi: b.hi,
            count: b.count,
        }
    }
}

/// Everything a thin client needs to render the current round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<TestKind>,
    state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seconds_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clicks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<(u32, u32)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    highlighted_cell: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_progress: Option<(usize, usize)>,
    /// Digits are exposed only while they are being flashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_reaction_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_result: Option<TestResult>,
    history_len: usize,
}

// ─────────────────────────────────────────────────────────────────────────
// Session state
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ActiveTest {
    Reaction(ReactionTest),
    Click(ClickTrackerTest),
    Direction(DirectionReactTest),
    Sequence(SequenceMemoryTest),
    Flash(NumberFlashTest),
}

impl ActiveTest {
    fn kind(&self) -> TestKind {
        match self {
            ActiveTest::Reaction(g) => g.kind(),
            ActiveTest::Click(_) => TestKind::ClickTracker,
            ActiveTest::Direction(_) => TestKind::DirectionReact,
            ActiveTest::Sequence(_) => TestKind::SequenceMemory,
            ActiveTest::Flash(_) => TestKind::NumberFlash,
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            ActiveTest::Reaction(g) => g.is_terminal(),
            ActiveTest::Click(g) => g.is_terminal(),
            ActiveTest::Direction(g) => g.is_terminal(),
            ActiveTest::Sequence(g) => g.is_terminal(),
            ActiveTest::Flash(g) => g.is_terminal(),
        }
    }

    fn on_timer(&mut self, token: TimerToken) -> Option<Schedule> {
        match self {
            ActiveTest::Reaction(g) => g.on_timer(token, Instant::now()),
            ActiveTest::Click(g) => g.on_timer(token, Instant::now()),
            ActiveTest::Direction(g) => g.on_timer(token, Instant::now()),
            ActiveTest::Sequence(g) => g.on_timer(token),
            ActiveTest::Flash(g) => g.on_timer(token),
        }
    }

    fn take_result(&mut self, id: String, timestamp: u64) -> Option<TestResult> {
        match self {
            ActiveTest::Reaction(g) => g.take_result(id, timestamp),
            ActiveTest::Click(g) => g.take_result(id, timestamp),
            ActiveTest::Direction(g) => g.take_result(id, timestamp),
            ActiveTest::Sequence(g) => g.take_result(id, timestamp),
            ActiveTest::Flash(g) => g.take_result(id, timestamp),
        }
    }

    fn state_label(&self) -> &'static str {
        match self {
            ActiveTest::Reaction(g) => match g.state() {
                ReactionState::Idle => "idle",
                ReactionState::Countdown { .. } => "countdown",
                ReactionState::Waiting => "waiting",
                ReactionState::Ready => "ready",
                ReactionState::Finished => "finished",
                ReactionState::Failed => "failed",
            },
            ActiveTest::Click(g) => match g.state() {
                ClickTrackerState::Idle => "idle",
                ClickTrackerState::Countdown { .. } => "countdown",
                ClickTrackerState::Running { .. } => "running",
                ClickTrackerState::Finished => "finished",
            },
            ActiveTest::Direction(g) => match g.state() {
                DirectionReactState::Idle => "idle",
                DirectionReactState::Countdown { .. } => "countdown",
                DirectionReactState::Running { .. } => "running",
                DirectionReactState::Finished => "finished",
            },
            ActiveTest::Sequence(g) => match g.state() {
                SequenceMemoryState::Idle => "idle",
                SequenceMemoryState::Countdown { .. } => "countdown",
                SequenceMemoryState::Showing { .. } => "showing",
                SequenceMemoryState::Input => "input",
                SequenceMemoryState::Pause => "pause",
                SequenceMemoryState::Finished => "finished",
            },
            ActiveTest::Flash(g) => match g.state() {
                NumberFlashState::Idle => "idle",
                NumberFlashState::Countdown { .. } => "countdown",
                NumberFlashState::Showing => "showing",
                NumberFlashState::Input => "input",
                NumberFlashState::Feedback { .. } => "feedback",
                NumberFlashState::Finished => "finished",
            },
        }
    }
}

/// A schedule stamped with the session generation that armed it. Deliveries
/// from a replaced session are dropped before the machine even sees them.
#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    session: u64,
    schedule: Schedule,
}

struct DaemonState {
    config: DaemonConfig,
    history: HistoryStore<FileHistory, FileRecordStore>,
    active: Option<ActiveTest>,
    /// Bumped on every start/abort; in-flight timers from older sessions no
    /// longer match.
    session: u64,
    last_result: Option<TestResult>,
    prng: Prng,
}

impl DaemonState {
    fn new(config: DaemonConfig, history: HistoryStore<FileHistory, FileRecordStore>) -> Self {
        Self {
            config,
            history,
            active: None,
            session: 0,
            last_result: None,
            prng: Prng::new(epoch_millis() | 1),
        }
    }

    fn next_seed(&mut self) -> u64 {
        ((self.prng.next_u32() as u64) << 32) | self.prng.next_u32() as u64
    }

    fn start_test(&mut self, kind: TestKind) -> ArmedTimer {
        self.session += 1;
        let seed = self.next_seed();

        let (active, schedule) = match kind {
            TestKind::ColorChange => {
                let mut config = ReactionConfig::color_change();
                config.total_rounds = self.config.reaction_rounds;
                let mut game = ReactionTest::new(config, seed);
                let schedule = game.start();
                (ActiveTest::Reaction(game), schedule)
            }
            TestKind::AudioReact => {
                let mut config = ReactionConfig::audio_react();
                config.total_rounds = self.config.reaction_rounds;
                let mut game = ReactionTest::new(config, seed);
                let schedule = game.start();
                (ActiveTest::Reaction(game), schedule)
            }
            TestKind::ClickTracker => {
                let config = ClickTrackerConfig {
                    duration_s: self.config.run_duration_s,
                    ..ClickTrackerConfig::default()
                };
                let mut game = ClickTrackerTest::new(config, seed);
                // Arena dims are a UI concern; a fixed virtual arena keeps
                // target coordinates meaningful for every client.
                let schedule = game.start(800, 400);
                (ActiveTest::Click(game), schedule)
            }
            TestKind::DirectionReact => {
                let config = DirectionReactConfig {
                    duration_s: self.config.run_duration_s,
                    ..DirectionReactConfig::default()
                };
                let mut game = DirectionReactTest::new(config, seed);
                let schedule = game.start();
                (ActiveTest::Direction(game), schedule)
            }
            TestKind::SequenceMemory => {
                let mut game = SequenceMemoryTest::new(SequenceMemoryConfig::default(), seed);
                let schedule = game.start();
                (ActiveTest::Sequence(game), schedule)
            }
            TestKind::NumberFlash => {
                let mut game = NumberFlashTest::new(NumberFlashConfig::default(), seed);
                let schedule = game.start();
                (ActiveTest::Flash(game), schedule)
            }
        };

        info!("session {}: started {}", self.session, kind.as_str());
        self.active = Some(active);
        ArmedTimer {
            session: self.session,
            schedule,
        }
    }

    fn abort_test(&mut self) -> bool {
        self.session += 1;
        self.active.take().is_some()
    }

    /// Timer delivery from the substrate. Stale sessions and stale epoch
    /// tokens both fall through to `None`.
    fn deliver_timer(&mut self, timer: ArmedTimer) -> Option<ArmedTimer> {
        if timer.session != self.session {
            return None;
        }
        let active = self.active.as_mut()?;
        let next = active.on_timer(timer.schedule.token);
        self.finalize_if_terminal();
        next.map(|schedule| ArmedTimer {
            session: self.session,
            schedule,
        })
    }

    fn arm_next(&self, next: Option<Schedule>) -> Option<ArmedTimer> {
        next.map(|schedule| ArmedTimer {
            session: self.session,
            schedule,
        })
    }

    /// When the active machine reaches a terminal state, build its result
    /// exactly once, annotate and record it, and retire the machine.
    fn finalize_if_terminal(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.is_terminal() {
            return;
        }

        let timestamp = epoch_millis();
        let id = generate_id(timestamp, &mut self.prng);
        if let Some(result) = active.take_result(id, timestamp) {
            let owner = self.config.owner.clone();
            let stored = self.history.add_result(result, owner.as_deref()).clone();
            info!(
                "recorded {} result: success={} percentile={:?} personal_best={}",
                stored.kind.as_str(),
                stored.success,
                stored.percentile,
                stored.is_personal_best,
            );
            self.last_result = Some(stored);
        }
        self.active = None;
    }

    fn press(&mut self) -> (Response, Option<ArmedTimer>) {
        let Some(ActiveTest::Reaction(game)) = self.active.as_mut() else {
            return (error_response("no reaction test is running"), None);
        };

        let outcome = game.press(Instant::now());
        let (message, next) = match outcome {
            PressOutcome::Reaction { reaction_ms, next } => (
                format!(
                    "reaction {} (grade {:?})",
                    format_time(reaction_ms),
                    grade_from_time(reaction_ms)
                ),
                next,
            ),
            PressOutcome::FalseStart { terminal, next } => (
                if terminal {
                    "false start - test failed".to_string()
                } else {
                    "false start - round restarts".to_string()
                },
                next,
            ),
            PressOutcome::Ignored => ("press ignored".to_string(), None),
        };

        self.finalize_if_terminal();
        let armed = self.arm_next(next);
        (Response::Success { message }, armed)
    }

    fn hit(&mut self) -> (Response, Option<ArmedTimer>) {
        let Some(ActiveTest::Click(game)) = self.active.as_mut() else {
            return (error_response("no click-tracker test is running"), None);
        };

        let message = match game.hit(Instant::now()) {
            HitOutcome::Hit { reaction_ms } => {
                format!("hit in {}", format_time(reaction_ms))
            }
            HitOutcome::Ignored => "click ignored".to_string(),
        };
        (Response::Success { message }, None)
    }

    fn key(&mut self, direction: Direction) -> (Response, Option<ArmedTimer>) {
        let Some(ActiveTest::Direction(game)) = self.active.as_mut() else {
            return (error_response("no direction test is running"), None);
        };

        let message = match game.key(direction, Instant::now()) {
            KeyOutcome::Scored { correct, sample_ms } => {
                if correct {
                    format!("correct in {}", format_time(sample_ms))
                } else {
                    format!("wrong ({} with penalty)", format_time(sample_ms))
                }
            }
            KeyOutcome::Ignored => "key ignored".to_string(),
        };
        (Response::Success { message }, None)
    }

    fn cell(&mut self, index: u8) -> (Response, Option<ArmedTimer>) {
        let Some(ActiveTest::Sequence(game)) = self.active.as_mut() else {
            return (error_response("no sequence test is running"), None);
        };

        let (message, next) = match game.cell_click(index) {
            CellOutcome::Correct { position } => {
                let (_, total) = game.input_progress();
                (format!("correct ({position}/{total})"), None)
            }
            CellOutcome::RoundComplete { next } => {
                (format!("level {} cleared", game.level() - 1), Some(next))
            }
            CellOutcome::Wrong => ("wrong cell - test over".to_string(), None),
            CellOutcome::Ignored => ("click ignored".to_string(), None),
        };

        self.finalize_if_terminal();
        let armed = self.arm_next(next);
        (Response::Success { message }, armed)
    }

    fn entry(&mut self, digits: &str) -> (Response, Option<ArmedTimer>) {
        let Some(ActiveTest::Flash(game)) = self.active.as_mut() else {
            return (error_response("no number-flash test is running"), None);
        };

        let (message, next) = match game.submit(digits) {
            EntryOutcome::Judged { correct, next } => (
                if correct {
                    format!("correct, round {} next", game.round() + 1)
                } else {
                    format!("wrong, answer was {}", game.digits())
                },
                Some(next),
            ),
            EntryOutcome::Ignored => ("entry ignored".to_string(), None),
        };

        let armed = self.arm_next(next);
        (Response::Success { message }, armed)
    }

    fn percentile_of(&self, kind: TestKind, value: f64) -> f64 {
        let key = kind.key_metric();
        match self.history.sync().scores(kind, key) {
            Ok(scores) => percentile_among(&scores, value, key.direction()),
            Err(e) => {
                warn!("population fetch failed, assuming median: {e}");
                DEFAULT_PERCENTILE
            }
        }
    }

    fn distribution(&self, kind: TestKind) -> (usize, Vec<BucketDto>) {
        let key = kind.key_metric();
        match self.history.sync().scores(kind, key) {
            Ok(scores) => (
                scores.len(),
                histogram(&scores, HISTOGRAM_BINS)
                    .into_iter()
                    .map(BucketDto::from)
                    .collect(),
            ),
            Err(e) => {
                warn!("population fetch failed, empty distribution: {e}");
                (0, Vec::new())
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            running: self.active.is_some(),
            kind: self.active.as_ref().map(ActiveTest::kind),
            state: self
                .active
                .as_ref()
                .map(ActiveTest::state_label)
                .unwrap_or("idle")
                .to_string(),
            round: None,
            total_rounds: None,
            seconds_left: None,
            level: None,
            clicks: None,
            target: None,
            direction: None,
            highlighted_cell: None,
            input_progress: None,
            digits: None,
            last_reaction_ms: None,
            accuracy: None,
            last_result: self.last_result.clone(),
            history_len: self.history.len(),
        };

        match self.active.as_ref() {
            Some(ActiveTest::Reaction(g)) => {
                snapshot.round = Some(g.round());
                snapshot.total_rounds = Some(g.total_rounds());
                snapshot.last_reaction_ms = g.last_reaction_ms();
            }
            Some(ActiveTest::Click(g)) => {
                snapshot.seconds_left = Some(g.seconds_left());
                snapshot.clicks = Some(g.clicks());
                snapshot.target = g.target().map(|t| (t.x, t.y));
                snapshot.last_reaction_ms = g.last_reaction_ms();
            }
            Some(ActiveTest::Direction(g)) => {
                snapshot.seconds_left = Some(g.seconds_left());
                snapshot.direction = g.current();
                snapshot.accuracy = Some(g.accuracy());
                snapshot.last_reaction_ms = g.last_reaction_ms();
            }
            Some(ActiveTest::Sequence(g)) => {
                snapshot.level = Some(g.level());
                snapshot.highlighted_cell = g.highlighted_cell();
                if g.state() == SequenceMemoryState::Input {
                    snapshot.input_progress = Some(g.input_progress());
                }
            }
            Some(ActiveTest::Flash(g)) => {
                snapshot.round = Some(g.round());
                if g.state() == NumberFlashState::Showing {
                    snapshot.digits = Some(g.digits().to_string());
                }
            }
            None => {}
        }

        snapshot
    }
}

fn error_response(message: &str) -> Response {
    Response::Error {
        message: message.to_string(),
    }
}

type Shared = Arc<RwLock<DaemonState>>;

/// Arm one pending timer: sleep, deliver, and keep chaining whatever the
/// machine schedules next. Stale deliveries die inside `deliver_timer`.
fn arm(state: &Shared, timer: ArmedTimer) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(timer.schedule.wait_ms)).await;
        let follow_up = {
            let mut s = state.write().await;
            s.deliver_timer(timer)
        };
        if let Some(next) = follow_up {
            arm(&state, next);
        }
    });
}

async fn handle_request(state: &Shared, request: Request) -> Response {
    match request {
        Request::GetState => {
            let s = state.read().await;
            Response::State(s.snapshot())
        }
        Request::StartTest { kind } => {
            let timer = {
                let mut s = state.write().await;
                s.start_test(kind)
            };
            arm(state, timer);
            Response::Success {
                message: format!("{} started", kind.as_str()),
            }
        }
        Request::Press => {
            let (response, timer) = {
                let mut s = state.write().await;
                s.press()
            };
            if let Some(timer) = timer {
                arm(state, timer);
            }
            response
        }
        Request::Hit => {
            let (response, _) = {
                let mut s = state.write().await;
                s.hit()
            };
            response
        }
        Request::Key { direction } => {
            let (response, _) = {
                let mut s = state.write().await;
                s.key(direction)
            };
            response
        }
        Request::Cell { index } => {
            let (response, timer) = {
                let mut s = state.write().await;
                s.cell(index)
            };
            if let Some(timer) = timer {
                arm(state, timer);
            }
            response
        }
        Request::Entry { digits } => {
            let (response, timer) = {
                let mut s = state.write().await;
                s.entry(&digits)
            };
            if let Some(timer) = timer {
                arm(state, timer);
            }
            response
        }
        Request::AbortTest => {
            let aborted = {
                let mut s = state.write().await;
                s.abort_test()
            };
            Response::Success {
                message: if aborted {
                    "test aborted".to_string()
                } else {
                    "nothing to abort".to_string()
                },
            }
        }
        Request::History => {
            let s = state.read().await;
            Response::Results(s.history.results().to_vec())
        }
        Request::HistoryByKind { kind } => {
            let s = state.read().await;
            Response::Results(s.history.results_by_kind(kind))
        }
        Request::BestResult { kind } => {
            let s = state.read().await;
            Response::Best(s.history.best_result(kind).cloned())
        }
        Request::DeleteResult { id } => {
            let mut s = state.write().await;
            match s.history.delete_result(&id) {
                Ok(()) => Response::Success {
                    message: format!("deleted {id}"),
                },
                // Local removal stood; the remote copy is what failed.
                Err(e) => error_response(&e.to_string()),
            }
        }
        Request::ClearHistory => {
            let mut s = state.write().await;
            let owner = s.config.owner.clone();
            match s.history.clear_history(owner.as_deref()) {
                Ok(()) => Response::Success {
                    message: "history cleared".to_string(),
                },
                Err(e) => error_response(&e.to_string()),
            }
        }
        Request::Percentile { kind, value } => {
            let s = state.read().await;
            Response::Percentile {
                value: s.percentile_of(kind, value),
            }
        }
        Request::Distribution { kind } => {
            let s = state.read().await;
            let (total, buckets) = s.distribution(kind);
            Response::Distribution { total, buckets }
        }
        Request::OwnerRecords => {
            let s = state.read().await;
            match &s.config.owner {
                Some(owner) => match s.history.sync().records_for_owner(owner) {
                    Ok(records) => Response::Records(records),
                    Err(e) => error_response(&e.to_string()),
                },
                None => error_response("no owner configured"),
            }
        }
        Request::Shutdown => Response::Success {
            message: "shutting down".to_string(),
        },
    }
}

async fn handle_client(stream: TcpStream, state: Shared) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (response, shutdown) = match serde_json::from_str::<Request>(trimmed) {
            Ok(request) => {
                let shutdown = matches!(request, Request::Shutdown);
                (handle_request(&state, request).await, shutdown)
            }
            Err(e) => (error_response(&format!("bad request: {e}")), false),
        };

        let mut payload = serde_json::to_string(&response)
            .unwrap_or_else(|e| format!("{{\"type\":\"Error\",\"message\":\"encode: {e}\"}}"));
        payload.push('\n');
        write_half.write_all(payload.as_bytes()).await?;

        if shutdown {
            info!("shutdown requested by client");
            std::process::exit(0);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Setup application paths
    let paths = AppPaths::new()?;
    info!("persistence initialized ({})", paths.data_dir().display());

    let config = DaemonConfig::load(&paths.config_file());

    let record_store = FileRecordStore::open(paths.population_file())?;
    let history = HistoryStore::open(FileHistory::new(paths.history_file()), record_store);
    let addr = config.addr.clone();
    let state: Shared = Arc::new(RwLock::new(DaemonState::new(config, history)));

    // History and pool snapshots are rewritten on every mutation, so Ctrl-C
    // only needs to stop accepting work.
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C: exiting");
                std::process::exit(0);
            }
        });
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("reflex daemon listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("client connected: {peer}");
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("client handler error: {e}");
            }
        });
    }
}
