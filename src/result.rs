//! Result records and metric metadata shared by every game.
//!
//! A [`TestResult`] carries exactly the metric fields that are meaningful for
//! its kind; everything else stays `None` (and is omitted on the wire). The
//! comparator in [`crate::grading`] maps an absent metric to the worst value
//! for its direction, so a missing sample can never win a comparison.

use serde::{Deserialize, Serialize};

use crate::prng::Prng;

/// Worst possible value for a metric that is minimized (reaction times).
pub const WORST_TIME_MS: f64 = f64::INFINITY;

/// Worst possible value for a metric that is maximized (counts, scores,
/// accuracy).
pub const WORST_COUNT: f64 = 0.0;

/// The six game kinds. Wire names are the kebab-case ids the record pool
/// stores (`click-tracker`, `color-change`, ...), so existing population
/// data stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    ClickTracker,
    ColorChange,
    SequenceMemory,
    NumberFlash,
    DirectionReact,
    AudioReact,
}

impl TestKind {
    pub const ALL: [TestKind; 6] = [
        TestKind::ClickTracker,
        TestKind::ColorChange,
        TestKind::SequenceMemory,
        TestKind::NumberFlash,
        TestKind::DirectionReact,
        TestKind::AudioReact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::ClickTracker => "click-tracker",
            TestKind::ColorChange => "color-change",
            TestKind::SequenceMemory => "sequence-memory",
            TestKind::NumberFlash => "number-flash",
            TestKind::DirectionReact => "direction-react",
            TestKind::AudioReact => "audio-react",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// The metric this kind is ranked by (personal best, percentile).
    pub fn key_metric(self) -> MetricKey {
        match self {
            TestKind::ColorChange | TestKind::AudioReact => MetricKey::AverageTime,
            TestKind::ClickTracker => MetricKey::TotalClicks,
            TestKind::DirectionReact => MetricKey::Accuracy,
            TestKind::SequenceMemory | TestKind::NumberFlash => MetricKey::Score,
        }
    }
}

/// Named metric fields a population can be queried by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    AverageTime,
    TotalClicks,
    Accuracy,
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDirection {
    LowerIsBetter,
    HigherIsBetter,
}

impl MetricDirection {
    /// The sentinel an absent sample takes in comparisons.
    pub fn worst(self) -> f64 {
        match self {
            MetricDirection::LowerIsBetter => WORST_TIME_MS,
            MetricDirection::HigherIsBetter => WORST_COUNT,
        }
    }
}

impl MetricKey {
    pub fn direction(self) -> MetricDirection {
        match self {
            MetricKey::AverageTime => MetricDirection::LowerIsBetter,
            MetricKey::TotalClicks | MetricKey::Accuracy | MetricKey::Score => {
                MetricDirection::HigherIsBetter
            }
        }
    }
}

/// One completed attempt at one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_clicks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowest_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,

    /// False only when the run was aborted by a false start; such a result
    /// stores its informational stats but omits the key metric.
    #[serde(default = "default_true")]
    pub success: bool,

    /// Share of the population this result outperformed, computed at
    /// insertion. `None` when no key metric was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
    #[serde(default)]
    pub is_personal_best: bool,
}

fn default_true() -> bool {
    true
}

impl TestResult {
    /// A blank record for `kind`; the game machine fills the metric fields.
    pub fn new(id: String, kind: TestKind, timestamp: u64) -> Self {
        Self {
            id,
            kind,
            timestamp,
            average_time: None,
            total_clicks: None,
            fastest_time: None,
            slowest_time: None,
            accuracy: None,
            score: None,
            success: true,
            percentile: None,
            is_personal_best: false,
        }
    }

    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::AverageTime => self.average_time,
            MetricKey::TotalClicks => self.total_clicks.map(f64::from),
            MetricKey::Accuracy => self.accuracy,
            MetricKey::Score => self.score.map(f64::from),
        }
    }

    /// The value this result is ranked by, if present.
    pub fn key_metric_value(&self) -> Option<f64> {
        self.metric(self.kind.key_metric())
    }
}

/// Opaque result id: epoch millis plus a random tail, hex. Unique enough for
/// a per-session history and stable across serialization.
pub fn generate_id(timestamp_ms: u64, prng: &mut Prng) -> String {
    format!("{:x}{:08x}", timestamp_ms, prng.next_u32())
}
