//! Grade tiers and the cross-game score comparator.
//!
//! Tier boundaries are closed-open: a 149.99 ms average is `Elite`, 150.0 ms
//! exactly is `Pro`. Every finite input lands in exactly one tier.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeTier {
    Elite,
    Pro,
    Advanced,
    Intermediate,
    Beginner,
}

pub const ELITE_BELOW_MS: f64 = 150.0;
pub const PRO_BELOW_MS: f64 = 200.0;
pub const ADVANCED_BELOW_MS: f64 = 300.0;
pub const INTERMEDIATE_BELOW_MS: f64 = 400.0;

/// Map an average reaction latency to its tier.
pub fn grade_from_time(average_time_ms: f64) -> GradeTier {
    if average_time_ms < ELITE_BELOW_MS {
        GradeTier::Elite
    } else if average_time_ms < PRO_BELOW_MS {
        GradeTier::Pro
    } else if average_time_ms < ADVANCED_BELOW_MS {
        GradeTier::Advanced
    } else if average_time_ms < INTERMEDIATE_BELOW_MS {
        GradeTier::Intermediate
    } else {
        GradeTier::Beginner
    }
}

/// Whole-millisecond rendering, `"123ms"`.
#[cfg(feature = "std")]
pub fn format_time(ms: f64) -> String {
    format!("{}ms", ms.round() as i64)
}

#[cfg(feature = "std")]
pub use comparator::{compare_scores, is_new_personal_best, ACCURACY_TIE_EPSILON};

#[cfg(feature = "std")]
mod comparator {
    use crate::result::{MetricDirection, TestKind, TestResult};

    /// Accuracy differences at or below this are treated as a tie and fall
    /// through to the reaction-time comparison.
    pub const ACCURACY_TIE_EPSILON: f64 = 0.01;

    // Absent samples take the worst sentinel for the direction; when both
    // sides are absent the pair is tied (avoids Inf - Inf).
    fn lower_is_better(a: Option<f64>, b: Option<f64>) -> f64 {
        let worst = MetricDirection::LowerIsBetter.worst();
        match (a, b) {
            (None, None) => 0.0,
            _ => b.unwrap_or(worst) - a.unwrap_or(worst),
        }
    }

    fn higher_is_better(a: Option<f64>, b: Option<f64>) -> f64 {
        let worst = MetricDirection::HigherIsBetter.worst();
        a.unwrap_or(worst) - b.unwrap_or(worst)
    }

    /// Signed comparison keyed by `a.kind`: positive means `a` outperforms
    /// `b`, negative the reverse, zero a tie.
    pub fn compare_scores(a: &TestResult, b: &TestResult) -> f64 {
        match a.kind {
            TestKind::ColorChange | TestKind::AudioReact => {
                lower_is_better(a.average_time, b.average_time)
            }
            TestKind::ClickTracker => higher_is_better(
                a.total_clicks.map(f64::from),
                b.total_clicks.map(f64::from),
            ),
            TestKind::DirectionReact => {
                let acc = higher_is_better(a.accuracy, b.accuracy);
                if acc.abs() > ACCURACY_TIE_EPSILON {
                    acc
                } else {
                    lower_is_better(a.average_time, b.average_time)
                }
            }
            TestKind::SequenceMemory | TestKind::NumberFlash => {
                higher_is_better(a.score.map(f64::from), b.score.map(f64::from))
            }
        }
    }

    /// True iff there is no prior best of this kind, or the candidate
    /// strictly outperforms it.
    pub fn is_new_personal_best(candidate: &TestResult, current_best: Option<&TestResult>) -> bool {
        match current_best {
            None => true,
            Some(best) => compare_scores(candidate, best) > 0.0,
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::result::{TestKind, TestResult};

    fn result(kind: TestKind) -> TestResult {
        TestResult::new("t".into(), kind, 0)
    }

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(grade_from_time(149.0), GradeTier::Elite);
        assert_eq!(grade_from_time(149.999), GradeTier::Elite);
        assert_eq!(grade_from_time(150.0), GradeTier::Pro);
        assert_eq!(grade_from_time(199.999), GradeTier::Pro);
        assert_eq!(grade_from_time(200.0), GradeTier::Advanced);
        assert_eq!(grade_from_time(300.0), GradeTier::Intermediate);
        assert_eq!(grade_from_time(400.0), GradeTier::Beginner);
        assert_eq!(grade_from_time(10_000.0), GradeTier::Beginner);
        assert_eq!(grade_from_time(0.0), GradeTier::Elite);
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let mut fast = result(TestKind::ColorChange);
        fast.average_time = Some(180.0);
        let mut slow = result(TestKind::ColorChange);
        slow.average_time = Some(240.0);

        assert_eq!(compare_scores(&fast, &slow), -compare_scores(&slow, &fast));
        assert!(compare_scores(&fast, &slow) > 0.0);

        let mut many = result(TestKind::ClickTracker);
        many.total_clicks = Some(40);
        let mut few = result(TestKind::ClickTracker);
        few.total_clicks = Some(25);
        assert_eq!(compare_scores(&many, &few), -compare_scores(&few, &many));
        assert!(compare_scores(&many, &few) > 0.0);
    }

    #[test]
    fn absent_metric_never_wins() {
        let mut completed = result(TestKind::ColorChange);
        completed.average_time = Some(900.0);
        let mut aborted = result(TestKind::ColorChange);
        aborted.average_time = None;
        aborted.success = false;

        assert!(compare_scores(&completed, &aborted) > 0.0);
        assert!(compare_scores(&aborted, &completed) < 0.0);
        // Two aborted runs tie instead of producing NaN.
        assert_eq!(compare_scores(&aborted, &aborted.clone()), 0.0);
    }

    #[test]
    fn direction_react_ties_break_on_time() {
        let mut a = result(TestKind::DirectionReact);
        a.accuracy = Some(90.0);
        a.average_time = Some(420.0);
        let mut b = result(TestKind::DirectionReact);
        b.accuracy = Some(90.005);
        b.average_time = Some(500.0);

        // Accuracy difference is inside the epsilon, so the faster run wins.
        assert!(compare_scores(&a, &b) > 0.0);

        b.accuracy = Some(95.0);
        assert!(compare_scores(&a, &b) < 0.0);
    }

    #[test]
    fn personal_best_rules() {
        let mut first = result(TestKind::NumberFlash);
        first.score = Some(6);
        assert!(is_new_personal_best(&first, None));

        let mut worse = result(TestKind::NumberFlash);
        worse.score = Some(5);
        assert!(!is_new_personal_best(&worse, Some(&first)));

        let mut tied = result(TestKind::NumberFlash);
        tied.score = Some(6);
        assert!(!is_new_personal_best(&tied, Some(&first)));

        let mut better = result(TestKind::NumberFlash);
        better.score = Some(7);
        assert!(is_new_personal_best(&better, Some(&first)));
    }
}
