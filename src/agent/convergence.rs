// src/agent/convergence.rs — Stop-condition rules for evaluation sessions

use serde::{Deserialize, Serialize};

use super::session::IterationRecord;

/// Stop signal the model may set when it sees nothing left to improve.
pub const STOP_NO_IMPROVEMENT: &str = "no_improvement";

/// Why a session stopped improving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergeReason {
    NoImprovement,
    TargetReached,
    Stagnant,
    MaxIterations,
}

impl ConvergeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvergeReason::NoImprovement => "no_improvement",
            ConvergeReason::TargetReached => "target_reached",
            ConvergeReason::Stagnant => "stagnant",
            ConvergeReason::MaxIterations => "max_iterations",
        }
    }
}

impl std::fmt::Display for ConvergeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict attached to every evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Active,
    Converged(ConvergeReason),
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged(_))
    }

    pub fn reason(&self) -> Option<ConvergeReason> {
        match self {
            Convergence::Active => None,
            Convergence::Converged(reason) => Some(*reason),
        }
    }
}

/// Apply the stop rules to the session history, highest priority first:
/// explicit model stop signal, target score reached with nothing left to
/// fix, three non-increasing scores, iteration budget exhausted.
pub fn verdict(history: &[IterationRecord], target_score: u8, max_iterations: u32) -> Convergence {
    let Some(last) = history.last() else {
        return Convergence::Active;
    };

    if last.stop_reason.as_deref() == Some(STOP_NO_IMPROVEMENT) {
        return Convergence::Converged(ConvergeReason::NoImprovement);
    }

    if last.score >= target_score && !last.had_suggestion {
        return Convergence::Converged(ConvergeReason::TargetReached);
    }

    if history.len() >= 3 {
        let tail = &history[history.len() - 3..];
        if tail[2].score <= tail[1].score && tail[1].score <= tail[0].score {
            return Convergence::Converged(ConvergeReason::Stagnant);
        }
    }

    if history.len() as u32 >= max_iterations {
        return Convergence::Converged(ConvergeReason::MaxIterations);
    }

    Convergence::Active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::session::CriteriaScores;

    fn record(iteration: u32, score: u8, had_suggestion: bool) -> IterationRecord {
        IterationRecord {
            iteration,
            score,
            criteria: CriteriaScores::default(),
            summary: String::new(),
            issues: vec![],
            had_suggestion,
            stop_reason: None,
        }
    }

    fn history(scores: &[u8]) -> Vec<IterationRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| record(i as u32 + 1, s, true))
            .collect()
    }

    // ─── priority order ─────────────────────────────────────────

    #[test]
    fn test_no_improvement_wins_regardless_of_score() {
        let mut h = history(&[3]);
        h[0].stop_reason = Some(STOP_NO_IMPROVEMENT.into());
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::NoImprovement)
        );
    }

    #[test]
    fn test_no_improvement_beats_target_reached() {
        let mut h = vec![record(1, 9, false)];
        h[0].stop_reason = Some(STOP_NO_IMPROVEMENT.into());
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::NoImprovement)
        );
    }

    #[test]
    fn test_unknown_stop_reason_is_ignored() {
        let mut h = history(&[3]);
        h[0].stop_reason = Some("good_enough".into());
        assert_eq!(verdict(&h, 8, 8), Convergence::Active);
    }

    // ─── target reached ─────────────────────────────────────────

    #[test]
    fn test_target_reached_without_suggestion() {
        let h = vec![record(1, 9, false)];
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::TargetReached)
        );
    }

    #[test]
    fn test_target_score_with_suggestion_stays_active() {
        // Same score, but the model still sees issues to fix.
        let h = vec![record(1, 9, true)];
        assert_eq!(verdict(&h, 8, 8), Convergence::Active);
    }

    #[test]
    fn test_exact_target_counts() {
        let h = vec![record(1, 8, false)];
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::TargetReached)
        );
    }

    // ─── stagnation ─────────────────────────────────────────────

    #[test]
    fn test_stagnant_on_three_flat_scores() {
        let h = history(&[6, 6, 6]);
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::Stagnant)
        );
    }

    #[test]
    fn test_stagnant_looks_only_at_last_three() {
        // [4, 6, 6, 6]: the rising 4->6 is outside the window.
        let h = history(&[4, 6, 6, 6]);
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::Stagnant)
        );
    }

    #[test]
    fn test_declining_scores_are_stagnant() {
        let h = history(&[7, 6, 5]);
        assert_eq!(
            verdict(&h, 8, 8),
            Convergence::Converged(ConvergeReason::Stagnant)
        );
    }

    #[test]
    fn test_improving_scores_stay_active() {
        let h = history(&[4, 5, 6]);
        assert_eq!(verdict(&h, 8, 8), Convergence::Active);
    }

    #[test]
    fn test_two_scores_cannot_stagnate() {
        let h = history(&[6, 6]);
        assert_eq!(verdict(&h, 8, 8), Convergence::Active);
    }

    // ─── iteration budget ───────────────────────────────────────

    #[test]
    fn test_max_iterations_cutoff() {
        // Rising scores never trip stagnation; the budget rule fires on
        // the fifth record.
        let h = history(&[1, 2, 3, 4, 5]);
        assert_eq!(verdict(&h[..4], 8, 5), Convergence::Active);
        assert_eq!(
            verdict(&h, 8, 5),
            Convergence::Converged(ConvergeReason::MaxIterations)
        );
    }

    #[test]
    fn test_stagnant_outranks_max_iterations() {
        let h = history(&[6, 6, 6]);
        assert_eq!(
            verdict(&h, 8, 3),
            Convergence::Converged(ConvergeReason::Stagnant)
        );
    }

    // ─── misc ───────────────────────────────────────────────────

    #[test]
    fn test_empty_history_is_active() {
        assert_eq!(verdict(&[], 8, 8), Convergence::Active);
    }

    #[test]
    fn test_reason_serialization_names() {
        for (reason, name) in [
            (ConvergeReason::NoImprovement, "no_improvement"),
            (ConvergeReason::TargetReached, "target_reached"),
            (ConvergeReason::Stagnant, "stagnant"),
            (ConvergeReason::MaxIterations, "max_iterations"),
        ] {
            assert_eq!(reason.as_str(), name);
            assert_eq!(
                serde_json::to_string(&reason).unwrap(),
                format!("\"{name}\"")
            );
        }
    }
}
