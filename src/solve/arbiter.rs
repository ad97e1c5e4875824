//! Log-odds acceptance policy for solver matches.
//!
//! A match is accepted when its score S satisfies:
//!   S >= to_solve
//!
//! Scores in [to_tune, to_solve) are rejected but flagged as tuning
//! candidates, worth a caller-level retry with looser parameters. Anything
//! lower (or NaN) is a plain rejection. The thresholds are used as given;
//! if `to_tune >= to_solve` the tuning band is simply empty.

use crate::config::LogOddsThresholds;
use crate::solve::task::TaskOutcome;

/// Classification of a single log-odds score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    TuningCandidate,
    Rejected,
}

/// Applies the acceptance thresholds to solver outcomes.
#[derive(Debug, Clone, Copy)]
pub struct ResultArbiter {
    thresholds: LogOddsThresholds,
}

impl ResultArbiter {
    pub fn new(thresholds: LogOddsThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &LogOddsThresholds {
        &self.thresholds
    }

    /// Classify a log-odds score.
    pub fn judge(&self, log_odds: f64) -> Verdict {
        if log_odds.is_nan() {
            Verdict::Rejected
        } else if log_odds >= self.thresholds.to_solve {
            Verdict::Accepted
        } else if log_odds >= self.thresholds.to_tune {
            Verdict::TuningCandidate
        } else {
            Verdict::Rejected
        }
    }

    /// Whether the solver would keep the match as a candidate.
    pub fn is_kept(&self, log_odds: f64) -> bool {
        log_odds >= self.thresholds.to_keep
    }

    /// Whether an outcome is a genuine win.
    pub fn accept(&self, outcome: &TaskOutcome) -> bool {
        match outcome {
            TaskOutcome::Solved { log_odds, .. } => self.judge(*log_odds) == Verdict::Accepted,
            _ => false,
        }
    }
}
