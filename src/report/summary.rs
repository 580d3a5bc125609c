use serde::{Deserialize, Serialize};

use crate::runner::{RunResults, RunTiming};

/// Aggregate statistics shown in the report header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    /// Percentage of successful uploads; `None` for an empty run
    pub success_rate: Option<f64>,
    pub elapsed_seconds: f64,
}

impl RunSummary {
    pub fn new(results: &RunResults, timing: &RunTiming) -> Self {
        let total = results.total();
        let successes = results.successes().len();
        let success_rate = (total > 0).then(|| successes as f64 / total as f64 * 100.0);
        Self {
            total,
            successes,
            failures: results.failures().len(),
            success_rate,
            elapsed_seconds: timing.elapsed_seconds(),
        }
    }

    /// Success rate with two decimals, or `N/A` when nothing ran
    pub fn success_rate_label(&self) -> String {
        match self.success_rate {
            Some(rate) => format!("{:.2}", rate),
            None => "N/A".to_string(),
        }
    }

    /// Success rate with a percent sign, or `N/A`
    pub fn success_rate_percent(&self) -> String {
        match self.success_rate {
            Some(_) => format!("{}%", self.success_rate_label()),
            None => self.success_rate_label(),
        }
    }

    /// Elapsed seconds with two decimals
    pub fn elapsed_label(&self) -> String {
        format!("{:.2}", self.elapsed_seconds)
    }
}
