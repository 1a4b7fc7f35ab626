//! Aggregate statistics over a request's replays

use crate::Replay;

/// Counts and average latency shown next to a captured request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayStats {
    pub attempted: usize,
    pub successful: usize,
    pub failed: usize,
    /// Mean response time in ms, rounded to two decimals; `None` without replays
    pub average_ms: Option<f64>,
}

impl ReplayStats {
    pub fn from_replays(replays: &[Replay]) -> Self {
        let attempted = replays.len();
        let successful = replays.iter().filter(|r| !r.is_error()).count();

        let average_ms = if attempted == 0 {
            None
        } else {
            let total: i64 = replays.iter().map(Replay::duration_ms).sum();
            let mean = total as f64 / attempted as f64;
            Some((mean * 100.0).round() / 100.0)
        };

        Self {
            attempted,
            successful,
            failed: attempted - successful,
            average_ms,
        }
    }

    pub fn average_label(&self) -> String {
        match self.average_ms {
            Some(ms) => format!("{}ms", ms),
            None => "N/A".to_string(),
        }
    }

    /// Rows for a two column name/value table
    pub fn rows(&self) -> [(&'static str, String); 4] {
        [
            ("Attempted replays:", self.attempted.to_string()),
            ("Successful replays:", self.successful.to_string()),
            ("Failed replays:", self.failed.to_string()),
            ("Average response time:", self.average_label()),
        ]
    }
}
