//! Progress extraction from downloader output

use regex::Regex;
use std::sync::LazyLock;

static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)%").expect("percent pattern is valid")
});

/// First `<digits>[.<digits>]%` on the line, clamped to `[0, 100]`
pub fn parse_percent(line: &str) -> Option<f64> {
    let captures = PERCENT.captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 100.0))
}

/// Keeps reported progress non-decreasing for one job
///
/// Merged video downloads fetch two streams and the second restarts at 0%;
/// those readings are swallowed instead of making the bar jump back.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    last: Option<f64>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value to report, or `None` if it would not move forward
    pub fn advance(&mut self, percent: f64) -> Option<f64> {
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }

    /// Highest value reported so far
    pub fn last(&self) -> f64 {
        self.last.unwrap_or(0.0)
    }
}
