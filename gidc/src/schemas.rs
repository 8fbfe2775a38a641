use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-1 class of a classified image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub score: f32,
}

impl Prediction {
    pub fn confidence(&self) -> Score {
        Score(self.score)
    }
}

/// Model confidence in `[0, 1]`, displayed as a percentage truncated to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Score(pub f32);

impl Score {
    /// Truncation happens in `f32`, the precision the model reports in.
    pub fn percent(self) -> f32 {
        (self.0 * 1000.0).trunc() / 10.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.percent())
    }
}
