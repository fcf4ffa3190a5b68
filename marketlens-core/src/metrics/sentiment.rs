//! Fear & Greed score bands.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentRating {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl SentimentRating {
    /// Band for a 0–100 score.
    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            Self::ExtremeFear
        } else if score < 45.0 {
            Self::Fear
        } else if score <= 55.0 {
            Self::Neutral
        } else if score <= 75.0 {
            Self::Greed
        } else {
            Self::ExtremeGreed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ExtremeFear => "extreme fear",
            Self::Fear => "fear",
            Self::Neutral => "neutral",
            Self::Greed => "greed",
            Self::ExtremeGreed => "extreme greed",
        }
    }
}

impl fmt::Display for SentimentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        assert_eq!(SentimentRating::from_score(0.0), SentimentRating::ExtremeFear);
        assert_eq!(SentimentRating::from_score(24.9), SentimentRating::ExtremeFear);
        assert_eq!(SentimentRating::from_score(25.0), SentimentRating::Fear);
        assert_eq!(SentimentRating::from_score(45.0), SentimentRating::Neutral);
        assert_eq!(SentimentRating::from_score(55.0), SentimentRating::Neutral);
        assert_eq!(SentimentRating::from_score(55.1), SentimentRating::Greed);
        assert_eq!(SentimentRating::from_score(75.0), SentimentRating::Greed);
        assert_eq!(SentimentRating::from_score(75.1), SentimentRating::ExtremeGreed);
        assert_eq!(SentimentRating::ExtremeGreed.to_string(), "extreme greed");
    }
}
