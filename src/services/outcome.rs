//! Scoring of predictions against final scores.

use crate::dao::models::{Prediction, PredictionResult};

/// Full-time goals of both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    pub home: u32,
    pub away: u32,
}

impl FinalScore {
    /// Parse `"2-1"` or `"2 - 1"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (home, away) = raw.split_once('-')?;
        Some(Self {
            home: home.trim().parse().ok()?,
            away: away.trim().parse().ok()?,
        })
    }

    /// Canonical `"h-a"` form stored on matches.
    pub fn label(&self) -> String {
        format!("{}-{}", self.home, self.away)
    }
}

/// Whether `prediction` holds for `score`.
pub fn prediction_holds(prediction: Prediction, score: FinalScore) -> bool {
    let FinalScore { home, away } = score;
    match prediction {
        Prediction::HomeWin => home > away,
        Prediction::Draw => home == away,
        Prediction::AwayWin => home < away,
        Prediction::Over25 => home.saturating_add(away) >= 3,
        Prediction::Under25 => home.saturating_add(away) <= 2,
        Prediction::BttsYes => home > 0 && away > 0,
        Prediction::BttsNo => home == 0 || away == 0,
    }
}

/// Win/loss for a prediction, `Pending` when there was none.
pub fn evaluate(prediction: Option<Prediction>, score: FinalScore) -> PredictionResult {
    match prediction {
        None => PredictionResult::Pending,
        Some(prediction) if prediction_holds(prediction, score) => PredictionResult::Win,
        Some(_) => PredictionResult::Loss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(home: u32, away: u32) -> FinalScore {
        FinalScore { home, away }
    }

    #[test]
    fn parses_spaced_and_compact_scores() {
        assert_eq!(FinalScore::parse("2-1"), Some(score(2, 1)));
        assert_eq!(FinalScore::parse(" 0 - 3 "), Some(score(0, 3)));
        assert_eq!(FinalScore::parse("2:1"), None);
        assert_eq!(FinalScore::parse("a-1"), None);
        assert_eq!(score(4, 0).label(), "4-0");
    }

    #[test]
    fn evaluates_every_prediction_kind() {
        let cases = [
            (Prediction::HomeWin, score(2, 1), true),
            (Prediction::HomeWin, score(1, 1), false),
            (Prediction::Draw, score(0, 0), true),
            (Prediction::Draw, score(0, 1), false),
            (Prediction::AwayWin, score(0, 1), true),
            (Prediction::AwayWin, score(3, 1), false),
            (Prediction::Over25, score(2, 1), true),
            (Prediction::Over25, score(1, 1), false),
            (Prediction::Under25, score(1, 1), true),
            (Prediction::Under25, score(3, 0), false),
            (Prediction::BttsYes, score(1, 1), true),
            (Prediction::BttsYes, score(2, 0), false),
            (Prediction::BttsNo, score(2, 0), true),
            (Prediction::BttsNo, score(1, 2), false),
        ];
        for (prediction, final_score, expected) in cases {
            assert_eq!(
                prediction_holds(prediction, final_score),
                expected,
                "{prediction:?} on {final_score:?}"
            );
        }
    }

    #[test]
    fn missing_prediction_stays_pending() {
        assert_eq!(evaluate(None, score(1, 0)), PredictionResult::Pending);
        assert_eq!(
            evaluate(Some(Prediction::HomeWin), score(1, 0)),
            PredictionResult::Win
        );
        assert_eq!(
            evaluate(Some(Prediction::Draw), score(1, 0)),
            PredictionResult::Loss
        );
    }

    #[test]
    fn goal_totals_saturate_on_huge_scores() {
        let huge = score(u32::MAX, 1);
        assert!(prediction_holds(Prediction::Over25, huge));
        assert!(!prediction_holds(Prediction::Under25, huge));
        assert_eq!(evaluate(Some(Prediction::Under25), huge), PredictionResult::Loss);
    }
}
