//! Pure rules for points, levels, visit streaks and badges.

use time::Date;

use crate::dao::models::{Badge, PredictionResult, UserStatsEntity};

/// Points granted for a winning prediction.
pub const POINTS_PER_WIN: u32 = 10;
const POINTS_PER_LEVEL: u32 = 100;

/// Threshold on a counter that unlocks a badge.
struct BadgeRule {
    badge: Badge,
    threshold: u32,
    title: &'static str,
    message: &'static str,
}

const PREDICTION_BADGES: [BadgeRule; 5] = [
    BadgeRule {
        badge: Badge::FirstPrediction,
        threshold: 1,
        title: "🌟 Badge débloqué !",
        message: "Première Étoile - Votre 1er pronostic",
    },
    BadgeRule {
        badge: Badge::FivePredictions,
        threshold: 5,
        title: "🏅 Badge Bronze !",
        message: "Débutant - 5 pronostics",
    },
    BadgeRule {
        badge: Badge::TwentyPredictions,
        threshold: 20,
        title: "🥈 Badge Silver !",
        message: "Régulier - 20 pronostics",
    },
    BadgeRule {
        badge: Badge::FiftyPredictions,
        threshold: 50,
        title: "🥇 Badge Gold !",
        message: "Expert - 50 pronostics",
    },
    BadgeRule {
        badge: Badge::HundredPredictions,
        threshold: 100,
        title: "👑 Badge Gold !",
        message: "Maître - 100 pronostics",
    },
];

const WIN_BADGES: [BadgeRule; 2] = [
    BadgeRule {
        badge: Badge::FirstWin,
        threshold: 1,
        title: "⚡ Badge débloqué !",
        message: "1ère Victoire",
    },
    BadgeRule {
        badge: Badge::TenWins,
        threshold: 10,
        title: "📈 Badge Silver !",
        message: "Vainqueur - 10 victoires",
    },
];

const STREAK_BADGES: [BadgeRule; 3] = [
    BadgeRule {
        badge: Badge::Streak3,
        threshold: 3,
        title: "🔥 Badge débloqué !",
        message: "En Feu - 3 jours consécutifs",
    },
    BadgeRule {
        badge: Badge::Streak7,
        threshold: 7,
        title: "🔥 Badge Silver !",
        message: "Inarrêtable - 7 jours consécutifs",
    },
    BadgeRule {
        badge: Badge::Streak30,
        threshold: 30,
        title: "🔥 Badge Gold !",
        message: "Légende - 30 jours consécutifs",
    },
];

/// Badge unlocked by an update, with the notification text announcing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardedBadge {
    pub badge: Badge,
    pub title: &'static str,
    pub message: &'static str,
}

pub fn level_for_points(points: u32) -> u32 {
    points / POINTS_PER_LEVEL + 1
}

/// Append every badge of `rules` whose threshold `value` reached and that is not owned yet.
fn award(badges: &mut Vec<Badge>, rules: &[BadgeRule], value: u32) -> Vec<AwardedBadge> {
    let mut awarded = Vec::new();
    for rule in rules {
        if value >= rule.threshold && !badges.contains(&rule.badge) {
            badges.push(rule.badge);
            awarded.push(AwardedBadge {
                badge: rule.badge,
                title: rule.title,
                message: rule.message,
            });
        }
    }
    awarded
}

/// Record one resolved prediction on `stats` and return the badges it unlocked.
pub fn apply_prediction(stats: &mut UserStatsEntity, result: PredictionResult) -> Vec<AwardedBadge> {
    stats.total_predictions += 1;
    if result == PredictionResult::Win {
        stats.total_wins += 1;
        stats.current_win_streak += 1;
        stats.points += POINTS_PER_WIN;
    } else {
        stats.current_win_streak = 0;
    }
    stats.best_streak = stats.best_streak.max(stats.current_win_streak);
    stats.level = level_for_points(stats.points);

    let mut awarded = award(&mut stats.badges, &PREDICTION_BADGES, stats.total_predictions);
    awarded.extend(award(&mut stats.badges, &WIN_BADGES, stats.total_wins));
    awarded
}

/// Take back a prediction previously counted as `result`. Badges already earned stay.
pub fn retract_prediction(stats: &mut UserStatsEntity, result: PredictionResult) {
    if result == PredictionResult::Pending {
        return;
    }
    stats.total_predictions = stats.total_predictions.saturating_sub(1);
    if result == PredictionResult::Win {
        stats.total_wins = stats.total_wins.saturating_sub(1);
        stats.current_win_streak = stats.current_win_streak.saturating_sub(1);
        stats.points = stats.points.saturating_sub(POINTS_PER_WIN);
    }
    stats.level = level_for_points(stats.points);
}

/// Re-count a prediction whose result changed from `previous` to `corrected`.
pub fn correct_prediction(
    stats: &mut UserStatsEntity,
    previous: PredictionResult,
    corrected: PredictionResult,
) -> Vec<AwardedBadge> {
    if previous == corrected {
        return Vec::new();
    }
    retract_prediction(stats, previous);
    if corrected == PredictionResult::Pending {
        return Vec::new();
    }
    apply_prediction(stats, corrected)
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitOutcome {
    /// Already counted today.
    SameDay,
    Counted { awarded: Vec<AwardedBadge> },
}

/// Register a visit on `today`: consecutive days extend the streak, gaps reset it to one.
pub fn register_visit(stats: &mut UserStatsEntity, today: Date) -> VisitOutcome {
    match stats.last_visit_date {
        Some(last) if last == today => return VisitOutcome::SameDay,
        Some(last) if last.next_day() == Some(today) => stats.streak_days += 1,
        _ => stats.streak_days = 1,
    }
    stats.last_visit_date = Some(today);

    let awarded = award(&mut stats.badges, &STREAK_BADGES, stats.streak_days);
    VisitOutcome::Counted { awarded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn stats() -> UserStatsEntity {
        UserStatsEntity::new("fan@example.com", None)
    }

    #[test]
    fn level_grows_every_hundred_points() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(250), 3);
    }

    #[test]
    fn first_win_awards_two_badges_once() {
        let mut stats = stats();
        let awarded = apply_prediction(&mut stats, PredictionResult::Win);
        let badges: Vec<_> = awarded.iter().map(|a| a.badge).collect();
        assert_eq!(badges, vec![Badge::FirstPrediction, Badge::FirstWin]);
        assert_eq!(stats.points, 10);
        assert_eq!(stats.current_win_streak, 1);

        let again = apply_prediction(&mut stats, PredictionResult::Win);
        assert!(again.is_empty());
        assert_eq!(stats.badges.len(), 2);
    }

    #[test]
    fn loss_resets_win_streak_but_keeps_best() {
        let mut stats = stats();
        apply_prediction(&mut stats, PredictionResult::Win);
        apply_prediction(&mut stats, PredictionResult::Win);
        apply_prediction(&mut stats, PredictionResult::Loss);
        assert_eq!(stats.current_win_streak, 0);
        assert_eq!(stats.best_streak, 2);
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.total_wins, 2);
    }

    #[test]
    fn ten_wins_reach_level_two() {
        let mut stats = stats();
        let mut unlocked = Vec::new();
        for _ in 0..10 {
            unlocked.extend(apply_prediction(&mut stats, PredictionResult::Win));
        }
        assert_eq!(stats.level, 2);
        assert!(unlocked.iter().any(|a| a.badge == Badge::TenWins));
        assert!(unlocked.iter().any(|a| a.badge == Badge::FivePredictions));
        assert_eq!(
            unlocked.iter().filter(|a| a.badge == Badge::FirstWin).count(),
            1
        );
    }

    #[test]
    fn corrected_win_becomes_loss() {
        let mut stats = stats();
        apply_prediction(&mut stats, PredictionResult::Win);
        apply_prediction(&mut stats, PredictionResult::Win);

        let awarded = correct_prediction(&mut stats, PredictionResult::Win, PredictionResult::Loss);
        assert!(awarded.is_empty());
        assert_eq!(stats.total_predictions, 2);
        assert_eq!(stats.total_wins, 1);
        assert_eq!(stats.points, 10);
        assert_eq!(stats.current_win_streak, 0);
        assert_eq!(stats.best_streak, 2);
    }

    #[test]
    fn corrected_loss_becomes_win_and_can_unlock_badges() {
        let mut stats = stats();
        apply_prediction(&mut stats, PredictionResult::Loss);

        let awarded = correct_prediction(&mut stats, PredictionResult::Loss, PredictionResult::Win);
        assert_eq!(awarded.iter().map(|a| a.badge).collect::<Vec<_>>(), vec![Badge::FirstWin]);
        assert_eq!(stats.total_predictions, 1);
        assert_eq!(stats.total_wins, 1);
        assert_eq!(stats.points, 10);

        correct_prediction(&mut stats, PredictionResult::Win, PredictionResult::Pending);
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.total_wins, 0);
        assert_eq!(stats.points, 0);
        assert_eq!(stats.level, 1);
    }

    #[test]
    fn consecutive_visits_build_streak() {
        let mut stats = stats();
        stats.last_visit_date = Some(date!(2025 - 03 - 01));
        stats.streak_days = 2;

        let outcome = register_visit(&mut stats, date!(2025 - 03 - 02));
        assert_eq!(stats.streak_days, 3);
        match outcome {
            VisitOutcome::Counted { awarded } => {
                assert_eq!(awarded.len(), 1);
                assert_eq!(awarded[0].badge, Badge::Streak3);
                assert_eq!(awarded[0].message, "En Feu - 3 jours consécutifs");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn same_day_visit_is_a_noop() {
        let mut stats = stats();
        stats.last_visit_date = Some(date!(2025 - 03 - 01));
        stats.streak_days = 4;
        assert_eq!(
            register_visit(&mut stats, date!(2025 - 03 - 01)),
            VisitOutcome::SameDay
        );
        assert_eq!(stats.streak_days, 4);
    }

    #[test]
    fn gap_resets_streak_without_badges() {
        let mut stats = stats();
        stats.last_visit_date = Some(date!(2025 - 02 - 26));
        stats.streak_days = 6;
        let outcome = register_visit(&mut stats, date!(2025 - 03 - 01));
        assert_eq!(stats.streak_days, 1);
        assert_eq!(outcome, VisitOutcome::Counted { awarded: vec![] });
        assert_eq!(stats.last_visit_date, Some(date!(2025 - 03 - 01)));
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let mut stats = stats();
        stats.last_visit_date = Some(date!(2025 - 02 - 28));
        stats.streak_days = 1;
        register_visit(&mut stats, date!(2025 - 03 - 01));
        assert_eq!(stats.streak_days, 2);
    }
}
