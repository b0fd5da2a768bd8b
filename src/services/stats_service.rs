//! Visit streaks and prediction counters of a user.

use time::{Date, OffsetDateTime};
use tracing::info;

use crate::{
    dao::models::{NotificationEntity, NotificationKind, PredictionResult, UserStatsEntity},
    dto::functions::{TrackVisitResponse, UpdateStatsResponse},
    error::ServiceError,
    services::{
        gamification::{self, AwardedBadge, VisitOutcome},
        notification_service,
    },
    state::SharedState,
};

/// Stats of `email`, if the user was already seen.
pub async fn find(
    state: &SharedState,
    email: &str,
) -> Result<Option<UserStatsEntity>, ServiceError> {
    let repo = state.repo::<UserStatsEntity>().await?;
    Ok(repo.find_first(|stats| stats.user_email == email).await?)
}

async fn announce(
    state: &SharedState,
    email: &str,
    awarded: &[AwardedBadge],
) -> Result<Vec<String>, ServiceError> {
    let mut messages = Vec::with_capacity(awarded.len());
    for badge in awarded {
        notification_service::push(
            state,
            NotificationEntity::new(email, NotificationKind::BadgeEarned, badge.title, badge.message),
        )
        .await?;
        messages.push(badge.message.to_string());
    }
    Ok(messages)
}

pub async fn track_visit(
    state: &SharedState,
    email: &str,
    display_name: Option<String>,
) -> Result<TrackVisitResponse, ServiceError> {
    track_visit_on(state, email, display_name, OffsetDateTime::now_utc().date()).await
}

/// Count a visit made on `today` towards the daily streak.
pub(crate) async fn track_visit_on(
    state: &SharedState,
    email: &str,
    display_name: Option<String>,
    today: Date,
) -> Result<TrackVisitResponse, ServiceError> {
    let _guard = state.lock_stats(email).await;
    let repo = state.repo::<UserStatsEntity>().await?;

    let Some(mut stats) = find(state, email).await? else {
        let mut stats = UserStatsEntity::new(email, display_name);
        gamification::register_visit(&mut stats, today);
        repo.create(stats).await?;
        info!(user = %email, "first visit recorded");
        return Ok(TrackVisitResponse {
            streak: 1,
            is_new: true,
            new_badges: None,
        });
    };

    match gamification::register_visit(&mut stats, today) {
        VisitOutcome::SameDay => Ok(TrackVisitResponse {
            streak: stats.streak_days,
            is_new: false,
            new_badges: None,
        }),
        VisitOutcome::Counted { awarded } => {
            if stats.display_name.is_none() {
                stats.display_name = display_name;
            }
            repo.update(&stats).await?;
            let new_badges = announce(state, email, &awarded).await?;
            Ok(TrackVisitResponse {
                streak: stats.streak_days,
                is_new: true,
                new_badges: Some(new_badges),
            })
        }
    }
}

/// Record one resolved prediction for `email`, creating the stats when missing.
pub async fn update_user_stats(
    state: &SharedState,
    email: &str,
    display_name: Option<String>,
    result: PredictionResult,
) -> Result<UpdateStatsResponse, ServiceError> {
    let _guard = state.lock_stats(email).await;
    let repo = state.repo::<UserStatsEntity>().await?;
    let mut stats = match find(state, email).await? {
        Some(stats) => stats,
        None => UserStatsEntity::new(email, display_name),
    };

    let awarded = gamification::apply_prediction(&mut stats, result);
    repo.update(&stats).await?;
    let new_badges = announce(state, email, &awarded).await?;

    Ok(UpdateStatsResponse {
        success: true,
        new_badges,
        points: stats.points,
        level: stats.level,
    })
}

/// Re-count a settled prediction of `email` whose result changed after a score correction.
pub async fn correct_user_stats(
    state: &SharedState,
    email: &str,
    previous: PredictionResult,
    corrected: PredictionResult,
) -> Result<(), ServiceError> {
    let _guard = state.lock_stats(email).await;
    let repo = state.repo::<UserStatsEntity>().await?;
    let mut stats = match find(state, email).await? {
        Some(stats) => stats,
        None => UserStatsEntity::new(email, None),
    };

    let awarded = gamification::correct_prediction(&mut stats, previous, corrected);
    repo.update(&stats).await?;
    announce(state, email, &awarded).await?;
    info!(user = %email, ?previous, ?corrected, "prediction result corrected");
    Ok(())
}

/// `win` counts as a won prediction, any other value as a miss.
pub fn parse_prediction_result(raw: Option<&str>) -> PredictionResult {
    match raw {
        Some("win") => PredictionResult::Win,
        _ => PredictionResult::Loss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use time::macros::date;

    #[tokio::test]
    async fn first_visit_creates_stats() {
        let ctx = TestContext::new().await;
        let response = track_visit_on(&ctx.state, "fan@x.io", None, date!(2025 - 03 - 01))
            .await
            .unwrap();
        assert_eq!(response.streak, 1);
        assert!(response.is_new);
        assert!(response.new_badges.is_none());

        let stored = find(&ctx.state, "fan@x.io").await.unwrap().unwrap();
        assert_eq!(stored.last_visit_date, Some(date!(2025 - 03 - 01)));
    }

    #[tokio::test]
    async fn third_consecutive_day_unlocks_streak_badge() {
        let ctx = TestContext::new().await;
        let email = "fan@x.io";
        track_visit_on(&ctx.state, email, None, date!(2025 - 03 - 01)).await.unwrap();
        let same_day = track_visit_on(&ctx.state, email, None, date!(2025 - 03 - 01))
            .await
            .unwrap();
        assert!(!same_day.is_new);
        assert_eq!(same_day.streak, 1);

        track_visit_on(&ctx.state, email, None, date!(2025 - 03 - 02)).await.unwrap();
        let third = track_visit_on(&ctx.state, email, None, date!(2025 - 03 - 03))
            .await
            .unwrap();
        assert_eq!(third.streak, 3);
        assert_eq!(
            third.new_badges,
            Some(vec!["En Feu - 3 jours consécutifs".to_string()])
        );

        let notifications = notification_service::list_for_user(&ctx.state, email)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::BadgeEarned);

        let gap = track_visit_on(&ctx.state, email, None, date!(2025 - 03 - 10))
            .await
            .unwrap();
        assert_eq!(gap.streak, 1);
        assert_eq!(gap.new_badges, Some(Vec::new()));
    }

    #[tokio::test]
    async fn prediction_updates_points_and_level() {
        let ctx = TestContext::new().await;
        let first = update_user_stats(&ctx.state, "fan@x.io", None, PredictionResult::Win)
            .await
            .unwrap();
        assert_eq!(first.points, 10);
        assert_eq!(first.level, 1);
        assert_eq!(first.new_badges.len(), 2);

        let second = update_user_stats(&ctx.state, "fan@x.io", None, PredictionResult::Loss)
            .await
            .unwrap();
        assert!(second.new_badges.is_empty());

        let stored = find(&ctx.state, "fan@x.io").await.unwrap().unwrap();
        assert_eq!(stored.total_predictions, 2);
        assert_eq!(stored.current_win_streak, 0);
        assert_eq!(stored.best_streak, 1);
    }

    #[test]
    fn only_win_counts_as_win() {
        assert_eq!(parse_prediction_result(Some("win")), PredictionResult::Win);
        assert_eq!(parse_prediction_result(Some("loss")), PredictionResult::Loss);
        assert_eq!(parse_prediction_result(None), PredictionResult::Loss);
    }
}
