//! Notification storage, favourite-team alerts and their hourly schedule.

use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            FavoriteTeamEntity, MatchEntity, MatchStatus, NotificationEntity, NotificationKind,
            NotificationPriority,
        },
        repository::SortOrder,
    },
    dto::functions::NotifyFavoritesResponse,
    error::ServiceError,
    state::SharedState,
};

const NOTIFICATION_LIST_LIMIT: usize = 50;
const FAVORITE_WINDOW: TimeDuration = TimeDuration::hours(24);

/// Persist a notification and push it to connected streams.
pub async fn push(
    state: &SharedState,
    notification: NotificationEntity,
) -> Result<NotificationEntity, ServiceError> {
    let repo = state.repo::<NotificationEntity>().await?;
    let stored = repo.create(notification).await?;
    state.notifications().broadcast(stored.clone());
    Ok(stored)
}

/// Most recent notifications of `email`.
pub async fn list_for_user(
    state: &SharedState,
    email: &str,
) -> Result<Vec<NotificationEntity>, ServiceError> {
    let repo = state.repo::<NotificationEntity>().await?;
    let mut mine = repo.filter(|n| n.user_email == email).await?;
    crate::dao::repository::sort_by_key(&mut mine, |n| n.created_at, SortOrder::Descending);
    mine.truncate(NOTIFICATION_LIST_LIMIT);
    Ok(mine)
}

pub async fn mark_read(
    state: &SharedState,
    email: &str,
    id: Uuid,
) -> Result<NotificationEntity, ServiceError> {
    let repo = state.repo::<NotificationEntity>().await?;
    let mut notification = repo
        .get(id)
        .await?
        .filter(|n| n.user_email == email)
        .ok_or_else(|| ServiceError::NotFound("Notification not found".into()))?;
    if !notification.read {
        notification.read = true;
        repo.update(&notification).await?;
    }
    Ok(notification)
}

/// Alert every fan whose favourite team plays within the next 24 hours.
pub async fn notify_favorite_teams(
    state: &SharedState,
) -> Result<NotifyFavoritesResponse, ServiceError> {
    notify_favorite_teams_at(state, OffsetDateTime::now_utc()).await
}

pub(crate) async fn notify_favorite_teams_at(
    state: &SharedState,
    now: OffsetDateTime,
) -> Result<NotifyFavoritesResponse, ServiceError> {
    let favorites = state.repo::<FavoriteTeamEntity>().await?.list().await?;
    let window_end = now + FAVORITE_WINDOW;
    let upcoming = state
        .repo::<MatchEntity>()
        .await?
        .filter(|m| {
            m.status == MatchStatus::Upcoming && m.match_date >= now && m.match_date <= window_end
        })
        .await?;
    let existing = state
        .repo::<NotificationEntity>()
        .await?
        .filter(|n| n.kind == NotificationKind::FavoriteTeamPlaying)
        .await?;

    let mut sent: Vec<(String, Uuid)> = existing
        .into_iter()
        .filter_map(|n| n.match_id.map(|match_id| (n.user_email, match_id)))
        .collect();

    let mut notifications_sent = 0;
    for favorite in &favorites {
        let team = favorite.team_name.trim().to_lowercase();
        if team.is_empty() {
            continue;
        }
        for fixture in upcoming.iter().filter(|m| {
            m.home_team.to_lowercase().contains(&team) || m.away_team.to_lowercase().contains(&team)
        }) {
            let key = (favorite.user_email.clone(), fixture.id);
            if sent.contains(&key) {
                continue;
            }

            let mut notification = NotificationEntity::new(
                &favorite.user_email,
                NotificationKind::FavoriteTeamPlaying,
                format!("❤️ {} joue bientôt !", favorite.team_name),
                format!("{} vs {}", fixture.home_team, fixture.away_team),
            );
            notification.match_id = Some(fixture.id);
            notification.priority = NotificationPriority::High;
            push(state, notification).await?;

            sent.push(key);
            notifications_sent += 1;
        }
    }

    info!(notifications_sent, favorites = favorites.len(), "favourite team notifications done");
    Ok(NotifyFavoritesResponse {
        success: true,
        notifications_sent,
        message: format!("{notifications_sent} notifications envoyées"),
    })
}

/// Run the favourite-team notifier on its configured interval.
pub async fn run_scheduler(state: SharedState) {
    let mut ticker = interval(state.config().schedule.favorite_notify_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if state.is_degraded().await {
            continue;
        }
        if let Err(err) = notify_favorite_teams(&state).await {
            warn!(error = %err, "scheduled favourite team notification failed");
        }
    }
}
