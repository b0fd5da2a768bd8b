use crate::{
    dao::{models::UserStatsEntity, repository::SortOrder},
    dto::account::{LeaderboardEntry, LeaderboardResponse},
    error::ServiceError,
    state::SharedState,
};

const LEADERBOARD_SIZE: usize = 100;

/// Public name of a player; the email itself is never exposed.
fn public_name(stats: &UserStatsEntity) -> String {
    stats
        .display_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            stats
                .user_email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

/// Top players by points, ranked from 1, with the caller's rank when listed.
pub async fn leaderboard(
    state: &SharedState,
    email: &str,
) -> Result<LeaderboardResponse, ServiceError> {
    let top = state
        .repo::<UserStatsEntity>()
        .await?
        .list_sorted(|s| s.points, SortOrder::Descending, LEADERBOARD_SIZE)
        .await?;

    let my_rank = top
        .iter()
        .position(|s| s.user_email == email)
        .map(|index| index + 1);
    let entries = top
        .iter()
        .enumerate()
        .map(|(index, stats)| LeaderboardEntry {
            rank: index + 1,
            display_name: public_name(stats),
            points: stats.points,
            level: stats.level,
            total_wins: stats.total_wins,
            total_predictions: stats.total_predictions,
            badges: stats.badges.clone(),
        })
        .collect();

    Ok(LeaderboardResponse { entries, my_rank })
}
