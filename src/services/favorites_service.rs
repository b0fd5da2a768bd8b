use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dao::models::FavoriteTeamEntity, dto::account::FavoriteTeamRequest, error::ServiceError,
    state::SharedState,
};

pub async fn list(state: &SharedState, email: &str) -> Result<Vec<FavoriteTeamEntity>, ServiceError> {
    let repo = state.repo::<FavoriteTeamEntity>().await?;
    Ok(repo.filter(|f| f.user_email == email).await?)
}

/// Follow a team; following the same team twice is a conflict.
pub async fn add(
    state: &SharedState,
    email: &str,
    request: FavoriteTeamRequest,
) -> Result<FavoriteTeamEntity, ServiceError> {
    let repo = state.repo::<FavoriteTeamEntity>().await?;
    let team_name = request.team_name.trim().to_string();
    if team_name.is_empty() {
        return Err(ServiceError::InvalidInput("Team name required".into()));
    }
    let duplicate = repo
        .find_first(|f| f.user_email == email && f.team_name.eq_ignore_ascii_case(&team_name))
        .await?;
    if duplicate.is_some() {
        return Err(ServiceError::Conflict("Team already in favorites".into()));
    }

    Ok(repo
        .create(FavoriteTeamEntity {
            id: Uuid::new_v4(),
            user_email: email.to_string(),
            team_name,
            league: request.league,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?)
}

pub async fn remove(state: &SharedState, email: &str, id: Uuid) -> Result<(), ServiceError> {
    let repo = state.repo::<FavoriteTeamEntity>().await?;
    match repo.get(id).await? {
        Some(favorite) if favorite.user_email == email => {
            repo.delete(id).await?;
            Ok(())
        }
        _ => Err(ServiceError::NotFound("Favorite not found".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::MatchEntity,
        services::notification_service,
        testing::TestContext,
    };

    fn request(team: &str) -> FavoriteTeamRequest {
        FavoriteTeamRequest {
            team_name: team.into(),
            league: Some("Ligue 1".into()),
        }
    }

    #[tokio::test]
    async fn add_list_remove_scoped_to_owner() {
        let ctx = TestContext::new().await;
        let added = add(&ctx.state, "a@x.io", request(" Olympique Lyonnais ")).await.unwrap();
        assert_eq!(added.team_name, "Olympique Lyonnais");
        assert!(matches!(
            add(&ctx.state, "a@x.io", request("olympique lyonnais")).await,
            Err(ServiceError::Conflict(_))
        ));

        assert!(matches!(
            remove(&ctx.state, "b@x.io", added.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(list(&ctx.state, "a@x.io").await.unwrap().len(), 1);

        remove(&ctx.state, "a@x.io", added.id).await.unwrap();
        assert!(list(&ctx.state, "a@x.io").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_team_name_is_rejected_and_never_matches() {
        let ctx = TestContext::new().await;
        assert!(matches!(
            add(&ctx.state, "a@x.io", request("   ")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(list(&ctx.state, "a@x.io").await.unwrap().is_empty());

        ctx.repo::<FavoriteTeamEntity>()
            .await
            .create(FavoriteTeamEntity {
                id: Uuid::new_v4(),
                user_email: "legacy@x.io".into(),
                team_name: "".into(),
                league: None,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        let fixture = MatchEntity::upcoming(
            "Home FC",
            "Away FC",
            "Ligue 1",
            OffsetDateTime::now_utc() + time::Duration::hours(2),
        );
        ctx.repo::<MatchEntity>().await.create(fixture).await.unwrap();

        let sent = notification_service::notify_favorite_teams(&ctx.state).await.unwrap();
        assert_eq!(sent.notifications_sent, 0);
    }
}
