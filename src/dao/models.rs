use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Record persisted in its own collection of the document store.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection holding this entity.
    const COLLECTION: &'static str;

    /// Primary key of the record.
    fn id(&self) -> Uuid;
}

macro_rules! entity {
    ($ty:ty, $collection:literal) => {
        impl Entity for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

/// Lifecycle of a fixture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Upcoming,
    Live,
    Finished,
}

/// Whether a prediction turned out right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PredictionResult {
    #[default]
    Pending,
    Win,
    Loss,
}

/// Outcome category a prediction can bet on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Prediction {
    #[serde(rename = "home_win")]
    HomeWin,
    #[serde(rename = "draw")]
    Draw,
    #[serde(rename = "away_win")]
    AwayWin,
    #[serde(rename = "over_2.5")]
    Over25,
    #[serde(rename = "under_2.5")]
    Under25,
    #[serde(rename = "btts_yes")]
    BttsYes,
    #[serde(rename = "btts_no")]
    BttsNo,
}

impl Prediction {
    /// Every variant, in the order exposed to the language model.
    pub const ALL: [Prediction; 7] = [
        Prediction::HomeWin,
        Prediction::Draw,
        Prediction::AwayWin,
        Prediction::Over25,
        Prediction::Under25,
        Prediction::BttsYes,
        Prediction::BttsNo,
    ];

    /// Wire name of the prediction (e.g. `over_2.5`).
    pub fn as_str(self) -> &'static str {
        match self {
            Prediction::HomeWin => "home_win",
            Prediction::Draw => "draw",
            Prediction::AwayWin => "away_win",
            Prediction::Over25 => "over_2.5",
            Prediction::Under25 => "under_2.5",
            Prediction::BttsYes => "btts_yes",
            Prediction::BttsNo => "btts_no",
        }
    }
}

/// Decimal odds offered by one bookmaker for the 1X2 market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Odds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// A fixture displayed in the catalogue and targeted by predictions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchEntity {
    pub id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    /// Kickoff time.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub match_date: OffsetDateTime,
    #[serde(default)]
    pub status: MatchStatus,
    /// Outcome of the match-level prediction.
    #[serde(default)]
    pub result: PredictionResult,
    #[serde(default)]
    pub prediction: Option<Prediction>,
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub odds_winamax: Option<Odds>,
    #[serde(default)]
    pub odds_betclic: Option<Odds>,
    #[serde(default)]
    pub odds_parionssport: Option<Odds>,
    #[serde(default)]
    pub logo_home: Option<String>,
    #[serde(default)]
    pub logo_away: Option<String>,
    /// `fbd-<id>` for fixtures imported from football-data.org.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub final_score: Option<String>,
    #[serde(default)]
    pub live_score: Option<String>,
    #[serde(default)]
    pub live_minute: Option<u16>,
    #[serde(default)]
    pub live_events: Vec<Value>,
    #[serde(default)]
    pub live_analysis: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub live_updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

impl MatchEntity {
    /// Build an upcoming fixture with no prediction attached.
    pub fn upcoming(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        league: impl Into<String>,
        match_date: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            league: league.into(),
            match_date,
            status: MatchStatus::Upcoming,
            result: PredictionResult::Pending,
            prediction: None,
            confidence: None,
            analysis: None,
            odds_winamax: None,
            odds_betclic: None,
            odds_parionssport: None,
            logo_home: None,
            logo_away: None,
            external_id: None,
            final_score: None,
            live_score: None,
            live_minute: None,
            live_events: Vec::new(),
            live_analysis: None,
            live_updated_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

entity!(MatchEntity, "matches");

/// A prediction made by a user for a match.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictionHistoryEntity {
    pub id: Uuid,
    pub user_email: String,
    pub match_id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub match_date: OffsetDateTime,
    pub prediction: Prediction,
    pub confidence: u8,
    #[serde(default)]
    pub result: PredictionResult,
    #[serde(default)]
    pub final_score: Option<String>,
    #[serde(default)]
    pub odds: Option<f64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

entity!(PredictionHistoryEntity, "prediction_history");

/// Achievement unlocked through predictions or visit streaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Badge {
    #[serde(rename = "premium_vip")]
    PremiumVip,
    #[serde(rename = "first_prediction")]
    FirstPrediction,
    #[serde(rename = "5_predictions")]
    FivePredictions,
    #[serde(rename = "20_predictions")]
    TwentyPredictions,
    #[serde(rename = "50_predictions")]
    FiftyPredictions,
    #[serde(rename = "100_predictions")]
    HundredPredictions,
    #[serde(rename = "first_win")]
    FirstWin,
    #[serde(rename = "10_wins")]
    TenWins,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
    #[serde(rename = "streak_30")]
    Streak30,
}

/// Gamification counters of a single user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserStatsEntity {
    pub id: Uuid,
    pub user_email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub points: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub last_visit_date: Option<Date>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub total_predictions: u32,
    #[serde(default)]
    pub total_wins: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub current_win_streak: u32,
}

fn default_level() -> u32 {
    1
}

impl UserStatsEntity {
    /// Fresh counters for a user seen for the first time.
    pub fn new(user_email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_email: user_email.into(),
            display_name,
            points: 0,
            level: 1,
            streak_days: 0,
            last_visit_date: None,
            badges: Vec::new(),
            total_predictions: 0,
            total_wins: 0,
            best_streak: 0,
            current_win_streak: 0,
        }
    }
}

entity!(UserStatsEntity, "user_stats");

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BadgeEarned,
    FavoriteTeamPlaying,
    MatchResult,
}

/// Display priority of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    #[default]
    Normal,
    High,
}

/// Message delivered to a single user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_email: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub match_id: Option<Uuid>,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

impl NotificationEntity {
    /// Build an unread notification with normal priority.
    pub fn new(
        user_email: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_email: user_email.into(),
            kind,
            title: title.into(),
            message: message.into(),
            match_id: None,
            priority: NotificationPriority::Normal,
            read: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

entity!(NotificationEntity, "notifications");

/// Plan a subscription grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    PremiumMonthly,
    PremiumYearly,
}

/// Billing state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

/// Paid access record kept in sync with Stripe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_email: String,
    #[serde(default)]
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub end_date: Option<OffsetDateTime>,
}

impl SubscriptionEntity {
    /// Premium access requires an active, non-free subscription.
    pub fn is_premium(&self) -> bool {
        self.status == SubscriptionStatus::Active && self.plan != SubscriptionPlan::Free
    }
}

entity!(SubscriptionEntity, "subscriptions");

/// Team followed by a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FavoriteTeamEntity {
    pub id: Uuid,
    pub user_email: String,
    pub team_name: String,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: OffsetDateTime,
}

entity!(FavoriteTeamEntity, "favorite_teams");

/// League table figures of a team, refreshed from football-data.org.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamStatsEntity {
    pub id: Uuid,
    pub team_name: String,
    pub league: String,
    #[serde(default)]
    pub external_id: Option<u64>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: i32,
    pub position: u32,
    pub played_games: u32,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub last_updated: OffsetDateTime,
}

entity!(TeamStatsEntity, "team_stats");

/// One row of a league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StandingRow {
    pub position: u32,
    pub team_name: String,
    pub played: u32,
    pub won: u32,
    pub draw: u32,
    pub lost: u32,
    pub points: i32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
}

/// Full table of a league for one season.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeagueStandingEntity {
    pub id: Uuid,
    pub league: String,
    /// `YYYY/YYYY`.
    pub season: String,
    pub standings: Vec<StandingRow>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub last_updated: OffsetDateTime,
}

entity!(LeagueStandingEntity, "league_standings");
