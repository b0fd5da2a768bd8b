use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Stripe Checkout session creation.
pub mod checkout_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Followed teams of a user.
pub mod favorites_service;
/// football-data.org imports, standings sync and head-to-head.
pub mod football_service;
/// Badge rules, points and visit streaks.
pub mod gamification;
/// Health check service.
pub mod health_service;
/// Prediction history and its summary.
pub mod history_service;
pub mod leaderboard_service;
/// Match catalogue, AI analysis and result settlement.
pub mod match_service;
/// Notification storage and favourite-team alerts.
pub mod notification_service;
/// Server-Sent Events feed of notifications.
pub mod notification_stream;
/// Outcome of a prediction given a final score.
pub mod outcome;
/// Periodic settlement of finished matches.
pub mod reconciler;
/// Visit and prediction counters.
pub mod stats_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
/// Premium status and Stripe webhook handling.
pub mod subscription_service;

/// RFC 3339 rendering used in response timestamps.
pub(crate) fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}
