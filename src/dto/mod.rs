/// Subscription, favourites and leaderboard payloads.
pub mod account;
/// Bodies of the `/functions/<name>` endpoints.
pub mod functions;
pub mod health;
pub mod history;
/// Match catalogue payloads.
pub mod matches;
/// Custom validators shared by request bodies.
pub mod validation;
