use serde::Serialize;
use utoipa::ToSchema;

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" while storage is unavailable.
    pub status: String,
    pub integrations: IntegrationStatus,
}

/// Which upstream credentials are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct IntegrationStatus {
    pub football_data: bool,
    pub stripe: bool,
    pub stripe_webhook: bool,
    pub llm: bool,
    pub identity: bool,
}

impl HealthResponse {
    pub fn ok(integrations: IntegrationStatus) -> Self {
        Self {
            status: "ok".to_string(),
            integrations,
        }
    }

    pub fn degraded(integrations: IntegrationStatus) -> Self {
        Self {
            status: "degraded".to_string(),
            integrations,
        }
    }
}
