use tracing::warn;

use crate::{
    dto::health::{HealthResponse, IntegrationStatus},
    state::SharedState,
};

fn integration_status(state: &SharedState) -> IntegrationStatus {
    let credentials = state.credentials();
    IntegrationStatus {
        football_data: credentials.football_data_api_key.is_some(),
        stripe: credentials.stripe_secret_key.is_some(),
        stripe_webhook: credentials.stripe_webhook_secret.is_some(),
        llm: credentials.llm_api_url.is_some(),
        identity: credentials.auth_base_url.is_some(),
    }
}

/// Ping the store and report degraded mode plus configured integrations.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let integrations = integration_status(state);
    if state.is_degraded().await {
        HealthResponse::degraded(integrations)
    } else {
        HealthResponse::ok(integrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn reports_degraded_until_store_is_installed() {
        let ctx = TestContext::without_store();
        let degraded = health_status(&ctx.state).await;
        assert_eq!(degraded.status, "degraded");
        assert!(degraded.integrations.football_data);
        assert!(!degraded.integrations.llm);

        ctx.install_memory_store().await;
        assert_eq!(health_status(&ctx.state).await.status, "ok");
    }
}
