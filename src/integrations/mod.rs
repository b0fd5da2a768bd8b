//! Clients for the third-party services the backend depends on.

pub mod error;
pub mod football_data;
pub mod identity;
pub mod llm;
pub mod pacer;
pub mod stripe;

use std::sync::Arc;

use crate::config::{AppConfig, Credentials};

use self::{
    error::UpstreamResult,
    football_data::{FootballDataApi, FootballDataClient},
    identity::{HttpIdentityProvider, IdentityProvider},
    llm::{HttpLanguageModel, LanguageModel},
    pacer::RequestPacer,
    stripe::{PaymentGateway, StripeClient},
};

/// Trait objects for every upstream, swappable in tests.
#[derive(Clone)]
pub struct Integrations {
    pub football: Arc<dyn FootballDataApi>,
    pub payments: Arc<dyn PaymentGateway>,
    pub llm: Arc<dyn LanguageModel>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Integrations {
    /// Build the HTTP clients from configuration and environment credentials.
    pub fn from_credentials(config: &AppConfig, credentials: &Credentials) -> UpstreamResult<Self> {
        let pacer = Arc::new(RequestPacer::new(config.football_request_spacing));
        Ok(Self {
            football: Arc::new(FootballDataClient::new(
                credentials.football_data_api_key.clone(),
                pacer,
            )?),
            payments: Arc::new(StripeClient::new(credentials.stripe_secret_key.clone())?),
            llm: Arc::new(HttpLanguageModel::new(
                credentials.llm_api_url.clone(),
                credentials.llm_api_key.clone(),
            )?),
            identity: Arc::new(HttpIdentityProvider::new(
                credentials.auth_base_url.clone(),
            )?),
        })
    }
}
