//! In-process fakes of the upstream services and a ready-to-use state for service tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde_json::Value;
use time::Date;

use crate::{
    config::{AppConfig, Credentials},
    dao::{document_store::memory::MemoryStore, models::Entity, repository::Repository},
    integrations::{
        Integrations,
        error::{UpstreamError, UpstreamResult},
        football_data::{FdMatch, FdStandings, FootballDataApi},
        identity::{IdentityProvider, User, UserRole},
        llm::{LanguageModel, LlmRequest},
        stripe::{CheckoutRequest, CheckoutSession, NewCustomer, PaymentGateway},
    },
    state::{AppState, SharedState},
};

pub const WEBHOOK_SECRET: &str = "whsec_test";

fn status_error(service: &'static str, status: StatusCode) -> UpstreamError {
    UpstreamError::Status {
        service,
        status,
        body: "fake failure".into(),
    }
}

#[derive(Default)]
pub struct FakeFootball {
    pub configured: bool,
    pub fixtures: Mutex<HashMap<String, Vec<FdMatch>>>,
    pub standings: Mutex<HashMap<String, FdStandings>>,
    pub team_fixtures: Mutex<HashMap<u64, Vec<FdMatch>>>,
    pub failing_codes: Mutex<HashMap<String, StatusCode>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFootball {
    fn outcome<T: Clone>(
        &self,
        key: String,
        source: &Mutex<HashMap<String, T>>,
    ) -> UpstreamResult<Option<T>> {
        self.calls.lock().unwrap().push(key.clone());
        if let Some(status) = self.failing_codes.lock().unwrap().get(&key) {
            return Err(status_error("football-data.org", *status));
        }
        Ok(source.lock().unwrap().get(&key).cloned())
    }
}

impl FootballDataApi for FakeFootball {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn competition_matches(
        &self,
        code: String,
        _from: Date,
        _to: Date,
    ) -> BoxFuture<'static, UpstreamResult<Vec<FdMatch>>> {
        let result = self
            .outcome(code, &self.fixtures)
            .map(Option::unwrap_or_default);
        Box::pin(async move { result })
    }

    fn standings(&self, code: String) -> BoxFuture<'static, UpstreamResult<FdStandings>> {
        let result = self.outcome(code, &self.standings).and_then(|found| {
            found.ok_or_else(|| status_error("football-data.org", StatusCode::NOT_FOUND))
        });
        Box::pin(async move { result })
    }

    fn team_matches(
        &self,
        team_id: u64,
        _limit: u32,
    ) -> BoxFuture<'static, UpstreamResult<Vec<FdMatch>>> {
        let key = format!("team:{team_id}");
        self.calls.lock().unwrap().push(key.clone());
        let result = match self.failing_codes.lock().unwrap().get(&key) {
            Some(status) => Err(status_error("football-data.org", *status)),
            None => Ok(self
                .team_fixtures
                .lock()
                .unwrap()
                .get(&team_id)
                .cloned()
                .unwrap_or_default()),
        };
        Box::pin(async move { result })
    }
}

#[derive(Default)]
pub struct FakePayments {
    pub existing_customer: Mutex<Option<String>>,
    pub created_customers: Mutex<Vec<NewCustomer>>,
    pub sessions: Mutex<Vec<CheckoutRequest>>,
}

impl PaymentGateway for FakePayments {
    fn find_customer(&self, _email: String) -> BoxFuture<'static, UpstreamResult<Option<String>>> {
        let existing = self.existing_customer.lock().unwrap().clone();
        Box::pin(async move { Ok(existing) })
    }

    fn create_customer(&self, customer: NewCustomer) -> BoxFuture<'static, UpstreamResult<String>> {
        self.created_customers.lock().unwrap().push(customer);
        Box::pin(async move { Ok("cus_new".to_string()) })
    }

    fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'static, UpstreamResult<CheckoutSession>> {
        self.sessions.lock().unwrap().push(request);
        Box::pin(async move {
            Ok(CheckoutSession {
                id: "cs_test".into(),
                url: Some("https://checkout.stripe.com/c/cs_test".into()),
            })
        })
    }
}

type Responder = Box<dyn Fn(&LlmRequest) -> Result<Value, String> + Send + Sync>;

/// Language model answering through a closure and recording prompts.
pub struct FakeLlm {
    responder: Mutex<Responder>,
    pub prompts: Mutex<Vec<String>>,
}

impl Default for FakeLlm {
    fn default() -> Self {
        Self {
            responder: Mutex::new(Box::new(|_| Err("no answer configured".into()))),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl FakeLlm {
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&LlmRequest) -> Result<Value, String> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Box::new(responder);
    }
}

impl LanguageModel for FakeLlm {
    fn invoke(&self, request: LlmRequest) -> BoxFuture<'static, UpstreamResult<Value>> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let responder = self.responder.lock().unwrap();
        let result = (*responder)(&request).map_err(|message| UpstreamError::Payload {
            service: "llm",
            message,
        });
        Box::pin(async move { result })
    }
}

#[derive(Default)]
pub struct FakeIdentity {
    pub users: Mutex<HashMap<String, User>>,
}

impl IdentityProvider for FakeIdentity {
    fn me(&self, token: String) -> BoxFuture<'static, UpstreamResult<Option<User>>> {
        let user = self.users.lock().unwrap().get(&token).cloned();
        Box::pin(async move { Ok(user) })
    }
}

pub fn user(email: &str) -> User {
    User {
        id: format!("id-{email}"),
        email: email.into(),
        full_name: Some("Test Fan".into()),
        role: UserRole::User,
    }
}

pub fn admin(email: &str) -> User {
    User {
        role: UserRole::Admin,
        ..user(email)
    }
}

/// Shared state wired to fakes, plus handles on those fakes.
pub struct TestContext {
    pub state: SharedState,
    pub football: Arc<FakeFootball>,
    pub payments: Arc<FakePayments>,
    pub llm: Arc<FakeLlm>,
    pub identity: Arc<FakeIdentity>,
}

impl TestContext {
    pub fn without_store() -> Self {
        let football = Arc::new(FakeFootball {
            configured: true,
            ..FakeFootball::default()
        });
        let payments = Arc::new(FakePayments::default());
        let llm = Arc::new(FakeLlm::default());
        let identity = Arc::new(FakeIdentity::default());

        let credentials = Credentials {
            stripe_secret_key: Some("sk_test".into()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            football_data_api_key: Some("fd_test".into()),
            app_id: Some("app_test".into()),
            auth_base_url: None,
            llm_api_url: None,
            llm_api_key: None,
        };
        let integrations = Integrations {
            football: football.clone(),
            payments: payments.clone(),
            llm: llm.clone(),
            identity: identity.clone(),
        };

        Self {
            state: AppState::new(AppConfig::default(), credentials, integrations),
            football,
            payments,
            llm,
            identity,
        }
    }

    pub async fn new() -> Self {
        let ctx = Self::without_store();
        ctx.install_memory_store().await;
        ctx
    }

    pub async fn install_memory_store(&self) {
        self.state.set_store(Arc::new(MemoryStore::new())).await;
    }

    pub async fn repo<E: Entity>(&self) -> Repository<E> {
        self.state.repo::<E>().await.unwrap()
    }
}
