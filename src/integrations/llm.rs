//! Hosted language-model endpoint used for match analysis and result lookups.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{UpstreamError, UpstreamResult, ensure_success};

const SERVICE: &str = "llm";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One prompt with the JSON schema the answer must follow.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub add_context_from_internet: bool,
    pub response_json_schema: Value,
}

/// Structured completion provider.
pub trait LanguageModel: Send + Sync {
    fn invoke(&self, request: LlmRequest) -> BoxFuture<'static, UpstreamResult<Value>>;
}

/// Bearer-authenticated JSON client for `LLM_API_URL`.
#[derive(Clone)]
pub struct HttpLanguageModel {
    http: Client,
    endpoint: Option<Arc<str>>,
    api_key: Option<Arc<str>>,
}

impl HttpLanguageModel {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> UpstreamResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| UpstreamError::ClientBuilder {
                service: SERVICE,
                source,
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.map(Arc::from),
            api_key: api_key.map(Arc::from),
        })
    }
}

impl LanguageModel for HttpLanguageModel {
    fn invoke(&self, request: LlmRequest) -> BoxFuture<'static, UpstreamResult<Value>> {
        let client = self.clone();
        Box::pin(async move {
            let endpoint = client
                .endpoint
                .clone()
                .ok_or(UpstreamError::MissingCredentials { service: SERVICE })?;

            debug!(prompt_len = request.prompt.len(), "invoking language model");
            let mut builder = client.http.post(endpoint.as_ref()).json(&request);
            if let Some(key) = client.api_key.as_deref() {
                builder = builder.bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .map_err(|source| UpstreamError::Transport {
                    service: SERVICE,
                    source,
                })?;
            let payload = ensure_success(SERVICE, response)
                .await?
                .json::<Value>()
                .await
                .map_err(|source| UpstreamError::Decode {
                    service: SERVICE,
                    source,
                })?;

            Ok(unwrap_envelope(payload))
        })
    }
}

/// Some gateways wrap the structured answer in `{ "response": ... }`.
fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("response") => {
            map.remove("response").unwrap_or(Value::Null)
        }
        other => other,
    }
}
