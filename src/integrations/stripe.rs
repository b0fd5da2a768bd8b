//! Stripe Checkout client and webhook signature verification.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use super::error::{UpstreamError, UpstreamResult, ensure_success};

const SERVICE: &str = "stripe";
const API_BASE_URL: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum age of a signed webhook payload.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Parameters of a subscription-mode Checkout Session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Fields needed to create a Stripe customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub name: Option<String>,
    pub app_user_id: String,
}

/// Billing operations used by the checkout handler.
pub trait PaymentGateway: Send + Sync {
    /// Id of the first customer registered with `email`.
    fn find_customer(&self, email: String) -> BoxFuture<'static, UpstreamResult<Option<String>>>;

    fn create_customer(&self, customer: NewCustomer) -> BoxFuture<'static, UpstreamResult<String>>;

    fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'static, UpstreamResult<CheckoutSession>>;
}

#[derive(Debug, Deserialize)]
struct CustomerList {
    #[serde(default)]
    data: Vec<CustomerRef>,
}

#[derive(Debug, Deserialize)]
struct CustomerRef {
    id: String,
}

/// Form-encoded client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    secret_key: Option<Arc<str>>,
}

impl StripeClient {
    pub fn new(secret_key: Option<String>) -> UpstreamResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| UpstreamError::ClientBuilder {
                service: SERVICE,
                source,
            })?;
        Ok(Self {
            http,
            secret_key: secret_key.map(Arc::from),
        })
    }

    fn key(&self) -> UpstreamResult<Arc<str>> {
        self.secret_key
            .clone()
            .ok_or(UpstreamError::MissingCredentials { service: SERVICE })
    }

    async fn send(self, builder: reqwest::RequestBuilder) -> UpstreamResult<reqwest::Response> {
        let key = self.key()?;
        let response = builder
            .bearer_auth(key.as_ref())
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;
        ensure_success(SERVICE, response).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> UpstreamResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| UpstreamError::Decode {
            service: SERVICE,
            source,
        })
}

impl PaymentGateway for StripeClient {
    fn find_customer(&self, email: String) -> BoxFuture<'static, UpstreamResult<Option<String>>> {
        let client = self.clone();
        Box::pin(async move {
            let builder = client
                .http
                .get(format!("{API_BASE_URL}/customers"))
                .query(&[("email", email.as_str()), ("limit", "1")]);
            let list: CustomerList = decode(client.send(builder).await?).await?;
            Ok(list.data.into_iter().next().map(|customer| customer.id))
        })
    }

    fn create_customer(&self, customer: NewCustomer) -> BoxFuture<'static, UpstreamResult<String>> {
        let client = self.clone();
        Box::pin(async move {
            let mut form = vec![
                ("email".to_string(), customer.email),
                ("metadata[app_user_id]".to_string(), customer.app_user_id),
            ];
            if let Some(name) = customer.name {
                form.push(("name".to_string(), name));
            }
            let builder = client
                .http
                .post(format!("{API_BASE_URL}/customers"))
                .form(&form);
            let created: CustomerRef = decode(client.send(builder).await?).await?;
            Ok(created.id)
        })
    }

    fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'static, UpstreamResult<CheckoutSession>> {
        let client = self.clone();
        Box::pin(async move {
            let builder = client
                .http
                .post(format!("{API_BASE_URL}/checkout/sessions"))
                .form(&checkout_form(request));
            decode(client.send(builder).await?).await
        })
    }
}

/// Flatten a checkout request into Stripe's bracketed form encoding.
fn checkout_form(request: CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("customer".to_string(), request.customer_id),
        ("mode".to_string(), "subscription".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("line_items[0][price]".to_string(), request.price_id),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), request.success_url),
        ("cancel_url".to_string(), request.cancel_url),
    ];
    form.extend(
        request
            .metadata
            .into_iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value)),
    );
    form
}

/// Envelope of a webhook event; `data.object` depends on `type`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

/// Reasons a `stripe-signature` header is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    MalformedHeader,
    #[error("no v1 signature matches the payload")]
    Mismatch,
    #[error("signature timestamp is outside the tolerance window")]
    Expired,
}

/// Check a `t=<unix>,v1=<hex>` header against `payload` signed with `secret`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                );
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });

    if !matched {
        return Err(SignatureError::Mismatch);
    }
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Compute the `v1` signature Stripe would send for `payload`.
#[cfg(test)]
pub(crate) fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn header(timestamp: i64, signature: &str) -> String {
        format!("t={timestamp},v1={signature}")
    }

    #[test]
    fn accepts_valid_signature() {
        let signature = sign_payload(SECRET, 1_700_000_000, BODY);
        assert_eq!(
            verify_signature(SECRET, &header(1_700_000_000, &signature), BODY, 1_700_000_100),
            Ok(())
        );
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let signature = sign_payload(SECRET, 1_700_000_000, BODY);
        let header = format!("t=1700000000,v1=deadbeef,v0=ignored,v1={signature}");
        assert_eq!(verify_signature(SECRET, &header, BODY, 1_700_000_000), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_or_wrong_secret() {
        let signature = sign_payload(SECRET, 1_700_000_000, BODY);
        let header = header(1_700_000_000, &signature);
        assert_eq!(
            verify_signature(SECRET, &header, b"{}", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature("whsec_other", &header, BODY, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let signature = sign_payload(SECRET, 1_700_000_000, BODY);
        assert_eq!(
            verify_signature(SECRET, &header(1_700_000_000, &signature), BODY, 1_700_000_301),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn rejects_malformed_header() {
        assert_eq!(
            verify_signature(SECRET, "v1=abc", BODY, 0),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(SECRET, "t=12", BODY, 12),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(SECRET, "t=abc,v1=00", BODY, 0),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn checkout_form_uses_bracketed_keys() {
        let form = checkout_form(CheckoutRequest {
            customer_id: "cus_1".into(),
            price_id: "price_1".into(),
            success_url: "https://app/?subscription=success".into(),
            cancel_url: "https://app/Pricing?cancelled=true".into(),
            metadata: vec![("plan".into(), "monthly".into())],
        });
        assert!(form.contains(&("line_items[0][price]".into(), "price_1".into())));
        assert!(form.contains(&("metadata[plan]".into(), "monthly".into())));
        assert!(form.contains(&("mode".into(), "subscription".into())));
    }
}
