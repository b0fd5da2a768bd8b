//! Premium status and the Stripe webhook that keeps it in sync.

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        Badge, NotificationEntity, NotificationKind, SubscriptionEntity, SubscriptionPlan,
        SubscriptionStatus, UserStatsEntity,
    },
    dto::{account::SubscriptionStatusResponse, functions::WebhookAck},
    error::ServiceError,
    integrations::stripe::{WebhookEvent, verify_signature},
    services::notification_service,
    state::SharedState,
};

/// First active subscription of `email`.
pub async fn active_subscription(
    state: &SharedState,
    email: &str,
) -> Result<Option<SubscriptionEntity>, ServiceError> {
    let repo = state.repo::<SubscriptionEntity>().await?;
    Ok(repo
        .find_first(|sub| sub.user_email == email && sub.status == SubscriptionStatus::Active)
        .await?)
}

pub async fn is_premium(state: &SharedState, email: &str) -> Result<bool, ServiceError> {
    Ok(active_subscription(state, email)
        .await?
        .is_some_and(|sub| sub.is_premium()))
}

pub async fn current(
    state: &SharedState,
    email: &str,
) -> Result<SubscriptionStatusResponse, ServiceError> {
    let subscription = active_subscription(state, email).await?;
    let is_premium = subscription.as_ref().is_some_and(SubscriptionEntity::is_premium);
    Ok(SubscriptionStatusResponse {
        subscription,
        is_premium,
    })
}

/// Verify and apply a Stripe webhook delivery.
pub async fn handle_webhook(
    state: &SharedState,
    signature: Option<&str>,
    body: &[u8],
) -> Result<WebhookAck, ServiceError> {
    handle_webhook_at(state, signature, body, OffsetDateTime::now_utc()).await
}

pub(crate) async fn handle_webhook_at(
    state: &SharedState,
    signature: Option<&str>,
    body: &[u8],
    now: OffsetDateTime,
) -> Result<WebhookAck, ServiceError> {
    let secret = state.credentials().stripe_webhook_secret.as_deref();
    let (Some(signature), Some(secret)) = (signature, secret) else {
        warn!("webhook rejected: missing signature header or secret");
        return Err(ServiceError::InvalidInput(
            "Configuration webhook invalide".into(),
        ));
    };

    if let Err(err) = verify_signature(secret, signature, body, now.unix_timestamp()) {
        warn!(error = %err, "webhook signature verification failed");
        return Err(ServiceError::InvalidInput("Signature invalide".into()));
    }

    let event: WebhookEvent = serde_json::from_slice(body)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid webhook payload: {err}")))?;
    info!(event_id = %event.id, kind = %event.kind, "webhook received");

    let object = &event.data.object;
    match event.kind.as_str() {
        "checkout.session.completed" => checkout_completed(state, object, now).await?,
        "customer.subscription.deleted" => {
            if let Some(stripe_id) = str_field(object, "id") {
                update_by_stripe_id(state, stripe_id, |sub| {
                    sub.status = SubscriptionStatus::Cancelled;
                    sub.end_date = Some(now);
                })
                .await?;
            }
        }
        "customer.subscription.updated" => {
            if let Some(stripe_id) = str_field(object, "id") {
                let status = map_stripe_status(str_field(object, "status").unwrap_or_default());
                update_by_stripe_id(state, stripe_id, |sub| sub.status = status).await?;
            }
        }
        other => info!(kind = other, "ignoring webhook event"),
    }

    Ok(WebhookAck { received: true })
}

fn str_field<'a>(object: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(serde_json::Value::as_str)
}

fn map_stripe_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "canceled" => SubscriptionStatus::Cancelled,
        _ => SubscriptionStatus::Expired,
    }
}

fn plan_from_checkout(plan: &str) -> Option<SubscriptionPlan> {
    match plan {
        "monthly" => Some(SubscriptionPlan::PremiumMonthly),
        "yearly" => Some(SubscriptionPlan::PremiumYearly),
        _ => None,
    }
}

async fn checkout_completed(
    state: &SharedState,
    session: &serde_json::Value,
    now: OffsetDateTime,
) -> Result<(), ServiceError> {
    let metadata = session.get("metadata");
    let email = metadata.and_then(|m| str_field(m, "user_email"));
    let plan = metadata.and_then(|m| str_field(m, "plan"));
    let (Some(email), Some(plan)) = (email, plan) else {
        warn!("checkout session without user_email/plan metadata");
        return Ok(());
    };
    let Some(plan) = plan_from_checkout(plan) else {
        warn!(plan, "checkout session with unknown plan");
        return Ok(());
    };

    let stripe_subscription_id = str_field(session, "subscription").map(str::to_string);
    let stripe_customer_id = str_field(session, "customer").map(str::to_string);
    let repo = state.repo::<SubscriptionEntity>().await?;

    match active_subscription(state, email).await? {
        Some(mut existing) => {
            existing.plan = plan;
            existing.stripe_subscription_id = stripe_subscription_id;
            existing.stripe_customer_id = stripe_customer_id;
            existing.start_date = Some(now);
            repo.update(&existing).await?;
        }
        None => {
            repo.create(SubscriptionEntity {
                id: Uuid::new_v4(),
                user_email: email.to_string(),
                plan,
                status: SubscriptionStatus::Active,
                stripe_subscription_id,
                stripe_customer_id,
                start_date: Some(now),
                end_date: None,
            })
            .await?;
        }
    }
    info!(user = email, ?plan, "subscription activated");

    grant_vip_badge(state, email).await
}

async fn grant_vip_badge(state: &SharedState, email: &str) -> Result<(), ServiceError> {
    let _guard = state.lock_stats(email).await;
    let repo = state.repo::<UserStatsEntity>().await?;
    let mut stats = repo
        .find_first(|stats| stats.user_email == email)
        .await?
        .unwrap_or_else(|| UserStatsEntity::new(email, None));
    if stats.badges.contains(&Badge::PremiumVip) {
        return Ok(());
    }
    stats.badges.push(Badge::PremiumVip);
    repo.update(&stats).await?;

    notification_service::push(
        state,
        NotificationEntity::new(
            email,
            NotificationKind::BadgeEarned,
            "👑 Badge VIP !",
            "VIP Premium - Abonné",
        ),
    )
    .await?;
    Ok(())
}

async fn update_by_stripe_id<F>(
    state: &SharedState,
    stripe_id: &str,
    apply: F,
) -> Result<(), ServiceError>
where
    F: FnOnce(&mut SubscriptionEntity),
{
    let repo = state.repo::<SubscriptionEntity>().await?;
    let Some(mut subscription) = repo
        .find_first(|sub| sub.stripe_subscription_id.as_deref() == Some(stripe_id))
        .await?
    else {
        info!(stripe_id, "no local subscription for stripe id");
        return Ok(());
    };
    apply(&mut subscription);
    repo.update(&subscription).await?;
    info!(stripe_id, status = ?subscription.status, "subscription updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        integrations::stripe::sign_payload,
        testing::{TestContext, WEBHOOK_SECRET},
    };
    use serde_json::json;

    async fn deliver(
        ctx: &TestContext,
        payload: serde_json::Value,
    ) -> Result<WebhookAck, ServiceError> {
        let body = serde_json::to_vec(&payload).unwrap();
        let now = OffsetDateTime::now_utc();
        let signature = format!(
            "t={},v1={}",
            now.unix_timestamp(),
            sign_payload(WEBHOOK_SECRET, now.unix_timestamp(), &body)
        );
        handle_webhook_at(&ctx.state, Some(&signature), &body, now).await
    }

    fn checkout_event(email: &str, plan: &str) -> serde_json::Value {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "subscription": "sub_123",
                "customer": "cus_123",
                "metadata": {"user_email": email, "plan": plan}
            }}
        })
    }

    #[tokio::test]
    async fn checkout_completion_creates_premium_subscription() {
        let ctx = TestContext::new().await;
        let ack = deliver(&ctx, checkout_event("fan@example.com", "yearly"))
            .await
            .unwrap();
        assert!(ack.received);

        let status = current(&ctx.state, "fan@example.com").await.unwrap();
        assert!(status.is_premium);
        let sub = status.subscription.unwrap();
        assert_eq!(sub.plan, SubscriptionPlan::PremiumYearly);
        assert_eq!(sub.stripe_subscription_id.as_deref(), Some("sub_123"));

        let stats = ctx
            .repo::<UserStatsEntity>()
            .await
            .find_first(|s| s.user_email == "fan@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.badges, vec![Badge::PremiumVip]);
    }

    #[tokio::test]
    async fn second_checkout_updates_existing_subscription() {
        let ctx = TestContext::new().await;
        deliver(&ctx, checkout_event("fan@example.com", "monthly"))
            .await
            .unwrap();
        deliver(&ctx, checkout_event("fan@example.com", "yearly"))
            .await
            .unwrap();

        let subs = ctx.repo::<SubscriptionEntity>().await.list().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].plan, SubscriptionPlan::PremiumYearly);
    }

    #[tokio::test]
    async fn subscription_lifecycle_events_update_status() {
        let ctx = TestContext::new().await;
        deliver(&ctx, checkout_event("fan@example.com", "monthly"))
            .await
            .unwrap();

        deliver(
            &ctx,
            json!({"id": "evt_2", "type": "customer.subscription.updated",
                   "data": {"object": {"id": "sub_123", "status": "past_due"}}}),
        )
        .await
        .unwrap();
        let sub = &ctx.repo::<SubscriptionEntity>().await.list().await.unwrap()[0];
        assert_eq!(sub.status, SubscriptionStatus::Expired);

        deliver(
            &ctx,
            json!({"id": "evt_3", "type": "customer.subscription.deleted",
                   "data": {"object": {"id": "sub_123"}}}),
        )
        .await
        .unwrap();
        let sub = &ctx.repo::<SubscriptionEntity>().await.list().await.unwrap()[0];
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.end_date.is_some());
        assert!(!is_premium(&ctx.state, "fan@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_missing_or_bad_signatures() {
        let ctx = TestContext::new().await;
        let body = br#"{"id":"evt","type":"x","data":{"object":{}}}"#;
        let now = OffsetDateTime::now_utc();

        match handle_webhook_at(&ctx.state, None, body, now).await {
            Err(ServiceError::InvalidInput(message)) => {
                assert_eq!(message, "Configuration webhook invalide")
            }
            other => panic!("unexpected {other:?}"),
        }

        let forged = format!("t={},v1={}", now.unix_timestamp(), "00".repeat(32));
        match handle_webhook_at(&ctx.state, Some(&forged), body, now).await {
            Err(ServiceError::InvalidInput(message)) => assert_eq!(message, "Signature invalide"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let ctx = TestContext::new().await;
        let ack = deliver(
            &ctx,
            json!({"id": "evt_9", "type": "invoice.paid", "data": {"object": {}}}),
        )
        .await
        .unwrap();
        assert!(ack.received);
        assert!(ctx.repo::<SubscriptionEntity>().await.list().await.unwrap().is_empty());
    }
}
