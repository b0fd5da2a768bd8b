use tracing::info;

use crate::{
    dto::functions::CheckoutResponse,
    error::ServiceError,
    integrations::{
        identity::User,
        stripe::{CheckoutRequest, NewCustomer},
    },
    state::SharedState,
};

/// Open a Stripe Checkout session for `plan` and return its URL.
pub async fn create_checkout(
    state: &SharedState,
    user: &User,
    plan: Option<&str>,
    origin: Option<&str>,
) -> Result<CheckoutResponse, ServiceError> {
    let prices = &state.config().prices;
    let (plan, price_id) = match plan {
        Some(plan @ "monthly") => (plan, prices.monthly.clone()),
        Some(plan @ "yearly") => (plan, prices.yearly.clone()),
        _ => return Err(ServiceError::InvalidInput("Plan invalide".into())),
    };
    let origin = origin
        .map(|origin| origin.trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("Origin header required".into()))?;

    let payments = &state.integrations().payments;
    let customer_id = match payments.find_customer(user.email.clone()).await? {
        Some(id) => id,
        None => {
            payments
                .create_customer(NewCustomer {
                    email: user.email.clone(),
                    name: user.full_name.clone(),
                    app_user_id: user.id.clone(),
                })
                .await?
        }
    };

    let mut metadata = vec![
        ("user_email".to_string(), user.email.clone()),
        ("plan".to_string(), plan.to_string()),
    ];
    if let Some(app_id) = &state.credentials().app_id {
        metadata.push(("app_id".to_string(), app_id.clone()));
    }

    let session = payments
        .create_checkout_session(CheckoutRequest {
            customer_id,
            price_id,
            success_url: format!("{origin}/?subscription=success"),
            cancel_url: format!("{origin}/Pricing?cancelled=true"),
            metadata,
        })
        .await?;
    info!(user = %user.email, plan, session = %session.id, "checkout session created");

    let url = session.url.ok_or_else(|| {
        ServiceError::Configuration("checkout session returned without url".into())
    })?;
    Ok(CheckoutResponse { url })
}
