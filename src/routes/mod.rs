use axum::Router;

use crate::state::SharedState;

pub mod api;
pub mod docs;
pub mod functions;
pub mod health;
pub mod notifications;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(functions::router())
        .merge(api::router())
        .merge(notifications::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
