use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{dao::models::NotificationEntity, state::SharedState};

/// Live SSE feed of the notifications created for `email`.
pub fn subscribe(
    state: &SharedState,
    email: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    to_sse_stream(state.notifications().subscribe(), email)
}

/// Forward the broadcast notifications addressed to `email` until the client disconnects.
fn to_sse_stream(
    mut receiver: broadcast::Receiver<NotificationEntity>,
    email: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(notification) if notification.user_email == email => {
                            let event = match Event::default()
                                .event("notification")
                                .json_data(&notification)
                            {
                                Ok(event) => event,
                                Err(err) => {
                                    warn!(error = %err, "failed to encode notification event");
                                    continue;
                                }
                            };
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => continue,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "notification stream lagged");
                            continue;
                        }
                    }
                }
            }
        }
        debug!(user = %email, "notification stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use futures::StreamExt;

    use super::*;
    use crate::{dao::models::NotificationKind, testing::TestContext};

    #[tokio::test]
    async fn feed_outlives_state_borrow_and_filters_by_user() {
        let ctx = TestContext::new().await;
        let response = {
            let state = ctx.state.clone();
            subscribe(&state, "fan@x.io".into()).into_response()
        };

        let hub = ctx.state.notifications();
        hub.broadcast(NotificationEntity::new(
            "other@x.io",
            NotificationKind::MatchResult,
            "not yours",
            "skip",
        ));
        hub.broadcast(NotificationEntity::new(
            "fan@x.io",
            NotificationKind::MatchResult,
            "yours",
            "deliver",
        ));

        let mut body = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.starts_with("event: notification\n"));
        assert!(text.contains("deliver"));
        assert!(!text.contains("skip"));
    }
}
