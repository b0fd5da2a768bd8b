use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{Instant, sleep_until},
};

/// Serialises outbound requests so two of them never start closer than `spacing`.
///
/// football-data.org's free tier allows roughly ten calls per minute; every
/// caller sharing the pacer waits its turn instead of sleeping blindly.
#[derive(Debug)]
pub struct RequestPacer {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the caller is allowed to issue its request.
    pub async fn wait_turn(&self) {
        let mut slot = self.next_slot.lock().await;
        if let Some(at) = *slot {
            sleep_until(at).await;
        }
        *slot = Some(Instant::now() + self.spacing);
    }
}
