//! Background settlement of matches whose result is known but not yet recorded.

use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use crate::{
    dao::models::{MatchEntity, MatchStatus},
    dto::functions::ReconcileReport,
    error::ServiceError,
    integrations::llm::LlmRequest,
    services::{match_service, outcome::FinalScore},
    state::SharedState,
};

#[derive(Debug, Deserialize)]
struct ResultAnswer {
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    final_score: Option<String>,
}

enum Lookup {
    Finished(FinalScore),
    NotFinished,
}

/// Run one pass now, refusing when another pass holds the gate.
pub async fn trigger(state: &SharedState) -> Result<ReconcileReport, ServiceError> {
    trigger_at(state, OffsetDateTime::now_utc()).await
}

pub(crate) async fn trigger_at(
    state: &SharedState,
    now: OffsetDateTime,
) -> Result<ReconcileReport, ServiceError> {
    let Ok(_guard) = state.reconcile_gate().try_lock() else {
        return Err(ServiceError::Conflict("reconciliation already running".into()));
    };
    reconcile(state, now).await
}

/// Periodic reconciliation; ticks that find a pass in progress are skipped.
pub async fn run_scheduler(state: SharedState) {
    let mut ticker = interval(state.config().schedule.reconcile_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if state.is_degraded().await {
            debug!("storage degraded; skipping reconciliation");
            continue;
        }
        match trigger(&state).await {
            Ok(report) if report.checked > 0 => info!(
                checked = report.checked,
                finished = report.finished,
                failed = report.failed,
                "reconciliation pass done"
            ),
            Ok(_) => {}
            Err(ServiceError::Conflict(_)) => debug!("previous reconciliation still running"),
            Err(err) => warn!(error = %err, "reconciliation pass failed"),
        }
    }
}

async fn reconcile(state: &SharedState, now: OffsetDateTime) -> Result<ReconcileReport, ServiceError> {
    let cutoff = now - state.config().schedule.result_grace;
    let candidates = state
        .repo::<MatchEntity>()
        .await?
        .filter(|m| m.status != MatchStatus::Finished && m.match_date < cutoff)
        .await?;

    let mut report = ReconcileReport {
        checked: candidates.len(),
        ..ReconcileReport::default()
    };

    for fixture in candidates {
        let match_id = fixture.id;
        match lookup(state, &fixture).await {
            Ok(Lookup::Finished(score)) => {
                match match_service::settle(state, fixture, score, None).await {
                    Ok(_) => report.finished += 1,
                    Err(err) => {
                        warn!(%match_id, error = %err, "failed to settle match");
                        report.failed += 1;
                    }
                }
            }
            Ok(Lookup::NotFinished) => debug!(%match_id, "match not finished yet"),
            Err(err) => {
                warn!(%match_id, error = %err, "result lookup failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

async fn lookup(state: &SharedState, fixture: &MatchEntity) -> Result<Lookup, ServiceError> {
    let prompt = format!(
        "Le match {} vs {} ({}, coup d'envoi {}) est-il terminé ? \
         Si oui, donne le score final au format \"buts domicile-buts extérieur\".",
        fixture.home_team,
        fixture.away_team,
        fixture.league,
        super::rfc3339(fixture.match_date),
    );
    let request = LlmRequest {
        prompt,
        add_context_from_internet: true,
        response_json_schema: json!({
            "type": "object",
            "properties": {
                "finished": {"type": "boolean"},
                "final_score": {"type": "string"}
            },
            "required": ["finished"]
        }),
    };

    let answer = timeout(
        state.config().schedule.result_lookup_timeout,
        state.integrations().llm.invoke(request),
    )
    .await
    .map_err(|_| ServiceError::Timeout)??;

    let answer: ResultAnswer = serde_json::from_value(answer)
        .map_err(|err| ServiceError::InvalidInput(format!("unexpected result answer: {err}")))?;
    if !answer.finished {
        return Ok(Lookup::NotFinished);
    }

    let raw = answer.final_score.unwrap_or_default();
    FinalScore::parse(&raw)
        .map(Lookup::Finished)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unparsable final score {raw:?}")))
}
