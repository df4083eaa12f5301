use chrono::Duration;
use log::*;
use ptt_engine::{db_types::PttToken, events::EventProducers, PttFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker, which cancels token requests that no bank has issued within `request_timeout`. Do not
/// await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, request_timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = PttFlowApi::new(db, producers);
        info!("🕰️ Stale request expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running stale request expiry job");
            match api.expire_stale_requests(request_timeout).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No stale requests"),
                Ok(expired) => {
                    info!("🕰️ {} stale token requests cancelled", expired.len());
                    debug!("🕰️ Cancelled requests: {}", ptt_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running stale request expiry job: {e}");
                },
            }
        }
    })
}

fn ptt_list(tokens: &[PttToken]) -> String {
    tokens
        .iter()
        .map(|t| format!("[{}] importer: {} bank: {} amount: {}", t.id, t.original_importer, t.issuer_bank, t.amount))
        .collect::<Vec<String>>()
        .join(", ")
}
