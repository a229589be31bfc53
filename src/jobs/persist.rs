use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::app_context::AppContext;
use crate::history::HistoryStore;

pub(super) fn start_persist_job(app_context: AppContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let persistence = &app_context.config.persistence;
        let path = PathBuf::from(&persistence.path);
        let mut shutdown = app_context.shutdown.clone();
        let mut ticker = tokio::time::interval(Duration::from_secs(persistence.interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait() => break,
            }

            persist_history(Arc::clone(&app_context.history), path.clone()).await;
        }

        log::info!("persist_job_stopped");
    })
}

/// Write the store to disk on the blocking pool. Failures are logged and the
/// in-memory history is kept either way.
pub async fn persist_history(history: Arc<HistoryStore>, path: PathBuf) -> bool {
    let display = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || history.persist(&path)).await;

    match result {
        Ok(Ok(written)) => {
            log::info!("history_persisted path={} samples={}", display, written);
            true
        }
        Ok(Err(error)) => {
            log::warn!("history_persist_failed path={} error={}", display, error);
            false
        }
        Err(error) => {
            log::error!("history_persist_failed path={} error=task_failed:{}", display, error);
            false
        }
    }
}
