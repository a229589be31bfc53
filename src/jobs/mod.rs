use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::app_context::AppContext;
use crate::monitor::ProcessProbe;

mod analysis;
mod config_reload;
mod notifications;
mod persist;
mod sampler;

pub use persist::persist_history;

pub fn start_background_jobs<P: ProcessProbe>(app_context: AppContext, probe: Arc<P>) -> Vec<JoinHandle<()>> {
    let mut handles = vec![
        notifications::start_notification_log_job(app_context.clone()),
        sampler::start_sampler_job(app_context.clone(), probe),
        analysis::start_analysis_job(app_context.clone()),
        config_reload::start_config_hot_reload_job(app_context.clone()),
    ];

    if app_context.config.persistence.enabled {
        handles.push(persist::start_persist_job(app_context));
    }

    handles
}
