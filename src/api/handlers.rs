use axum::{
    Json,
    extract::{Query, State},
    response::Html,
};
use chrono::{DateTime, Utc};

use crate::app_context::AppContext;
use crate::monitor::ProcessRole;

use super::{
    downsample::downsample,
    error::ApiError,
    model::{ApplicationTotals, HistoryResponse, SnapshotResponse, StatusResponse, TrendsResponse},
    query::{HistoryParams, parse_history_query},
};

const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

pub(super) async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub(super) async fn snapshot(State(app_context): State<AppContext>) -> Json<SnapshotResponse> {
    let roles = ProcessRole::ALL
        .into_iter()
        .map(|role| (role, app_context.history.snapshot(role)))
        .collect::<std::collections::BTreeMap<_, _>>();
    let totals = ApplicationTotals::from_latest(roles.values().flatten());

    Json(SnapshotResponse {
        generated_at: Utc::now(),
        roles,
        totals,
    })
}

pub(super) async fn history(
    State(app_context): State<AppContext>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let query = parse_history_query(&params, &app_context.config.api)?;

    let samples = app_context.history.query(
        query.role,
        query.since.unwrap_or(DateTime::<Utc>::MIN_UTC),
        query.until.unwrap_or(DateTime::<Utc>::MAX_UTC),
    );
    let total_samples = samples.len();
    let (samples, stride) = downsample(samples, query.resolution);

    Ok(Json(HistoryResponse {
        process_role: query.role,
        since: query.since,
        until: query.until,
        resolution: query.resolution,
        total_samples,
        stride,
        downsampling: "uniform_stride",
        samples,
    }))
}

pub(super) async fn trends(State(app_context): State<AppContext>) -> Json<TrendsResponse> {
    let settings = app_context.runtime_config.read().await.trend.clone();
    let trends = app_context.analyzer.trends(&app_context.history, &settings);

    Json(TrendsResponse {
        generated_at: Utc::now(),
        window_minutes: settings.window_minutes,
        trends,
        active_alerts: app_context.analyzer.active_alerts(),
    })
}

pub(super) async fn status(State(app_context): State<AppContext>) -> Json<StatusResponse> {
    let now = Utc::now();
    let last_sampler_tick = *app_context.last_sampler_tick.lock().await;
    let last_analysis_tick = *app_context.last_analysis_tick.lock().await;

    Json(StatusResponse {
        started_at: app_context.started_at,
        uptime_secs: now.signed_duration_since(app_context.started_at).num_seconds().max(0),
        last_sampler_tick,
        last_analysis_tick,
        samples_per_role: app_context.history.counts(),
        history_capacity_per_role: app_context.history.capacity(),
        active_alerts: app_context.analyzer.active_alerts().len(),
        raised_alerts_total: app_context.analyzer.raised_total(),
        simulation: app_context.config.simulation.enabled,
    })
}
