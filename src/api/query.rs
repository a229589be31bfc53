use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::config::Api;
use crate::monitor::ProcessRole;

use super::error::ApiError;

/// Raw `/api/history` parameters. Everything is a string so that bad values
/// surface as `ApiError`s instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub role: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub role: ProcessRole,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub resolution: usize,
}

pub fn parse_history_query(params: &HistoryParams, api: &Api) -> Result<HistoryQuery, ApiError> {
    let role = match non_empty(params.role.as_deref()) {
        Some(raw) => ProcessRole::parse(raw).ok_or_else(|| ApiError::UnknownRole(raw.to_string()))?,
        None => return Err(ApiError::MissingParameter("role")),
    };

    let since = non_empty(params.since.as_deref())
        .map(|raw| parse_timestamp("since", raw))
        .transpose()?;
    let until = non_empty(params.until.as_deref())
        .map(|raw| parse_timestamp("until", raw))
        .transpose()?;

    let resolution = match non_empty(params.resolution.as_deref()) {
        Some(raw) => parse_resolution(raw, api.max_resolution)?,
        None => api.default_resolution,
    };

    Ok(HistoryQuery {
        role,
        since,
        until,
        resolution,
    })
}

/// Unix seconds (integer or fractional) or RFC 3339.
pub fn parse_timestamp(param: &'static str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let invalid = || ApiError::InvalidTimestamp {
        param,
        value: raw.to_string(),
    };

    if let Ok(seconds) = raw.parse::<i64>() {
        return Utc.timestamp_opt(seconds, 0).single().ok_or_else(invalid);
    }

    if let Ok(seconds) = raw.parse::<f64>() {
        if !seconds.is_finite() {
            return Err(invalid());
        }
        let millis = (seconds * 1000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return Err(invalid());
        }
        return Utc.timestamp_millis_opt(millis as i64).single().ok_or_else(invalid);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid())
}

fn parse_resolution(raw: &str, max: usize) -> Result<usize, ApiError> {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 && value <= max => Ok(value),
        _ => Err(ApiError::InvalidResolution {
            value: raw.to_string(),
            max,
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
