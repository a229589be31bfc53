use crate::monitor::Sample;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Least-squares slope of RSS over time, in MB per hour.
///
/// `None` when there are fewer than two samples or they all share one timestamp.
pub fn rss_growth_mb_per_hour(samples: &[Sample]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }

    let origin = samples.first()?.timestamp;
    let points = samples
        .iter()
        .map(|sample| {
            let seconds = (sample.timestamp - origin)
                .num_microseconds()
                .map(|micros| micros as f64 / 1e6)
                .unwrap_or_else(|| (sample.timestamp - origin).num_seconds() as f64);
            (seconds, sample.rss_bytes as f64 / BYTES_PER_MB)
        })
        .collect::<Vec<_>>();

    let slope_mb_per_second = least_squares_slope(&points)?;
    Some(slope_mb_per_second * SECONDS_PER_HOUR)
}

fn least_squares_slope(points: &[(f64, f64)]) -> Option<f64> {
    let count = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / count;

    let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), (x, y)| {
        let dx = x - mean_x;
        (cov + dx * (y - mean_y), var + dx * dx)
    });

    if variance <= f64::EPSILON {
        return None;
    }

    let slope = covariance / variance;
    slope.is_finite().then_some(slope)
}
