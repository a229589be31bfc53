use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::TrendSettings;
use crate::history::HistoryStore;
use crate::monitor::{ProcessRole, Sample};

use super::{
    AlertBook, AlertTransition, AnalysisTrigger, Severity, TrendAnalyzer,
    analyzer::{Classification, analyze, classify},
};

const MB: u64 = 1024 * 1024;

fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600, 0).unwrap()
}

fn settings() -> TrendSettings {
    TrendSettings {
        window_minutes: 30,
        stable_band_mb_per_hour: 1.0,
        alert_threshold_mb_per_hour: 5.0,
        clear_threshold_mb_per_hour: 2.0,
        critical_threshold_mb_per_hour: 20.0,
        min_alert_samples: 3,
    }
}

/// Samples every `step_secs` whose RSS grows by `rate_mb_per_hour`.
fn growing(role: ProcessRole, count: usize, step_secs: i64, rate_mb_per_hour: f64) -> Vec<Sample> {
    (0..count)
        .map(|index| {
            let elapsed = step_secs * index as i64;
            let rss_mb = 100.0 + rate_mb_per_hour * elapsed as f64 / 3600.0;
            Sample {
                timestamp: base_time() + Duration::seconds(elapsed),
                process_role: role,
                pid: 77,
                rss_bytes: (rss_mb * MB as f64) as u64,
                vms_bytes: 0,
                cpu_percent: 0.0,
                thread_count: 2,
            }
        })
        .collect()
}

#[test]
fn classification_follows_band_edges() {
    let band = 1.0;
    assert_eq!(classify(Some(1.0001), band), Classification::Rising);
    assert_eq!(classify(Some(0.9999), band), Classification::Stable);
    assert_eq!(classify(Some(1.0), band), Classification::Stable);
    assert_eq!(classify(Some(-1.0), band), Classification::Stable);
    assert_eq!(classify(Some(-1.0001), band), Classification::Falling);
    assert_eq!(classify(None, band), Classification::InsufficientData);
}

/// RSS moving by `bytes_per_step` every 225 s; 64 KiB per step is exactly 1 MB/h.
fn stepped(role: ProcessRole, bytes_per_step: i64) -> Vec<Sample> {
    (0..=16)
        .map(|step| Sample {
            timestamp: base_time() + Duration::seconds(225 * step),
            process_role: role,
            pid: 77,
            rss_bytes: (100 * MB as i64 + bytes_per_step * step) as u64,
            vms_bytes: 0,
            cpu_percent: 0.0,
            thread_count: 2,
        })
        .collect()
}

#[test]
fn series_at_band_edge_is_stable() {
    let role = ProcessRole::Menubar;
    let one_mb_per_hour = 64 * 1024;

    let rising_edge = analyze(role, &stepped(role, one_mb_per_hour), &settings());
    let rate = rising_edge.growth_rate_mb_per_hour.expect("rate should exist");
    assert!((rate - 1.0).abs() < 1e-9, "rate was {}", rate);

    // pin the band to the fitted rate so the edge is hit exactly
    let at_edge = TrendSettings {
        stable_band_mb_per_hour: rate,
        ..settings()
    };
    assert_eq!(
        analyze(role, &stepped(role, one_mb_per_hour), &at_edge).classification,
        Classification::Stable
    );
    assert_eq!(
        analyze(role, &stepped(role, -one_mb_per_hour), &at_edge).classification,
        Classification::Stable
    );

    // a few bytes per step either side of the edge
    for (bytes_per_step, expected) in [
        (one_mb_per_hour + 64, Classification::Rising),
        (one_mb_per_hour - 64, Classification::Stable),
        (-one_mb_per_hour + 64, Classification::Stable),
        (-one_mb_per_hour - 64, Classification::Falling),
    ] {
        let record = analyze(role, &stepped(role, bytes_per_step), &settings());
        assert_eq!(record.classification, expected, "bytes_per_step={}", bytes_per_step);
    }
}

#[test]
fn analyze_reports_rising_series() {
    let window = growing(ProcessRole::BackgroundService, 60, 30, 12.0);
    let record = analyze(ProcessRole::BackgroundService, &window, &settings());

    let rate = record.growth_rate_mb_per_hour.expect("rate should exist");
    assert!((rate - 12.0).abs() < 0.01, "rate was {}", rate);
    assert_eq!(record.classification, Classification::Rising);
    assert_eq!(record.sample_count, 60);
    assert_eq!(record.latest_rss_bytes, window.last().map(|sample| sample.rss_bytes));
    assert_eq!(record.peak_rss_bytes, record.latest_rss_bytes);
    assert_eq!(record.window_start, Some(base_time()));
}

#[test]
fn analyze_with_one_sample_is_insufficient() {
    let window = growing(ProcessRole::Menubar, 1, 2, 50.0);
    let record = analyze(ProcessRole::Menubar, &window, &settings());
    assert_eq!(record.classification, Classification::InsufficientData);
    assert!(record.growth_rate_mb_per_hour.is_none());
    assert_eq!(record.sample_count, 1);

    let empty = analyze(ProcessRole::Menubar, &[], &settings());
    assert_eq!(empty.classification, Classification::InsufficientData);
    assert!(empty.latest_rss_bytes.is_none());
}

#[test]
fn alert_needs_consecutive_readings_and_fires_once() {
    let settings = settings();
    let mut book = AlertBook::default();
    let role = ProcessRole::BackgroundService;

    let mut raised = 0;
    for tick in 0..10 {
        let transition = book.observe(role, Some(8.0), &settings, base_time() + Duration::seconds(tick));
        if let AlertTransition::Raised(event) = transition {
            assert_eq!(tick, 2, "alert should fire on the third reading");
            assert_eq!(event.severity, Severity::Warning);
            raised += 1;
        }
    }

    assert_eq!(raised, 1);
    assert_eq!(book.raised_total(), 1);
    let active = book.active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].process_role, role);
}

#[test]
fn streak_resets_when_rate_dips() {
    let settings = settings();
    let mut book = AlertBook::default();
    let role = ProcessRole::Menubar;

    for rate in [6.0, 6.0, 4.0, 6.0, 6.0] {
        assert_eq!(book.observe(role, Some(rate), &settings, base_time()), AlertTransition::None);
    }
    assert!(matches!(
        book.observe(role, Some(6.0), &settings, base_time()),
        AlertTransition::Raised(_)
    ));
}

#[test]
fn threshold_must_be_exceeded() {
    let settings = settings();
    let mut book = AlertBook::default();
    for _ in 0..5 {
        book.observe(ProcessRole::Menubar, Some(5.0), &settings, base_time());
    }
    assert_eq!(book.raised_total(), 0);
}

#[test]
fn alert_clears_only_below_clear_threshold() {
    let settings = settings();
    let mut book = AlertBook::default();
    let role = ProcessRole::BackgroundService;

    for _ in 0..3 {
        book.observe(role, Some(30.0), &settings, base_time());
    }
    let active = book.active_alerts().pop().expect("alert should be active");
    assert_eq!(active.severity, Severity::Critical);

    // between clear and alert: still active, no duplicate raise
    for _ in 0..5 {
        assert_eq!(book.observe(role, Some(3.0), &settings, base_time()), AlertTransition::None);
    }
    assert_eq!(book.observe(role, None, &settings, base_time()), AlertTransition::None);
    assert_eq!(book.active_alerts().len(), 1);

    let cleared_at = base_time() + Duration::minutes(5);
    match book.observe(role, Some(1.5), &settings, cleared_at) {
        AlertTransition::Cleared {
            event,
            cleared_at: at,
            growth_rate_mb_per_hour,
        } => {
            assert_eq!(event, active);
            assert_eq!(at, cleared_at);
            assert_eq!(growth_rate_mb_per_hour, 1.5);
        }
        other => panic!("expected clear, got {:?}", other),
    }
    assert!(book.active_alerts().is_empty());
    assert_eq!(book.raised_total(), 1);
}

fn analyzer() -> TrendAnalyzer {
    TrendAnalyzer::new(Duration::seconds(60))
}

#[test]
fn analyzer_tick_raises_for_leaking_role_only() {
    let store = HistoryStore::new(1000);
    let leaking = growing(ProcessRole::BackgroundService, 300, 2, 40.0);
    let flat = growing(ProcessRole::Menubar, 300, 2, 0.0);
    let machine = growing(ProcessRole::SystemTotal, 300, 2, 500.0);

    let analyzer = analyzer();
    let settings = settings();
    for batch in 0..3 {
        let range = batch * 100..(batch + 1) * 100;
        for (role, series) in [
            (ProcessRole::BackgroundService, &leaking),
            (ProcessRole::Menubar, &flat),
            (ProcessRole::SystemTotal, &machine),
        ] {
            for sample in &series[range.clone()] {
                store.append(role, sample.clone());
            }
        }
        let now = leaking[range.end - 1].timestamp;
        let results = analyzer.run_tick(&store, &settings, now, AnalysisTrigger::Scheduled);
        assert_eq!(results.len(), 2);
    }

    let alerts = analyzer.active_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].process_role, ProcessRole::BackgroundService);
    assert_eq!(alerts[0].severity, Severity::Critical);

    let trends = analyzer.trends(&store, &settings);
    assert_eq!(trends.len(), 3);
    assert_eq!(trends[0].classification, Classification::Stable);
    assert_eq!(trends[2].classification, Classification::Rising);
}

#[test]
fn silent_role_does_not_raise_from_frozen_window() {
    let store = HistoryStore::new(1000);
    let role = ProcessRole::BackgroundService;
    let series = growing(role, 200, 2, 40.0);
    let newest = series.last().map(|sample| sample.timestamp).expect("series should not be empty");
    for sample in series {
        store.append(role, sample);
    }

    let analyzer = analyzer();
    let settings = settings();

    // analysis keeps running while nothing new arrives
    for tick in 0..5 {
        analyzer.run_tick(&store, &settings, newest + Duration::seconds(tick), AnalysisTrigger::Scheduled);
    }
    assert!(analyzer.active_alerts().is_empty());

    // restored history a day later is stale data
    for tick in 0..5 {
        let now = newest + Duration::days(1) + Duration::seconds(tick * 30);
        analyzer.run_tick(&store, &settings, now, AnalysisTrigger::Scheduled);
    }
    assert!(analyzer.active_alerts().is_empty());
    assert_eq!(analyzer.raised_total(), 0);

    // the rising trend is still reported, only alerting is held back
    let record = analyzer.trend_for(&store, role, &settings);
    assert_eq!(record.classification, Classification::Rising);
}

#[test]
fn config_reload_rerun_does_not_advance_streak() {
    let store = HistoryStore::new(1000);
    let role = ProcessRole::BackgroundService;
    let series = growing(role, 30, 2, 40.0);
    let analyzer = analyzer();
    let settings = settings();

    let mut raised_on = None;
    for (index, sample) in series.into_iter().enumerate() {
        let now = sample.timestamp;
        store.append(role, sample);
        let trigger = if index % 2 == 0 {
            AnalysisTrigger::ConfigReload
        } else {
            AnalysisTrigger::Scheduled
        };
        let results = analyzer.run_tick(&store, &settings, now, trigger);
        if raised_on.is_none()
            && results
                .iter()
                .any(|(_, transition)| matches!(transition, AlertTransition::Raised(_)))
        {
            raised_on = Some(index);
        }
    }

    // only the scheduled passes on indexes 1, 3 and 5 count
    assert_eq!(raised_on, Some(5));
    assert_eq!(analyzer.raised_total(), 1);
}

#[test]
fn config_reload_rerun_clears_with_new_thresholds() {
    let store = HistoryStore::new(1000);
    let role = ProcessRole::BackgroundService;
    let series = growing(role, 40, 2, 8.0);
    let analyzer = analyzer();
    let mut settings = settings();

    for sample in series {
        let now = sample.timestamp;
        store.append(role, sample);
        analyzer.run_tick(&store, &settings, now, AnalysisTrigger::Scheduled);
    }
    assert_eq!(analyzer.active_alerts().len(), 1);

    let now = store.snapshot(role).map(|sample| sample.timestamp).expect("role should have data");
    settings.alert_threshold_mb_per_hour = 12.0;
    settings.clear_threshold_mb_per_hour = 10.0;
    let results = analyzer.run_tick(&store, &settings, now, AnalysisTrigger::ConfigReload);
    assert!(
        results
            .iter()
            .any(|(_, transition)| matches!(transition, AlertTransition::Cleared { .. }))
    );
    assert!(analyzer.active_alerts().is_empty());
}

#[test]
fn trend_window_only_covers_recent_samples() {
    let store = HistoryStore::new(5000);
    let role = ProcessRole::BackgroundService;
    // an hour of growth followed by 40 flat minutes at 1s spacing
    let mut samples = growing(role, 3600, 1, 60.0);
    let template = samples.last().cloned().expect("series should not be empty");
    let start = samples.len() as i64;
    samples.extend((0..2400).map(|index| Sample {
        timestamp: base_time() + Duration::seconds(start + index),
        ..template.clone()
    }));
    for sample in samples {
        store.append(role, sample);
    }

    let record = analyzer().trend_for(&store, role, &settings());
    assert_eq!(record.classification, Classification::Stable);
    assert_eq!(record.sample_count, 1801);
}
