use std::collections::{BTreeMap, VecDeque};

use chrono::{Duration, NaiveDate};

use crate::config::Thresholds;
use crate::models::{saturating_total, Alert, AlertDetail, ClinicRecord, Severity};

pub const HIGH_LOAD_KIND: &str = "High Fever+Cough Cases";
pub const CLUSTER_KIND: &str = "Geographic Cluster";
pub const RAPID_INCREASE_KIND: &str = "Rapid Increase";

/// Runs all three rules and concatenates their alerts in rule order.
pub fn evaluate_all(records: &[ClinicRecord], thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = sustained_load(records, thresholds);
    alerts.extend(site_clusters(records, thresholds));
    alerts.extend(rapid_increase(records, thresholds));
    alerts
}

/// Fever+cough totals per observed date, ascending.
pub fn daily_totals(records: &[ClinicRecord]) -> Vec<(NaiveDate, u64)> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        let total = totals.entry(record.date).or_insert(0);
        *total = total.saturating_add(record.fever_and_cough_cases);
    }
    totals.into_iter().collect()
}

/// First date of the trailing window ending at `date`. A window reaching
/// past the earliest representable date starts there instead.
pub fn window_start(date: NaiveDate, window_days: i64) -> NaiveDate {
    Duration::try_days(window_days)
        .and_then(|window| date.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN)
}

/// Rule 1: the trailing `[date - window_days, date]` sum, evaluated only on
/// dates that appear in the data.
pub fn sustained_load(records: &[ClinicRecord], thresholds: &Thresholds) -> Vec<Alert> {
    let mut in_window: VecDeque<(NaiveDate, u64)> = VecDeque::new();
    let mut running = 0u64;
    let mut alerts = Vec::new();

    for (date, total) in daily_totals(records) {
        in_window.push_back((date, total));
        running = running.saturating_add(total);

        let start = window_start(date, thresholds.window_days);
        while let Some(&(oldest, amount)) = in_window.front() {
            if oldest >= start {
                break;
            }
            running = running.saturating_sub(amount);
            in_window.pop_front();
        }

        if running > thresholds.window_case_limit {
            alerts.push(Alert {
                date,
                rule: 1,
                kind: HIGH_LOAD_KIND.to_string(),
                severity: Severity::High,
                site_id: None,
                detail: AlertDetail::Count { count: running },
                description: format!(
                    "{running} fever+cough cases in {}-day window",
                    thresholds.window_days
                ),
            });
        }
    }

    alerts
}

/// Rule 2: any single site-day above the cluster limit.
pub fn site_clusters(records: &[ClinicRecord], thresholds: &Thresholds) -> Vec<Alert> {
    records
        .iter()
        .filter(|record| record.fever_and_cough_cases > thresholds.cluster_case_limit)
        .map(|record| Alert {
            date: record.date,
            rule: 2,
            kind: CLUSTER_KIND.to_string(),
            severity: Severity::Medium,
            site_id: Some(record.site_id.clone()),
            detail: AlertDetail::Count {
                count: record.fever_and_cough_cases,
            },
            description: format!(
                "Cluster at {}: {} cases",
                record.site_id, record.fever_and_cough_cases
            ),
        })
        .collect()
}

/// Rule 3: a day's total against the mean of the preceding observed days.
/// Days without a full baseline behind them are skipped.
pub fn rapid_increase(records: &[ClinicRecord], thresholds: &Thresholds) -> Vec<Alert> {
    let totals = daily_totals(records);
    let baseline = thresholds.baseline_days;
    let mut alerts = Vec::new();

    for index in baseline..totals.len() {
        let (date, current) = totals[index];
        let previous =
            saturating_total(totals[index - baseline..index].iter().map(|(_, total)| *total));
        let average = previous as f64 / baseline as f64;

        if average > 0.0 && current as f64 > average * thresholds.increase_multiplier {
            let average = round_one_decimal(average);
            alerts.push(Alert {
                date,
                rule: 3,
                kind: RAPID_INCREASE_KIND.to_string(),
                severity: Severity::High,
                site_id: None,
                detail: AlertDetail::Increase { current, average },
                description: format!("Cases doubled: {current} vs avg {average}"),
            });
        }
    }

    alerts
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
