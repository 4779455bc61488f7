use crate::config::{Thresholds, Tier, MAX_SCORE};
use crate::models::{saturating_total, Alert, ClinicRecord, RiskAssessment, RiskLevel, Trend};
use crate::rules::window_start;

/// Scores outbreak risk from the most recent window of records.
///
/// `alerts` is accepted alongside the records so callers can hand over a
/// whole analysis run; the score itself is derived from the records only.
pub fn assess_risk(
    records: &[ClinicRecord],
    _alerts: &[Alert],
    thresholds: &Thresholds,
) -> RiskAssessment {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let Some(last_date) = sorted.last().map(|record| record.date) else {
        return RiskAssessment::insufficient_data();
    };

    let cutoff = window_start(last_date, thresholds.window_days);
    let recent: Vec<&ClinicRecord> = sorted.iter().filter(|r| r.date >= cutoff).collect();

    let fever_cough = saturating_total(recent.iter().map(|r| r.fever_and_cough_cases));
    let avg_daily_cases = fever_cough as f64 / thresholds.daily_average_divisor;
    let severe_cases_7d = saturating_total(recent.iter().map(|r| r.severe_cases));

    let (trend, trend_points) = trend_of(&recent, thresholds);
    let score = tier_points(&thresholds.volume_tiers, avg_daily_cases)
        .saturating_add(tier_points(&thresholds.severity_tiers, severe_cases_7d as f64))
        .saturating_add(trend_points)
        .min(MAX_SCORE);
    let level = level_for(score, thresholds);

    RiskAssessment {
        score,
        level,
        trend,
        avg_daily_cases,
        severe_cases_7d,
        recommendation: level.recommendation().to_string(),
    }
}

pub fn tier_points(tiers: &[Tier], value: f64) -> u32 {
    tiers
        .iter()
        .find(|tier| value > tier.above)
        .map(|tier| tier.points)
        .unwrap_or(0)
}

/// Compares the two positional halves of the recent subset. With an odd
/// count the later half holds the extra record.
fn trend_of(recent: &[&ClinicRecord], thresholds: &Thresholds) -> (Trend, u32) {
    let half = recent.len() / 2;
    let (first, second) = recent.split_at(half);
    let first_sum = saturating_total(first.iter().map(|r| r.fever_and_cough_cases));
    let second_sum = saturating_total(second.iter().map(|r| r.fever_and_cough_cases));

    if second_sum as f64 > first_sum as f64 * thresholds.rapid_growth_ratio {
        (Trend::RapidlyIncreasing, thresholds.rapid_growth_points)
    } else if second_sum > first_sum {
        (Trend::Increasing, thresholds.growth_points)
    } else {
        (Trend::StableOrDecreasing, 0)
    }
}

pub fn level_for(score: u32, thresholds: &Thresholds) -> RiskLevel {
    match score {
        s if s >= thresholds.critical_score => RiskLevel::Critical,
        s if s >= thresholds.high_score => RiskLevel::High,
        s if s >= thresholds.medium_score => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}
