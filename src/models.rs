use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicRecord {
    pub date: NaiveDate,
    pub site_id: String,
    pub total_patients: u64,
    pub fever_cases: u64,
    pub cough_cases: u64,
    pub fever_and_cough_cases: u64,
    pub sore_throat_cases: u64,
    pub body_ache_cases: u64,
    pub headache_cases: u64,
    pub severe_cases: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

/// Numeric payload carried by an alert. Rules 1 and 2 report a single count,
/// Rule 3 reports the current day against the trailing average.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlertDetail {
    Count { count: u64 },
    Increase { current: u64, average: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub date: NaiveDate,
    pub rule: u8,
    pub kind: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(flatten)]
    pub detail: AlertDetail,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Critical => {
                "Immediate outbreak response required. Activate emergency protocols."
            }
            RiskLevel::High => {
                "High outbreak risk detected. Increase monitoring and prepare response teams."
            }
            RiskLevel::Medium => "Moderate risk detected. Continue enhanced surveillance.",
            RiskLevel::Low => "Normal operations. Maintain routine monitoring.",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    #[serde(rename = "Stable/Decreasing")]
    StableOrDecreasing,
    #[serde(rename = "Increasing")]
    Increasing,
    #[serde(rename = "Rapidly Increasing")]
    RapidlyIncreasing,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::StableOrDecreasing => "Stable/Decreasing",
            Trend::Increasing => "Increasing",
            Trend::RapidlyIncreasing => "Rapidly Increasing",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub trend: Trend,
    pub avg_daily_cases: f64,
    pub severe_cases_7d: u64,
    pub recommendation: String,
}

impl RiskAssessment {
    /// Neutral assessment returned when there is no data to score.
    pub fn insufficient_data() -> Self {
        Self {
            score: 0,
            level: RiskLevel::Low,
            trend: Trend::StableOrDecreasing,
            avg_daily_cases: 0.0,
            severe_cases_7d: 0,
            recommendation: RiskLevel::Low.recommendation().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub sites: Vec<String>,
    pub total_patients: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRollup {
    pub site_id: String,
    pub total_patients: u64,
    pub fever_and_cough_cases: u64,
    pub severe_cases: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub alerts: Vec<Alert>,
    pub risk: RiskAssessment,
    pub summary: Summary,
    pub site_rollups: Vec<SiteRollup>,
}

/// Alert counts by severity. Callers polling a growing feed fold these
/// across runs themselves; the engine keeps no counters between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertTally {
    pub high: usize,
    pub medium: usize,
}

impl AlertTally {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let mut tally = Self::default();
        for alert in alerts {
            match alert.severity {
                Severity::High => tally.high += 1,
                Severity::Medium => tally.medium += 1,
            }
        }
        tally
    }

    pub fn absorb(&mut self, other: AlertTally) {
        self.high += other.high;
        self.medium += other.medium;
    }

    pub fn total(&self) -> usize {
        self.high + self.medium
    }
}

/// Adds counts without wrapping; a total that would overflow stays at
/// `u64::MAX`.
pub fn saturating_total<I: IntoIterator<Item = u64>>(counts: I) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}
