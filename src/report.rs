use std::fmt::Write;

use crate::models::{Alert, AlertTally, AnalysisResult, Severity};

/// Alerts listed per severity before the rest are collapsed into a count.
pub const ALERTS_PER_SEVERITY: usize = 10;

pub fn alerts_with_severity(alerts: &[Alert], severity: Severity) -> Vec<&Alert> {
    alerts.iter().filter(|a| a.severity == severity).collect()
}

pub fn build_report(source: &str, result: &AnalysisResult) -> String {
    let summary = &result.summary;
    let risk = &result.risk;
    let tally = AlertTally::from_alerts(&result.alerts);

    let mut output = String::new();

    let _ = writeln!(output, "# Clinic Outbreak Report");
    let _ = writeln!(output, "Generated from {source}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Summary");
    let _ = writeln!(output, "- Total records: {}", summary.total_records);

    match (summary.date_start, summary.date_end) {
        (Some(start), Some(end)) => {
            let _ = writeln!(output, "- Date range: {start} to {end}");
        }
        _ => {
            let _ = writeln!(output, "- Date range: no data");
        }
    }

    let _ = writeln!(output, "- Clinics monitored: {}", summary.sites.len());
    let _ = writeln!(output, "- Total patients: {}", summary.total_patients);
    if !summary.sites.is_empty() {
        let _ = writeln!(output, "- Clinics: {}", summary.sites.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Outbreak Risk Prediction");
    let _ = writeln!(output, "- Level: **{}** ({}/100)", risk.level, risk.score);
    let _ = writeln!(output, "- Trend: {}", risk.trend);
    let _ = writeln!(output, "- Avg daily cases (7d): {:.1}", risk.avg_daily_cases);
    let _ = writeln!(output, "- Severe cases (7d): {}", risk.severe_cases_7d);
    let _ = writeln!(output, "- Recommendation: {}", risk.recommendation);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Outbreak Alerts ({})", tally.total());

    if result.alerts.is_empty() {
        let _ = writeln!(output, "No alerts raised for this data.");
    } else {
        for (severity, label) in [(Severity::High, "HIGH"), (Severity::Medium, "MEDIUM")] {
            let matching = alerts_with_severity(&result.alerts, severity);
            if matching.is_empty() {
                continue;
            }
            let _ = writeln!(output);
            let _ = writeln!(output, "### {label} severity ({})", matching.len());
            for alert in matching.iter().take(ALERTS_PER_SEVERITY) {
                let _ = writeln!(
                    output,
                    "- {} ({}, rule {}): {}",
                    alert.date, alert.kind, alert.rule, alert.description
                );
            }
            if matching.len() > ALERTS_PER_SEVERITY {
                let _ = writeln!(
                    output,
                    "- ... and {} more {label} alerts",
                    matching.len() - ALERTS_PER_SEVERITY
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Clinic Summary");

    if result.site_rollups.is_empty() {
        let _ = writeln!(output, "No clinics reported in this data.");
    } else {
        let _ = writeln!(
            output,
            "| Clinic | Total Patients | Fever+Cough Cases | Severe Cases |"
        );
        let _ = writeln!(output, "| --- | ---: | ---: | ---: |");
        for rollup in &result.site_rollups {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                rollup.site_id,
                rollup.total_patients,
                rollup.fever_and_cough_cases,
                rollup.severe_cases
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::Thresholds;
    use crate::ingest::{read_records, TEMPLATE_CSV};
    use crate::rules::tests::record;

    #[test]
    fn empty_report_has_every_section() {
        let result = analyze(&[], &Thresholds::default());
        let report = build_report("empty.csv", &result);
        assert!(report.contains("# Clinic Outbreak Report"));
        assert!(report.contains("- Date range: no data"));
        assert!(report.contains("Level: **LOW** (0/100)"));
        assert!(report.contains("No alerts raised for this data."));
        assert!(report.contains("No clinics reported in this data."));
    }

    #[test]
    fn template_report_lists_clusters_and_clinics() {
        let records = read_records(TEMPLATE_CSV.as_bytes()).unwrap().records;
        let result = analyze(&records, &Thresholds::default());
        let report = build_report("template.csv", &result);
        assert!(report.contains("- Date range: 2024-01-01 to 2024-01-20"));
        assert!(report.contains("Cluster at Clinic_B: 13 cases"));
        assert!(report.contains("| Clinic_A |"));
        assert!(report.contains("| Clinic_B | 108 | 43 | 7 |"));
    }

    #[test]
    fn long_alert_lists_are_collapsed() {
        let records: Vec<_> = (0..12).map(|d| record(d * 10, "Clinic_A", 20)).collect();
        let result = analyze(&records, &Thresholds::default());
        let report = build_report("busy.csv", &result);
        assert!(report.contains("### MEDIUM severity (12)"));
        assert!(report.contains("- ... and 2 more MEDIUM alerts"));
    }
}
