use tracing::debug;

use crate::config::Thresholds;
use crate::models::{AnalysisResult, ClinicRecord};
use crate::{risk, rules, summary};

/// Runs the full outbreak analysis over one snapshot of records.
///
/// The input is copied and sorted by date once; every rule, the scorer and
/// both aggregators read that same sorted sequence. The caller's slice is
/// never modified, and identical input always produces an identical result.
/// An empty slice yields no alerts, a neutral LOW assessment and empty
/// summaries.
pub fn analyze(records: &[ClinicRecord], thresholds: &Thresholds) -> AnalysisResult {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let alerts = rules::evaluate_all(&sorted, thresholds);
    let risk = risk::assess_risk(&sorted, &alerts, thresholds);
    let summary = summary::summarize(&sorted);
    let site_rollups = summary::rollup_by_site(&sorted);

    debug!(
        records = sorted.len(),
        alerts = alerts.len(),
        score = risk.score,
        level = %risk.level,
        "analysis complete"
    );

    AnalysisResult {
        alerts,
        risk,
        summary,
        site_rollups,
    }
}
