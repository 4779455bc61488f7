use std::collections::HashMap;

use crate::models::{saturating_total, ClinicRecord, SiteRollup, Summary};

pub fn summarize(records: &[ClinicRecord]) -> Summary {
    let mut sites: Vec<String> = Vec::new();
    for record in records {
        if !sites.contains(&record.site_id) {
            sites.push(record.site_id.clone());
        }
    }

    Summary {
        total_records: records.len(),
        date_start: records.iter().map(|r| r.date).min(),
        date_end: records.iter().map(|r| r.date).max(),
        sites,
        total_patients: saturating_total(records.iter().map(|r| r.total_patients)),
    }
}

/// Per-site totals in the order sites first appear in `records`.
pub fn rollup_by_site(records: &[ClinicRecord]) -> Vec<SiteRollup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rollups: Vec<SiteRollup> = Vec::new();

    for record in records {
        let slot = *index.entry(record.site_id.as_str()).or_insert_with(|| {
            rollups.push(SiteRollup {
                site_id: record.site_id.clone(),
                total_patients: 0,
                fever_and_cough_cases: 0,
                severe_cases: 0,
            });
            rollups.len() - 1
        });

        let entry = &mut rollups[slot];
        entry.total_patients = entry.total_patients.saturating_add(record.total_patients);
        entry.fever_and_cough_cases = entry
            .fever_and_cough_cases
            .saturating_add(record.fever_and_cough_cases);
        entry.severe_cases = entry.severe_cases.saturating_add(record.severe_cases);
    }

    rollups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::{day, record};

    #[test]
    fn empty_input_has_no_range() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.date_start, None);
        assert_eq!(summary.date_end, None);
        assert!(summary.sites.is_empty());
        assert!(rollup_by_site(&[]).is_empty());
    }

    #[test]
    fn summary_tracks_range_and_distinct_sites() {
        let records = vec![
            record(3, "Clinic_B", 2),
            record(1, "Clinic_A", 4),
            record(5, "Clinic_B", 1),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.date_start, Some(day(1)));
        assert_eq!(summary.date_end, Some(day(5)));
        assert_eq!(summary.sites, vec!["Clinic_B", "Clinic_A"]);
        assert_eq!(summary.total_patients, 14);
    }

    #[test]
    fn rollups_keep_first_seen_order() {
        let mut severe = record(2, "Clinic_A", 3);
        severe.severe_cases = 2;
        let records = vec![
            record(0, "Clinic_C", 1),
            record(0, "Clinic_A", 5),
            severe,
            record(1, "Clinic_C", 4),
        ];
        let rollups = rollup_by_site(&records);
        assert_eq!(rollups.len(), 2);
        assert_eq!(rollups[0].site_id, "Clinic_C");
        assert_eq!(rollups[0].fever_and_cough_cases, 5);
        assert_eq!(rollups[0].total_patients, 10);
        assert_eq!(rollups[1].site_id, "Clinic_A");
        assert_eq!(rollups[1].fever_and_cough_cases, 8);
        assert_eq!(rollups[1].severe_cases, 2);
    }

    #[test]
    fn rollup_patients_add_up_to_summary() {
        let records: Vec<_> = (0..20)
            .map(|d| record(d % 6, ["North", "South", "East"][(d % 3) as usize], d as u64))
            .collect();
        let total: u64 = rollup_by_site(&records)
            .iter()
            .map(|rollup| rollup.total_patients)
            .sum();
        assert_eq!(total, summarize(&records).total_patients);
    }

    #[test]
    fn huge_patient_counts_saturate() {
        let mut first = record(0, "Clinic_A", 1);
        first.total_patients = u64::MAX;
        let second = record(1, "Clinic_A", 1);
        let records = vec![first, second];
        assert_eq!(summarize(&records).total_patients, u64::MAX);
        assert_eq!(rollup_by_site(&records)[0].total_patients, u64::MAX);
    }
}
