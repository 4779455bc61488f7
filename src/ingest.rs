//! CSV ingestion for daily clinic counts.
//!
//! Ingestion is deliberately lenient with counts: a blank, negative or
//! unreadable count becomes 0. Rows whose date cannot be parsed or whose
//! clinic name is empty are dropped and reported, so everything handed to the
//! analysis engine has a valid date and a non-empty site.

use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::ClinicRecord;

const DATE: &str = "date";
const CLINIC_NAME: &str = "clinic_name";
const TOTAL_PATIENTS: &str = "total_patients";
const FEVER_CASES: &str = "fever_cases";
const COUGH_CASES: &str = "cough_cases";
const FEVER_AND_COUGH_CASES: &str = "fever_and_cough_cases";
const SORE_THROAT_CASES: &str = "sore_throat_cases";
const BODY_ACHE_CASES: &str = "body_ache_cases";
const HEADACHE_CASES: &str = "headache_cases";
const SEVERE_CASES: &str = "severe_cases";

pub const HEADER: [&str; 10] = [
    DATE,
    CLINIC_NAME,
    TOTAL_PATIENTS,
    FEVER_CASES,
    COUGH_CASES,
    FEVER_AND_COUGH_CASES,
    SORE_THROAT_CASES,
    BODY_ACHE_CASES,
    HEADACHE_CASES,
    SEVERE_CASES,
];

pub const TEMPLATE_CSV: &str = "\
date,clinic_name,total_patients,fever_cases,cough_cases,fever_and_cough_cases,sore_throat_cases,body_ache_cases,headache_cases,severe_cases
2024-01-01,Clinic_A,8,2,1,1,1,0,1,0
2024-01-01,Clinic_B,10,2,2,1,0,1,2,0
2024-01-02,Clinic_A,12,3,2,2,1,1,1,0
2024-01-02,Clinic_B,15,5,4,4,2,1,2,0
2024-01-15,Clinic_A,12,3,2,2,1,1,1,0
2024-01-15,Clinic_B,25,12,10,11,2,1,3,2
2024-01-16,Clinic_A,10,2,2,1,0,1,1,0
2024-01-16,Clinic_B,28,14,12,13,1,2,2,2
2024-01-20,Clinic_A,14,4,3,3,2,1,2,0
2024-01-20,Clinic_B,30,15,14,14,2,1,3,3
";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column `{0}` is missing from the header")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub records: Vec<ClinicRecord>,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: String,
    clinic_name: &'a str,
    total_patients: u64,
    fever_cases: u64,
    cough_cases: u64,
    fever_and_cough_cases: u64,
    sore_throat_cases: u64,
    body_ache_cases: u64,
    headache_cases: u64,
    severe_cases: u64,
}

/// Header positions, looked up by column name so any column order works.
/// Count columns may be absent and then read as zero.
struct Columns {
    date: usize,
    clinic_name: usize,
    total_patients: Option<usize>,
    fever_cases: Option<usize>,
    cough_cases: Option<usize>,
    fever_and_cough_cases: Option<usize>,
    sore_throat_cases: Option<usize>,
    body_ache_cases: Option<usize>,
    headache_cases: Option<usize>,
    severe_cases: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        Ok(Self {
            date: find(DATE).ok_or(IngestError::MissingColumn(DATE))?,
            clinic_name: find(CLINIC_NAME).ok_or(IngestError::MissingColumn(CLINIC_NAME))?,
            total_patients: find(TOTAL_PATIENTS),
            fever_cases: find(FEVER_CASES),
            cough_cases: find(COUGH_CASES),
            fever_and_cough_cases: find(FEVER_AND_COUGH_CASES),
            sore_throat_cases: find(SORE_THROAT_CASES),
            body_ache_cases: find(BODY_ACHE_CASES),
            headache_cases: find(HEADACHE_CASES),
            severe_cases: find(SEVERE_CASES),
        })
    }
}

fn count_at(row: &StringRecord, column: Option<usize>) -> u64 {
    column
        .and_then(|index| row.get(index))
        .map(lenient_count)
        .unwrap_or(0)
}

pub fn read_path(path: &Path) -> Result<IngestReport, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let report = read_records(file)?;
    info!(
        path = %path.display(),
        records = report.records.len(),
        skipped = report.skipped,
        "ingested clinic records"
    );
    Ok(report)
}

pub fn read_records<R: Read>(input: R) -> Result<IngestReport, IngestError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let columns = Columns::locate(reader.headers()?)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in reader.records().enumerate() {
        let row = result?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }

        let raw_date = row.get(columns.date).unwrap_or_default();
        let Ok(date) = NaiveDate::parse_from_str(raw_date, DATE_FORMAT) else {
            warn!(row = line + 1, date = raw_date, "skipping row with unparseable date");
            skipped += 1;
            continue;
        };

        let site_id = row.get(columns.clinic_name).unwrap_or_default();
        if site_id.is_empty() {
            warn!(row = line + 1, "skipping row without a clinic name");
            skipped += 1;
            continue;
        }

        records.push(ClinicRecord {
            date,
            site_id: site_id.to_string(),
            total_patients: count_at(&row, columns.total_patients),
            fever_cases: count_at(&row, columns.fever_cases),
            cough_cases: count_at(&row, columns.cough_cases),
            fever_and_cough_cases: count_at(&row, columns.fever_and_cough_cases),
            sore_throat_cases: count_at(&row, columns.sore_throat_cases),
            body_ache_cases: count_at(&row, columns.body_ache_cases),
            headache_cases: count_at(&row, columns.headache_cases),
            severe_cases: count_at(&row, columns.severe_cases),
        });
    }

    Ok(IngestReport { records, skipped })
}

/// Reads the leading run of digits, so `"12abc"` is 12. Anything without
/// one, or with a leading minus sign, counts as zero.
pub fn lenient_count(raw: &str) -> u64 {
    let raw = raw.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let digits_end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..digits_end].parse().unwrap_or(0)
}

pub fn write_records<W: Write>(output: W, records: &[ClinicRecord]) -> Result<(), IngestError> {
    let mut writer = csv::Writer::from_writer(output);
    for record in records {
        writer.serialize(CsvRow {
            date: record.date.format(DATE_FORMAT).to_string(),
            clinic_name: &record.site_id,
            total_patients: record.total_patients,
            fever_cases: record.fever_cases,
            cough_cases: record.cough_cases,
            fever_and_cough_cases: record.fever_and_cough_cases,
            sore_throat_cases: record.sore_throat_cases,
            body_ache_cases: record.body_ache_cases,
            headache_cases: record.headache_cases,
            severe_cases: record.severe_cases,
        })?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_cleanly() {
        let report = read_records(TEMPLATE_CSV.as_bytes()).unwrap();
        assert_eq!(report.records.len(), 10);
        assert_eq!(report.skipped, 0);
        let busiest = &report.records[9];
        assert_eq!(busiest.site_id, "Clinic_B");
        assert_eq!(busiest.fever_and_cough_cases, 14);
        assert_eq!(busiest.severe_cases, 3);
        assert_eq!(busiest.date, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
    }

    #[test]
    fn bad_counts_become_zero() {
        let csv = "date,clinic_name,total_patients,fever_and_cough_cases,severe_cases\n\
                   2024-03-01, North ,abc,-4,7x\n";
        let report = read_records(csv.as_bytes()).unwrap();
        let record = &report.records[0];
        assert_eq!(record.site_id, "North");
        assert_eq!(record.total_patients, 0);
        assert_eq!(record.fever_and_cough_cases, 0);
        assert_eq!(record.severe_cases, 7);
        // columns absent from the header read as zero
        assert_eq!(record.headache_cases, 0);
    }

    #[test]
    fn short_rows_are_padded_with_zero() {
        let csv = format!("{}\n2024-03-01,North,12\n", HEADER.join(","));
        let report = read_records(csv.as_bytes()).unwrap();
        assert_eq!(report.records[0].total_patients, 12);
        assert_eq!(report.records[0].severe_cases, 0);
    }

    #[test]
    fn rows_with_bad_dates_or_sites_are_skipped() {
        let csv = format!(
            "{}\nnot-a-date,North,1,1,1,1,1,1,1,1\n2024-03-02,,1,1,1,1,1,1,1,1\n\n2024-03-03,South,1,1,1,1,1,1,1,1\n",
            HEADER.join(",")
        );
        let report = read_records(csv.as_bytes()).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.records[0].site_id, "South");
    }

    #[test]
    fn reordered_header_maps_columns_by_name() {
        let csv = "severe_cases,headache_cases,clinic_name,fever_and_cough_cases,date,total_patients,cough_cases,fever_cases,body_ache_cases,sore_throat_cases\n\
                   1,2,East,3,2024-05-06,40,5,6,7,8\n";
        let report = read_records(csv.as_bytes()).unwrap();
        assert_eq!(
            report.records,
            vec![ClinicRecord {
                date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                site_id: "East".to_string(),
                total_patients: 40,
                fever_cases: 6,
                cough_cases: 5,
                fever_and_cough_cases: 3,
                sore_throat_cases: 8,
                body_ache_cases: 7,
                headache_cases: 2,
                severe_cases: 1,
            }]
        );
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let err = read_records("clinic_name,total_patients\nNorth,4\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn("date")));
    }

    #[test]
    fn lenient_count_handles_prefixes() {
        assert_eq!(lenient_count("42"), 42);
        assert_eq!(lenient_count(" 12abc "), 12);
        assert_eq!(lenient_count("+3"), 3);
        assert_eq!(lenient_count("-3"), 0);
        assert_eq!(lenient_count(""), 0);
        assert_eq!(lenient_count("4.9"), 4);
    }

    #[test]
    fn written_records_read_back() {
        let original = read_records(TEMPLATE_CSV.as_bytes()).unwrap().records;
        let mut buffer = Vec::new();
        write_records(&mut buffer, &original).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with(&HEADER.join(",")));
        assert_eq!(read_records(text.as_bytes()).unwrap().records, original);
    }

    #[test]
    fn read_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_path(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Open { .. }));
    }
}
