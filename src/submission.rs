/*!
Batch submissions and their graded reports.

The grading itself happens on the remote end; this module holds the
typed shapes that cross that boundary, the CSV reading used to check an
upload before it is forwarded, and the sample data the views fall back
on when no live data is available.

Submission .csv rows should look like this:

```csv
#batch_label, detergency, foaming, biodegradability, purity
ACME_LAS_001,        520,        315,          160,      5
```
*/
use std::io::Read;

use serde::{Deserialize, Serialize};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime,
};

const DATE_FMT: &[FormatItem] = format_description!("[month repr:short] [day], [year] [hour]:[minute] UTC");
const SHORT_DATE_FMT: &[FormatItem] = format_description!("[month]/[day]");

// The remote grader stamps reports without a zone offset sometimes.
const NAIVE_STAMP_FMT: &[FormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// The four graded properties of a detergent batch.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Metrics {
    pub detergency: f64,
    pub foaming: f64,
    #[serde(default)]
    pub biodegradability: f64,
    pub purity: f64,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum BatchStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BatchReport {
    pub batch_label: String,
    pub status: BatchStatus,
    pub metrics: Metrics,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct ReportSummary {
    pub total_batches: u32,
    pub passed_batches: u32,
    pub failed_batches: u32,
}

/// One graded submission, as the grading endpoint returns it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmissionReport {
    pub submission_id: String,
    pub submission_label: String,
    pub processed_at: String,
    pub summary: ReportSummary,
    #[serde(default)]
    pub results: Vec<BatchReport>,
}

impl SubmissionReport {
    /// `Mar 12, 2025 10:04 UTC` rendering of `processed_at`.
    pub fn processed_at_display(&self) -> String {
        display_timestamp(&self.processed_at)
    }

    /// `03/12` rendering of `processed_at`, for the dashboard table.
    pub fn processed_at_short(&self) -> String {
        match parse_timestamp(&self.processed_at) {
            Some(dt) => dt
                .format(&SHORT_DATE_FMT)
                .unwrap_or_else(|_| self.processed_at.clone()),
            None => self.processed_at.clone(),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt);
    }
    match PrimitiveDateTime::parse(raw, &NAIVE_STAMP_FMT) {
        Ok(dt) => Some(dt.assume_utc()),
        Err(_) => None,
    }
}

/// Human rendering of a collaborator timestamp. An unparseable stamp
/// renders verbatim rather than erroring.
pub fn display_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format(&DATE_FMT).unwrap_or_else(|_| raw.to_owned()),
        None => {
            log::warn!("Timestamp {:?} unparseable; rendering verbatim.", raw);
            raw.to_owned()
        }
    }
}

/// One row of an uploaded submission file, before grading.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub label: String,
    pub metrics: Metrics,
}

fn metric_from_field(row: &csv::StringRecord, n: usize, name: &str) -> Result<f64, String> {
    let s = match row.get(n) {
        Some(s) => s,
        None => {
            return Err(format!("no {} column", name));
        }
    };
    s.parse()
        .map_err(|_| format!("unable to parse {:?} as a {} value", s, name))
}

impl Batch {
    pub fn from_csv_line(row: &csv::StringRecord) -> Result<Batch, String> {
        log::trace!("Batch::from_csv_line( {:?} ) called.", row);

        let label = match row.get(0) {
            Some("") | None => {
                return Err("no batch label".to_owned());
            }
            Some(s) => s.to_owned(),
        };

        let metrics = Metrics {
            detergency: metric_from_field(row, 1, "detergency")?,
            foaming: metric_from_field(row, 2, "foaming")?,
            biodegradability: metric_from_field(row, 3, "biodegradability")?,
            purity: metric_from_field(row, 4, "purity")?,
        };

        Ok(Batch { label, metrics })
    }

    pub fn vec_from_csv_reader<R: Read>(r: R) -> Result<Vec<Batch>, String> {
        log::trace!("Batch::vec_from_csv_reader(...) called.");

        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(false)
            .has_headers(false)
            .from_reader(r);

        let mut batches: Vec<Batch> = Vec::new();

        for (n, res) in csv_reader.records().enumerate() {
            match res {
                Ok(record) => match Batch::from_csv_line(&record) {
                    Ok(batch) => {
                        batches.push(batch);
                    }
                    Err(e) => {
                        let estr = match record.position() {
                            Some(p) => format!("Error on line {}: {}", p.line(), &e),
                            None => format!("Error in CSV record {}: {}", &n, &e),
                        };
                        return Err(estr);
                    }
                },
                Err(e) => {
                    let estr = match e.position() {
                        Some(p) => format!("Error on line {}: {}", p.line(), &e),
                        None => format!("Error in CSV record {}: {}", &n, &e),
                    };
                    return Err(estr);
                }
            }
        }

        log::trace!(
            "Batch::vec_from_csv_reader() returns {} batches.",
            batches.len()
        );
        Ok(batches)
    }
}

/// The built-in submission template, served when the template endpoint
/// is unreachable.
pub fn template_csv() -> String {
    "#batch_label, detergency, foaming, biodegradability, purity\n\
     EXAMPLE_LAS_001, 520, 315, 160, 5\n"
        .to_owned()
}

/// The sample report the results view shows when it has no live data.
pub fn sample_report() -> SubmissionReport {
    let results = vec![
        BatchReport {
            batch_label: "ACME_LAS_001".to_owned(),
            status: BatchStatus::Fail,
            metrics: Metrics {
                detergency: 520.0,
                foaming: 315.0,
                biodegradability: 160.0,
                purity: 5.0,
            },
            failure_reasons: vec![
                "Biodegradability (160 < required 600)".to_owned(),
                "Purity (5 < required 60)".to_owned(),
            ],
        },
        BatchReport {
            batch_label: "ACME_LAS_002".to_owned(),
            status: BatchStatus::Fail,
            metrics: Metrics {
                detergency: 1040.0,
                foaming: 735.0,
                biodegradability: 480.0,
                purity: 25.0,
            },
            failure_reasons: vec![
                "Biodegradability (480 < required 600)".to_owned(),
                "Purity (25 < required 60)".to_owned(),
            ],
        },
        BatchReport {
            batch_label: "ACME_LAS_003".to_owned(),
            status: BatchStatus::Fail,
            metrics: Metrics {
                detergency: 1560.0,
                foaming: 1155.0,
                biodegradability: 800.0,
                purity: 45.0,
            },
            failure_reasons: vec!["Purity (45 < required 60)".to_owned()],
        },
        BatchReport {
            batch_label: "ACME_LAS_004".to_owned(),
            status: BatchStatus::Pass,
            metrics: Metrics {
                detergency: 2080.0,
                foaming: 1575.0,
                biodegradability: 1120.0,
                purity: 65.0,
            },
            failure_reasons: vec![],
        },
        BatchReport {
            batch_label: "ACME_LAS_005".to_owned(),
            status: BatchStatus::Pass,
            metrics: Metrics {
                detergency: 2600.0,
                foaming: 1995.0,
                biodegradability: 1440.0,
                purity: 85.0,
            },
            failure_reasons: vec![],
        },
    ];

    SubmissionReport {
        submission_id: "123".to_owned(),
        submission_label: "ACME_Q2_Batch_2".to_owned(),
        processed_at: "2025-03-12T10:04:39.445Z".to_owned(),
        summary: ReportSummary {
            total_batches: 5,
            passed_batches: 2,
            failed_batches: 3,
        },
        results,
    }
}

/// Sample past submissions for the dashboard table.
pub fn sample_submissions() -> Vec<SubmissionReport> {
    vec![
        SubmissionReport {
            submission_id: "acme-q2-1".to_owned(),
            submission_label: "ACME_Q2_1".to_owned(),
            processed_at: "2023-05-12T00:00:00Z".to_owned(),
            summary: ReportSummary {
                total_batches: 5,
                passed_batches: 2,
                failed_batches: 3,
            },
            results: vec![],
        },
        SubmissionReport {
            submission_id: "acme-q2-0".to_owned(),
            submission_label: "ACME_Q2_0".to_owned(),
            processed_at: "2023-05-01T00:00:00Z".to_owned(),
            summary: ReportSummary {
                total_batches: 3,
                passed_batches: 0,
                failed_batches: 3,
            },
            results: vec![],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    use float_cmp::approx_eq;

    #[test]
    fn batches_from_csv() {
        ensure_logging();
        let f = std::fs::File::open("test/good_batches_0.csv").unwrap();
        let batches = Batch::vec_from_csv_reader(f).unwrap();
        log::trace!("Batches:\n{:#?}", &batches);

        assert_eq!(batches.len(), 3);
        assert_eq!(&batches[0].label, "ACME_LAS_001");
        assert!(approx_eq!(f64, batches[1].metrics.foaming, 735.0));
        assert!(approx_eq!(f64, batches[2].metrics.purity, 45.0));
    }

    #[test]
    fn bad_csv_errors_name_the_line() {
        ensure_logging();

        let missing = "ACME_LAS_001, 520, 315, 160\n";
        let e = Batch::vec_from_csv_reader(missing.as_bytes()).unwrap_err();
        assert!(e.contains("line 1"));

        let garbled = "ACME_LAS_001, 520, 315, 160, 5\nACME_LAS_002, lots, 735, 480, 25\n";
        let e = Batch::vec_from_csv_reader(garbled.as_bytes()).unwrap_err();
        assert!(e.contains("line 2"));
        assert!(e.contains("detergency"));
    }

    #[test]
    fn builtin_template_parses() {
        ensure_logging();
        let batches = Batch::vec_from_csv_reader(template_csv().as_bytes()).unwrap();
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn timestamp_rendering() {
        ensure_logging();

        assert_eq!(
            display_timestamp("2025-03-12T10:04:39.445Z"),
            "Mar 12, 2025 10:04 UTC"
        );
        // Zone-less stamps from the roster service.
        assert_eq!(
            display_timestamp("2025-03-07T15:25:50.84047"),
            "Mar 07, 2025 15:25 UTC"
        );
        // Garbage renders verbatim.
        assert_eq!(display_timestamp("yesterday-ish"), "yesterday-ish");

        let report = sample_report();
        assert_eq!(report.processed_at_short(), "03/12");
    }

    #[test]
    fn sample_report_is_consistent() {
        ensure_logging();
        let report = sample_report();

        let passed = report
            .results
            .iter()
            .filter(|b| b.status == BatchStatus::Pass)
            .count() as u32;
        assert_eq!(passed, report.summary.passed_batches);
        assert_eq!(report.results.len() as u32, report.summary.total_batches);

        // Failed batches carry reasons; passed ones don't.
        for batch in report.results.iter() {
            match batch.status {
                BatchStatus::Fail => assert!(!batch.failure_reasons.is_empty()),
                BatchStatus::Pass => assert!(batch.failure_reasons.is_empty()),
            }
        }
    }
}
