/*!
Subcrate for interoperation with supplier users.

Everything here runs behind the supplier gate, but deliberately not
behind a supplier-id check: a session with the role and no identifier
gets the placeholder id rather than a locked door.
*/
use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path},
    http::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

use crate::config::Glob;
use crate::hooks::SubmissionList;
use crate::session::Session;
use crate::submission::{sample_report, sample_submissions, Batch, SubmissionReport};
use super::*;

const DEFAULT_UPLOAD_NAME: &str = "submission.csv";
const DEFAULT_SUBMISSION_LABEL: &str = "ACME_Q2_Batch_2";

fn dashboard_data(session: &Session, submissions: Option<Vec<Value>>, notice: Option<&str>) -> Value {
    json!({
        "supplier_id": session.supplier_id(),
        "status": session.status().to_string(),
        "submissions": submissions,
        "notice": notice,
    })
}

fn submission_row(report: &SubmissionReport) -> Value {
    json!({
        "id": &report.submission_id,
        "date": report.processed_at_short(),
        "label": &report.submission_label,
        "batches": report.summary.total_batches,
        "status": format!("{} Pass", report.summary.passed_batches),
    })
}

pub async fn dashboard(headers: HeaderMap) -> Response {
    let session = Session::from_cookie_header(&headers);
    log::trace!(
        "supplier::dashboard() called for {:?}.",
        session.supplier_id()
    );

    serve_template(
        StatusCode::OK,
        "supplier_dashboard",
        &dashboard_data(&session, None, None),
        vec![],
    )
}

/// Dashboard with the past-submissions table filled in from the
/// submissions endpoint. Anything short of a usable list falls back to
/// the sample rows with a notice saying so.
pub async fn dashboard_submissions(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
) -> Response {
    let session = Session::from_cookie_header(&headers);
    let supplier_id = session.supplier_id_or_placeholder().to_owned();
    log::trace!(
        "supplier::dashboard_submissions() called for {:?}.",
        &supplier_id
    );

    let (rows, notice) = match glob.hooks.past_submissions(&supplier_id).await {
        Ok(SubmissionList::Reports(reports)) if !reports.is_empty() => {
            let rows: Vec<Value> = reports.iter().map(submission_row).collect();
            (rows, None)
        }
        Ok(SubmissionList::Reports(_)) => {
            let rows: Vec<Value> = sample_submissions().iter().map(submission_row).collect();
            (
                rows,
                Some("No previous submissions were found for your account. Displaying sample rows.".to_owned()),
            )
        }
        Ok(SubmissionList::Note(msg)) => {
            let rows: Vec<Value> = sample_submissions().iter().map(submission_row).collect();
            (rows, Some(msg))
        }
        Err(e) => {
            log::error!(
                "Hooks::past_submissions( {:?} ) returned error: {}",
                &supplier_id,
                &e
            );
            let rows: Vec<Value> = sample_submissions().iter().map(submission_row).collect();
            (
                rows,
                Some("There was a problem fetching your submissions. Please try again.".to_owned()),
            )
        }
    };

    serve_template(
        StatusCode::OK,
        "supplier_dashboard",
        &dashboard_data(&session, Some(rows), notice.as_deref()),
        vec![],
    )
}

fn new_submission_page(code: StatusCode, error: Option<&str>) -> Response {
    serve_template(
        code,
        "new_submission",
        &json!({
            "error": error,
            "default_label": DEFAULT_SUBMISSION_LABEL,
        }),
        vec![],
    )
}

pub async fn new_submission_form() -> Response {
    new_submission_page(StatusCode::OK, None)
}

/// Serve the CSV submission template, from the template endpoint when
/// it answers and from the built-in copy when it doesn't.
pub async fn template_download(Extension(glob): Extension<Arc<Glob>>) -> Response {
    log::trace!("supplier::template_download() called.");

    let body = match glob.hooks.template().await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!(
                "Template endpoint unavailable ({}); serving built-in template.",
                &e
            );
            crate::submission::template_csv().into_bytes()
        }
    };

    (
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (
                CONTENT_DISPOSITION,
                HeaderValue::from_static(
                    "attachment; filename=\"las_submission_template.csv\"",
                ),
            ),
        ],
        body,
    )
        .into_response()
}

/**
Multipart submission upload.

The file is presence-checked locally (does it parse as batch rows at
all?) before it is forwarded to the grading endpoint; grading itself is
entirely the remote end's business.
*/
pub async fn upload(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let session = Session::from_cookie_header(&headers);
    log::trace!("supplier::upload() called for {:?}.", session.supplier_id());

    let mut file_name = DEFAULT_UPLOAD_NAME.to_owned();
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut submission_label = DEFAULT_SUBMISSION_LABEL.to_owned();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log::error!("Error reading upload form: {}", &e);
                return respond_bad_request("Upload form unreadable.".to_owned());
            }
        };

        let name = match field.name() {
            Some(name) => name.to_owned(),
            None => continue,
        };

        match name.as_str() {
            "file" => {
                if let Some(n) = field.file_name() {
                    file_name = n.to_owned();
                }
                match field.bytes().await {
                    Ok(bytes) => {
                        file_bytes = Some(bytes.to_vec());
                    }
                    Err(e) => {
                        log::error!("Error reading uploaded file: {}", &e);
                        return respond_bad_request("Uploaded file unreadable.".to_owned());
                    }
                }
            }
            "submission_label" => match field.text().await {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        submission_label = text.trim().to_owned();
                    }
                }
                Err(e) => {
                    log::error!("Error reading submission label: {}", &e);
                    return respond_bad_request("Submission label unreadable.".to_owned());
                }
            },
            _ => {}
        }
    }

    let file_bytes = match file_bytes {
        Some(bytes) => bytes,
        None => {
            return new_submission_page(
                StatusCode::BAD_REQUEST,
                Some("Please upload a completed CSV file before submitting."),
            );
        }
    };

    match Batch::vec_from_csv_reader(&file_bytes[..]) {
        Ok(batches) if batches.is_empty() => {
            return new_submission_page(
                StatusCode::BAD_REQUEST,
                Some("The uploaded file contains no batch rows."),
            );
        }
        Ok(batches) => {
            log::trace!("Upload presence check: {} batch rows.", batches.len());
        }
        Err(e) => {
            return new_submission_page(StatusCode::BAD_REQUEST, Some(&e));
        }
    }

    let supplier_id = session.supplier_id_or_placeholder();
    let reports = match glob
        .hooks
        .grade(&file_name, file_bytes, &submission_label, supplier_id)
        .await
    {
        Ok(reports) => reports,
        Err(e) => {
            log::error!("Hooks::grade( {:?} ) returned error: {}", &file_name, &e);
            return new_submission_page(
                StatusCode::BAD_GATEWAY,
                Some("Could not submit your CSV file. Please try again."),
            );
        }
    };

    match reports.into_iter().next() {
        Some(report) => serve_template(
            StatusCode::OK,
            "submission_results",
            &report_data(&report, None),
            vec![],
        ),
        None => new_submission_page(
            StatusCode::BAD_GATEWAY,
            Some("The grading service returned no report. Please try again."),
        ),
    }
}

/// Whole-number metrics render without the trailing `.0`.
fn metric_display(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

fn report_data(report: &SubmissionReport, notice: Option<&str>) -> Value {
    let results: Vec<Value> = report
        .results
        .iter()
        .map(|batch| {
            json!({
                "batch_label": &batch.batch_label,
                "passed": batch.status == crate::submission::BatchStatus::Pass,
                "metrics": {
                    "detergency": metric_display(batch.metrics.detergency),
                    "foaming": metric_display(batch.metrics.foaming),
                    "biodegradability": metric_display(batch.metrics.biodegradability),
                    "purity": metric_display(batch.metrics.purity),
                },
                "failure_reasons": &batch.failure_reasons,
                "has_failures": !batch.failure_reasons.is_empty(),
            })
        })
        .collect();

    json!({
        "submission_label": &report.submission_label,
        "processed_at": report.processed_at_display(),
        "summary": &report.summary,
        "results": results,
        "notice": notice,
    })
}

/// Results view with no live report to show: the portal keeps no state,
/// so a direct visit gets the sample report, labeled as such.
fn sample_results_page() -> Response {
    serve_template(
        StatusCode::OK,
        "submission_results",
        &report_data(
            &sample_report(),
            Some("No submission data found. Displaying sample results."),
        ),
        vec![],
    )
}

pub async fn results_latest() -> Response {
    log::trace!("supplier::results_latest() called.");
    sample_results_page()
}

pub async fn results_by_id(Path(submission_id): Path<String>) -> Response {
    log::trace!("supplier::results_by_id( {:?} ) called.", &submission_id);
    sample_results_page()
}
