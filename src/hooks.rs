/*!
Outbound calls to the webhook collaborators.

Every piece of real business logic (credential checks, registration,
CSV grading, the supplier roster, baseline persistence) lives behind a
remote HTTP endpoint. This module is the portal's one boundary with
those services: each operation gets a method that performs the call and
validates the reply into an explicit type, so nothing past this module
ever inspects untyped data.

No call here retries or deduplicates; a failed call is reported and the
caller decides what to show.
*/
use std::time::Duration;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::session::SupplierStatus;
use crate::submission::SubmissionReport;
use crate::supplier::Supplier;

const HOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq)]
pub struct HookError(String);

impl HookError {
    /// Prepend some contextual `annotation` for the error.
    fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl From<reqwest::Error> for HookError {
    fn from(e: reqwest::Error) -> HookError {
        HookError(format!("Webhook: {}", &e))
    }
}

impl From<String> for HookError {
    fn from(s: String) -> HookError {
        HookError(s)
    }
}

/// Where each collaborator lives. The values are full URLs; the remote
/// side treats them as opaque single-purpose endpoints.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub template: String,
    pub grade: String,
    pub submissions: String,
    pub suppliers: String,
    pub supplier_status: String,
    pub supplier_delete: String,
    pub baseline: String,
}

impl std::default::Default for Endpoints {
    fn default() -> Self {
        let base = "https://hooks.essence.example/webhook";
        Self {
            login: format!("{}/login", base),
            register: format!("{}/register", base),
            template: format!("{}/template", base),
            grade: format!("{}/grade", base),
            submissions: format!("{}/submissions", base),
            suppliers: format!("{}/suppliers", base),
            supplier_status: format!("{}/supplier-status", base),
            supplier_delete: format!("{}/supplier-delete", base),
            baseline: format!("{}/baseline", base),
        }
    }
}

/// Registration data as the registration endpoint wants it; the
/// password never leaves the portal, only its digest does.
#[derive(Clone, Debug)]
pub struct Registration {
    pub company_name: String,
    pub email: String,
    pub notification_email: String,
    pub password_hash: String,
}

/// Hex SHA-256 digest of a password, for the registration contract.
///
/// The endpoint stores one deterministic digest string per account, so
/// a salted KDF can't be used here; see DESIGN.md.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// What the past-submissions endpoint answered with.
#[derive(Debug)]
pub enum SubmissionList {
    Reports(Vec<SubmissionReport>),
    /// The service acknowledged but is still processing.
    Note(String),
}

/// A reply that may arrive as a bare object or a one-element array.
fn first_record(v: Value) -> Value {
    match v {
        Value::Array(mut a) => {
            if a.is_empty() {
                Value::Null
            } else {
                a.swap_remove(0)
            }
        }
        v => v,
    }
}

fn login_id_from_value(v: Value) -> Option<String> {
    let record = first_record(v);
    match record.get("supplierid") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}

fn reports_from_value(v: Value) -> Result<Vec<SubmissionReport>, HookError> {
    let records = match v {
        Value::Array(a) => a,
        v => vec![v],
    };

    let mut reports: Vec<SubmissionReport> = Vec::with_capacity(records.len());
    for record in records {
        let report: SubmissionReport = serde_json::from_value(record)
            .map_err(|e| HookError(format!("Unusable submission report: {}", &e)))?;
        reports.push(report);
    }
    Ok(reports)
}

fn submission_list_from_value(v: Value) -> SubmissionList {
    if let Some(Value::String(msg)) = v.get("message") {
        return SubmissionList::Note(msg.clone());
    }

    match reports_from_value(v) {
        Ok(reports) => SubmissionList::Reports(reports),
        Err(e) => {
            log::warn!("Past-submissions reply unusable ({}); treating as empty.", &e);
            SubmissionList::Reports(vec![])
        }
    }
}

#[derive(Debug)]
pub struct Hooks {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl Hooks {
    pub fn new(endpoints: Endpoints) -> Result<Hooks, HookError> {
        log::trace!("Hooks::new( {:?} ) called.", &endpoints);

        let client = reqwest::Client::builder()
            .timeout(HOOK_TIMEOUT)
            .build()
            .map_err(HookError::from)?;

        Ok(Hooks { client, endpoints })
    }

    /**
    Check credentials against the authentication endpoint.

    `Ok(Some(id))` is a successful login; `Ok(None)` means the service
    answered but had no identifier for these credentials, which the
    caller should treat as a plain bad-password case rather than an
    error.
    */
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<String>, HookError> {
        log::trace!("Hooks::login( {:?}, [ password ] ) called.", email);

        let reply: Value = self
            .client
            .post(&self.endpoints.login)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| HookError::from(e).annotate("Login reply unreadable"))?;

        Ok(login_id_from_value(reply))
    }

    /// Submit a registration. Success is transport-level; the endpoint
    /// returns no identifier.
    pub async fn register(&self, reg: &Registration) -> Result<(), HookError> {
        log::trace!(
            "Hooks::register( {:?}, {:?} ) called.",
            &reg.company_name,
            &reg.email
        );

        self.client
            .get(&self.endpoints.register)
            .query(&[
                ("company_name", reg.company_name.as_str()),
                ("email", reg.email.as_str()),
                ("notification_email", reg.notification_email.as_str()),
                ("password_hash", reg.password_hash.as_str()),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HookError::from(e).annotate("Registration rejected"))?;

        Ok(())
    }

    /// Fetch the CSV submission template.
    pub async fn template(&self) -> Result<Vec<u8>, HookError> {
        log::trace!("Hooks::template() called.");

        let bytes = self
            .client
            .get(&self.endpoints.template)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
            .map_err(|e| HookError::from(e).annotate("Template body unreadable"))?;

        Ok(bytes.to_vec())
    }

    /// Upload a submission file for grading and return the graded
    /// report(s).
    pub async fn grade(
        &self,
        file_name: &str,
        file: Vec<u8>,
        submission_label: &str,
        supplier_id: &str,
    ) -> Result<Vec<SubmissionReport>, HookError> {
        log::trace!(
            "Hooks::grade( {:?}, [ {} bytes ], {:?}, {:?} ) called.",
            file_name,
            file.len(),
            submission_label,
            supplier_id
        );

        let part = reqwest::multipart::Part::bytes(file)
            .file_name(file_name.to_owned())
            .mime_str("text/csv")
            .map_err(|e| HookError::from(e).annotate("Unable to build file part"))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("submissionLabel", submission_label.to_owned())
            .text("supplierid", supplier_id.to_owned());

        let reply: Value = self
            .client
            .post(&self.endpoints.grade)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| HookError::from(e).annotate("Grading reply unreadable"))?;

        reports_from_value(reply).map_err(|e| e.annotate("Grading reply"))
    }

    /// Fetch a supplier's past submissions.
    pub async fn past_submissions(&self, supplier_id: &str) -> Result<SubmissionList, HookError> {
        log::trace!("Hooks::past_submissions( {:?} ) called.", supplier_id);

        let reply: Value = self
            .client
            .post(&self.endpoints.submissions)
            .json(&json!({ "supplierID": supplier_id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| HookError::from(e).annotate("Submission list unreadable"))?;

        Ok(submission_list_from_value(reply))
    }

    /// Fetch the supplier roster.
    pub async fn suppliers(&self) -> Result<Vec<Supplier>, HookError> {
        log::trace!("Hooks::suppliers() called.");

        let roster: Vec<Supplier> = self
            .client
            .get(&self.endpoints.suppliers)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| HookError::from(e).annotate("Supplier roster unreadable"))?;

        Ok(roster)
    }

    /// Report an approval/rejection decision for a supplier account.
    pub async fn set_supplier_status(
        &self,
        supplier_id: &str,
        status: SupplierStatus,
    ) -> Result<(), HookError> {
        log::trace!(
            "Hooks::set_supplier_status( {:?}, {} ) called.",
            supplier_id,
            &status
        );

        self.client
            .post(&self.endpoints.supplier_status)
            .json(&json!({
                "supplierid": supplier_id,
                "status": status.to_string(),
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HookError::from(e).annotate("Status change rejected"))?;

        Ok(())
    }

    /// Delete a supplier account.
    pub async fn delete_supplier(&self, supplier_id: &str) -> Result<(), HookError> {
        log::trace!("Hooks::delete_supplier( {:?} ) called.", supplier_id);

        self.client
            .post(&self.endpoints.supplier_delete)
            .json(&json!({ "supplierid": supplier_id }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HookError::from(e).annotate("Deletion rejected"))?;

        Ok(())
    }

    /// Persist a named baseline threshold set.
    pub async fn save_baseline(
        &self,
        config: &crate::baseline::BaselineConfig,
    ) -> Result<(), HookError> {
        log::trace!("Hooks::save_baseline( {:?} ) called.", &config.name);

        self.client
            .post(&self.endpoints.baseline)
            .json(&config.save_payload())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HookError::from(e).annotate("Baseline save rejected"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    #[test]
    fn login_reply_normalization() {
        ensure_logging();

        // The service emits both of these shapes.
        let as_array = json!([{ "supplierid": "2ba035af" }]);
        let as_object = json!({ "supplierid": "2ba035af" });
        assert_eq!(login_id_from_value(as_array).as_deref(), Some("2ba035af"));
        assert_eq!(login_id_from_value(as_object).as_deref(), Some("2ba035af"));

        // Failure shapes.
        assert_eq!(login_id_from_value(json!([])), None);
        assert_eq!(login_id_from_value(json!({ "supplierid": "" })), None);
        assert_eq!(login_id_from_value(json!({ "error": "not found" })), None);
        assert_eq!(login_id_from_value(Value::Null), None);
    }

    #[test]
    fn submission_list_variants() {
        ensure_logging();

        let note = json!({ "message": "Your submissions are still being processed." });
        match submission_list_from_value(note) {
            SubmissionList::Note(m) => {
                assert_eq!(&m, "Your submissions are still being processed.");
            }
            SubmissionList::Reports(v) => panic!("expected note, got {} reports", v.len()),
        }

        let reports = serde_json::to_value(crate::submission::sample_submissions()).unwrap();
        match submission_list_from_value(reports) {
            SubmissionList::Reports(v) => assert_eq!(v.len(), 2),
            SubmissionList::Note(m) => panic!("expected reports, got note {:?}", m),
        }

        // Junk degrades to an empty list, not a crash.
        match submission_list_from_value(json!(42)) {
            SubmissionList::Reports(v) => assert!(v.is_empty()),
            SubmissionList::Note(m) => panic!("expected empty reports, got note {:?}", m),
        }
    }

    #[test]
    fn grading_reply_shapes() {
        ensure_logging();

        let single = serde_json::to_value(crate::submission::sample_report()).unwrap();
        assert_eq!(reports_from_value(single).unwrap().len(), 1);

        let many = serde_json::to_value(vec![
            crate::submission::sample_report(),
            crate::submission::sample_report(),
        ])
        .unwrap();
        assert_eq!(reports_from_value(many).unwrap().len(), 2);

        assert!(reports_from_value(json!({ "nope": true })).is_err());
    }

    #[test]
    fn password_digest_is_sha256_hex() {
        ensure_logging();
        assert_eq!(
            password_digest("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        // Deterministic, as the endpoint contract requires.
        assert_eq!(password_digest("hunter2"), password_digest("hunter2"));
    }
}
