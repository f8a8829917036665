/*!
Subcrate for interoperation with admin users.
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    Form,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::baseline::BaselineConfig;
use crate::config::Glob;
use crate::session::{SupplierStatus, ADMIN_DASHBOARD_PATH};
use crate::submission::{display_timestamp, Metrics};
use crate::supplier::{sample_suppliers, Supplier};
use super::*;

const SUPPLIER_LIST_PATH: &str = "/admin-dashboard/suppliers";

fn dashboard_data(suppliers: Option<Vec<Value>>, sample: bool, notice: Option<&str>) -> Value {
    json!({
        "suppliers": suppliers,
        "sample": sample,
        "notice": notice,
    })
}

fn supplier_row(s: &Supplier) -> Value {
    json!({
        "id": &s.id,
        "company_name": &s.company_name,
        "email": &s.email,
        "notification_email": &s.notification_email,
        "status": s.status.to_string(),
        "created": display_timestamp(&s.created_at),
    })
}

pub async fn dashboard() -> Response {
    log::trace!("admin::dashboard() called.");

    serve_template(
        StatusCode::OK,
        "admin_dashboard",
        &dashboard_data(None, false, None),
        vec![],
    )
}

/**
Dashboard with the supplier roster filled in from the listing endpoint.

Every listed account is presented as pending: the roster is loaded for
review, and approval/rejection decisions are recorded through the
status endpoint. When the listing endpoint has nothing usable the
built-in sample roster is shown, labeled as sample data.
*/
pub async fn dashboard_suppliers(Extension(glob): Extension<Arc<Glob>>) -> Response {
    log::trace!("admin::dashboard_suppliers() called.");

    let (mut roster, sample, notice) = match glob.hooks.suppliers().await {
        Ok(roster) if !roster.is_empty() => (roster, false, None),
        Ok(_) => (
            sample_suppliers(),
            true,
            Some("The listing service returned no suppliers. Displaying sample data."),
        ),
        Err(e) => {
            log::error!("Hooks::suppliers() returned error: {}", &e);
            (
                sample_suppliers(),
                true,
                Some("There was a problem fetching suppliers. Displaying sample data."),
            )
        }
    };

    for s in roster.iter_mut() {
        s.status = SupplierStatus::Pending;
    }
    let rows: Vec<Value> = roster.iter().map(supplier_row).collect();

    serve_template(
        StatusCode::OK,
        "admin_dashboard",
        &dashboard_data(Some(rows), sample, notice),
        vec![],
    )
}

#[derive(Debug, Deserialize)]
pub struct SupplierAction {
    pub supplierid: String,
}

async fn record_decision(
    glob: Arc<Glob>,
    supplier_id: &str,
    status: SupplierStatus,
) -> Response {
    match glob.hooks.set_supplier_status(supplier_id, status).await {
        Ok(()) => redirect_to(SUPPLIER_LIST_PATH, vec![]),
        Err(e) => {
            log::error!(
                "Hooks::set_supplier_status( {:?}, {} ) returned error: {}",
                supplier_id,
                &status,
                &e
            );
            serve_template(
                StatusCode::BAD_GATEWAY,
                "admin_dashboard",
                &dashboard_data(
                    None,
                    false,
                    Some("Could not record the decision. Please try again."),
                ),
                vec![],
            )
        }
    }
}

pub async fn approve(
    Extension(glob): Extension<Arc<Glob>>,
    Form(form): Form<SupplierAction>,
) -> Response {
    log::trace!("admin::approve( {:?} ) called.", &form.supplierid);
    record_decision(glob, &form.supplierid, SupplierStatus::Approved).await
}

pub async fn reject(
    Extension(glob): Extension<Arc<Glob>>,
    Form(form): Form<SupplierAction>,
) -> Response {
    log::trace!("admin::reject( {:?} ) called.", &form.supplierid);
    record_decision(glob, &form.supplierid, SupplierStatus::Rejected).await
}

pub async fn delete(
    Extension(glob): Extension<Arc<Glob>>,
    Form(form): Form<SupplierAction>,
) -> Response {
    log::trace!("admin::delete( {:?} ) called.", &form.supplierid);

    match glob.hooks.delete_supplier(&form.supplierid).await {
        Ok(()) => redirect_to(SUPPLIER_LIST_PATH, vec![]),
        Err(e) => {
            log::error!(
                "Hooks::delete_supplier( {:?} ) returned error: {}",
                &form.supplierid,
                &e
            );
            serve_template(
                StatusCode::BAD_GATEWAY,
                "admin_dashboard",
                &dashboard_data(
                    None,
                    false,
                    Some("Could not delete the supplier. Please try again."),
                ),
                vec![],
            )
        }
    }
}

fn baseline_data(config: &BaselineConfig, error: Option<&str>) -> Value {
    json!({
        "name": &config.name,
        "base": &config.base,
        "thresholds": &config.thresholds,
        "error": error,
    })
}

pub async fn baseline_form() -> Response {
    log::trace!("admin::baseline_form() called.");

    serve_template(
        StatusCode::OK,
        "baseline_config",
        &baseline_data(&BaselineConfig::default(), None),
        vec![],
    )
}

#[derive(Debug, Deserialize)]
pub struct BaselineForm {
    pub name: String,
    pub base_detergency: String,
    pub base_foaming: String,
    pub base_biodegradability: String,
    pub base_purity: String,
    pub threshold_detergency: String,
    pub threshold_foaming: String,
    pub threshold_biodegradability: String,
    pub threshold_purity: String,
    pub active: Option<String>,
}

/// Unparseable metric fields read as zero rather than failing the save.
fn metric_field(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

impl BaselineForm {
    fn into_config(self) -> BaselineConfig {
        BaselineConfig {
            name: self.name,
            base: Metrics {
                detergency: metric_field(&self.base_detergency),
                foaming: metric_field(&self.base_foaming),
                biodegradability: metric_field(&self.base_biodegradability),
                purity: metric_field(&self.base_purity),
            },
            thresholds: Metrics {
                detergency: metric_field(&self.threshold_detergency),
                foaming: metric_field(&self.threshold_foaming),
                biodegradability: metric_field(&self.threshold_biodegradability),
                purity: metric_field(&self.threshold_purity),
            },
        }
    }
}

pub async fn baseline_save(
    Extension(glob): Extension<Arc<Glob>>,
    Form(form): Form<BaselineForm>,
) -> Response {
    log::trace!("admin::baseline_save( {:?} ) called.", &form.name);

    let set_active = form.active.is_some();
    let config = form.into_config();

    match glob.hooks.save_baseline(&config).await {
        Ok(()) => {
            if set_active {
                log::info!("Baseline configuration {:?} set as active.", &config.name);
            }
            redirect_to(ADMIN_DASHBOARD_PATH, vec![])
        }
        Err(e) => {
            log::error!(
                "Hooks::save_baseline( {:?} ) returned error: {}",
                &config.name,
                &e
            );
            serve_template(
                StatusCode::BAD_GATEWAY,
                "baseline_config",
                &baseline_data(&config, Some("Failed to save configuration. Please try again.")),
                vec![],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    use float_cmp::approx_eq;

    #[test]
    fn baseline_form_folds_garbage_to_zero() {
        ensure_logging();

        let form = BaselineForm {
            name: "Autumn 2023 Detergent".to_owned(),
            base_detergency: " 320 ".to_owned(),
            base_foaming: "250".to_owned(),
            base_biodegradability: "five hundred".to_owned(),
            base_purity: "40".to_owned(),
            threshold_detergency: "500".to_owned(),
            threshold_foaming: "".to_owned(),
            threshold_biodegradability: "600".to_owned(),
            threshold_purity: "60".to_owned(),
            active: None,
        };

        let config = form.into_config();
        assert!(approx_eq!(f64, config.base.detergency, 320.0));
        assert!(approx_eq!(f64, config.base.biodegradability, 0.0));
        assert!(approx_eq!(f64, config.thresholds.foaming, 0.0));
        assert!(approx_eq!(f64, config.thresholds.purity, 60.0));
    }
}
