/*!
Here we go!
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    middleware,
    routing::{get, post},
    Router,
};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use tower_http::services::fs::ServeDir;

use essence::config;
use essence::inter;

const DEFAULT_CONFIG_PATH: &str = "portal.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("essence")
        .build();
    TermLogger::init(
        essence::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto,
    )
    .unwrap();
    log::info!("Logging started.");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let glob = config::load_configuration(&config_path).unwrap();
    let static_dir = glob.static_dir.clone();
    let addr = glob.addr;
    let glob = Arc::new(glob);

    let supplier_pages = Router::new()
        .route("/supplier-dashboard", get(inter::supplier::dashboard))
        .route(
            "/supplier-dashboard/submissions",
            get(inter::supplier::dashboard_submissions),
        )
        .route(
            "/new-submission",
            get(inter::supplier::new_submission_form).post(inter::supplier::upload),
        )
        .route(
            "/new-submission/template",
            get(inter::supplier::template_download),
        )
        .route("/submission-results", get(inter::supplier::results_latest))
        .route(
            "/submission-results/:submission_id",
            get(inter::supplier::results_by_id),
        )
        .route_layer(middleware::from_fn(inter::supplier_gate));

    let admin_pages = Router::new()
        .route("/admin-dashboard", get(inter::admin::dashboard))
        .route(
            "/admin-dashboard/suppliers",
            get(inter::admin::dashboard_suppliers),
        )
        .route("/admin/suppliers/approve", post(inter::admin::approve))
        .route("/admin/suppliers/reject", post(inter::admin::reject))
        .route("/admin/suppliers/delete", post(inter::admin::delete))
        .route(
            "/admin-baseline-config",
            get(inter::admin::baseline_form).post(inter::admin::baseline_save),
        )
        .route_layer(middleware::from_fn(inter::admin_gate));

    let app = Router::new()
        .route("/", get(inter::landing))
        .route("/auth", get(inter::auth::entry))
        .route("/auth/role", post(inter::auth::choose_role))
        .route(
            "/auth/login",
            get(inter::auth::login_form).post(inter::auth::login),
        )
        .route(
            "/auth/register",
            get(inter::auth::register_form).post(inter::auth::register),
        )
        .route("/signout", post(inter::auth::sign_out))
        .merge(supplier_pages)
        .merge(admin_pages)
        .nest_service("/static", ServeDir::new(&static_dir))
        .fallback(inter::not_found)
        .layer(Extension(glob));

    log::info!("Listening on {}", &addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
