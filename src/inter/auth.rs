/*!
The authentication entry point: role selection, login, and supplier
registration.

Success in any flow here is the only thing that ever moves a session
out of the unauthenticated state, and sign-out is the only thing that
moves one back.
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::header::HeaderMap,
    http::StatusCode,
    response::Response,
    Form,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::Glob;
use crate::hooks::{password_digest, Registration};
use crate::session::{Role, Session, AUTH_PATH, SUPPLIER_DASHBOARD_PATH};
use super::*;

/// Role selection page.
pub async fn entry() -> Response {
    serve_template(StatusCode::OK, "auth_entry", &json!({}), vec![])
}

#[derive(Debug, Deserialize)]
pub struct RoleChoice {
    pub role: String,
}

/**
Role selection submit.

Choosing the admin dashboard authenticates immediately (the admin side
has no credential flow); choosing supplier hands off to registration.
Whatever session arrived is signed out first, so a role change always
passes through the unauthenticated state.
*/
pub async fn choose_role(headers: HeaderMap, Form(form): Form<RoleChoice>) -> Response {
    log::trace!("choose_role( {:?} ) called.", &form);

    match form.role.as_str() {
        "admin" => {
            let mut session = Session::from_cookie_header(&headers);
            session.sign_out();
            session.set_role(Some(Role::Admin));
            redirect_to(crate::session::ADMIN_DASHBOARD_PATH, session.cookie_headers())
        }
        "supplier" => redirect_to("/auth/register", vec![]),
        x => respond_bad_request(format!("{:?} is not a selectable dashboard.", x)),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

fn login_page(code: StatusCode, error: Option<&str>) -> Response {
    serve_template(code, "login", &json!({ "error": error }), vec![])
}

pub async fn login_form() -> Response {
    login_page(StatusCode::OK, None)
}

pub async fn login(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    Form(form): Form<LoginData>,
) -> Response {
    log::trace!("login( {:?}, [ password ] ) called.", &form.email);

    if form.email.trim().is_empty() || form.password.is_empty() {
        return login_page(StatusCode::BAD_REQUEST, Some("Please fill out all fields."));
    }

    let supplier_id = match glob.hooks.login(form.email.trim(), &form.password).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            return login_page(StatusCode::UNAUTHORIZED, Some("Invalid email or password."));
        }
        Err(e) => {
            log::error!("Hooks::login( {:?} ) returned error: {}", &form.email, &e);
            return login_page(
                StatusCode::BAD_GATEWAY,
                Some("An unexpected error occurred during login. Please try again."),
            );
        }
    };

    // Through the unauthenticated state first; a lingering admin
    // session doesn't carry over.
    let mut session = Session::from_cookie_header(&headers);
    session.sign_out();
    session.set_supplier_id(Some(supplier_id));
    session.set_role(Some(Role::Supplier));

    redirect_to(SUPPLIER_DASHBOARD_PATH, session.cookie_headers())
}

#[derive(Debug, Deserialize)]
pub struct RegistrationData {
    pub company_name: String,
    pub email: String,
    pub notification_email: String,
    pub password: String,
    pub confirm_password: String,
}

fn register_page(code: StatusCode, error: Option<&str>) -> Response {
    serve_template(code, "register", &json!({ "error": error }), vec![])
}

pub async fn register_form() -> Response {
    register_page(StatusCode::OK, None)
}

pub async fn register(
    Extension(glob): Extension<Arc<Glob>>,
    headers: HeaderMap,
    Form(form): Form<RegistrationData>,
) -> Response {
    log::trace!(
        "register( {:?}, {:?} ) called.",
        &form.company_name,
        &form.email
    );

    if form.company_name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.notification_email.trim().is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return register_page(StatusCode::BAD_REQUEST, Some("Please fill out all fields."));
    }

    if form.password != form.confirm_password {
        return register_page(StatusCode::BAD_REQUEST, Some("Passwords do not match."));
    }

    let registration = Registration {
        company_name: form.company_name.trim().to_owned(),
        email: form.email.trim().to_owned(),
        notification_email: form.notification_email.trim().to_owned(),
        password_hash: password_digest(&form.password),
    };

    if let Err(e) = glob.hooks.register(&registration).await {
        log::error!(
            "Hooks::register( {:?} ) returned error: {}",
            &registration.email,
            &e
        );
        return register_page(
            StatusCode::BAD_GATEWAY,
            Some("An unexpected error occurred during registration. Please try again."),
        );
    }

    // The registration endpoint returns no identifier; the session gets
    // the supplier role anyway, and supplier-scoped calls will run on
    // the placeholder until a login supplies the real id.
    let mut session = Session::from_cookie_header(&headers);
    session.sign_out();
    session.set_role(Some(Role::Supplier));

    redirect_to(SUPPLIER_DASHBOARD_PATH, session.cookie_headers())
}

/// Clears the session. Idempotent; signing out signed-out is fine.
pub async fn sign_out(headers: HeaderMap) -> Response {
    log::trace!("sign_out() called.");

    let mut session = Session::from_cookie_header(&headers);
    session.sign_out();

    redirect_to(AUTH_PATH, session.cookie_headers())
}
