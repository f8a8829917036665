/*!
Interoperation between the browser and the portal.

(Not the portal and the webhook services; that's covered by `hooks`.)
*/
use std::fmt::Debug;
use std::path::Path;

use axum::{
    http::header::{HeaderName, HeaderValue},
    http::{Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::json;

use crate::session::{Role, Session, AUTH_PATH};

pub mod admin;
pub mod auth;
pub mod supplier;

static TEMPLATES: OnceCell<Handlebars> = OnceCell::new();

static HTML_500: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>essence | Error</title>
<link rel="stylesheet" href="/static/essence.css">
</head>
<body>
<h1>Internal Server Error</h1>
<p>(Error 500)</p>
<p>Something went wrong on our end. No further or more
helpful information is available about the problem.</p>
</body>
</html>"#;

static TEXT_500: &str = "An internal error occurred; an appropriate response was inconstructable.";

pub trait AddHeaders: IntoResponse + Sized {
    fn add_headers(self, mut new_headers: Vec<(HeaderName, HeaderValue)>) -> Response {
        let mut r = self.into_response();
        let r_headers = r.headers_mut();
        for (name, value) in new_headers.drain(..) {
            r_headers.append(name, value);
        }

        r
    }
}

impl<T: IntoResponse + Sized> AddHeaders for T {}

/**
Initializes the resources used in this module. This function should be
called before any functionality of this module or any of its submodules
is used.

Currently the only thing that happens here is loading the templates used
by `serve_template()`, which will panic unless `init()` has been called
first.

The argument is the path to the directory where the templates used by
`serve_template()` can be found.
*/
pub fn init<P: AsRef<Path>>(template_dir: P) -> Result<(), String> {
    if TEMPLATES.get().is_some() {
        log::warn!("Templates directory already initialized; ignoring.");
        return Ok(());
    }

    let template_dir = template_dir.as_ref();

    let mut h = Handlebars::new();
    #[cfg(debug_assertions)]
    h.set_dev_mode(true);
    h.register_templates_directory(".html", template_dir)
        .map_err(|e| {
            format!(
                "Error registering templates directory {}: {}",
                template_dir.display(),
                &e
            )
        })?;

    TEMPLATES.set(h).map_err(|old_h| {
        let mut estr = String::from("Templates directory already registered w/templates:");
        for template_name in old_h.get_templates().keys() {
            estr.push('\n');
            estr.push_str(template_name.as_str());
        }
        estr
    })?;

    Ok(())
}

/**
Return an HTML response in the case of an unrecoverable* error.

(*"Unrecoverable" from the perspective of fielding the current request,
not from the perspective of the program crashing.)
*/
pub fn html_500() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(HTML_500)).into_response()
}

pub fn text_500(text: Option<String>) -> Response {
    match text {
        Some(text) => (StatusCode::INTERNAL_SERVER_ERROR, text).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, TEXT_500.to_owned()).into_response(),
    }
}

pub fn serve_template<S>(
    code: StatusCode,
    template_name: &str,
    data: &S,
    addl_headers: Vec<(HeaderName, HeaderValue)>,
) -> Response
where
    S: Serialize + Debug,
{
    log::trace!("serve_template( {}, {:?}, ... ) called.", &code, template_name);

    match TEMPLATES.get().unwrap().render(template_name, data) {
        Ok(response_body) => (code, Html(response_body)).add_headers(addl_headers),
        Err(e) => {
            log::error!(
                "Error rendering template {:?} with data {:?}:\n{}",
                template_name,
                data,
                &e
            );
            html_500()
        }
    }
}

pub fn respond_bad_request(msg: String) -> Response {
    log::trace!("respond_bad_request( {:?} ) called.", &msg);

    (StatusCode::BAD_REQUEST, msg).into_response()
}

/// See-other redirect, with any session cookies the caller needs to
/// persist riding along.
pub fn redirect_to(path: &'static str, addl_headers: Vec<(HeaderName, HeaderValue)>) -> Response {
    log::trace!("redirect_to( {:?} ) called.", path);

    (
        StatusCode::SEE_OTHER,
        [(axum::http::header::LOCATION, HeaderValue::from_static(path))],
    )
        .add_headers(addl_headers)
}

/// Middleware for the supplier page group: anyone without the supplier
/// role is sent back to the auth entry point. Holding a supplier id or
/// an approved status is deliberately not required.
pub async fn supplier_gate<B>(req: Request<B>, next: Next<B>) -> Response {
    let session = Session::from_cookie_header(req.headers());

    match session.role() {
        Some(Role::Supplier) => next.run(req).await,
        other => {
            log::trace!(
                "Unauthenticated request for {} (role {:?}); redirecting.",
                req.uri().path(),
                &other
            );
            redirect_to(AUTH_PATH, vec![])
        }
    }
}

/// Middleware for the admin page group.
pub async fn admin_gate<B>(req: Request<B>, next: Next<B>) -> Response {
    let session = Session::from_cookie_header(req.headers());

    match session.role() {
        Some(Role::Admin) => next.run(req).await,
        other => {
            log::trace!(
                "Unauthenticated request for {} (role {:?}); redirecting.",
                req.uri().path(),
                &other
            );
            redirect_to(AUTH_PATH, vec![])
        }
    }
}

/// The marketing landing page.
pub async fn landing() -> Response {
    serve_template(StatusCode::OK, "index", &json!({}), vec![])
}

/// Fallback for every route the router doesn't know.
pub async fn not_found() -> Response {
    serve_template(StatusCode::NOT_FOUND, "not_found", &json!({}), vec![])
}
