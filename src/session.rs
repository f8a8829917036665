/*!
The client-held session.

The portal keeps no state of its own; who the current user is lives
entirely in three cookies on the browser side:

```text
essence-role             "supplier" | "admin" | absent
essence-supplier-id      opaque identifier | absent
essence-supplier-status  "pending" | "approved" | "rejected" | absent
```

Every request reconstructs a `Session` from its `Cookie` header; every
handler that mutates the session attaches the result of
[`Session::cookie_headers`] to whatever response it returns. An absent
status cookie means `Pending`.
*/
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

pub const ROLE_COOKIE: &str = "essence-role";
pub const SUPPLIER_ID_COOKIE: &str = "essence-supplier-id";
pub const STATUS_COOKIE: &str = "essence-supplier-status";

pub const SUPPLIER_DASHBOARD_PATH: &str = "/supplier-dashboard";
pub const ADMIN_DASHBOARD_PATH: &str = "/admin-dashboard";
pub const AUTH_PATH: &str = "/auth";

/// Identifier substituted when a supplier-scoped operation runs with no
/// identifier in the session. The remote end treats it as "unknown
/// supplier"; the operation proceeds rather than blocking.
pub const PLACEHOLDER_SUPPLIER_ID: &str = "placeholder-id";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Supplier,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            Role::Supplier => "supplier",
            Role::Admin => "admin",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supplier" => Ok(Role::Supplier),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("{:?} is not a valid role.", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SupplierStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for SupplierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            SupplierStatus::Pending => "pending",
            SupplierStatus::Approved => "approved",
            SupplierStatus::Rejected => "rejected",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for SupplierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SupplierStatus::Pending),
            "approved" => Ok(SupplierStatus::Approved),
            "rejected" => Ok(SupplierStatus::Rejected),
            _ => Err(format!("{:?} is not a valid supplier status.", s)),
        }
    }
}

/**
The single authority for "who is the current user" within one request.

None of its operations can fail; a corrupt or unexpected persisted value
reads back as the unauthenticated state rather than raising. Role
transitions only ever pass through the unauthenticated state: sign-out is
the sole exit from either role.
*/
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    role: Option<Role>,
    supplier_id: Option<String>,
    status: SupplierStatus,
}

/// Yield `(name, value)` for each cookie in a `Cookie` header value.
fn split_cookie_str(s: &str) -> impl Iterator<Item = (&str, &str)> {
    s.split(';').filter_map(|chunk| {
        let (name, value) = chunk.split_once('=')?;
        Some((name.trim(), value.trim()))
    })
}

impl Session {
    /// Reconstruct the session from a request's headers.
    ///
    /// Missing or unparseable cookies fall back to the empty session
    /// field by field; this never errors.
    pub fn from_cookie_header(headers: &HeaderMap) -> Session {
        let mut session = Session::default();

        for value in headers.get_all(header::COOKIE).iter() {
            let value = match value.to_str() {
                Ok(s) => s,
                Err(_) => {
                    log::warn!("Cookie header undecodable; ignoring.");
                    continue;
                }
            };

            for (name, value) in split_cookie_str(value) {
                match name {
                    ROLE_COOKIE => match value.parse() {
                        Ok(role) => {
                            session.role = Some(role);
                        }
                        Err(e) => {
                            log::warn!("Persisted role unusable ({}); treating as signed out.", &e);
                        }
                    },
                    SUPPLIER_ID_COOKIE => {
                        if !value.is_empty() {
                            session.supplier_id = Some(value.to_owned());
                        }
                    }
                    STATUS_COOKIE => match value.parse() {
                        Ok(status) => {
                            session.status = status;
                        }
                        Err(e) => {
                            log::warn!("Persisted status unusable ({}); defaulting to pending.", &e);
                        }
                    },
                    _ => {}
                }
            }
        }

        session
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn supplier_id(&self) -> Option<&str> {
        self.supplier_id.as_deref()
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    /// The supplier identifier, or the documented placeholder when the
    /// session has none.
    pub fn supplier_id_or_placeholder(&self) -> &str {
        match self.supplier_id.as_deref() {
            Some(id) => id,
            None => {
                log::warn!(
                    "No supplier id in session; substituting {:?}.",
                    PLACEHOLDER_SUPPLIER_ID
                );
                PLACEHOLDER_SUPPLIER_ID
            }
        }
    }

    /// Passing `None` clears the persisted role.
    pub fn set_role(&mut self, role: Option<Role>) {
        self.role = role;
    }

    pub fn set_supplier_id(&mut self, id: Option<String>) {
        self.supplier_id = id;
    }

    pub fn set_supplier_status(&mut self, status: SupplierStatus) {
        self.status = status;
    }

    /// Route a user with this session's role lands on. Total over the
    /// three role states; no side effects.
    pub fn dashboard_path(&self) -> &'static str {
        match self.role {
            Some(Role::Supplier) => SUPPLIER_DASHBOARD_PATH,
            Some(Role::Admin) => ADMIN_DASHBOARD_PATH,
            None => AUTH_PATH,
        }
    }

    /// Clear role, supplier id, and status. Idempotent; signing out an
    /// already-empty session is a no-op with the same end state.
    pub fn sign_out(&mut self) {
        self.role = None;
        self.supplier_id = None;
        self.status = SupplierStatus::default();
    }

    /// The persistence side of every mutation: one `Set-Cookie` header
    /// per session field. Live fields are written, cleared fields are
    /// expired. `Pending` status is represented by absence, so the
    /// cookies of a fresh sign-out all expire.
    pub fn cookie_headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers: Vec<(HeaderName, HeaderValue)> = Vec::with_capacity(3);

        let role = match self.role {
            Some(role) => set_cookie(ROLE_COOKIE, &role.to_string()),
            None => clear_cookie(ROLE_COOKIE),
        };
        if let Some(v) = role {
            headers.push((header::SET_COOKIE, v));
        }

        let id = match self.supplier_id.as_deref() {
            Some(id) => set_cookie(SUPPLIER_ID_COOKIE, id),
            None => clear_cookie(SUPPLIER_ID_COOKIE),
        };
        if let Some(v) = id {
            headers.push((header::SET_COOKIE, v));
        }

        let status = match self.status {
            SupplierStatus::Pending => clear_cookie(STATUS_COOKIE),
            status => set_cookie(STATUS_COOKIE, &status.to_string()),
        };
        if let Some(v) = status {
            headers.push((header::SET_COOKIE, v));
        }

        headers
    }
}

fn set_cookie(name: &str, value: &str) -> Option<HeaderValue> {
    let text = format!("{}={}; Path=/; SameSite=Lax", name, value);
    match HeaderValue::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            // A malformed value loses its own cookie, nothing else.
            log::error!("Cookie value {:?} unwritable: {}", &text, &e);
            None
        }
    }
}

fn clear_cookie(name: &str) -> Option<HeaderValue> {
    let text = format!("{}=; Path=/; Max-Age=0", name);
    match HeaderValue::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            log::error!("Cookie expiry for {:?} unwritable: {}", name, &e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    /// Pretend the browser sent back exactly what `session` persisted.
    fn round_trip(session: &Session) -> Session {
        let mut headers = HeaderMap::new();
        let mut jar: Vec<String> = Vec::new();

        for (_, value) in session.cookie_headers() {
            let value = value.to_str().unwrap();
            let cookie = value.split(';').next().unwrap();
            // A Max-Age=0 cookie never comes back.
            if !value.contains("Max-Age=0") {
                jar.push(cookie.to_owned());
            }
        }

        if !jar.is_empty() {
            headers.insert(
                header::COOKIE,
                HeaderValue::from_str(&jar.join("; ")).unwrap(),
            );
        }

        Session::from_cookie_header(&headers)
    }

    #[test]
    fn dashboard_paths() {
        ensure_logging();
        let mut session = Session::default();

        assert_eq!(session.dashboard_path(), AUTH_PATH);
        session.set_role(Some(Role::Supplier));
        assert_eq!(session.dashboard_path(), SUPPLIER_DASHBOARD_PATH);
        assert_eq!(session.dashboard_path(), SUPPLIER_DASHBOARD_PATH);
        session.set_role(Some(Role::Admin));
        assert_eq!(session.dashboard_path(), ADMIN_DASHBOARD_PATH);
        session.set_role(None);
        assert_eq!(session.dashboard_path(), AUTH_PATH);
    }

    #[test]
    fn sign_out_clears_everything() {
        ensure_logging();
        let mut session = Session::default();
        session.set_role(Some(Role::Supplier));
        session.set_supplier_id(Some("2ba035af".to_owned()));
        session.set_supplier_status(SupplierStatus::Approved);

        session.sign_out();
        assert_eq!(session, Session::default());

        // Every persisted entry should be an expiry.
        for (_, value) in session.cookie_headers() {
            assert!(value.to_str().unwrap().contains("Max-Age=0"));
        }

        // Idempotent.
        session.sign_out();
        assert_eq!(session, Session::default());
    }

    #[test]
    fn supplier_id_set_and_clear() {
        ensure_logging();
        let mut session = Session::default();

        session.set_supplier_id(Some("439ba9f0".to_owned()));
        assert_eq!(session.supplier_id(), Some("439ba9f0"));
        session.set_supplier_id(None);
        assert_eq!(session.supplier_id(), None);
        assert_eq!(session.supplier_id_or_placeholder(), PLACEHOLDER_SUPPLIER_ID);
    }

    #[test]
    fn cookie_round_trip() {
        ensure_logging();
        let mut session = Session::default();
        session.set_role(Some(Role::Supplier));
        session.set_supplier_id(Some("32a5f1d3".to_owned()));
        session.set_supplier_status(SupplierStatus::Approved);

        assert_eq!(round_trip(&session), session);

        // Restart with role only: status reads back as pending.
        let mut role_only = Session::default();
        role_only.set_role(Some(Role::Supplier));
        let restored = round_trip(&role_only);
        assert_eq!(restored.role(), Some(Role::Supplier));
        assert_eq!(restored.status(), SupplierStatus::Pending);
    }

    #[test]
    fn admin_select_then_sign_out() {
        ensure_logging();
        let mut session = Session::default();

        session.set_role(Some(Role::Admin));
        assert_eq!(session.dashboard_path(), ADMIN_DASHBOARD_PATH);

        session.sign_out();
        assert_eq!(session.role(), None);
        assert_eq!(session.dashboard_path(), AUTH_PATH);
    }

    #[test]
    fn registration_without_identifier() {
        ensure_logging();
        let mut session = Session::default();

        // The registration endpoint returns no identifier; the role is
        // still set. Supplier-scoped calls then run on the placeholder.
        session.set_role(Some(Role::Supplier));
        assert_eq!(session.supplier_id(), None);
        assert_eq!(session.supplier_id_or_placeholder(), PLACEHOLDER_SUPPLIER_ID);
        assert_eq!(session.dashboard_path(), SUPPLIER_DASHBOARD_PATH);
    }

    #[test]
    fn corrupt_cookies_fall_back() {
        ensure_logging();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static(
                "essence-role=superuser; essence-supplier-status=weird; essence-supplier-id=abc",
            ),
        );

        let session = Session::from_cookie_header(&headers);
        assert_eq!(session.role(), None);
        assert_eq!(session.status(), SupplierStatus::Pending);
        assert_eq!(session.supplier_id(), Some("abc"));
    }
}
