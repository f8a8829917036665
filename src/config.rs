/*!
Structs to hold configuration data and the shared per-process context.
*/
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::hooks::{Endpoints, Hooks};

#[derive(Deserialize)]
struct HookFile {
    login: Option<String>,
    register: Option<String>,
    template: Option<String>,
    grade: Option<String>,
    submissions: Option<String>,
    suppliers: Option<String>,
    supplier_status: Option<String>,
    supplier_delete: Option<String>,
    baseline: Option<String>,
}

#[derive(Deserialize)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    template_dir: Option<String>,
    static_dir: Option<String>,
    hooks: Option<HookFile>,
}

#[derive(Debug)]
pub struct Cfg {
    pub addr: SocketAddr,
    pub template_dir: String,
    pub static_dir: String,
    pub endpoints: Endpoints,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new("0.0.0.0".parse().unwrap(), 8001),
            template_dir: "templates/".to_owned(),
            static_dir: "static/".to_owned(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        let cf: ConfigFile = toml::from_str(&file_contents)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(s) = cf.host {
            c.addr.set_ip(
                s.parse()
                    .map_err(|e| format!("Error parsing {:?} as IP address: {}", &s, &e))?,
            );
        }
        if let Some(n) = cf.port {
            c.addr.set_port(n);
        }
        if let Some(s) = cf.template_dir {
            c.template_dir = s;
        }
        if let Some(s) = cf.static_dir {
            c.static_dir = s;
        }

        if let Some(hf) = cf.hooks {
            if let Some(s) = hf.login {
                c.endpoints.login = s;
            }
            if let Some(s) = hf.register {
                c.endpoints.register = s;
            }
            if let Some(s) = hf.template {
                c.endpoints.template = s;
            }
            if let Some(s) = hf.grade {
                c.endpoints.grade = s;
            }
            if let Some(s) = hf.submissions {
                c.endpoints.submissions = s;
            }
            if let Some(s) = hf.suppliers {
                c.endpoints.suppliers = s;
            }
            if let Some(s) = hf.supplier_status {
                c.endpoints.supplier_status = s;
            }
            if let Some(s) = hf.supplier_delete {
                c.endpoints.supplier_delete = s;
            }
            if let Some(s) = hf.baseline {
                c.endpoints.baseline = s;
            }
        }

        Ok(c)
    }
}

/**
This guy will haul around the shared per-process context and be passed in
an `axum::Extension` to the handlers who need him.

Nothing in here mutates after startup, so he rides in a plain `Arc`.
*/
#[derive(Debug)]
pub struct Glob {
    pub addr: SocketAddr,
    pub static_dir: String,
    pub hooks: Hooks,
}

/// Loads system configuration, registers the view templates, and builds
/// the webhook client.
pub fn load_configuration<P: AsRef<Path>>(path: P) -> Result<Glob, String> {
    let path = path.as_ref();

    let cfg = if path.exists() {
        let cfg = Cfg::from_file(path)?;
        log::info!("Configuration file read:\n{:#?}", &cfg);
        cfg
    } else {
        log::info!(
            "No configuration file at {}; using default configuration.",
            path.display()
        );
        Cfg::default()
    };

    crate::inter::init(&cfg.template_dir)?;

    let hooks = Hooks::new(cfg.endpoints)
        .map_err(|e| format!("Unable to build webhook client: {}", &e))?;

    Ok(Glob {
        addr: cfg.addr,
        static_dir: cfg.static_dir,
        hooks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    #[test]
    fn defaults_overridden_field_by_field() {
        ensure_logging();

        let text = r#"
port = 8080
template_dir = "views/"

[hooks]
login = "https://hooks.example.net/portal/login"
"#;
        let file = std::env::temp_dir().join("essence_cfg_test.toml");
        std::fs::write(&file, text).unwrap();

        let cfg = Cfg::from_file(&file).unwrap();
        let dflt = Cfg::default();

        assert_eq!(cfg.addr.port(), 8080);
        assert_eq!(cfg.addr.ip(), dflt.addr.ip());
        assert_eq!(&cfg.template_dir, "views/");
        assert_eq!(&cfg.static_dir, &dflt.static_dir);
        assert_eq!(&cfg.endpoints.login, "https://hooks.example.net/portal/login");
        assert_eq!(&cfg.endpoints.grade, &dflt.endpoints.grade);

        std::fs::remove_file(&file).unwrap();
    }
}
