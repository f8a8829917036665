/*!
Baseline quality configuration: the named threshold sets the grading
service judges batches against.
*/
use serde_json::{json, Value};

use crate::submission::Metrics;

#[derive(Clone, Debug, PartialEq)]
pub struct BaselineConfig {
    pub name: String,
    pub base: Metrics,
    pub thresholds: Metrics,
}

impl std::default::Default for BaselineConfig {
    fn default() -> Self {
        Self {
            name: "Spring 2023 Detergent".to_owned(),
            base: Metrics {
                detergency: 320.0,
                foaming: 250.0,
                biodegradability: 500.0,
                purity: 40.0,
            },
            thresholds: Metrics {
                detergency: 500.0,
                foaming: 300.0,
                biodegradability: 600.0,
                purity: 60.0,
            },
        }
    }
}

impl BaselineConfig {
    /// What the configuration endpoint is sent. The base values are
    /// reference display values only; the service consumes the name and
    /// the pass/fail thresholds.
    pub fn save_payload(&self) -> Value {
        json!({
            "name": &self.name,
            "thresholds": {
                "detergency": self.thresholds.detergency,
                "foaming": self.thresholds.foaming,
                "biodegradability": self.thresholds.biodegradability,
                "purity": self.thresholds.purity,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    #[test]
    fn save_payload_shape() {
        ensure_logging();
        let cfg = BaselineConfig::default();
        let payload = cfg.save_payload();

        assert_eq!(payload["name"], "Spring 2023 Detergent");
        assert_eq!(payload["thresholds"]["biodegradability"], 600.0);
        assert!(payload.get("base").is_none());
        assert_eq!(payload["thresholds"].as_object().unwrap().len(), 4);
    }
}
