/*!
Supplier roster records, as the listing endpoint returns them.
*/
use serde::{Deserialize, Deserializer};

use crate::session::SupplierStatus;

/// The roster service writes statuses with assorted capitalization;
/// anything unrecognizable reads as pending rather than dropping the
/// record.
fn lenient_status<'de, D>(deserializer: D) -> Result<SupplierStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().parse() {
        Ok(status) => Ok(status),
        Err(e) => {
            log::warn!("{} Defaulting to pending.", &e);
            Ok(SupplierStatus::default())
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub company_name: String,
    pub email: String,
    pub notification_email: String,
    #[serde(deserialize_with = "lenient_status", default)]
    pub status: SupplierStatus,
    pub created_at: String,
}

/// The roster the admin view falls back to when the listing endpoint
/// has nothing usable.
pub fn sample_suppliers() -> Vec<Supplier> {
    let records = [
        (
            "2ba035af-e4ad-4a7b-aaca-cd318b7c8647",
            "LOL",
            "lol@gmail.com",
            "2025-03-07T15:25:50.84047",
        ),
        (
            "32a5f1d3-003b-4955-8a81-9f90406136a9",
            "ABC",
            "abc@gmail.com",
            "2025-03-07T15:18:47.899904",
        ),
        (
            "439ba9f0-6184-49cf-97e1-4d872a0799da",
            "Reliance",
            "reliance@gmail.com",
            "2025-03-07T16:54:27.934076",
        ),
        (
            "43bf87df-c7b7-407f-9680-7e8a330e9b44",
            "AMC",
            "amc@gmail.com",
            "2025-03-07T16:47:29.680506",
        ),
        (
            "5c144d9f-a1be-4d66-97c6-dcb978a26bb4",
            "Compannyyy",
            "company@company.com",
            "2025-03-07T20:02:03.891065",
        ),
        (
            "97afef35-53fd-4bc5-8f37-806a9a53c4cc",
            "RANDOM",
            "random@gmail.com",
            "2025-03-10T09:23:43.308399",
        ),
    ];

    records
        .iter()
        .map(|&(id, company, email, created)| Supplier {
            id: id.to_owned(),
            company_name: company.to_owned(),
            email: email.to_owned(),
            notification_email: email.to_owned(),
            status: SupplierStatus::Approved,
            created_at: created.to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    #[test]
    fn roster_statuses_read_leniently() {
        ensure_logging();

        let text = r#"[
            {
                "id": "506dbd69-177a-4f0b-b210-ae9b7259d1da",
                "company_name": "Danish",
                "email": "danish@example.com",
                "notification_email": "danish@example.com",
                "status": "Approved",
                "created_at": "2025-03-10T09:51:09.384387"
            },
            {
                "id": "36a7d8c8-3230-40af-b2fe-87c8d911c8c5",
                "company_name": "ABCDE",
                "email": "abcde@example.com",
                "notification_email": "abcde@example.com",
                "status": "UNDER-REVIEW",
                "created_at": "2025-03-10T12:49:11.829208"
            }
        ]"#;

        let roster: Vec<Supplier> = serde_json::from_str(text).unwrap();
        assert_eq!(roster[0].status, SupplierStatus::Approved);
        assert_eq!(roster[1].status, SupplierStatus::Pending);
    }
}
