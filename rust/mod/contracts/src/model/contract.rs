use amc_core::PageParams;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Contract lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Draft,
    Active,
    Expired,
    Cancelled,
}

impl Default for ContractStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 4] = [
        ContractStatus::Draft,
        ContractStatus::Active,
        ContractStatus::Expired,
        ContractStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Active => "active",
            ContractStatus::Expired => "expired",
            ContractStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

/// Annual maintenance contract with a vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    pub id: i64,

    /// Business key, unique across contracts.
    pub contract_number: String,

    pub title: String,

    pub vendor_name: String,

    /// Asset under maintenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,

    pub start_date: NaiveDate,

    /// Never before `start_date`.
    pub end_date: NaiveDate,

    pub contract_value: f64,

    pub status: ContractStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Id of the user who created the record.
    #[serde(default)]
    pub created_by: Option<i64>,

    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /contracts` and `PUT /contracts/{id}`.
///
/// Dates and status arrive as strings so that malformed values are
/// reported per field instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractInput {
    #[serde(default)]
    pub contract_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub contract_value: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `GET /contracts` and `GET /contracts/export` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    /// Substring match on number, title, vendor or equipment.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Substring match on vendor name only.
    #[serde(default)]
    pub vendor: Option<String>,
    /// Active contracts ending within this many days from today.
    #[serde(default)]
    pub expiring_within_days: Option<i64>,
}

impl ContractQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for st in ContractStatus::ALL {
            assert_eq!(ContractStatus::parse(st.as_str()), Some(st));
        }
        assert_eq!(ContractStatus::parse("Active"), None);
        assert_eq!(ContractStatus::default(), ContractStatus::Active);
    }

    #[test]
    fn test_contract_serializes_dates_as_iso() {
        let c = Contract {
            id: 1,
            contract_number: "AMC-001".into(),
            title: "Chiller upkeep".into(),
            vendor_name: "Acme".into(),
            equipment: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            contract_value: 1200.5,
            status: ContractStatus::Active,
            notes: None,
            created_by: Some(1),
            created_at: "2025-01-01T00:00:00+00:00".into(),
            updated_at: "2025-01-01T00:00:00+00:00".into(),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["start_date"], "2025-01-01");
        assert_eq!(v["status"], "active");
        assert!(v.get("equipment").is_none());
    }
}
