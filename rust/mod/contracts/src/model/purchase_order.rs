use amc_core::PageParams;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Purchase order workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoStatus {
    Draft,
    Submitted,
    Approved,
    Received,
    Cancelled,
}

impl Default for PoStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PoStatus {
    pub const ALL: [PoStatus; 5] = [
        PoStatus::Draft,
        PoStatus::Submitted,
        PoStatus::Approved,
        PoStatus::Received,
        PoStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoStatus::Draft => "draft",
            PoStatus::Submitted => "submitted",
            PoStatus::Approved => "approved",
            PoStatus::Received => "received",
            PoStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

/// Purchase order header as shown in lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrderSummary {
    pub id: i64,

    /// Business key, unique across purchase orders.
    pub po_number: String,

    /// Contract this order is raised against, if any.
    #[serde(default)]
    pub contract_id: Option<i64>,

    pub vendor_name: String,

    pub order_date: NaiveDate,

    pub status: PoStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Sum of item amounts.
    pub total_amount: f64,

    pub item_count: i64,

    #[serde(default)]
    pub created_by: Option<i64>,

    pub created_at: String,
    pub updated_at: String,
}

/// Purchase order with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrder {
    #[serde(flatten)]
    pub header: PurchaseOrderSummary,
    pub items: Vec<PoItem>,
}

/// One line of a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoItem {
    pub id: i64,
    pub purchase_order_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: f64,
    /// `quantity * unit_price`, rounded to cents.
    pub amount: f64,
}

/// Line item as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoItemInput {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

/// Body of `POST /purchase-orders` and `PUT /purchase-orders/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderInput {
    #[serde(default)]
    pub po_number: String,
    #[serde(default)]
    pub contract_id: Option<i64>,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<PoItemInput>,
}

/// `GET /purchase-orders` and `GET /purchase-orders/export` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    /// Substring match on PO number or vendor.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contract_id: Option<i64>,
}

impl PurchaseOrderQuery {
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
    fn test_detail_flattens_header() {
        let po = PurchaseOrder {
            header: PurchaseOrderSummary {
                id: 7,
                po_number: "PO-7".into(),
                contract_id: None,
                vendor_name: "Acme".into(),
                order_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                status: PoStatus::Draft,
                notes: None,
                total_amount: 20.0,
                item_count: 1,
                created_by: None,
                created_at: String::new(),
                updated_at: String::new(),
            },
            items: vec![PoItem {
                id: 1,
                purchase_order_id: 7,
                description: "Filter".into(),
                quantity: 2,
                unit_price: 10.0,
                amount: 20.0,
            }],
        };
        let v = serde_json::to_value(&po).unwrap();
        assert_eq!(v["po_number"], "PO-7");
        assert_eq!(v["status"], "draft");
        assert_eq!(v["items"][0]["amount"], 20.0);
        assert!(v.get("header").is_none());
    }
}
