//! Quotation entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quotation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Rejected => "rejected",
        }
    }
}

/// A customer quotation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: i64,
    pub customer_name: String,
    pub status: QuotationStatus,
    pub total: f64,
    pub created_at: Option<DateTime<Utc>>,
}
