//! Promotion entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-boxed discount campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: i64,
    pub name: String,
    pub discount_percent: f64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active: bool,
}
