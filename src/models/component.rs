//! Component catalogue entity

use serde::{Deserialize, Serialize};

/// A single computer component (CPU, board, disk, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub brand: Option<String>,
    pub price: f64,
    pub stock: u32,
    pub supplier_id: Option<i64>,
}
