//! Assembled PC entity

use serde::{Deserialize, Serialize};

use super::Component;

/// A pre-assembled PC offered in the catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pc {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub components: Vec<Component>,
}
