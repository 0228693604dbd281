//! Data models for the portal resources

mod component;
mod order;
mod pc;
mod promotion;
mod quotation;
mod supplier;

pub use component::Component;
pub use order::{Order, OrderStatus};
pub use pc::Pc;
pub use promotion::Promotion;
pub use quotation::{Quotation, QuotationStatus};
pub use supplier::Supplier;

use serde::Deserialize;

/// Paginated envelope returned by the portal's list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}
