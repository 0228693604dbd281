//! API client module for the portal microservices

mod catalog;
pub mod client;
mod orders;
mod promotions;
mod quotations;

use anyhow::Result;

/// List catalogue components
pub async fn list_components(page: u32, size: u32, category: Option<String>) -> Result<()> {
    catalog::list_components(page, size, category).await
}

/// Show one component in detail
pub async fn show_component(id: i64) -> Result<()> {
    catalog::show_component(id).await
}

/// List assembled PCs
pub async fn list_pcs(page: u32, size: u32) -> Result<()> {
    catalog::list_pcs(page, size).await
}

/// List quotations
pub async fn list_quotations(page: u32, size: u32, status: Option<String>) -> Result<()> {
    quotations::list_quotations(page, size, status).await
}

/// List purchase orders
pub async fn list_orders(page: u32, size: u32, status: Option<String>) -> Result<()> {
    orders::list_orders(page, size, status).await
}

/// List suppliers
pub async fn list_suppliers(page: u32, size: u32) -> Result<()> {
    orders::list_suppliers(page, size).await
}

/// List promotions
pub async fn list_promotions(page: u32, size: u32, active_only: bool) -> Result<()> {
    promotions::list_promotions(page, size, active_only).await
}
