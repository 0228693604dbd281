//! Order and supplier resources

use anyhow::{Context, Result};

use super::client::PortalClient;
use crate::models::{Order, Page, Supplier};

/// List purchase orders, optionally filtered by status (prints to stdout).
pub async fn list_orders(page: u32, size: u32, status: Option<String>) -> Result<()> {
    let client = PortalClient::new().await?;

    let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
    if let Some(status) = status {
        query.push(("status", status.to_uppercase()));
    }

    let resp = client.get_with_query("/orders", &query).await?;
    let orders: Page<Order> = resp
        .json()
        .await
        .context("Failed to parse orders response")?;

    println!(
        "\nOrders (page {}/{}, {} total):",
        orders.number + 1,
        orders.total_pages.max(1),
        orders.total_elements
    );
    println!("{:-<72}", "");

    if orders.content.is_empty() {
        println!("  (no orders found)");
        return Ok(());
    }

    for o in &orders.content {
        let quotation = o
            .quotation_id
            .map(|id| format!("Q{}", id))
            .unwrap_or_else(|| "-".to_string());
        let created = o
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<8} {:<10} {:>10.2}  {}",
            o.id,
            quotation,
            o.status.as_str(),
            o.total,
            created
        );
    }

    Ok(())
}

/// List suppliers (prints to stdout).
pub async fn list_suppliers(page: u32, size: u32) -> Result<()> {
    let client = PortalClient::new().await?;

    let query = vec![("page", page.to_string()), ("size", size.to_string())];
    let resp = client.get_with_query("/suppliers", &query).await?;
    let suppliers: Page<Supplier> = resp
        .json()
        .await
        .context("Failed to parse suppliers response")?;

    println!(
        "\nSuppliers (page {}/{}, {} total):",
        suppliers.number + 1,
        suppliers.total_pages.max(1),
        suppliers.total_elements
    );
    println!("{:-<72}", "");

    if suppliers.content.is_empty() {
        println!("  (no suppliers found)");
        return Ok(());
    }

    for s in &suppliers.content {
        println!(
            "{:<6} {:<26} {:<24} {:<14} {}",
            s.id,
            s.name,
            s.email.as_deref().unwrap_or("-"),
            s.phone.as_deref().unwrap_or("-"),
            s.city.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
