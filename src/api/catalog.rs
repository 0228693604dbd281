//! Catalogue resources: components and assembled PCs

use anyhow::{Context, Result};

use super::client::PortalClient;
use crate::models::{Component, Page, Pc};

/// List catalogue components (prints to stdout).
pub async fn list_components(page: u32, size: u32, category: Option<String>) -> Result<()> {
    let client = PortalClient::new().await?;

    let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
    if let Some(category) = category {
        query.push(("category", category));
    }

    let resp = client.get_with_query("/components", &query).await?;
    let components: Page<Component> = resp
        .json()
        .await
        .context("Failed to parse components response")?;

    println!(
        "\nComponents (page {}/{}, {} total):",
        components.number + 1,
        components.total_pages.max(1),
        components.total_elements
    );
    println!("{:-<72}", "");

    if components.content.is_empty() {
        println!("  (no components found)");
        return Ok(());
    }

    for c in &components.content {
        println!(
            "{:<6} {:<28} {:<12} {:>9.2}  stock {}",
            c.id, c.name, c.category, c.price, c.stock
        );
    }

    Ok(())
}

/// Show one component in detail.
pub async fn show_component(id: i64) -> Result<()> {
    let client = PortalClient::new().await?;
    let resp = client.get(&format!("/components/{}", id)).await?;
    let c: Component = resp
        .json()
        .await
        .context("Failed to parse component response")?;

    println!("Component {}", c.id);
    println!("  name:     {}", c.name);
    println!("  category: {}", c.category);
    if let Some(ref brand) = c.brand {
        println!("  brand:    {}", brand);
    }
    println!("  price:    {:.2}", c.price);
    println!("  stock:    {}", c.stock);
    if let Some(supplier) = c.supplier_id {
        println!("  supplier: {}", supplier);
    }

    Ok(())
}

/// List assembled PCs (prints to stdout).
pub async fn list_pcs(page: u32, size: u32) -> Result<()> {
    let client = PortalClient::new().await?;

    let query = vec![("page", page.to_string()), ("size", size.to_string())];
    let resp = client.get_with_query("/pcs", &query).await?;
    let pcs: Page<Pc> = resp.json().await.context("Failed to parse PCs response")?;

    println!(
        "\nAssembled PCs (page {}/{}, {} total):",
        pcs.number + 1,
        pcs.total_pages.max(1),
        pcs.total_elements
    );
    println!("{:-<72}", "");

    if pcs.content.is_empty() {
        println!("  (no PCs found)");
        return Ok(());
    }

    for pc in &pcs.content {
        println!(
            "{:<6} {:<32} {:>9.2}  ({} components)",
            pc.id,
            pc.name,
            pc.price,
            pc.components.len()
        );
    }

    Ok(())
}
