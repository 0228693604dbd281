//! Quotation resource

use anyhow::{Context, Result};

use super::client::PortalClient;
use crate::models::{Page, Quotation};

/// List quotations, optionally filtered by status (prints to stdout).
pub async fn list_quotations(page: u32, size: u32, status: Option<String>) -> Result<()> {
    let client = PortalClient::new().await?;

    let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
    if let Some(status) = status {
        query.push(("status", status.to_uppercase()));
    }

    let resp = client.get_with_query("/quotations", &query).await?;
    let quotations: Page<Quotation> = resp
        .json()
        .await
        .context("Failed to parse quotations response")?;

    println!(
        "\nQuotations (page {}/{}, {} total):",
        quotations.number + 1,
        quotations.total_pages.max(1),
        quotations.total_elements
    );
    println!("{:-<72}", "");

    if quotations.content.is_empty() {
        println!("  (no quotations found)");
        return Ok(());
    }

    for q in &quotations.content {
        let created = q
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<26} {:<10} {:>10.2}  {}",
            q.id,
            q.customer_name,
            q.status.as_str(),
            q.total,
            created
        );
    }

    Ok(())
}
