//! Promotion resource

use anyhow::{Context, Result};

use super::client::PortalClient;
use crate::models::{Page, Promotion};

/// List promotions, optionally only currently active ones (prints to stdout).
pub async fn list_promotions(page: u32, size: u32, active_only: bool) -> Result<()> {
    let client = PortalClient::new().await?;

    let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
    if active_only {
        query.push(("active", "true".to_string()));
    }

    let resp = client.get_with_query("/promotions", &query).await?;
    let promotions: Page<Promotion> = resp
        .json()
        .await
        .context("Failed to parse promotions response")?;

    println!(
        "\nPromotions (page {}/{}, {} total):",
        promotions.number + 1,
        promotions.total_pages.max(1),
        promotions.total_elements
    );
    println!("{:-<72}", "");

    if promotions.content.is_empty() {
        println!("  (no promotions found)");
        return Ok(());
    }

    for p in &promotions.content {
        let window = match (p.starts_at, p.ends_at) {
            (Some(start), Some(end)) => format!(
                "{} → {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            _ => "-".to_string(),
        };
        println!(
            "{:<6} {:<28} {:>5.1}%  {:<10} {}",
            p.id,
            p.name,
            p.discount_percent,
            if p.active { "active" } else { "inactive" },
            window
        );
    }

    Ok(())
}
