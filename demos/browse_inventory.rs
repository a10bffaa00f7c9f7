//! Walk an account's holdings in one collection, page by page.
//!
//! Usage:
//!   cargo run --example browse_inventory -- <chain_id> <collection> <account> [--laos]
//!
//! Endpoints come from MARKETPLACE_API_URL, MARKETPLACE_INDEXER_URL and
//! MARKETPLACE_LAOS_URL; set MARKETPLACE_ACCESS_KEY for authenticated access.

use anyhow::Context;
use marketplace_inventory_sdk::{ClientConfig, InventoryArgs, MarketplaceClient, PageRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let chain_id: u64 = args
        .next()
        .context("missing chain id")?
        .parse()
        .context("chain id must be a number")?;
    let collection = args.next().context("missing collection address")?;
    let account = args.next().context("missing account address")?;
    let is_laos = args.next().as_deref() == Some("--laos");

    println!("=== Inventory of {} in {} (chain {}) ===\n", account, collection, chain_id);

    let client = MarketplaceClient::new(ClientConfig::from_env()?)?;
    let inventory = InventoryArgs::new(chain_id, collection, account).laos(is_laos);

    let mut page = PageRequest::new(1, 20);
    let mut total = 0;
    loop {
        let result = client.fetch_inventory(&inventory, page).await?;
        println!("Page {} ({} items):", result.page.page, result.collectibles.len());
        for collectible in &result.collectibles {
            let listed = collectible
                .listing
                .as_ref()
                .map(|o| format!(" listed at {}", o.price_amount_formatted))
                .unwrap_or_default();
            println!(
                "   - #{} {} balance={}{}",
                collectible.token_id(),
                collectible.metadata.name,
                collectible.balance.as_deref().unwrap_or("?"),
                listed
            );
        }
        total += result.collectibles.len();

        if !result.page.more {
            break;
        }
        page = page.next();
    }

    println!("\nTotal collectibles: {}", total);
    Ok(())
}
