//! # Marketplace Inventory SDK
//!
//! A Rust client for an NFT marketplace, its token indexer and the LAOS supply
//! provider, with a reconciled view of what an account holds in a collection.
//!
//! ## Features
//!
//! - Search collectibles and their listings/offers on the marketplace
//! - Read token balances from the indexer
//! - Paginate an account's inventory: marketplace results first, then every
//!   indexer-owned token the marketplace has not indexed yet, each token once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketplace_inventory_sdk::{ClientConfig, InventoryArgs, MarketplaceClient, PageRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Uses MARKETPLACE_API_URL, MARKETPLACE_INDEXER_URL, ... or public defaults
//!     let client = MarketplaceClient::new(ClientConfig::from_env()?)?;
//!
//!     let args = InventoryArgs::new(137, "0xcollection", "0xaccount");
//!     let mut page = PageRequest::new(1, 30);
//!     loop {
//!         let result = client.fetch_inventory(&args, page).await?;
//!         for collectible in &result.collectibles {
//!             let balance = collectible.balance.as_deref().unwrap_or("?");
//!             println!("{} x{}", collectible.token_id(), balance);
//!         }
//!         if !result.page.more {
//!             break;
//!         }
//!         page = page.next();
//!     }
//!
//!     Ok(())
//! }
//! ```

// Internal modules
mod client;
mod error;
mod inventory;
mod rpc;
mod state;
mod supply;
mod types;

// Re-export public API
pub use client::{ClientConfig, MarketplaceClient};
pub use error::{Result, SdkError};
pub use inventory::InventorySession;
pub use rpc::{
    IndexerApi, IndexerClient, LaosApi, LaosClient, MarketplaceApi, MarketplaceApiClient,
    RpcTransport,
};
pub use state::{InventoryCache, ReconciliationKey, ReconciliationState};
pub use supply::{
    IndexerSupply, LaosSupply, OwnedTokens, SupplyProvider, DEFAULT_INDEXER_PAGE_SIZE,
};
pub use types::{
    // Enums
    ContractType,
    OrderSide,
    // Collectibles
    CollectibleOrder,
    ContractInfo,
    EnrichedCollectible,
    Order,
    TokenMetadata,
    // Pagination
    IndexerPage,
    MarketplacePage,
    PageCursor,
    PageRequest,
    // Indexer
    TokenBalance,
    TokenBalancesRequest,
    TokenBalancesResponse,
    // Marketplace
    CollectiblesFilter,
    ListCollectiblesRequest,
    ListCollectiblesResponse,
    // LAOS
    LaosBalancesRequest,
    LaosBalancesResponse,
    // Inventory
    ChainId,
    InventoryArgs,
    InventoryPage,
};
