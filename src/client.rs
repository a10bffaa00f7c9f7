//! Main MarketplaceClient facade for the SDK.
//!
//! Owns the REST clients and the inventory reconciliation cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use url::Url;

use crate::error::{Result, SdkError};
use crate::inventory::InventorySession;
use crate::rpc::{
    IndexerApi, IndexerClient, LaosApi, LaosClient, MarketplaceApi, MarketplaceApiClient,
    RpcTransport,
};
use crate::state::{InventoryCache, ReconciliationKey};
use crate::supply::{IndexerSupply, LaosSupply, SupplyProvider, DEFAULT_INDEXER_PAGE_SIZE};
use crate::types::{
    ChainId, InventoryArgs, InventoryPage, ListCollectiblesRequest, ListCollectiblesResponse,
    PageRequest, TokenBalancesRequest, TokenBalancesResponse,
};

/// Configuration for the marketplace client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Marketplace API base URL
    pub marketplace_url: String,
    /// Token indexer base URL
    pub indexer_url: String,
    /// LAOS supply provider base URL
    pub laos_url: String,
    /// Project access key sent as `X-Access-Key`
    pub access_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Page size used when draining the indexer
    pub indexer_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            marketplace_url: std::env::var("MARKETPLACE_API_URL")
                .unwrap_or_else(|_| "https://marketplace-api.sequence.app".to_string()),
            indexer_url: std::env::var("MARKETPLACE_INDEXER_URL")
                .unwrap_or_else(|_| "https://indexer.sequence.app".to_string()),
            laos_url: std::env::var("MARKETPLACE_LAOS_URL")
                .unwrap_or_else(|_| "https://extensions.api.laosnetwork.io".to_string()),
            access_key: std::env::var("MARKETPLACE_ACCESS_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            timeout: std::env::var("MARKETPLACE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),
            indexer_page_size: std::env::var("MARKETPLACE_INDEXER_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INDEXER_PAGE_SIZE),
        }
    }
}

impl ClientConfig {
    /// Read the configuration from the environment and validate it.
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Check that every endpoint parses and the numeric settings are usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("marketplace_url", &self.marketplace_url),
            ("indexer_url", &self.indexer_url),
            ("laos_url", &self.laos_url),
        ] {
            if value.is_empty() {
                return Err(SdkError::Config(format!("{} is empty", name)));
            }
            Url::parse(value)
                .map_err(|e| SdkError::Config(format!("{} '{}': {}", name, value, e)))?;
        }
        if self.indexer_page_size == 0 {
            return Err(SdkError::Config(
                "indexer_page_size must be positive".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SdkError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// The main marketplace SDK client.
///
/// Provides methods for:
/// - Searching collectibles on the marketplace
/// - Reading token balances from the indexer
/// - Paginating an account's reconciled inventory in a collection
pub struct MarketplaceClient {
    marketplace: Arc<dyn MarketplaceApi>,
    indexer: Arc<dyn IndexerApi>,
    standard_supply: Arc<dyn SupplyProvider>,
    laos_supply: Arc<dyn SupplyProvider>,
    inventory: Arc<InventoryCache>,
}

impl MarketplaceClient {
    /// Create a new MarketplaceClient talking to the configured REST endpoints.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let transport = |service, url: &str| {
            RpcTransport::new(service, url, config.access_key.clone(), config.timeout)
        };
        let marketplace: Arc<dyn MarketplaceApi> = Arc::new(MarketplaceApiClient::new(
            transport("marketplace", &config.marketplace_url)?,
        ));
        let indexer: Arc<dyn IndexerApi> =
            Arc::new(IndexerClient::new(transport("indexer", &config.indexer_url)?));
        let laos: Arc<dyn LaosApi> =
            Arc::new(LaosClient::new(transport("laos", &config.laos_url)?));

        info!(
            marketplace = %config.marketplace_url,
            indexer = %config.indexer_url,
            "MarketplaceClient initialized"
        );

        Ok(Self::with_providers(
            marketplace,
            indexer,
            laos,
            config.indexer_page_size,
        ))
    }

    /// Create a client around custom upstream providers.
    pub fn with_providers(
        marketplace: Arc<dyn MarketplaceApi>,
        indexer: Arc<dyn IndexerApi>,
        laos: Arc<dyn LaosApi>,
        indexer_page_size: u32,
    ) -> Self {
        let standard_supply = Arc::new(
            IndexerSupply::new(indexer.clone(), marketplace.clone())
                .with_page_size(indexer_page_size),
        );
        let laos_supply = Arc::new(LaosSupply::new(laos));
        Self {
            marketplace,
            indexer,
            standard_supply,
            laos_supply,
            inventory: Arc::new(InventoryCache::new()),
        }
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Build an inventory session for `args`.
    ///
    /// The supply strategy is fixed here from `args.is_laos721`.
    pub fn inventory_session(&self, args: &InventoryArgs) -> InventorySession {
        let key = ReconciliationKey::new(
            args.chain_id,
            &args.collection_address,
            &args.account_address,
        );
        let supply = if args.is_laos721 {
            self.laos_supply.clone()
        } else {
            self.standard_supply.clone()
        };
        InventorySession::new(key, supply, self.inventory.clone())
    }

    /// Fetch one page of an account's holdings in a collection.
    pub async fn fetch_inventory(
        &self,
        args: &InventoryArgs,
        page: PageRequest,
    ) -> Result<InventoryPage> {
        self.inventory_session(args).fetch_page(page).await
    }

    /// Drop reconciliation state so the next fetch starts from scratch.
    pub fn invalidate_inventory(
        &self,
        chain_id: ChainId,
        collection_address: &str,
        account_address: &str,
    ) {
        self.inventory.invalidate(&ReconciliationKey::new(
            chain_id,
            collection_address,
            account_address,
        ));
    }

    /// Drop reconciliation state for every key, e.g. on account disconnect.
    pub fn clear_inventory(&self) {
        self.inventory.clear_all();
    }

    /// Shared reconciliation cache.
    pub fn inventory_cache(&self) -> Arc<InventoryCache> {
        self.inventory.clone()
    }

    // =========================================================================
    // Read operations
    // =========================================================================

    /// Search collectibles on the marketplace.
    pub async fn list_collectibles(
        &self,
        request: &ListCollectiblesRequest,
    ) -> Result<ListCollectiblesResponse> {
        self.marketplace.list_collectibles(request).await
    }

    /// Read one page of token balances from the indexer.
    pub async fn get_token_balances(
        &self,
        request: &TokenBalancesRequest,
    ) -> Result<TokenBalancesResponse> {
        self.indexer.get_token_balances(request).await
    }
}
