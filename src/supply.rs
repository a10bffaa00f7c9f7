//! Token-supply strategies.
//!
//! A [`SupplyProvider`] answers two questions for a reconciliation key: which
//! tokens the account owns (ground truth), and what one page of the account's
//! collectibles looks like from the marketplace side. Most collections use the
//! indexer plus the marketplace search; LAOS collections answer both from the
//! LAOS provider.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::rpc::{IndexerApi, LaosApi, MarketplaceApi};
use crate::state::{ReconciliationKey, ReconciliationState};
use crate::types::{
    CollectibleOrder, CollectiblesFilter, EnrichedCollectible, IndexerPage, LaosBalancesRequest,
    ListCollectiblesRequest, ListCollectiblesResponse, MarketplacePage, OrderSide, PageRequest,
    TokenBalancesRequest,
};

/// Page size used when walking the indexer's balance listing.
pub const DEFAULT_INDEXER_PAGE_SIZE: u32 = 50;

/// Owned tokens keyed by token id, in scan order.
pub type OwnedTokens = IndexMap<String, EnrichedCollectible>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SupplyProvider: Send + Sync {
    /// Every token the account holds in the collection.
    async fn owned_tokens(&self, key: &ReconciliationKey) -> Result<OwnedTokens>;

    /// One page of the account's collectibles as the marketplace lists them.
    async fn listed_page(
        &self,
        key: &ReconciliationKey,
        page: PageRequest,
    ) -> Result<ListCollectiblesResponse>;
}

/// Populate `state` with the provider's owned tokens unless that already happened.
///
/// The scan is committed only once it completes, so a failure leaves `state`
/// untouched and the next call scans again from the start.
pub async fn ensure_drained(
    supply: &dyn SupplyProvider,
    key: &ReconciliationKey,
    state: &mut ReconciliationState,
) -> Result<()> {
    if state.indexer_drained {
        trace!(%key, "Owned tokens already drained");
        return Ok(());
    }

    let owned = supply.owned_tokens(key).await?;
    info!(%key, tokens = owned.len(), "Drained owned tokens");
    state.commit_drain(owned);
    Ok(())
}

// =============================================================================
// Indexer + marketplace search
// =============================================================================

/// Default strategy: the indexer for ownership, the marketplace search for listings.
pub struct IndexerSupply {
    indexer: Arc<dyn IndexerApi>,
    marketplace: Arc<dyn MarketplaceApi>,
    page_size: u32,
}

impl IndexerSupply {
    pub fn new(indexer: Arc<dyn IndexerApi>, marketplace: Arc<dyn MarketplaceApi>) -> Self {
        Self {
            indexer,
            marketplace,
            page_size: DEFAULT_INDEXER_PAGE_SIZE,
        }
    }

    /// Override the indexer page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl SupplyProvider for IndexerSupply {
    async fn owned_tokens(&self, key: &ReconciliationKey) -> Result<OwnedTokens> {
        let mut owned = OwnedTokens::new();
        let mut cursor = IndexerPage::first(self.page_size);
        let mut pages = 0u32;

        loop {
            let response = self
                .indexer
                .get_token_balances(&TokenBalancesRequest {
                    account_address: key.account_address.clone(),
                    contract_address: key.collection_address.clone(),
                    include_metadata: true,
                    page: Some(cursor),
                })
                .await?;
            pages += 1;

            for balance in response.balances {
                if let Some(collectible) = EnrichedCollectible::from_balance(balance) {
                    owned.insert(collectible.metadata.token_id.clone(), collectible);
                }
            }

            if !response.page.more {
                break;
            }
            cursor = response.page;
        }

        debug!(%key, pages, tokens = owned.len(), "Indexer scan finished");
        Ok(owned)
    }

    async fn listed_page(
        &self,
        key: &ReconciliationKey,
        page: PageRequest,
    ) -> Result<ListCollectiblesResponse> {
        self.marketplace
            .list_collectibles(&ListCollectiblesRequest {
                chain_id: key.chain_id,
                contract_address: key.collection_address.clone(),
                side: OrderSide::Listing,
                filter: CollectiblesFilter {
                    in_accounts: vec![key.account_address.clone()],
                    include_empty: true,
                },
                page: Some(page),
            })
            .await
    }
}

// =============================================================================
// LAOS
// =============================================================================

/// Strategy for LAOS ERC-721 collections.
///
/// The LAOS provider returns the whole holding in one call, newest first. Both
/// the owned set and the listed pages are derived from that response: each
/// drain refreshes a per-key snapshot and listed pages are sliced from it.
pub struct LaosSupply {
    laos: Arc<dyn LaosApi>,
    snapshots: DashMap<ReconciliationKey, Arc<Vec<EnrichedCollectible>>>,
}

impl LaosSupply {
    pub fn new(laos: Arc<dyn LaosApi>) -> Self {
        Self {
            laos,
            snapshots: DashMap::new(),
        }
    }

    /// Fetch the holding from the provider and store it as the key's snapshot.
    async fn refresh(&self, key: &ReconciliationKey) -> Result<Arc<Vec<EnrichedCollectible>>> {
        let response = self
            .laos
            .get_token_balances(&LaosBalancesRequest {
                chain_id: key.chain_id.to_string(),
                account_address: key.account_address.clone(),
                contract_address: key.collection_address.clone(),
                include_metadata: true,
            })
            .await?;

        let mut holdings = Vec::with_capacity(response.balances.len());
        for balance in response.balances {
            if balance.token_metadata.is_none() {
                warn!(
                    %key,
                    token_id = %balance.token_id,
                    "Dropping LAOS balance without metadata"
                );
                continue;
            }
            if let Some(collectible) = EnrichedCollectible::from_balance(balance) {
                holdings.push(collectible);
            }
        }

        let holdings = Arc::new(holdings);
        self.snapshots.insert(key.clone(), holdings.clone());
        Ok(holdings)
    }

    /// The key's snapshot, fetched on first use.
    async fn holdings(&self, key: &ReconciliationKey) -> Result<Arc<Vec<EnrichedCollectible>>> {
        if let Some(snapshot) = self.snapshots.get(key) {
            return Ok(snapshot.clone());
        }
        self.refresh(key).await
    }
}

#[async_trait]
impl SupplyProvider for LaosSupply {
    async fn owned_tokens(&self, key: &ReconciliationKey) -> Result<OwnedTokens> {
        let holdings = self.refresh(key).await?;
        Ok(holdings
            .iter()
            .map(|c| (c.metadata.token_id.clone(), c.clone()))
            .collect())
    }

    async fn listed_page(
        &self,
        key: &ReconciliationKey,
        page: PageRequest,
    ) -> Result<ListCollectiblesResponse> {
        let holdings = self.holdings(key).await?;
        let size = page.page_size as usize;
        let start = (page.page.saturating_sub(1) as usize).saturating_mul(size);
        let end = start.saturating_add(size).min(holdings.len());

        let collectibles = holdings
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|c| CollectibleOrder {
                metadata: c.metadata.clone(),
                listing: None,
                offer: None,
            })
            .collect();

        Ok(ListCollectiblesResponse {
            collectibles,
            page: Some(MarketplacePage {
                page: page.page,
                page_size: page.page_size,
                more: Some(end < holdings.len()),
            }),
        })
    }
}
