//! Account inventory: the marketplace search merged with indexer ownership.
//!
//! The marketplace search orders the results but lags behind the chain; the
//! indexer is authoritative but knows nothing about orders. A session walks the
//! marketplace pages first, enriching each collectible with indexer balances,
//! then serves whatever the indexer owns that the marketplace never returned.
//! No token id is emitted twice for the same key.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, SdkError};
use crate::state::{InventoryCache, ReconciliationKey, ReconciliationState};
use crate::supply::{ensure_drained, SupplyProvider};
use crate::types::{
    EnrichedCollectible, InventoryPage, ListCollectiblesResponse, PageCursor, PageRequest,
};

/// Paginated view of one account's holdings in one collection.
#[derive(Clone)]
pub struct InventorySession {
    key: ReconciliationKey,
    supply: Arc<dyn SupplyProvider>,
    cache: Arc<InventoryCache>,
}

impl InventorySession {
    pub fn new(
        key: ReconciliationKey,
        supply: Arc<dyn SupplyProvider>,
        cache: Arc<InventoryCache>,
    ) -> Self {
        Self { key, supply, cache }
    }

    pub fn key(&self) -> &ReconciliationKey {
        &self.key
    }

    /// Fetch one page of holdings.
    ///
    /// Pages are expected in increasing order. Calls for the same key are
    /// serialized; a failed call leaves the session as it was and may be retried.
    pub async fn fetch_page(&self, page: PageRequest) -> Result<InventoryPage> {
        if page.page == 0 {
            return Err(SdkError::InvalidArgument("page numbers start at 1".to_string()));
        }
        if page.page_size == 0 {
            return Err(SdkError::InvalidArgument(
                "page size must be positive".to_string(),
            ));
        }

        let shared = self.cache.get_or_init(&self.key);
        let mut state = shared.lock().await;

        ensure_drained(self.supply.as_ref(), &self.key, &mut state).await?;

        if state.marketplace_finished {
            return Ok(backfill_page(&mut state, page));
        }

        let upstream = self.supply.listed_page(&self.key, page).await?;
        let result = merge_upstream_page(&mut state, upstream, page);
        if state.marketplace_finished {
            info!(
                key = %self.key,
                remaining = state.unseen_owned_count(),
                "Marketplace search exhausted, serving indexer backfill"
            );
        }
        Ok(result)
    }

    /// Forget everything reconciled for this key.
    pub fn invalidate(&self) {
        self.cache.invalidate(&self.key);
    }
}

/// Merge one marketplace page into `state`.
///
/// When the marketplace reports no further pages, indexer-owned tokens not yet
/// emitted are appended (at most `request.page_size` of them) and the state
/// switches to backfill for every later call.
fn merge_upstream_page(
    state: &mut ReconciliationState,
    upstream: ListCollectiblesResponse,
    request: PageRequest,
) -> InventoryPage {
    let upstream_more = upstream.has_more();
    let (page, page_size) = match upstream.page {
        Some(p) if p.page > 0 && p.page_size > 0 => (p.page, p.page_size),
        _ => (request.page, request.page_size),
    };

    let mut collectibles = Vec::with_capacity(upstream.collectibles.len());
    for item in upstream.collectibles {
        if item.token_id().is_empty() {
            continue;
        }
        // The search may repeat a token across pages while its index shifts.
        if !state.seen_token_ids.insert(item.token_id().to_string()) {
            continue;
        }
        let owned = state.indexer_owned_tokens.get(item.token_id());
        collectibles.push(EnrichedCollectible::enrich(item, owned));
    }

    if upstream_more {
        debug!(page, emitted = collectibles.len(), "Merged marketplace page");
        return InventoryPage {
            collectibles,
            page: PageCursor {
                page,
                page_size,
                more: true,
            },
        };
    }

    state.marketplace_finished = true;
    let missing = take_unseen(state, request.page_size as usize);
    debug!(
        page,
        emitted = collectibles.len(),
        backfilled = missing.len(),
        "Merged final marketplace page"
    );
    collectibles.extend(missing);

    InventoryPage {
        collectibles,
        page: PageCursor {
            page,
            page_size,
            more: state.unseen_owned_count() > 0,
        },
    }
}

/// Serve the next slice of indexer-owned tokens the marketplace never returned.
fn backfill_page(state: &mut ReconciliationState, request: PageRequest) -> InventoryPage {
    let collectibles = take_unseen(state, request.page_size as usize);
    let more = state.unseen_owned_count() > 0;
    debug!(
        page = request.page,
        emitted = collectibles.len(),
        more,
        "Served backfill page"
    );

    InventoryPage {
        collectibles,
        page: PageCursor {
            page: request.page,
            page_size: request.page_size,
            more,
        },
    }
}

/// Take up to `limit` unseen owned tokens in scan order and mark them seen.
fn take_unseen(state: &mut ReconciliationState, limit: usize) -> Vec<EnrichedCollectible> {
    let batch: Vec<EnrichedCollectible> = state.unseen_owned().take(limit).cloned().collect();
    for collectible in &batch {
        state
            .seen_token_ids
            .insert(collectible.metadata.token_id.clone());
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supply::{MockSupplyProvider, OwnedTokens};
    use crate::types::{CollectibleOrder, ContractType, MarketplacePage, Order, TokenMetadata};
    use pretty_assertions::assert_eq;

    fn key() -> ReconciliationKey {
        ReconciliationKey::new(1, "0xcol", "0xacc")
    }

    fn owned(ids: &[&str]) -> OwnedTokens {
        ids.iter()
            .map(|id| {
                (
                    id.to_string(),
                    EnrichedCollectible {
                        metadata: TokenMetadata::with_token_id(*id),
                        balance: Some("1".to_string()),
                        contract_type: Some(ContractType::Erc1155),
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    fn listed(
        ids: &[&str],
        page: u32,
        page_size: u32,
        more: Option<bool>,
    ) -> ListCollectiblesResponse {
        ListCollectiblesResponse {
            collectibles: ids
                .iter()
                .map(|id| CollectibleOrder {
                    metadata: TokenMetadata::with_token_id(*id),
                    listing: Some(Order {
                        order_id: format!("order-{}", id),
                        ..Default::default()
                    }),
                    offer: None,
                })
                .collect(),
            page: Some(MarketplacePage {
                page,
                page_size,
                more,
            }),
        }
    }

    fn drained(ids: &[&str]) -> ReconciliationState {
        let mut state = ReconciliationState::default();
        state.commit_drain(owned(ids));
        state
    }

    #[test]
    fn marketplace_page_is_enriched_from_indexer() {
        let mut state = drained(&["1", "2"]);
        let page = merge_upstream_page(
            &mut state,
            listed(&["2", "5"], 1, 10, Some(true)),
            PageRequest::new(1, 10),
        );

        assert_eq!(page.token_ids(), vec!["2", "5"]);
        assert_eq!(page.collectibles[0].balance.as_deref(), Some("1"));
        assert_eq!(page.collectibles[0].contract_type, Some(ContractType::Erc1155));
        assert_eq!(
            page.collectibles[0].listing.as_ref().map(|o| o.order_id.as_str()),
            Some("order-2")
        );
        assert_eq!(page.collectibles[1].balance, None);
        assert!(page.page.more);
        assert!(!state.marketplace_finished);
    }

    #[test]
    fn final_page_appends_missing_tokens() {
        let mut state = drained(&["1", "2", "3", "4"]);
        let page = merge_upstream_page(
            &mut state,
            listed(&["1", "2", "3"], 1, 10, Some(false)),
            PageRequest::new(1, 10),
        );

        assert_eq!(page.token_ids(), vec!["1", "2", "3", "4"]);
        assert!(!page.page.more);
        assert!(state.marketplace_finished);
    }

    #[test]
    fn tokens_seen_on_earlier_pages_are_not_backfilled() {
        let mut state = drained(&["1", "2", "3"]);
        merge_upstream_page(
            &mut state,
            listed(&["1"], 1, 1, Some(true)),
            PageRequest::new(1, 1),
        );
        let last = merge_upstream_page(
            &mut state,
            listed(&["2", "1"], 2, 1, None),
            PageRequest::new(2, 1),
        );

        assert_eq!(last.token_ids(), vec!["2", "3"]);
        assert!(!last.page.more);
    }

    #[test]
    fn backfill_is_truncated_to_page_size() {
        let mut state = drained(&["7", "8", "9"]);
        let upstream = listed(&[], 1, 2, Some(false));
        let first = merge_upstream_page(&mut state, upstream, PageRequest::new(1, 2));
        assert_eq!(first.token_ids(), vec!["7", "8"]);
        assert!(first.page.more);

        let second = backfill_page(&mut state, PageRequest::new(2, 2));
        assert_eq!(second.token_ids(), vec!["9"]);
        assert_eq!(
            second.page,
            PageCursor {
                page: 2,
                page_size: 2,
                more: false
            }
        );
    }

    #[test]
    fn missing_upstream_cursor_falls_back_to_request() {
        let mut state = drained(&[]);
        let page = merge_upstream_page(
            &mut state,
            ListCollectiblesResponse {
                collectibles: vec![],
                page: None,
            },
            PageRequest::new(4, 25),
        );
        assert_eq!(
            page.page,
            PageCursor {
                page: 4,
                page_size: 25,
                more: false
            }
        );
    }

    #[tokio::test]
    async fn rejects_zero_page_and_page_size() {
        let session = InventorySession::new(
            key(),
            Arc::new(MockSupplyProvider::new()),
            Arc::new(InventoryCache::new()),
        );

        let err = session.fetch_page(PageRequest::new(0, 10)).await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidArgument(_)));
        let err = session.fetch_page(PageRequest::new(1, 0)).await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn failed_marketplace_call_can_be_retried() {
        let mut supply = MockSupplyProvider::new();
        supply
            .expect_owned_tokens()
            .times(1)
            .returning(|_| Ok(owned(&["1", "2"])));
        let mut calls = 0;
        supply
            .expect_listed_page()
            .times(2)
            .returning(move |_, page| {
                calls += 1;
                if calls == 1 {
                    Err(SdkError::Api {
                        service: "marketplace",
                        status: 502,
                        body: "bad gateway".to_string(),
                    })
                } else {
                    Ok(listed(&["1"], page.page, page.page_size, Some(false)))
                }
            });

        let cache = Arc::new(InventoryCache::new());
        let session = InventorySession::new(key(), Arc::new(supply), cache.clone());

        let err = session.fetch_page(PageRequest::new(1, 10)).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        {
            let shared = cache.get_or_init(&key());
            let state = shared.lock().await;
            assert!(state.seen_token_ids.is_empty());
            assert!(!state.marketplace_finished);
        }

        let page = session.fetch_page(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.token_ids(), vec!["1", "2"]);
        assert!(!page.page.more);
    }

    #[tokio::test]
    async fn finished_session_never_calls_marketplace_again() {
        let mut supply = MockSupplyProvider::new();
        supply
            .expect_owned_tokens()
            .times(1)
            .returning(|_| Ok(owned(&["1", "2", "3"])));
        supply
            .expect_listed_page()
            .times(1)
            .returning(|_, page| Ok(listed(&[], page.page, page.page_size, Some(false))));

        let cache = Arc::new(InventoryCache::new());
        let session = InventorySession::new(key(), Arc::new(supply), cache);

        let mut request = PageRequest::new(1, 1);
        let mut seen = Vec::new();
        loop {
            let page = session.fetch_page(request).await.unwrap();
            seen.extend(page.token_ids().into_iter().map(str::to_string));
            if !page.page.more {
                break;
            }
            request = request.next();
        }
        assert_eq!(seen, vec!["1", "2", "3"]);

        let after = session.fetch_page(request.next()).await.unwrap();
        assert!(after.collectibles.is_empty());
        assert!(!after.page.more);
    }
}
