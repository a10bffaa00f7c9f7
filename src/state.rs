//! Per-collection reconciliation state and the table that owns it.
//!
//! One [`ReconciliationState`] exists per (chain, collection, account). The table
//! hands out each state behind its own async mutex so page requests for the same
//! key run one at a time while unrelated keys never contend.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::{ChainId, EnrichedCollectible};

/// Identifies one reconciliation session.
///
/// Addresses are lower-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconciliationKey {
    pub chain_id: ChainId,
    pub collection_address: String,
    pub account_address: String,
}

impl ReconciliationKey {
    pub fn new(chain_id: ChainId, collection_address: &str, account_address: &str) -> Self {
        Self {
            chain_id,
            collection_address: collection_address.to_lowercase(),
            account_address: account_address.to_lowercase(),
        }
    }
}

impl fmt::Display for ReconciliationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.chain_id, self.collection_address, self.account_address
        )
    }
}

/// Everything remembered about one key between page requests.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationState {
    /// Token ids already returned to the caller. Only grows.
    pub seen_token_ids: HashSet<String>,
    /// The marketplace paginator reported its last page.
    pub marketplace_finished: bool,
    /// The indexer scan for this key completed.
    pub indexer_drained: bool,
    /// Tokens owned according to the indexer, in scan order.
    pub indexer_owned_tokens: IndexMap<String, EnrichedCollectible>,
}

impl ReconciliationState {
    /// Indexer-owned tokens not yet emitted, in scan order.
    pub fn unseen_owned(&self) -> impl Iterator<Item = &EnrichedCollectible> {
        self.indexer_owned_tokens
            .iter()
            .filter(|(id, _)| !self.seen_token_ids.contains(*id))
            .map(|(_, collectible)| collectible)
    }

    pub fn unseen_owned_count(&self) -> usize {
        self.unseen_owned().count()
    }

    /// Replace the owned set with a completed scan and mark the drain done.
    pub fn commit_drain(&mut self, owned: IndexMap<String, EnrichedCollectible>) {
        self.indexer_owned_tokens = owned;
        self.indexer_drained = true;
    }
}

/// Shared handle to one key's state.
pub type SharedState = Arc<Mutex<ReconciliationState>>;

/// Table of reconciliation state keyed by [`ReconciliationKey`].
///
/// Owned by whoever owns the query cache and passed into sessions by reference.
#[derive(Debug, Default)]
pub struct InventoryCache {
    states: DashMap<ReconciliationKey, SharedState>,
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing state for `key`, or a fresh one stored under it.
    pub fn get_or_init(&self, key: &ReconciliationKey) -> SharedState {
        if let Some(state) = self.states.get(key) {
            return state.clone();
        }
        self.states
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(%key, "Creating reconciliation state");
                Arc::new(Mutex::new(ReconciliationState::default()))
            })
            .clone()
    }

    /// Drop the state for `key`. Absent keys are ignored.
    ///
    /// A request already holding the old state finishes against it; the next
    /// request starts from a fresh state.
    pub fn invalidate(&self, key: &ReconciliationKey) {
        if self.states.remove(key).is_some() {
            debug!(%key, "Invalidated reconciliation state");
        }
    }

    /// Drop every entry.
    pub fn clear_all(&self) {
        self.states.clear();
    }

    pub fn contains(&self, key: &ReconciliationKey) -> bool {
        self.states.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
