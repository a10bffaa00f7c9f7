use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric EVM chain id (e.g. 137 for Polygon).
pub type ChainId = u64;

// =============================================================================
// Enums
// =============================================================================

/// Which side of the order book a marketplace query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Listing,
    Offer,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Listing => write!(f, "listing"),
            OrderSide::Offer => write!(f, "offer"),
        }
    }
}

/// Token standard of a contract as reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContractType {
    Erc20,
    Erc721,
    Erc1155,
    LaosErc721,
    Unknown,
}

impl From<String> for ContractType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ERC20" => ContractType::Erc20,
            "ERC721" => ContractType::Erc721,
            "ERC1155" => ContractType::Erc1155,
            "LAOS-ERC721" => ContractType::LaosErc721,
            _ => ContractType::Unknown,
        }
    }
}

impl From<ContractType> for String {
    fn from(ty: ContractType) -> Self {
        ty.to_string()
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractType::Erc20 => write!(f, "ERC20"),
            ContractType::Erc721 => write!(f, "ERC721"),
            ContractType::Erc1155 => write!(f, "ERC1155"),
            ContractType::LaosErc721 => write!(f, "LAOS-ERC721"),
            ContractType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// Token and contract metadata
// =============================================================================

/// Metadata of a single token, shared by every provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub token_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub attributes: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

impl TokenMetadata {
    /// Metadata carrying nothing but a token id.
    pub fn with_token_id(token_id: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            ..Default::default()
        }
    }
}

/// Contract information attached to indexer balances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub chain_id: ChainId,
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub contract_type: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
}

// =============================================================================
// Orders and collectibles (marketplace)
// =============================================================================

/// A marketplace order attached to a collectible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    #[serde(default)]
    pub marketplace: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub price_amount: String,
    #[serde(default)]
    pub price_amount_formatted: String,
    #[serde(default)]
    pub price_currency_address: String,
    #[serde(default)]
    pub quantity_available: String,
}

/// A collectible as returned by the marketplace search.
///
/// The search never carries balances or contract details; those come from
/// the indexer and are merged in by the inventory engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleOrder {
    pub metadata: TokenMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<Order>,
}

impl CollectibleOrder {
    pub fn token_id(&self) -> &str {
        &self.metadata.token_id
    }
}

/// A collectible surfaced to the caller of the inventory engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCollectible {
    pub metadata: TokenMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_info: Option<ContractInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<ContractType>,
}

impl EnrichedCollectible {
    pub fn token_id(&self) -> &str {
        &self.metadata.token_id
    }

    /// Build from an indexer balance. Returns `None` when the balance has no token id.
    ///
    /// Balances without metadata still produce a record keyed by `token_id`.
    pub fn from_balance(balance: TokenBalance) -> Option<Self> {
        if balance.token_id.is_empty() {
            return None;
        }
        let mut metadata = balance.token_metadata.unwrap_or_default();
        metadata.token_id = balance.token_id;
        Some(Self {
            metadata,
            listing: None,
            offer: None,
            balance: Some(balance.balance),
            contract_info: balance.contract_info,
            contract_type: balance.contract_type,
        })
    }

    /// Copy the indexer-only fields of `owned` onto `collectible`.
    pub fn enrich(collectible: CollectibleOrder, owned: Option<&EnrichedCollectible>) -> Self {
        Self {
            metadata: collectible.metadata,
            listing: collectible.listing,
            offer: collectible.offer,
            balance: owned.and_then(|o| o.balance.clone()),
            contract_info: owned.and_then(|o| o.contract_info.clone()),
            contract_type: owned.and_then(|o| o.contract_type),
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Page requested by a caller. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// The page after this one, same size.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 30,
        }
    }
}

/// Outward-facing cursor returned with every inventory page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub page: u32,
    pub page_size: u32,
    pub more: bool,
}

/// Cursor echoed by the marketplace search. `more` may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplacePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub more: Option<bool>,
}

/// Cursor of the indexer's balance listing. Echoed back verbatim to get the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default)]
    pub more: bool,
}

impl IndexerPage {
    /// Cursor for the first page.
    pub fn first(page_size: u32) -> Self {
        Self {
            page: Some(1),
            page_size: Some(page_size),
            after: None,
            more: false,
        }
    }
}

// =============================================================================
// Indexer wire types
// =============================================================================

/// One balance row from the indexer (or the LAOS provider).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    #[serde(default)]
    pub contract_type: Option<ContractType>,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub account_address: String,
    #[serde(rename = "tokenID", default)]
    pub token_id: String,
    #[serde(default)]
    pub balance: String,
    #[serde(default)]
    pub token_metadata: Option<TokenMetadata>,
    #[serde(default)]
    pub contract_info: Option<ContractInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalancesRequest {
    pub account_address: String,
    pub contract_address: String,
    pub include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<IndexerPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalancesResponse {
    #[serde(default)]
    pub balances: Vec<TokenBalance>,
    #[serde(default)]
    pub page: IndexerPage,
}

// =============================================================================
// Marketplace wire types
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectiblesFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_accounts: Vec<String>,
    #[serde(default)]
    pub include_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCollectiblesRequest {
    /// Part of the URL path, not of the body.
    #[serde(skip)]
    pub chain_id: ChainId,
    pub contract_address: String,
    pub side: OrderSide,
    #[serde(default)]
    pub filter: CollectiblesFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCollectiblesResponse {
    #[serde(default)]
    pub collectibles: Vec<CollectibleOrder>,
    #[serde(default)]
    pub page: Option<MarketplacePage>,
}

impl ListCollectiblesResponse {
    /// Whether the upstream paginator reported further pages.
    pub fn has_more(&self) -> bool {
        self.page.and_then(|p| p.more).unwrap_or(false)
    }
}

// =============================================================================
// LAOS wire types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaosBalancesRequest {
    pub chain_id: String,
    pub account_address: String,
    pub contract_address: String,
    pub include_metadata: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaosBalancesResponse {
    #[serde(default)]
    pub balances: Vec<TokenBalance>,
}

// =============================================================================
// Inventory
// =============================================================================

/// One page of reconciled inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPage {
    pub collectibles: Vec<EnrichedCollectible>,
    pub page: PageCursor,
}

impl InventoryPage {
    pub fn token_ids(&self) -> Vec<&str> {
        self.collectibles.iter().map(|c| c.token_id()).collect()
    }
}

/// Arguments identifying whose holdings in which collection to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryArgs {
    pub chain_id: ChainId,
    pub collection_address: String,
    pub account_address: String,
    /// The collection lives on the LAOS supply provider instead of the indexer.
    pub is_laos721: bool,
}

impl InventoryArgs {
    pub fn new(
        chain_id: ChainId,
        collection_address: impl Into<String>,
        account_address: impl Into<String>,
    ) -> Self {
        Self {
            chain_id,
            collection_address: collection_address.into(),
            account_address: account_address.into(),
            is_laos721: false,
        }
    }

    pub fn laos(mut self, is_laos721: bool) -> Self {
        self.is_laos721 = is_laos721;
        self
    }
}
