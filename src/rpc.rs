//! REST clients for the marketplace API, the token indexer and the LAOS supply provider.
//!
//! Each upstream service sits behind a small trait so the inventory engine can be
//! driven by in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SdkError};
use crate::types::{
    LaosBalancesRequest, LaosBalancesResponse, ListCollectiblesRequest, ListCollectiblesResponse,
    TokenBalancesRequest, TokenBalancesResponse,
};

const ACCESS_KEY_HEADER: &str = "X-Access-Key";

/// Indexer endpoint listing token balances of an account in one contract.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IndexerApi: Send + Sync {
    async fn get_token_balances(
        &self,
        request: &TokenBalancesRequest,
    ) -> Result<TokenBalancesResponse>;
}

/// Marketplace search over collectibles and their orders.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn list_collectibles(
        &self,
        request: &ListCollectiblesRequest,
    ) -> Result<ListCollectiblesResponse>;
}

/// LAOS token-supply provider. Returns every balance in one call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LaosApi: Send + Sync {
    async fn get_token_balances(&self, request: &LaosBalancesRequest)
        -> Result<LaosBalancesResponse>;
}

/// JSON-over-POST transport shared by the service clients.
#[derive(Clone)]
pub struct RpcTransport {
    client: Client,
    base_url: String,
    access_key: Option<String>,
    service: &'static str,
}

impl RpcTransport {
    /// Create a transport with its own reqwest client
    pub fn new(
        service: &'static str,
        base_url: &str,
        access_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(service, base_url, access_key, client))
    }

    /// Create a transport around a custom reqwest client
    pub fn with_client(
        service: &'static str,
        base_url: &str,
        access_key: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key,
            service,
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(service = self.service, %url, "Sending request");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.access_key {
            request = request.header(ACCESS_KEY_HEADER, key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SdkError::Api {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        trace!(service = self.service, body = %text, "Received response");
        serde_json::from_str(&text)
            .map_err(|e| SdkError::Decode(format!("{} response: {}", self.service, e)))
    }
}

// =============================================================================
// Indexer
// =============================================================================

/// REST client for the token indexer
#[derive(Clone)]
pub struct IndexerClient {
    transport: RpcTransport,
}

impl IndexerClient {
    pub fn new(transport: RpcTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl IndexerApi for IndexerClient {
    async fn get_token_balances(
        &self,
        request: &TokenBalancesRequest,
    ) -> Result<TokenBalancesResponse> {
        self.transport
            .post("rpc/Indexer/GetTokenBalances", request)
            .await
    }
}

// =============================================================================
// Marketplace
// =============================================================================

/// REST client for the marketplace API
#[derive(Clone)]
pub struct MarketplaceApiClient {
    transport: RpcTransport,
}

impl MarketplaceApiClient {
    pub fn new(transport: RpcTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl MarketplaceApi for MarketplaceApiClient {
    async fn list_collectibles(
        &self,
        request: &ListCollectiblesRequest,
    ) -> Result<ListCollectiblesResponse> {
        let path = format!("rpc/Marketplace/{}/ListCollectibles", request.chain_id);
        self.transport.post(&path, request).await
    }
}

// =============================================================================
// LAOS
// =============================================================================

/// REST client for the LAOS supply provider
#[derive(Clone)]
pub struct LaosClient {
    transport: RpcTransport,
}

impl LaosClient {
    pub fn new(transport: RpcTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LaosApi for LaosClient {
    async fn get_token_balances(
        &self,
        request: &LaosBalancesRequest,
    ) -> Result<LaosBalancesResponse> {
        self.transport.post("token/GetTokenBalances", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollectiblesFilter, IndexerPage, OrderSide, PageRequest};
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn transport(server: &Server, key: Option<&str>) -> RpcTransport {
        RpcTransport::new(
            "test",
            &server.url(),
            key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn indexer_posts_request_and_decodes_balances() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rpc/Indexer/GetTokenBalances")
            .match_header("x-access-key", "secret")
            .match_body(Matcher::PartialJson(json!({
                "accountAddress": "0xacc",
                "contractAddress": "0xcol",
                "includeMetadata": true,
                "page": { "page": 1, "pageSize": 50 }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "balances": [
                        { "tokenID": "1", "balance": "1", "contractType": "ERC721" }
                    ],
                    "page": { "page": 2, "pageSize": 50, "more": true }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = IndexerClient::new(transport(&server, Some("secret")));
        let resp = client
            .get_token_balances(&TokenBalancesRequest {
                account_address: "0xacc".to_string(),
                contract_address: "0xcol".to_string(),
                include_metadata: true,
                page: Some(IndexerPage::first(50)),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resp.balances.len(), 1);
        assert_eq!(resp.balances[0].token_id, "1");
        assert!(resp.page.more);
        assert_eq!(resp.page.page, Some(2));
    }

    #[tokio::test]
    async fn marketplace_puts_chain_id_in_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rpc/Marketplace/137/ListCollectibles")
            .match_body(Matcher::PartialJson(json!({
                "side": "listing",
                "filter": { "inAccounts": ["0xacc"], "includeEmpty": true }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "collectibles": [ { "metadata": { "tokenId": "9", "name": "Shield" } } ],
                    "page": { "page": 1, "pageSize": 10 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = MarketplaceApiClient::new(transport(&server, None));
        let resp = client
            .list_collectibles(&ListCollectiblesRequest {
                chain_id: 137,
                contract_address: "0xcol".to_string(),
                side: OrderSide::Listing,
                filter: CollectiblesFilter {
                    in_accounts: vec!["0xacc".to_string()],
                    include_empty: true,
                },
                page: Some(PageRequest::new(1, 10)),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resp.collectibles[0].token_id(), "9");
        assert!(!resp.has_more());
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/GetTokenBalances")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = LaosClient::new(transport(&server, None));
        let err = client
            .get_token_balances(&LaosBalancesRequest {
                chain_id: "137".to_string(),
                account_address: "0xacc".to_string(),
                contract_address: "0xcol".to_string(),
                include_metadata: true,
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("unavailable"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/GetTokenBalances")
            .with_status(200)
            .with_body("{ not json")
            .create_async()
            .await;

        let client = LaosClient::new(transport(&server, None));
        let err = client
            .get_token_balances(&LaosBalancesRequest {
                chain_id: "137".to_string(),
                account_address: "0xacc".to_string(),
                contract_address: "0xcol".to_string(),
                include_metadata: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::Decode(_)));
    }
}
