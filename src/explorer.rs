use crate::chains::Chain;
use crate::config::ExplorerConfig;
use crate::error::FetchError;
use crate::models::{ChainTransaction, ExplorerTx};
use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Anything that can list transactions for an address on one chain.
/// The aggregator fans out over this seam; tests substitute canned sources.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Most-recent-first transaction list for `address` on `chain`.
    async fn fetch(&self, chain: Chain, address: &str) -> Result<Vec<ChainTransaction>, FetchError>;
}

struct Endpoint {
    api_base: String,
    api_key: String,
}

/// HTTP client for etherscan-compatible explorer APIs. Each chain has an
/// independent endpoint and key; a failure on one chain never affects
/// requests to another.
pub struct ExplorerClient {
    client: Client,
    endpoints: HashMap<Chain, Endpoint>,
}

/// Explorer envelope. `result` is an array of transaction records on
/// success and a string (error description) otherwise, so it is kept as a
/// raw value until inspected.
#[derive(Debug, Deserialize)]
struct TxListResponse {
    result: serde_json::Value,
}

impl ExplorerClient {
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let mut endpoints = HashMap::new();
        for chain in Chain::ALL {
            let spec = chain.spec();
            let api_base = config
                .base_urls
                .get(spec.slug)
                .cloned()
                .unwrap_or_else(|| spec.api_base.to_string());
            let api_key = config.api_keys.get(spec.slug).cloned().unwrap_or_default();
            endpoints.insert(chain, Endpoint { api_base, api_key });
        }

        Ok(Self { client, endpoints })
    }

    fn txlist_url(&self, chain: Chain, address: &str) -> Result<String, FetchError> {
        let endpoint = self
            .endpoints
            .get(&chain)
            .ok_or(FetchError::UnknownEndpoint(chain))?;
        Ok(format!(
            "{}?module=account&action=txlist&address={}&startblock=0&endblock=99999999&sort=desc&apikey={}",
            endpoint.api_base, address, endpoint.api_key
        ))
    }
}

#[async_trait]
impl TransactionSource for ExplorerClient {
    async fn fetch(&self, chain: Chain, address: &str) -> Result<Vec<ChainTransaction>, FetchError> {
        let url = self.txlist_url(chain, address)?;
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                chain,
                status: status.as_u16(),
            });
        }

        let body: TxListResponse = response.json().await?;

        // A non-array result is the explorer's error envelope ("Max rate
        // limit reached", "NOTOK", ...). Treated as zero transactions.
        let records = match body.result {
            serde_json::Value::Array(items) => items,
            other => {
                warn!(
                    "explorer for {} returned non-list result for {}: {}",
                    chain, address, other
                );
                return Ok(Vec::new());
            }
        };

        let mut transactions = Vec::with_capacity(records.len());
        for record in records {
            let raw: ExplorerTx = match serde_json::from_value(record) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("skipping malformed {} record for {}: {}", chain, address, e);
                    continue;
                }
            };
            match ChainTransaction::from_explorer(chain, address, raw) {
                Some(tx) => transactions.push(tx),
                None => warn!("skipping {} record with invalid timestamp for {}", chain, address),
            }
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> ExplorerConfig {
        let mut config = ExplorerConfig::default();
        for chain in Chain::ALL {
            config
                .base_urls
                .insert(chain.slug().to_string(), format!("{}/api", server_uri));
            config
                .api_keys
                .insert(chain.slug().to_string(), "test-key".to_string());
        }
        config
    }

    #[tokio::test]
    async fn test_fetch_parses_transaction_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("action", "txlist"))
            .and(query_param("address", "0xabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "hash": "0x111",
                    "from": "0xfeed",
                    "to": "0xabc",
                    "value": "2000000000000000000",
                    "timeStamp": "1693526400"
                }]
            })))
            .mount(&server)
            .await;

        let client = ExplorerClient::from_config(&test_config(&server.uri())).unwrap();
        let txs = client.fetch(Chain::Ethereum, "0xabc").await.unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "0x111");
        assert_eq!(txs[0].chain, Chain::Ethereum);
        assert_eq!(txs[0].watched_address, "0xabc");
        assert_eq!(txs[0].timestamp, 1693526400);
    }

    #[tokio::test]
    async fn test_fetch_non_array_result_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Max rate limit reached"
            })))
            .mount(&server)
            .await;

        let client = ExplorerClient::from_config(&test_config(&server.uri())).unwrap();
        let txs = client.fetch(Chain::Polygon, "0xabc").await.unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = ExplorerClient::from_config(&test_config(&server.uri())).unwrap();
        let result = client.fetch(Chain::Fantom, "0xabc").await;
        assert!(matches!(
            result,
            Err(FetchError::Status { chain: Chain::Fantom, status: 502 })
        ));
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [
                    {"hash": "0x1", "from": "0xa", "to": "0xb", "value": "1", "timeStamp": "100"},
                    {"unexpected": "shape"},
                    {"hash": "0x2", "from": "0xa", "to": "0xb", "value": "1", "timeStamp": "bogus"}
                ]
            })))
            .mount(&server)
            .await;

        let client = ExplorerClient::from_config(&test_config(&server.uri())).unwrap();
        let txs = client.fetch(Chain::Avalanche, "0xabc").await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "0x1");
    }

    #[test]
    fn test_txlist_url_carries_key_and_address() {
        let mut config = ExplorerConfig::default();
        config
            .api_keys
            .insert("eth".to_string(), "SECRET".to_string());
        let client = ExplorerClient::from_config(&config).unwrap();
        let url = client.txlist_url(Chain::Ethereum, "0xabc").unwrap();
        assert!(url.starts_with("https://api.etherscan.io/api?"));
        assert!(url.contains("address=0xabc"));
        assert!(url.contains("apikey=SECRET"));
        assert!(url.contains("sort=desc"));
    }
}
