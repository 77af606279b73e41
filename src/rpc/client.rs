use std::time::Duration;

use alloy::primitives::hex;
use itertools::Itertools;
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info};
use url::Url;

use super::{SwapApi, address};
use crate::{
    config::ScraperConfig,
    error::RpcError,
    types::{Asset, EventField, RawSwapEvent},
};

/// `getSymbol`, `getName`, `getDecimals` of the fungible token interface.
const SYMBOL_METHOD_INDEX: u32 = 0;
const NAME_METHOD_INDEX: u32 = 1;
const DECIMALS_METHOD_INDEX: u32 = 2;

/// `getTokenPair` of the Ayin pair contract.
const TOKEN_PAIR_METHOD_INDEX: u32 = 7;

const ALPH_DECIMALS: u8 = 18;

/// HTTP client for the Alephium explorer backend and full node.
#[derive(Clone, Debug)]
pub struct AlephiumClient {
    http: reqwest::Client,
    node_url: Url,
    explorer_url: Url,
    factory: String,
    debug: bool,
}

#[derive(Deserialize)]
struct TransactionResponse {
    timestamp: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubContractsResponse {
    sub_contracts: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallContractRequest<'a> {
    group: u8,
    address: &'a str,
    method_index: u32,
}

#[derive(Deserialize)]
struct CallContractResponse {
    returns: Vec<EventField>,
}

impl AlephiumClient {
    pub fn new(config: &ScraperConfig) -> Result<Self, RpcError> {
        Self::with_urls(
            config.node_url.clone(),
            config.explorer_url.clone(),
            config.factory_address.clone(),
            config.request_timeout(),
            config.debug,
        )
    }

    pub fn with_urls(
        node_url: Url,
        explorer_url: Url,
        factory: impl Into<String>,
        timeout: Duration,
        debug: bool,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            node_url,
            explorer_url,
            factory: factory.into(),
            debug,
        })
    }

    async fn request<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, RpcError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.debug {
            info!(%method, %url, "alephium request");
        }
        let mut request = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if self.debug {
            info!(%url, %status, body = %text, "alephium response");
        } else {
            debug!(%url, %status, "alephium response");
        }
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                message: text,
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| RpcError::InvalidResponse(format!("{url}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RpcError> {
        self.request::<(), T>(Method::GET, url, None).await
    }

    async fn call_contract(
        &self,
        address: &str,
        method_index: u32,
    ) -> Result<Vec<EventField>, RpcError> {
        let request = CallContractRequest {
            group: address::contract_group(address)?,
            address,
            method_index,
        };
        let response: CallContractResponse = self
            .request(
                Method::POST,
                endpoint(&self.node_url, &["contracts", "call-contract"])?,
                Some(&request),
            )
            .await?;
        Ok(response.returns)
    }

    async fn call_single(&self, address: &str, method_index: u32) -> Result<String, RpcError> {
        self.call_contract(address, method_index)
            .await?
            .into_iter()
            .next()
            .map(|v| v.value)
            .ok_or_else(|| {
                RpcError::InvalidResponse(format!(
                    "method {method_index} of {address} returned nothing"
                ))
            })
    }
}

impl SwapApi for AlephiumClient {
    async fn swap_events(
        &self,
        contract: &str,
        limit: usize,
        page: u64,
    ) -> Result<Vec<RawSwapEvent>, RpcError> {
        let mut url = endpoint(&self.explorer_url, &["contracts", contract, "events"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        self.get(url).await
    }

    async fn transaction_timestamp(&self, tx_hash: &str) -> Result<i64, RpcError> {
        let url = endpoint(&self.explorer_url, &["transactions", tx_hash])?;
        let tx: TransactionResponse = self.get(url).await?;
        Ok(tx.timestamp)
    }

    async fn swap_contract_addresses(&self, limit: usize) -> Result<Vec<String>, RpcError> {
        let mut url = endpoint(
            &self.explorer_url,
            &["contracts", &self.factory, "sub-contracts"],
        )?;
        url.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("limit", &limit.to_string());
        let response: SubContractsResponse = self.get(url).await?;
        Ok(response.sub_contracts)
    }

    async fn token_pair_addresses(&self, contract: &str) -> Result<[String; 2], RpcError> {
        let returns = self.call_contract(contract, TOKEN_PAIR_METHOD_INDEX).await?;
        let Some((token0, token1)) = returns.iter().map(|v| token_address(&v.value)).collect_tuple()
        else {
            return Err(RpcError::InvalidResponse(format!(
                "token pair of {contract}: expected 2 values, got {}",
                returns.len()
            )));
        };
        Ok([token0?, token1?])
    }

    async fn token_info(&self, address: &str, blockchain: &str) -> Result<Asset, RpcError> {
        if address::contract_id(address)? == address::ALPH_TOKEN_ID {
            return Ok(Asset::new("ALPH", "Alephium", address, ALPH_DECIMALS, blockchain));
        }
        let (symbol, name, decimals) = futures::try_join!(
            self.call_single(address, SYMBOL_METHOD_INDEX),
            self.call_single(address, NAME_METHOD_INDEX),
            self.call_single(address, DECIMALS_METHOD_INDEX),
        )?;
        let decimals = decimals.parse::<u8>().map_err(|e| {
            RpcError::InvalidResponse(format!("decimals of {address}: {decimals}: {e}"))
        })?;
        Ok(Asset::new(
            decode_utf8(&symbol)?,
            decode_utf8(&name)?,
            address,
            decimals,
            blockchain,
        ))
    }
}

/// Appends path segments to the base URL, keeping any base path.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, RpcError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RpcError::InvalidRequest(format!("{base} can not be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn token_address(token_id: &str) -> Result<String, RpcError> {
    let id: [u8; 32] = hex::decode(token_id)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| RpcError::InvalidResponse(format!("invalid token id {token_id}")))?;
    Ok(address::contract_address(&id))
}

fn decode_utf8(byte_vec: &str) -> Result<String, RpcError> {
    hex::decode(byte_vec)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| RpcError::InvalidResponse(format!("invalid ByteVec {byte_vec}: {e}")))
}
