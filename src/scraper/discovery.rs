//! Swap contract discovery.

use std::time::Duration;

use tracing::{info, warn};

use crate::{Exchange, error::RpcError, rpc::SwapApi, types::SwapRelation};

/// Lists the swap contracts of the exchange and resolves the assets they trade.
///
/// Contracts whose tokens can not be resolved are logged and skipped. Only a
/// failure to list the contracts is returned.
pub async fn discover_swap_relations<A: SwapApi>(
    api: &A,
    exchange: &Exchange,
    limit: usize,
    pacing: Duration,
) -> Result<Vec<SwapRelation>, RpcError> {
    let contracts = api.swap_contract_addresses(limit).await.inspect_err(|e| {
        warn!(error = %e, "failed to get swap contract addresses");
    })?;

    let mut relations = Vec::with_capacity(contracts.len());
    for contract in contracts {
        match resolve_relation(api, exchange, &contract).await {
            Ok(relation) => {
                info!(
                    %contract,
                    asset0 = %relation.asset0.symbol,
                    asset1 = %relation.asset1.symbol,
                    "swap contract discovered"
                );
                relations.push(relation);
            }
            Err(e) => {
                warn!(error = %e, %contract, "failed to resolve swap contract tokens");
                continue;
            }
        }
        tokio::time::sleep(pacing).await;
    }
    Ok(relations)
}

async fn resolve_relation<A: SwapApi>(
    api: &A,
    exchange: &Exchange,
    contract: &str,
) -> Result<SwapRelation, RpcError> {
    let [token0, token1] = api.token_pair_addresses(contract).await?;
    let asset0 = api.token_info(&token0, exchange.blockchain()).await?;
    let asset1 = api.token_info(&token1, exchange.blockchain()).await?;
    Ok(SwapRelation::new(contract, asset0, asset1))
}
