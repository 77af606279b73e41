//! Swap event decoder.

use alloy::primitives::{I256, U256};
use fastnum::{D256, UD256};
use tracing::warn;

use super::types::Trade;
use crate::{
    error::DecodeError,
    num,
    types::{Asset, RawSwapEvent, SwapRelation},
};

const AMOUNT0_IN: usize = 1;
const AMOUNT1_IN: usize = 2;
const AMOUNT0_OUT: usize = 3;
const AMOUNT1_OUT: usize = 4;

/// Trade decoder - pure logic, no async.
#[derive(Clone, Debug)]
pub struct TradeDecoder {
    source: String,
}

impl TradeDecoder {
    /// Create a new decoder producing trades attributed to `source` exchange.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Decode a single swap event of the given relation.
    ///
    /// A non-zero `amount0In` means asset0 was swapped for asset1 and the trade
    /// is quoted as `asset0-asset1`, otherwise asset1 was swapped for asset0 and
    /// the trade is quoted as `asset1-asset0`. The volume is the negated input
    /// amount, the price is output over input.
    pub fn decode(
        &self,
        relation: &SwapRelation,
        event: &RawSwapEvent,
        timestamp: i64,
    ) -> Result<Trade, DecodeError> {
        if event.fields.len() <= AMOUNT1_OUT {
            return Err(DecodeError::MissingFields(event.fields.len()));
        }

        let (base, quote, in_idx, out_idx) = if event.fields[AMOUNT0_IN].value != "0" {
            (&relation.asset0, &relation.asset1, AMOUNT0_IN, AMOUNT1_OUT)
        } else {
            (&relation.asset1, &relation.asset0, AMOUNT1_IN, AMOUNT0_OUT)
        };

        let amount_in = amount(event, in_idx);
        let amount_out = amount(event, out_idx);
        if amount_in.is_zero() {
            return Err(DecodeError::ZeroInput(in_idx));
        }
        if amount_out.is_zero() {
            return Err(DecodeError::ZeroOutput(out_idx));
        }
        let signed_in =
            I256::try_from(amount_in).map_err(|_| DecodeError::AmountOutOfRange(in_idx))?;

        let in_converter = num::Converter::new(base.decimals);
        let out_converter = num::Converter::new(quote.decimals);
        let price: UD256 =
            out_converter.from_unsigned(amount_out) / in_converter.from_unsigned::<4>(amount_in);
        let volume: D256 = in_converter.from_signed(-signed_in);

        let symbol = pair_symbol(base, quote);
        Ok(Trade {
            time: timestamp,
            pair: symbol.clone(),
            symbol,
            price,
            volume,
            foreign_trade_id: event.tx_hash.clone(),
            source: self.source.clone(),
            base_token: base.clone(),
            quote_token: quote.clone(),
            verified_pair: true,
        })
    }
}

fn amount(event: &RawSwapEvent, index: usize) -> U256 {
    let raw = &event.fields[index].value;
    num::parse_amount(raw).unwrap_or_else(|| {
        warn!(tx_hash = %event.tx_hash, index, raw, "malformed swap amount, using zero");
        U256::ZERO
    })
}

fn pair_symbol(base: &Asset, quote: &Asset) -> String {
    format!("{}-{}", base.symbol, quote.symbol)
}
