use crate::error::RpcError;

/// Address type prefix of contract addresses (P2C).
const CONTRACT_PREFIX: u8 = 0x03;

/// Number of address groups on Alephium mainnet.
const GROUPS: u8 = 4;

/// Token ID of the native ALPH token.
pub const ALPH_TOKEN_ID: [u8; 32] = [0; 32];

/// Base58 contract address of the contract (or token) ID.
pub fn contract_address(id: &[u8; 32]) -> String {
    let mut bytes = Vec::with_capacity(33);
    bytes.push(CONTRACT_PREFIX);
    bytes.extend_from_slice(id);
    bs58::encode(bytes).into_string()
}

/// Contract ID encoded in the base58 contract address.
pub fn contract_id(address: &str) -> Result<[u8; 32], RpcError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| RpcError::InvalidRequest(format!("invalid address {address}: {e}")))?;
    match bytes.split_first() {
        Some((&CONTRACT_PREFIX, id)) => id.try_into().map_err(|_| {
            RpcError::InvalidRequest(format!("invalid contract id length in {address}"))
        }),
        _ => Err(RpcError::InvalidRequest(format!(
            "{address} is not a contract address"
        ))),
    }
}

/// Group the contract lives in, required by contract calls.
pub fn contract_group(address: &str) -> Result<u8, RpcError> {
    contract_id(address).map(|id| id[31] % GROUPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_address_roundtrip() {
        let mut id = [0u8; 32];
        id[0] = 0xab;
        id[31] = 0x07;

        let address = contract_address(&id);
        assert_eq!(contract_id(&address).unwrap(), id);
        assert_eq!(contract_group(&address).unwrap(), 3);
    }

    #[test]
    fn test_native_token_address() {
        let address = contract_address(&ALPH_TOKEN_ID);
        assert_eq!(address, "tgx7VNFoP9DJiFMFgXXtafQZkUvyEdDHT9ryamHJYrjq");
        assert_eq!(contract_group(&address).unwrap(), 0);
    }

    #[test]
    fn test_rejects_non_contract_address() {
        // P2PKH prefix
        let address = bs58::encode([0u8; 33]).into_string();
        assert!(matches!(
            contract_id(&address),
            Err(RpcError::InvalidRequest(_))
        ));
        assert!(contract_id("not-base58-0OIl").is_err());
        assert!(contract_id(&bs58::encode([CONTRACT_PREFIX; 5]).into_string()).is_err());
    }
}
