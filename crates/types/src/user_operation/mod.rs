// This file is part of opgas.
//
// opgas is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// opgas is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with opgas.
// If not, see https://www.gnu.org/licenses/.

use std::fmt::Debug;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// User Operation types for Entry Point v0.6
pub mod v0_6;
/// User Operation types for Entry Point v0.7
pub mod v0_7;

use crate::chain::ChainSpec;

/// ERC-4337 Entry point version
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum EntryPointVersion {
    /// Version 0.6
    #[serde(rename = "v0.6")]
    #[strum(to_string = "v0.6", serialize = "0.6")]
    V0_6,
    /// Version 0.7
    #[serde(rename = "v0.7")]
    #[strum(to_string = "v0.7", serialize = "0.7")]
    V0_7,
}

/// Unique identifier for a user operation from a given sender
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UserOperationId {
    /// sender of user operation
    pub sender: Address,
    /// nonce of user operation
    pub nonce: U256,
}

/// Gas and fee fields to replace on a copy of a user operation.
///
/// Fields left as `None` keep the value of the source operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GasOverrides {
    /// Replacement pre verification gas
    pub pre_verification_gas: Option<U256>,
    /// Replacement verification gas limit
    pub verification_gas_limit: Option<U256>,
    /// Replacement call gas limit
    pub call_gas_limit: Option<U256>,
    /// Replacement max fee per gas
    pub max_fee_per_gas: Option<U256>,
    /// Replacement max priority fee per gas
    pub max_priority_fee_per_gas: Option<U256>,
    /// Replacement paymaster verification gas limit, ignored by v0.6
    pub paymaster_verification_gas_limit: Option<U256>,
}

/// User operation trait
///
/// Operations are values: estimation never mutates a shared operation, it builds
/// an independent copy through [`UserOperation::with_gas`].
pub trait UserOperation: Debug + Clone + Send + Sync + 'static {
    /// Get the entry point version for this UO
    fn entry_point_version() -> EntryPointVersion;

    /*
     * Getters
     */

    /// Get the user operation sender address
    fn sender(&self) -> Address;

    /// Get the user operation nonce
    fn nonce(&self) -> U256;

    /// Get the user operation factory address, if any
    fn factory(&self) -> Option<Address>;

    /// Get the user operation paymaster address, if any
    fn paymaster(&self) -> Option<Address>;

    /// Get the user operation calldata
    fn call_data(&self) -> &Bytes;

    /// Returns the call gas limit
    fn call_gas_limit(&self) -> U256;

    /// Returns the verification gas limit
    fn verification_gas_limit(&self) -> U256;

    /// Returns the pre verification gas
    fn pre_verification_gas(&self) -> U256;

    /// Returns the max fee per gas
    fn max_fee_per_gas(&self) -> U256;

    /// Returns the max priority fee per gas
    fn max_priority_fee_per_gas(&self) -> U256;

    /// Hash of the operation as computed by the entry point
    fn hash(&self, entry_point: Address, chain_id: u64) -> B256;

    /// Returns a copy of this operation with the given gas fields replaced
    fn with_gas(&self, overrides: &GasOverrides) -> Self;

    /// ABI encoding of the on-chain form of the operation with the signature
    /// replaced by its keccak digest
    fn abi_encode_with_hashed_signature(&self) -> Vec<u8>;

    /// Calldata of `handleOps([op], beneficiary)` for this single operation
    fn handle_ops_calldata(&self, beneficiary: Address) -> Bytes;

    /*
     * Provided
     */

    /// Gets the user operation id
    fn id(&self) -> UserOperationId {
        UserOperationId {
            sender: self.sender(),
            nonce: self.nonce(),
        }
    }

    /// Calldata and overhead cost of including this operation in a bundle,
    /// before any data availability fee.
    ///
    /// The fixed transaction cost is amortized over the configured bundle size
    /// and rounded to the nearest unit of gas.
    fn static_pre_verification_gas(&self, chain_spec: &ChainSpec) -> U256 {
        let encoded = self.abi_encode_with_hashed_signature();
        let bundle_size = U256::from(chain_spec.bundle_size.max(1));
        let fixed = U256::from(chain_spec.transaction_intrinsic_gas);

        op_calldata_gas_cost(
            &encoded,
            U256::from(chain_spec.calldata_zero_byte_gas),
            U256::from(chain_spec.calldata_non_zero_byte_gas),
            U256::from(chain_spec.per_user_op_word_gas),
        ) + U256::from(chain_spec.per_user_op_gas(Self::entry_point_version()))
            + (fixed + bundle_size / U256::from(2)) / bundle_size
    }
}

/// Gas estimate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    /// Pre verification gas
    pub pre_verification_gas: U256,
    /// Verification gas limit
    pub verification_gas_limit: U256,
    /// Call gas limit
    pub call_gas_limit: U256,
    /// Paymaster verification gas limit
    ///
    /// v0.6: unused
    ///
    /// v0.7: populated only if the user operation has a paymaster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Paymaster post op gas limit
    ///
    /// v0.6: unused
    ///
    /// v0.7: populated only if the user operation has a paymaster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Timestamp after which the operation is valid, if validation bounded it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_after: Option<u64>,
    /// Timestamp until which the operation is valid, if validation bounded it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<u64>,
}

pub(crate) fn op_calldata_gas_cost(
    encoded_op: &[u8],
    zero_byte_cost: U256,
    non_zero_byte_cost: U256,
    per_word_cost: U256,
) -> U256 {
    let length_in_words = (encoded_op.len() + 31) >> 5; // ceil(encoded_op.len() / 32)
    let call_data_cost: U256 = encoded_op
        .iter()
        .map(|&x| {
            if x == 0 {
                zero_byte_cost
            } else {
                non_zero_byte_cost
            }
        })
        .fold(U256::ZERO, |a, b| a + b);

    call_data_cost + per_word_cost * U256::from(length_in_words)
}

/// Packs two values into a 32 byte word, each taking 16 bytes.
///
/// Values wider than 128 bits saturate to `u128::MAX`.
pub(crate) fn concat_128(high: U256, low: U256) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&saturating_u128(high).to_be_bytes());
    word[16..].copy_from_slice(&saturating_u128(low).to_be_bytes());
    B256::from(word)
}

pub(crate) fn saturating_u128(value: U256) -> u128 {
    u128::try_from(value).unwrap_or(u128::MAX)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b256;

    use super::*;

    #[test]
    fn test_op_calldata_gas_cost() {
        // 2 zero bytes, 2 non-zero bytes, 1 word
        let cost = op_calldata_gas_cost(
            &[0, 1, 0, 2],
            U256::from(4),
            U256::from(16),
            U256::from(4),
        );
        assert_eq!(cost, U256::from(4 + 4 + 16 + 16 + 4));
    }

    #[test]
    fn test_concat_128() {
        let word = concat_128(U256::from(0x0114fc), U256::from(0x12c9b5));
        assert_eq!(
            word,
            b256!("000000000000000000000000000114fc0000000000000000000000000012c9b5")
        );
    }

    #[test]
    fn test_concat_128_saturates() {
        let word = concat_128(U256::MAX, U256::from(1));
        assert_eq!(
            word,
            b256!("ffffffffffffffffffffffffffffffff00000000000000000000000000000001")
        );
    }

    #[test]
    fn test_entry_point_version_parse() {
        assert_eq!(
            "v0.7".parse::<EntryPointVersion>().unwrap(),
            EntryPointVersion::V0_7
        );
        assert_eq!(
            "0.6".parse::<EntryPointVersion>().unwrap(),
            EntryPointVersion::V0_6
        );
        assert_eq!(EntryPointVersion::V0_6.to_string(), "v0.6");
    }
}
