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

//! Chain specification for opgas

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::EntryPointVersion;

const ENTRY_POINT_ADDRESS_V6_0: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");
const ENTRY_POINT_ADDRESS_V7_0: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Chain specification for opgas
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChainSpec {
    /*
     * Chain constants
     */
    /// name for logging purposes, e.g. "Ethereum", no logic is performed on this
    pub name: String,
    /// chain id
    pub id: u64,
    /// entry point address for v0_6
    pub entry_point_address_v0_6: Address,
    /// entry point address for v0_7
    pub entry_point_address_v0_7: Address,

    /*
     * Node capabilities
     */
    /// true if the chain's nodes accept state overrides on `eth_call`
    pub supports_state_override: bool,
    /// true if the chain's nodes reliably apply code overrides on `eth_call`
    pub supports_code_override: bool,

    /*
     * Pre-verification gas
     */
    /// Intrinsic gas cost for a transaction, amortized over the bundle
    pub transaction_intrinsic_gas: u64,
    /// Per user operation gas cost for v0.6
    pub per_user_op_v0_6_gas: u64,
    /// Per user operation gas cost for v0.7
    pub per_user_op_v0_7_gas: u64,
    /// Gas cost for a user operation word in a bundle transaction
    pub per_user_op_word_gas: u64,
    /// Gas cost for a zero byte in calldata
    pub calldata_zero_byte_gas: u64,
    /// Gas cost for a non-zero byte in calldata
    pub calldata_non_zero_byte_gas: u64,
    /// Number of operations the fixed transaction cost is amortized over
    pub bundle_size: u64,
    /// type of oracle contract for pricing data availability in preVerificationGas
    pub da_gas_oracle_type: DAGasOracleType,
    /// address of the data availability oracle contract
    pub da_gas_oracle_contract_address: Address,

    /*
     * Degraded mode
     *
     * Used only when the chain's nodes do not support state overrides.
     */
    /// preVerificationGas forced on the probe operation
    pub fallback_pre_verification_gas: u64,
    /// verificationGasLimit forced on the probe operation
    pub fallback_verification_gas_limit: u64,
    /// callGasLimit forced on the probe operation
    pub fallback_call_gas_limit: u64,
    /// maxFeePerGas and maxPriorityFeePerGas forced on the probe operation
    pub fallback_max_fee_per_gas: u64,
}

/// Type of oracle contract for pricing data availability in preVerificationGas
#[derive(Clone, Copy, Debug, Deserialize, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DAGasOracleType {
    /// No data availability fee
    #[default]
    None,
    /// Arbitrum Nitro `NodeInterface` precompile
    ArbitrumNitro,
    /// Optimism Bedrock `GasPriceOracle` predeploy
    OptimismBedrock,
    /// Mantle `GasPriceOracle` with token ratio
    Mantle,
    /// Scroll style `L1GasPriceOracle`, also used by Morph
    Scroll,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            id: 0,
            entry_point_address_v0_6: ENTRY_POINT_ADDRESS_V6_0,
            entry_point_address_v0_7: ENTRY_POINT_ADDRESS_V7_0,
            supports_state_override: true,
            supports_code_override: true,
            transaction_intrinsic_gas: 21_000,
            per_user_op_v0_6_gas: 18_300,
            per_user_op_v0_7_gas: 19_500,
            per_user_op_word_gas: 4,
            calldata_zero_byte_gas: 4,
            calldata_non_zero_byte_gas: 16,
            bundle_size: 1,
            da_gas_oracle_type: DAGasOracleType::default(),
            da_gas_oracle_contract_address: Address::ZERO,
            fallback_pre_verification_gas: 1_000_000,
            fallback_verification_gas_limit: 10_000_000,
            fallback_call_gas_limit: 10_000_000,
            fallback_max_fee_per_gas: 1_000_000,
        }
    }
}

impl ChainSpec {
    /// The entry point address configured for the given version
    pub fn entry_point_address(&self, version: EntryPointVersion) -> Address {
        match version {
            EntryPointVersion::V0_6 => self.entry_point_address_v0_6,
            EntryPointVersion::V0_7 => self.entry_point_address_v0_7,
        }
    }

    /// The per user operation overhead for the given version
    pub fn per_user_op_gas(&self, version: EntryPointVersion) -> u64 {
        match version {
            EntryPointVersion::V0_6 => self.per_user_op_v0_6_gas,
            EntryPointVersion::V0_7 => self.per_user_op_v0_7_gas,
        }
    }
}
