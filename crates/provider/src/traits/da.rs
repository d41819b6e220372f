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

use alloy_primitives::{Address, Bytes, U256};

use crate::ProviderResult;

/// Inputs for pricing the data availability cost of one operation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DAGasRequest {
    /// Entry point the operation is submitted to
    pub entry_point: Address,
    /// `handleOps` calldata carrying the operation
    pub calldata: Bytes,
    /// The operation's max fee per gas
    pub max_fee_per_gas: U256,
    /// The operation's max priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Current base fee, only some oracles need it
    pub base_fee: Option<U256>,
}

/// Trait for a DA gas oracle
///
/// Implementations convert a rollup's data publishing fee into L2 gas units
/// that are added on top of the static pre-verification gas.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait DAGasOracle: Send + Sync {
    /// True if [`DAGasOracle::estimate_da_gas`] fails without a base fee
    fn requires_base_fee(&self) -> bool;

    /// Estimate the DA gas for the given calldata
    async fn estimate_da_gas(&self, request: DAGasRequest) -> ProviderResult<U256>;
}
