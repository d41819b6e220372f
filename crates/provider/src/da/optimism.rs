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

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use super::ensure_nonzero;
use crate::{ContractReader, DAGasOracle, DAGasRequest, EvmProvider, ProviderResult};

// https://github.com/ethereum-optimism/optimism/blob/develop/packages/contracts-bedrock/src/L2/GasPriceOracle.sol
sol! {
    interface GasPriceOracle {
        function getL1Fee(bytes memory _data) external view returns (uint256);
    }
}

/// Prices L1 data with the bedrock `GasPriceOracle` predeploy.
///
/// The L1 fee is converted to L2 gas at the price the operation will actually
/// pay: `min(maxFeePerGas, baseFee + maxPriorityFeePerGas)`.
pub(crate) struct OptimismBedrockDAGasOracle<P> {
    oracle_address: Address,
    provider: P,
}

impl<P> OptimismBedrockDAGasOracle<P> {
    pub(crate) fn new(oracle_address: Address, provider: P) -> Self {
        Self {
            oracle_address,
            provider,
        }
    }
}

#[async_trait::async_trait]
impl<P: EvmProvider> DAGasOracle for OptimismBedrockDAGasOracle<P> {
    fn requires_base_fee(&self) -> bool {
        true
    }

    async fn estimate_da_gas(&self, request: DAGasRequest) -> ProviderResult<U256> {
        let base_fee = request
            .base_fee
            .ok_or_else(|| anyhow::anyhow!("base fee is required for optimism DA gas"))?;
        let gas_price = ensure_nonzero(
            request
                .max_fee_per_gas
                .min(base_fee.saturating_add(request.max_priority_fee_per_gas)),
            "gas price",
        )?;

        let l1_fee = self
            .provider
            .read_contract(
                self.oracle_address,
                GasPriceOracle::getL1FeeCall {
                    _data: request.calldata,
                },
                None,
            )
            .await?;

        Ok(l1_fee / gas_price)
    }
}
