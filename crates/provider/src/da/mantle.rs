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
use crate::{
    ContractReader, DAGasOracle, DAGasRequest, EvmProvider, ProviderError, ProviderResult,
};

// https://github.com/mantlenetworkio/mantle-v2/blob/develop/packages/contracts-bedrock/contracts/L2/GasPriceOracle.sol
sol! {
    interface MantleGasPriceOracle {
        function tokenRatio() external view returns (uint256);
        function scalar() external view returns (uint256);
        function l1BaseFee() external view returns (uint256);
        function getL1GasUsed(bytes memory _data) external view returns (uint256);
    }
}

/// `scalar` carries six decimals on Mantle
const DIVISION_FACTOR: u64 = 1_000_000;

/// Prices L1 data on Mantle, where the rollup fee is scaled by the MNT/ETH
/// token ratio.
pub(crate) struct MantleDAGasOracle<P> {
    oracle_address: Address,
    provider: P,
}

impl<P> MantleDAGasOracle<P> {
    pub(crate) fn new(oracle_address: Address, provider: P) -> Self {
        Self {
            oracle_address,
            provider,
        }
    }
}

#[async_trait::async_trait]
impl<P: EvmProvider> DAGasOracle for MantleDAGasOracle<P> {
    fn requires_base_fee(&self) -> bool {
        false
    }

    async fn estimate_da_gas(&self, request: DAGasRequest) -> ProviderResult<U256> {
        let max_fee_per_gas = ensure_nonzero(request.max_fee_per_gas, "max fee per gas")?;
        let rlp_data = alloy_rlp::encode(&request.calldata[..]);

        let (token_ratio, scalar, l1_base_fee, l1_gas_used) = tokio::try_join!(
            self.provider.read_contract(
                self.oracle_address,
                MantleGasPriceOracle::tokenRatioCall {},
                None
            ),
            self.provider.read_contract(
                self.oracle_address,
                MantleGasPriceOracle::scalarCall {},
                None
            ),
            self.provider.read_contract(
                self.oracle_address,
                MantleGasPriceOracle::l1BaseFeeCall {},
                None
            ),
            self.provider.read_contract(
                self.oracle_address,
                MantleGasPriceOracle::getL1GasUsedCall {
                    _data: rlp_data.into(),
                },
                None
            ),
        )?;

        let rollup_fee = l1_gas_used
            .checked_mul(l1_base_fee)
            .and_then(|fee| fee.checked_mul(token_ratio))
            .and_then(|fee| fee.checked_mul(scalar))
            .ok_or_else(|| {
                ProviderError::ContractError(format!(
                    "mantle rollup fee overflows: gas used {l1_gas_used}, l1 base fee \
                     {l1_base_fee}, token ratio {token_ratio}, scalar {scalar}"
                ))
            })?
            / U256::from(DIVISION_FACTOR);

        Ok(rollup_fee / max_fee_per_gas)
    }
}
