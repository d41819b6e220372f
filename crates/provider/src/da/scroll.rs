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

// https://github.com/scroll-tech/scroll/blob/develop/contracts/src/L2/predeploys/L1GasPriceOracle.sol
sol! {
    interface L1GasPriceOracle {
        function getL1Fee(bytes memory _data) external view returns (uint256);
    }
}

/// Prices L1 data with the `L1GasPriceOracle` predeploy used by Scroll and Morph.
pub(crate) struct ScrollDAGasOracle<P> {
    oracle_address: Address,
    provider: P,
}

impl<P> ScrollDAGasOracle<P> {
    pub(crate) fn new(oracle_address: Address, provider: P) -> Self {
        Self {
            oracle_address,
            provider,
        }
    }
}

#[async_trait::async_trait]
impl<P: EvmProvider> DAGasOracle for ScrollDAGasOracle<P> {
    fn requires_base_fee(&self) -> bool {
        false
    }

    async fn estimate_da_gas(&self, request: DAGasRequest) -> ProviderResult<U256> {
        let max_fee_per_gas = ensure_nonzero(request.max_fee_per_gas, "max fee per gas")?;

        let l1_fee = self
            .provider
            .read_contract(
                self.oracle_address,
                L1GasPriceOracle::getL1FeeCall {
                    _data: request.calldata,
                },
                None,
            )
            .await?;

        Ok(l1_fee / max_fee_per_gas)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use alloy_sol_types::SolValue;

    use super::*;
    use crate::{MockEvmProvider, ProviderError};

    const ORACLE: Address = address!("5300000000000000000000000000000000000002");

    #[tokio::test]
    async fn test_l1_fee_divided_by_max_fee() {
        let mut provider = MockEvmProvider::new();
        provider
            .expect_call()
            .times(1)
            .returning(|_, _| Ok(U256::from(90_000).abi_encode().into()));

        let oracle = ScrollDAGasOracle::new(ORACLE, provider);
        let gas = oracle
            .estimate_da_gas(DAGasRequest {
                max_fee_per_gas: U256::from(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(gas, U256::from(30_000));
    }

    #[tokio::test]
    async fn test_undecodable_return() {
        let mut provider = MockEvmProvider::new();
        provider
            .expect_call()
            .returning(|_, _| Ok(alloy_primitives::Bytes::new()));

        let oracle = ScrollDAGasOracle::new(ORACLE, provider);
        let err = oracle
            .estimate_da_gas(DAGasRequest {
                max_fee_per_gas: U256::from(1),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ContractError(_)));
    }
}
