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

use crate::{ContractReader, DAGasOracle, DAGasRequest, EvmProvider, ProviderResult};

// https://github.com/OffchainLabs/nitro-contracts/blob/main/src/node-interface/NodeInterface.sol
sol! {
    interface NodeInterface {
        function gasEstimateL1Component(
            address to,
            bool contractCreation,
            bytes calldata data
        )
            external
            payable
            returns (uint64 gasEstimateForL1, uint256 baseFee, uint256 l1BaseFeeEstimate);
    }
}

/// Reads the L1 component of a transaction's gas from the nitro node interface.
///
/// The result is already denominated in L2 gas.
pub(crate) struct ArbitrumNitroDAGasOracle<P> {
    node_interface_address: Address,
    provider: P,
}

impl<P> ArbitrumNitroDAGasOracle<P> {
    pub(crate) fn new(node_interface_address: Address, provider: P) -> Self {
        Self {
            node_interface_address,
            provider,
        }
    }
}

#[async_trait::async_trait]
impl<P: EvmProvider> DAGasOracle for ArbitrumNitroDAGasOracle<P> {
    fn requires_base_fee(&self) -> bool {
        false
    }

    async fn estimate_da_gas(&self, request: DAGasRequest) -> ProviderResult<U256> {
        let ret = self
            .provider
            .read_contract(
                self.node_interface_address,
                NodeInterface::gasEstimateL1ComponentCall {
                    to: request.entry_point,
                    contractCreation: false,
                    data: request.calldata,
                },
                None,
            )
            .await?;

        Ok(U256::from(ret.gasEstimateForL1))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes};
    use alloy_sol_types::{SolCall, SolValue};

    use super::*;
    use crate::MockEvmProvider;

    // only reachable through eth_call
    const NODE_INTERFACE_ADDRESS: Address = address!("00000000000000000000000000000000000000C8");

    #[tokio::test]
    async fn test_gas_estimate_added_directly() {
        let entry_point = Address::repeat_byte(0x11);
        let mut provider = MockEvmProvider::new();
        provider.expect_call().times(1).returning(move |call, _| {
            assert_eq!(call.to, NODE_INTERFACE_ADDRESS);
            let decoded =
                NodeInterface::gasEstimateL1ComponentCall::abi_decode(&call.data).unwrap();
            assert_eq!(decoded.to, entry_point);
            assert!(!decoded.contractCreation);
            Ok((7_777u64, U256::from(100), U256::from(30)).abi_encode().into())
        });

        let oracle = ArbitrumNitroDAGasOracle::new(NODE_INTERFACE_ADDRESS, provider);
        let gas = oracle
            .estimate_da_gas(DAGasRequest {
                entry_point,
                calldata: bytes!("01"),
                // fees are irrelevant, the estimate is in gas units
                max_fee_per_gas: U256::from(1_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(gas, U256::from(7_777));
    }
}
