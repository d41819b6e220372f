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

//! Per-chain data availability gas oracles.

use std::sync::Arc;

use alloy_primitives::U256;
use opgas_types::chain::{ChainSpec, DAGasOracleType};

use crate::{DAGasOracle, DAGasRequest, EvmProvider, ProviderError, ProviderResult};

mod arbitrum;
pub(crate) use arbitrum::ArbitrumNitroDAGasOracle;
mod mantle;
pub(crate) use mantle::MantleDAGasOracle;
mod optimism;
pub(crate) use optimism::OptimismBedrockDAGasOracle;
mod scroll;
pub(crate) use scroll::ScrollDAGasOracle;

/// Oracle for chains without a data availability fee
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ZeroDAGasOracle;

#[async_trait::async_trait]
impl DAGasOracle for ZeroDAGasOracle {
    fn requires_base_fee(&self) -> bool {
        false
    }

    async fn estimate_da_gas(&self, _request: DAGasRequest) -> ProviderResult<U256> {
        Ok(U256::ZERO)
    }
}

/// Build the DA gas oracle configured for a chain
pub fn new_da_gas_oracle<P>(chain_spec: &ChainSpec, provider: P) -> Arc<dyn DAGasOracle>
where
    P: EvmProvider + 'static,
{
    let address = chain_spec.da_gas_oracle_contract_address;
    match chain_spec.da_gas_oracle_type {
        DAGasOracleType::None => Arc::new(ZeroDAGasOracle),
        DAGasOracleType::OptimismBedrock => {
            Arc::new(OptimismBedrockDAGasOracle::new(address, provider))
        }
        DAGasOracleType::ArbitrumNitro => Arc::new(ArbitrumNitroDAGasOracle::new(address, provider)),
        DAGasOracleType::Mantle => Arc::new(MantleDAGasOracle::new(address, provider)),
        DAGasOracleType::Scroll => Arc::new(ScrollDAGasOracle::new(address, provider)),
    }
}

/// Fee oracles report wei, dividing by a zero gas price is a caller error
pub(crate) fn ensure_nonzero(value: U256, what: &str) -> ProviderResult<U256> {
    if value.is_zero() {
        return Err(ProviderError::Other(anyhow::anyhow!("{what} cannot be zero")));
    }
    Ok(value)
}
