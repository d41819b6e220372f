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

use alloy_primitives::Bytes;
use alloy_provider::Provider as AlloyProvider;
use alloy_rpc_types_eth::{BlockId, BlockNumberOrTag, TransactionInput, TransactionRequest};
use anyhow::Context;
use tracing::instrument;

use crate::{EvmCall, EvmProvider, ProviderResult};

/// Evm Provider implementation using [alloy-provider](https://github.com/alloy-rs/alloy-rs)
#[derive(Clone)]
pub struct AlloyEvmProvider<AP> {
    inner: AP,
}

impl<AP> AlloyEvmProvider<AP> {
    /// Create a new `AlloyEvmProvider`
    pub fn new(inner: AP) -> Self {
        Self { inner }
    }
}

impl<AP: AlloyProvider> From<AP> for AlloyEvmProvider<AP> {
    fn from(inner: AP) -> Self {
        Self::new(inner)
    }
}

#[async_trait::async_trait]
impl<AP> EvmProvider for AlloyEvmProvider<AP>
where
    AP: AlloyProvider,
{
    #[instrument(skip_all, fields(to = %call.to))]
    async fn call(&self, call: EvmCall, block: Option<BlockId>) -> ProviderResult<Bytes> {
        let EvmCall {
            to,
            data,
            from,
            gas,
            state_override,
        } = call;

        let mut tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));
        if let Some(from) = from {
            tx = tx.from(from);
        }
        if let Some(gas) = gas {
            tx = tx.gas_limit(gas);
        }

        let mut eth_call = self.inner.call(tx);
        if let Some(block) = block {
            eth_call = eth_call.block(block);
        }
        if let Some(state_override) = state_override {
            eth_call = eth_call.overrides(state_override);
        }

        Ok(eth_call.await?)
    }

    async fn get_pending_base_fee(&self) -> ProviderResult<u128> {
        let base_fee = self
            .inner
            .get_block_by_number(BlockNumberOrTag::Pending)
            .await?
            .context("pending block should exist")?
            .header
            .base_fee_per_gas
            .context("pending block should have a nonempty base fee")?;
        Ok(base_fee.into())
    }

    async fn get_chain_id(&self) -> ProviderResult<u64> {
        Ok(self.inner.get_chain_id().await?)
    }
}
