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

//! Trait for interacting with chain data and contracts.

use std::future::Future;

use alloy_primitives::{Address, Bytes};
use alloy_rpc_types_eth::{state::StateOverride, BlockId};
use alloy_sol_types::SolCall;
#[cfg(feature = "test-utils")]
use mockall::automock;

use super::error::{ProviderError, ProviderResult};

/// A struct representing an EVM call
#[derive(Clone, Debug, Default)]
pub struct EvmCall {
    /// The address to call
    pub to: Address,
    /// Call data
    pub data: Bytes,
    /// Caller, left to the node when unset
    pub from: Option<Address>,
    /// Gas limit for the call, left to the node when unset
    pub gas: Option<u64>,
    /// State overrides, omitted from the request entirely when unset
    pub state_override: Option<StateOverride>,
}

/// Trait for interacting with chain data and contracts.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait EvmProvider: Send + Sync {
    /// Simulate a transaction via an eth_call.
    ///
    /// A reverted call is returned as [`ProviderError::Rpc`] carrying the
    /// node's error object unmodified.
    async fn call(&self, call: EvmCall, block: Option<BlockId>) -> ProviderResult<Bytes>;

    /// Get the base fee per gas of the pending block
    async fn get_pending_base_fee(&self) -> ProviderResult<u128>;

    /// Get the chain id reported by the node
    async fn get_chain_id(&self) -> ProviderResult<u64>;
}

/// Typed read-only contract calls on top of [`EvmProvider::call`]
pub trait ContractReader: EvmProvider {
    /// Calls a view function at `to` and decodes its return value
    fn read_contract<C>(
        &self,
        to: Address,
        call: C,
        block: Option<BlockId>,
    ) -> impl Future<Output = ProviderResult<C::Return>> + Send
    where
        C: SolCall + Send + Sync,
        C::Return: Send,
    {
        async move {
            let data = self
                .call(
                    EvmCall {
                        to,
                        data: call.abi_encode().into(),
                        ..Default::default()
                    },
                    block,
                )
                .await?;

            C::abi_decode_returns(&data).map_err(|e| {
                ProviderError::ContractError(format!(
                    "failed to decode {} return data: {e}",
                    C::SIGNATURE
                ))
            })
        }
    }
}

impl<P: EvmProvider + ?Sized> ContractReader for P {}
