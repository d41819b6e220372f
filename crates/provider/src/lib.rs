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

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Opgas providers
//!
//! A provider is a type that provides access to blockchain data and functions.
//! The estimation engine only needs `eth_call` with state overrides, so the
//! surface here is small: [`EvmProvider`] for raw calls, [`ContractReader`] for
//! typed view calls, and [`DAGasOracle`] for per-chain data availability fees.

mod alloy;
pub use alloy::{evm::AlloyEvmProvider, new_alloy_evm_provider, new_alloy_provider};

mod da;
pub use da::new_da_gas_oracle;

mod traits;
// re-export alloy RPC types
pub use alloy_rpc_types_eth::{
    state::{AccountOverride, StateOverride},
    BlockId, BlockNumberOrTag,
};
#[cfg(any(test, feature = "test-utils"))]
pub use traits::test_utils::*;
pub use traits::*;
