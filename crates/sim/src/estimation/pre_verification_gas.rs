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
use opgas_provider::{DAGasOracle, DAGasRequest};
use opgas_types::{chain::ChainSpec, UserOperation};
use tracing::{debug, instrument};

use super::GasEstimationError;

/// Static calldata and overhead gas plus the chain's data availability gas.
///
/// Fails before any network call when the oracle needs a base fee and none
/// was supplied.
#[instrument(skip_all)]
pub(crate) async fn calculate_pre_verification_gas<UO: UserOperation>(
    chain_spec: &ChainSpec,
    entry_point: Address,
    da_gas_oracle: &dyn DAGasOracle,
    op: &UO,
    base_fee: Option<U256>,
) -> Result<U256, GasEstimationError> {
    if da_gas_oracle.requires_base_fee() && base_fee.is_none() {
        return Err(GasEstimationError::MissingInput("base fee"));
    }

    let static_gas = op.static_pre_verification_gas(chain_spec);
    let da_gas = da_gas_oracle
        .estimate_da_gas(DAGasRequest {
            entry_point,
            calldata: op.handle_ops_calldata(Address::repeat_byte(0xff)),
            max_fee_per_gas: op.max_fee_per_gas(),
            max_priority_fee_per_gas: op.max_priority_fee_per_gas(),
            base_fee,
        })
        .await?;
    debug!("pre-verification gas: {static_gas} static, {da_gas} data availability");

    Ok(static_gas.saturating_add(da_gas))
}
