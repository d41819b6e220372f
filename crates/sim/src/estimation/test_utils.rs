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

//! Node responses for estimation tests.

use alloy_primitives::{aliases::U48, Bytes, U256};
use alloy_sol_types::{SolCall, SolError};
use opgas_contracts::{
    common::CallGasEstimator,
    v0_6::IEntryPoint as IEntryPointV0_6,
    v0_7::{IEntryPoint as IEntryPointV0_7, IEntryPointSimulations},
};
use opgas_provider::ProviderError;
use serde_json::json;

/// A reverted eth_call carrying `data` the way geth reports it
pub(crate) fn reverted(data: impl Into<Bytes>) -> ProviderError {
    ProviderError::Rpc {
        code: 3,
        message: "execution reverted".to_string(),
        data: Some(json!(data.into().to_string())),
    }
}

pub(crate) fn execution_result_v0_6(
    pre_op_gas: u64,
    paid: u64,
    target_success: bool,
    target_result: Bytes,
) -> ProviderError {
    reverted(
        IEntryPointV0_6::ExecutionResult {
            preOpGas: U256::from(pre_op_gas),
            paid: U256::from(paid),
            validAfter: U48::ZERO,
            validUntil: U48::ZERO,
            targetSuccess: target_success,
            targetResult: target_result,
        }
        .abi_encode(),
    )
}

pub(crate) fn failed_op_v0_6(reason: &str) -> ProviderError {
    reverted(
        IEntryPointV0_6::FailedOp {
            opIndex: U256::ZERO,
            reason: reason.to_string(),
        }
        .abi_encode(),
    )
}

pub(crate) fn failed_op_v0_7(reason: &str) -> ProviderError {
    reverted(
        IEntryPointV0_7::FailedOp {
            opIndex: U256::ZERO,
            reason: reason.to_string(),
        }
        .abi_encode(),
    )
}

/// Return data of a v0.7 `simulateHandleOp` that ran the target
pub(crate) fn execution_result_v0_7(
    pre_op_gas: u64,
    paid: u64,
    target_success: bool,
    target_result: Bytes,
) -> Bytes {
    IEntryPointSimulations::simulateHandleOpCall::abi_encode_returns(
        &IEntryPointSimulations::ExecutionResult {
            preOpGas: U256::from(pre_op_gas),
            paid: U256::from(paid),
            accountValidationData: U256::ZERO,
            paymasterValidationData: U256::ZERO,
            targetSuccess: target_success,
            targetResult: target_result,
        },
    )
    .into()
}

pub(crate) fn call_gas_result(gas_estimate: u64, num_rounds: u64) -> Bytes {
    CallGasEstimator::EstimateCallGasResult {
        gasEstimate: U256::from(gas_estimate),
        numRounds: U256::from(num_rounds),
    }
    .abi_encode()
    .into()
}

pub(crate) fn call_gas_continuation(min_gas: u64, max_gas: u64, num_rounds: u64) -> Bytes {
    CallGasEstimator::EstimateCallGasContinuation {
        minGas: U256::from(min_gas),
        maxGas: U256::from(max_gas),
        numRounds: U256::from(num_rounds),
    }
    .abi_encode()
    .into()
}
