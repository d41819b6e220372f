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

//! Normalizes raw simulation outcomes.
//!
//! Every `eth_call` made during estimation ends here: either as return data,
//! or as a node error that may carry revert bytes somewhere inside its `data`
//! member. Anything that cannot be decoded into a known shape becomes
//! [`GasEstimationError::UnexpectedResponse`].

use alloy_primitives::{hex, Address, Bytes, U256};
use alloy_sol_types::{Panic, Revert, SolError};
use opgas_provider::{ProviderError, ProviderResult};
use opgas_types::{ValidTimeRange, ValidationRevert};
use opgas_utils::{eth, json_rpc};
use serde_json::Value;

use super::{GasEstimationError, SimulatedOperation};

/// Locations of revert data inside a JSON-RPC error's `data` member, tried in order.
///
/// Most nodes put the hex string directly in `data`, some wrap it one or two
/// levels deeper.
const REVERT_DATA_PATHS: &[&[&str]] = &[
    &[],
    &["data"],
    &["cause", "data"],
    &["cause", "cause", "data"],
    &["originalError", "data"],
];

/// Outcome of a `simulateHandleOp` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulationResult {
    /// Validation or execution failed with a reason from the entry point
    Failed(ValidationRevert),
    /// The operation ran to completion
    Execution(ExecutionResult),
}

/// Result of a completed `simulateHandleOp`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Gas used by validation, including pre-verification gas
    pub pre_op_gas: U256,
    /// Total paid by the operation, in wei
    pub paid: U256,
    /// Window reported by account and paymaster validation
    pub valid_time_range: ValidTimeRange,
    /// Whether the target call succeeded
    pub target_success: bool,
    /// Return or revert data of the target call
    pub target_result: Bytes,
}

/// Classifies the outcome of a `simulateHandleOp` eth_call
pub(crate) fn classify_simulate_handle_op<UO: SimulatedOperation>(
    ret: ProviderResult<Bytes>,
) -> Result<SimulationResult, GasEstimationError> {
    match ret {
        Ok(data) => UO::decode_simulate_handle_op_return(&data),
        Err(err) => UO::classify_revert(&revert_data(err)?),
    }
}

/// Pulls revert data out of a failed eth_call.
///
/// Errors that carry no revert data are returned as they are, unless the
/// node says the call reverted, in which case the envelope was not understood.
pub(crate) fn revert_data(err: ProviderError) -> Result<Bytes, GasEstimationError> {
    match err {
        ProviderError::Rpc {
            code,
            message,
            data,
        } => {
            if let Some(revert_data) = data.as_ref().and_then(find_revert_data) {
                return Ok(revert_data);
            }
            if code == json_rpc::EXECUTION_REVERTED_CODE
                || json_rpc::check_execution_reverted(&message)
            {
                let payload = data.map(|d| d.to_string()).unwrap_or_default();
                tracing::warn!("reverted call without recognizable revert data: {payload}");
                return Err(GasEstimationError::UnexpectedResponse {
                    message: format!("revert without recognizable data: {message}"),
                    payload,
                });
            }
            Err(ProviderError::Rpc {
                code,
                message,
                data,
            }
            .into())
        }
        other => Err(other.into()),
    }
}

fn find_revert_data(data: &Value) -> Option<Bytes> {
    REVERT_DATA_PATHS
        .iter()
        .find_map(|path| json_rpc::value_at_path(data, path).and_then(json_rpc::hex_bytes))
}

/// Decodes `Error(string)` and `Panic(uint256)` reverts
pub(crate) fn decode_generic_revert(data: &Bytes) -> Option<ValidationRevert> {
    if let Ok(revert) = Revert::abi_decode(data) {
        Some(revert.into())
    } else {
        Panic::abi_decode(data).ok().map(Into::into)
    }
}

pub(crate) fn signature_validation_failed(aggregator: Address) -> ValidationRevert {
    ValidationRevert::EntryPoint(format!(
        "signature validation failed for aggregator {aggregator}"
    ))
}

/// Error for revert data that matched none of the known shapes
pub(crate) fn unrecognized(what: &str, data: &Bytes) -> GasEstimationError {
    let selector = eth::revert_selector(data)
        .map(hex::encode_prefixed)
        .unwrap_or_else(|| "none".to_string());
    tracing::warn!("unrecognized {what}, selector {selector}: {data}");
    GasEstimationError::UnexpectedResponse {
        message: format!("unrecognized {what} with selector {selector}"),
        payload: data.to_string(),
    }
}
