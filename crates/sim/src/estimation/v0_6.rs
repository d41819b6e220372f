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

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use opgas_contracts::v0_6::{IEntryPoint, IEntryPoint::IEntryPointErrors, ReturnInfo};
use opgas_types::{v0_6::UserOperation, ValidTimeRange};

use super::{
    classify, ExecutionResult, GasEstimationError, SimulatedOperation, SimulationResult,
    VerificationRoundArgs,
};

impl SimulatedOperation for UserOperation {
    const DEPLOYED_SIMULATE_HANDLE_OP: bool = true;
    const ON_CHAIN_VERIFICATION_SEARCH: bool = false;

    fn simulate_handle_op_calldata(&self, target: Address, target_call_data: Bytes) -> Bytes {
        IEntryPoint::simulateHandleOpCall {
            op: self.pack(),
            target,
            targetCallData: target_call_data,
        }
        .abi_encode()
        .into()
    }

    fn decode_simulate_handle_op_return(
        data: &Bytes,
    ) -> Result<SimulationResult, GasEstimationError> {
        // v0.6 always reports through a revert
        Err(GasEstimationError::UnexpectedResponse {
            message: "simulateHandleOp returned without reverting, check the entry point address"
                .to_string(),
            payload: data.to_string(),
        })
    }

    fn classify_revert(data: &Bytes) -> Result<SimulationResult, GasEstimationError> {
        if let Ok(err) = IEntryPointErrors::abi_decode(data) {
            return match err {
                IEntryPointErrors::ExecutionResult(result) => {
                    Ok(SimulationResult::Execution(ExecutionResult {
                        pre_op_gas: result.preOpGas,
                        paid: result.paid,
                        valid_time_range: ValidTimeRange::new(
                            result.validAfter.to(),
                            result.validUntil.to(),
                        ),
                        target_success: result.targetSuccess,
                        target_result: result.targetResult,
                    }))
                }
                IEntryPointErrors::FailedOp(failed_op) => {
                    Ok(SimulationResult::Failed(failed_op.into()))
                }
                IEntryPointErrors::SignatureValidationFailed(failed) => Ok(
                    SimulationResult::Failed(classify::signature_validation_failed(
                        failed.aggregator,
                    )),
                ),
                IEntryPointErrors::ValidationResult(result) => {
                    Ok(from_return_info(result.returnInfo))
                }
                IEntryPointErrors::ValidationResultWithAggregation(result) => {
                    Ok(from_return_info(result.returnInfo))
                }
                IEntryPointErrors::SenderAddressResult(result) => {
                    Err(GasEstimationError::UnexpectedResponse {
                        message: format!(
                            "simulation reverted with SenderAddressResult({})",
                            result.sender
                        ),
                        payload: data.to_string(),
                    })
                }
            };
        }

        classify::decode_generic_revert(data)
            .map(SimulationResult::Failed)
            .ok_or_else(|| classify::unrecognized("v0.6 entry point revert", data))
    }

    fn estimate_verification_gas_calldata(&self, _args: VerificationRoundArgs) -> Option<Bytes> {
        None
    }

    fn paymaster_post_op_gas_limit(&self) -> Option<U256> {
        None
    }
}

/// `simulateValidation` results carry no execution, the prefund stands in for `paid`
fn from_return_info(info: ReturnInfo) -> SimulationResult {
    SimulationResult::Execution(ExecutionResult {
        pre_op_gas: info.preOpGas,
        paid: info.prefund,
        valid_time_range: ValidTimeRange::new(info.validAfter.to(), info.validUntil.to()),
        target_success: false,
        target_result: Bytes::new(),
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, aliases::U48, bytes};
    use alloy_sol_types::{Panic, Revert, SolError};
    use opgas_contracts::v0_6::StakeInfo;
    use opgas_types::ValidationRevert;

    use super::*;

    #[test]
    fn test_execution_result() {
        let data: Bytes = IEntryPoint::ExecutionResult {
            preOpGas: U256::from(50_000),
            paid: U256::from(70_000),
            validAfter: U48::from(10),
            validUntil: U48::from(20),
            targetSuccess: true,
            targetResult: bytes!("abcd"),
        }
        .abi_encode()
        .into();

        let SimulationResult::Execution(result) = UserOperation::classify_revert(&data).unwrap()
        else {
            panic!("expected execution result");
        };
        assert_eq!(result.pre_op_gas, U256::from(50_000));
        assert_eq!(result.paid, U256::from(70_000));
        assert_eq!(result.valid_time_range, ValidTimeRange::new(10, 20));
        assert!(result.target_success);
        assert_eq!(result.target_result, bytes!("abcd"));
    }

    #[test]
    fn test_failed_op() {
        let data: Bytes = IEntryPoint::FailedOp {
            opIndex: U256::ZERO,
            reason: "AA21 didn't pay prefund".to_string(),
        }
        .abi_encode()
        .into();

        assert_eq!(
            UserOperation::classify_revert(&data).unwrap(),
            SimulationResult::Failed(ValidationRevert::EntryPoint(
                "AA21 didn't pay prefund".to_string()
            ))
        );
    }

    #[test]
    fn test_generic_reverts() {
        let data: Bytes = Revert {
            reason: "validation OOG".to_string(),
        }
        .abi_encode()
        .into();
        assert_eq!(
            UserOperation::classify_revert(&data).unwrap(),
            SimulationResult::Failed(ValidationRevert::EntryPoint("validation OOG".to_string()))
        );

        let data: Bytes = Panic {
            code: U256::from(0x12),
        }
        .abi_encode()
        .into();
        let SimulationResult::Failed(revert) = UserOperation::classify_revert(&data).unwrap()
        else {
            panic!("expected failure");
        };
        assert!(revert.to_string().contains("division"));
    }

    #[test]
    fn test_validation_result() {
        let info = ReturnInfo {
            preOpGas: U256::from(40_000),
            prefund: U256::from(100_000),
            ..Default::default()
        };
        let data: Bytes = IEntryPoint::ValidationResult {
            returnInfo: info,
            senderInfo: StakeInfo::default(),
            factoryInfo: StakeInfo::default(),
            paymasterInfo: StakeInfo::default(),
        }
        .abi_encode()
        .into();

        let SimulationResult::Execution(result) = UserOperation::classify_revert(&data).unwrap()
        else {
            panic!("expected execution result");
        };
        assert_eq!(result.pre_op_gas, U256::from(40_000));
        assert_eq!(result.paid, U256::from(100_000));
        assert!(result.valid_time_range.is_unbounded());
    }

    #[test]
    fn test_unexpected_shapes() {
        let data: Bytes = IEntryPoint::SenderAddressResult {
            sender: address!("f497A8026717FbbA3944c3dd2533c0716b7685e2"),
        }
        .abi_encode()
        .into();
        assert!(matches!(
            UserOperation::classify_revert(&data),
            Err(GasEstimationError::UnexpectedResponse { .. })
        ));

        assert!(matches!(
            UserOperation::classify_revert(&bytes!("deadbeef")),
            Err(GasEstimationError::UnexpectedResponse { .. })
        ));
        assert!(matches!(
            UserOperation::decode_simulate_handle_op_return(&Bytes::new()),
            Err(GasEstimationError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_simulate_handle_op_calldata() {
        let op = UserOperation {
            sender: address!("f497A8026717FbbA3944c3dd2533c0716b7685e2"),
            call_gas_limit: U256::from(5),
            ..Default::default()
        };
        let target = Address::repeat_byte(0x11);
        let data = op.simulate_handle_op_calldata(target, bytes!("01"));

        let decoded = IEntryPoint::simulateHandleOpCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.op, op.pack());
        assert_eq!(decoded.target, target);
        assert_eq!(decoded.targetCallData, bytes!("01"));
        assert!(op
            .estimate_verification_gas_calldata(VerificationRoundArgs {
                is_paymaster: false,
                min_gas: U256::ZERO,
                max_gas: U256::from(1),
                rounding: U256::from(1),
                is_continuation: false,
            })
            .is_none());
    }
}
