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
use opgas_contracts::v0_7::{
    IEntryPoint::IEntryPointErrors,
    IEntryPointSimulations::{self, EstimateVerificationGasArgs},
};
use opgas_types::{v0_7::UserOperation, ValidationData};

use super::{
    classify, ExecutionResult, GasEstimationError, SimulatedOperation, SimulationResult,
    VerificationRoundArgs,
};

impl SimulatedOperation for UserOperation {
    const DEPLOYED_SIMULATE_HANDLE_OP: bool = false;
    const ON_CHAIN_VERIFICATION_SEARCH: bool = true;

    fn simulate_handle_op_calldata(&self, target: Address, target_call_data: Bytes) -> Bytes {
        IEntryPointSimulations::simulateHandleOpCall {
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
        let result = IEntryPointSimulations::simulateHandleOpCall::abi_decode_returns(data)
            .map_err(|_| classify::unrecognized("simulateHandleOp return data", data))?;

        let account = ValidationData::from(result.accountValidationData);
        let paymaster = ValidationData::from(result.paymasterValidationData);

        Ok(SimulationResult::Execution(ExecutionResult {
            pre_op_gas: result.preOpGas,
            paid: result.paid,
            valid_time_range: account
                .valid_time_range()
                .intersect(paymaster.valid_time_range()),
            target_success: result.targetSuccess,
            target_result: result.targetResult,
        }))
    }

    fn classify_revert(data: &Bytes) -> Result<SimulationResult, GasEstimationError> {
        if let Ok(err) = IEntryPointErrors::abi_decode(data) {
            return match err {
                IEntryPointErrors::FailedOp(failed_op) => {
                    Ok(SimulationResult::Failed(failed_op.into()))
                }
                IEntryPointErrors::FailedOpWithRevert(failed_op) => {
                    Ok(SimulationResult::Failed(failed_op.into()))
                }
                IEntryPointErrors::SignatureValidationFailed(failed) => Ok(
                    SimulationResult::Failed(classify::signature_validation_failed(
                        failed.aggregator,
                    )),
                ),
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
            .ok_or_else(|| classify::unrecognized("v0.7 entry point revert", data))
    }

    fn estimate_verification_gas_calldata(&self, args: VerificationRoundArgs) -> Option<Bytes> {
        let call = IEntryPointSimulations::estimateVerificationGasCall {
            args: EstimateVerificationGasArgs {
                userOp: self.pack(),
                isPaymaster: args.is_paymaster,
                minGas: args.min_gas,
                maxGas: args.max_gas,
                rounding: args.rounding,
                isContinuation: args.is_continuation,
            },
        };
        Some(call.abi_encode().into())
    }

    fn paymaster_post_op_gas_limit(&self) -> Option<U256> {
        self.paymaster.map(|_| self.paymaster_post_op_gas_limit)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes, uint};
    use alloy_sol_types::{Panic, SolError};
    use opgas_contracts::v0_7::IEntryPoint;
    use opgas_types::{ValidTimeRange, ValidationRevert};

    use super::*;

    #[test]
    fn test_execution_result_time_range() {
        // validAfter 100, validUntil 300 for the account, validUntil 200 for the paymaster
        let data: Bytes = IEntryPointSimulations::simulateHandleOpCall::abi_encode_returns(
            &IEntryPointSimulations::ExecutionResult {
                preOpGas: U256::from(60_000),
                paid: U256::from(90_000),
                accountValidationData: uint!(
                    0x00000000006400000000012c0000000000000000000000000000000000000000_U256
                ),
                paymasterValidationData: uint!(
                    0x0000000000000000000000c80000000000000000000000000000000000000000_U256
                ),
                targetSuccess: false,
                targetResult: bytes!("08c379a0"),
            },
        )
        .into();

        let SimulationResult::Execution(result) =
            UserOperation::decode_simulate_handle_op_return(&data).unwrap()
        else {
            panic!("expected execution result");
        };
        assert_eq!(result.pre_op_gas, U256::from(60_000));
        assert_eq!(result.paid, U256::from(90_000));
        assert_eq!(result.valid_time_range, ValidTimeRange::new(100, 200));
        assert!(!result.target_success);
    }

    #[test]
    fn test_bad_return_data() {
        assert!(matches!(
            UserOperation::decode_simulate_handle_op_return(&bytes!("1234")),
            Err(GasEstimationError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_failed_op_with_panic() {
        let data: Bytes = IEntryPoint::FailedOpWithRevert {
            opIndex: U256::ZERO,
            reason: "AA23 reverted".to_string(),
            inner: Panic {
                code: U256::from(0x32),
            }
            .abi_encode()
            .into(),
        }
        .abi_encode()
        .into();

        let SimulationResult::Failed(revert) = UserOperation::classify_revert(&data).unwrap()
        else {
            panic!("expected failure");
        };
        assert_eq!(revert.entry_point_reason(), Some("AA23 reverted"));
        let ValidationRevert::Operation {
            inner_revert_reason,
            ..
        } = revert
        else {
            panic!("expected operation revert");
        };
        assert!(inner_revert_reason.unwrap().contains("out-of-bounds"));
    }

    #[test]
    fn test_signature_validation_failed() {
        let aggregator = address!("0000000000000000000000000000000000000a99");
        let data: Bytes = IEntryPoint::SignatureValidationFailed { aggregator }
            .abi_encode()
            .into();
        let SimulationResult::Failed(revert) = UserOperation::classify_revert(&data).unwrap()
        else {
            panic!("expected failure");
        };
        assert!(revert.to_string().contains("signature validation failed"));
    }

    #[test]
    fn test_estimate_verification_gas_calldata() {
        let op = UserOperation {
            sender: address!("f497A8026717FbbA3944c3dd2533c0716b7685e2"),
            ..Default::default()
        };
        let data = op
            .estimate_verification_gas_calldata(VerificationRoundArgs {
                is_paymaster: true,
                min_gas: U256::from(10),
                max_gas: U256::from(20),
                rounding: U256::from(1),
                is_continuation: true,
            })
            .unwrap();

        let decoded = IEntryPointSimulations::estimateVerificationGasCall::abi_decode(&data)
            .unwrap()
            .args;
        assert_eq!(decoded.userOp, op.pack());
        assert!(decoded.isPaymaster);
        assert_eq!(decoded.minGas, U256::from(10));
        assert_eq!(decoded.maxGas, U256::from(20));
        assert!(decoded.isContinuation);
    }

    #[test]
    fn test_paymaster_post_op_gas_limit() {
        let op = UserOperation {
            paymaster_post_op_gas_limit: U256::from(5),
            ..Default::default()
        };
        assert_eq!(SimulatedOperation::paymaster_post_op_gas_limit(&op), None);

        let op = UserOperation {
            paymaster: Some(Address::repeat_byte(0x22)),
            ..op
        };
        assert_eq!(
            SimulatedOperation::paymaster_post_op_gas_limit(&op),
            Some(U256::from(5))
        );
    }
}
