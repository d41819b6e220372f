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

// Contracts from https://github.com/eth-infinitism/account-abstraction/tree/releases/v0.7/contracts

use alloy_sol_macro::sol;

sol!(
    #[allow(missing_docs)]
    #[derive(Default, Debug, PartialEq, Eq)]
    struct PackedUserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes paymasterAndData;
        bytes signature;
    }

    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    interface IEntryPoint {
        error FailedOp(uint256 opIndex, string reason);

        error FailedOpWithRevert(uint256 opIndex, string reason, bytes inner);

        error SignatureValidationFailed(address aggregator);

        error SenderAddressResult(address sender);

        function handleOps(
            PackedUserOperation[] calldata ops,
            address payable beneficiary
        ) external;
    }

    // Deployed only through a code override at the entry point address.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    interface IEntryPointSimulations {
        struct ExecutionResult {
            uint256 preOpGas;
            uint256 paid;
            uint256 accountValidationData;
            uint256 paymasterValidationData;
            bool targetSuccess;
            bytes targetResult;
        }

        struct EstimateVerificationGasArgs {
            PackedUserOperation userOp;
            bool isPaymaster;
            uint256 minGas;
            uint256 maxGas;
            uint256 rounding;
            bool isContinuation;
        }

        function simulateHandleOp(
            PackedUserOperation calldata op,
            address target,
            bytes calldata targetCallData
        )
        external
        returns (
            ExecutionResult memory
        );

        function estimateVerificationGas(
            EstimateVerificationGasArgs calldata args
        ) external;
    }
);
