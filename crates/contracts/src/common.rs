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

use alloy_sol_macro::sol;

// The call gas simulator runs as the target of `simulateHandleOp`, after
// validation, and binary searches the gas needed by the sender's call data.
sol!(
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    interface CallGasEstimator {
        struct EstimateCallGasArgs {
            address sender;
            bytes callData;
            uint256 minGas;
            uint256 maxGas;
            uint256 rounding;
            bool isContinuation;
        }

        error EstimateCallGasResult(uint256 gasEstimate, uint256 numRounds);

        error EstimateCallGasContinuation(uint256 minGas, uint256 maxGas, uint256 numRounds);

        error EstimateCallGasRevertAtMax(bytes revertData);

        function estimateCallGas(EstimateCallGasArgs calldata args) external;
    }
);

// Signals reverted by the verification gas simulator.
sol!(
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    interface VerificationGasEstimator {
        error EstimateVerificationGasResult(
            uint256 gasEstimate,
            uint48 validAfter,
            uint48 validUntil,
            uint256 numRounds
        );

        error EstimateVerificationGasContinuation(
            uint256 minGas,
            uint256 maxGas,
            uint48 validAfter,
            uint48 validUntil,
            uint256 numRounds
        );

        error EstimateVerificationGasRevertAtMax(bytes revertData);
    }
);
