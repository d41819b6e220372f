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
//! Gas estimation for ERC-4337 user operations.
//!
//! Includes:
//!
//! - Classification of entry point reverts and node error envelopes
//! - `simulateHandleOp` calls with state and code overrides
//! - Host driven and on-chain binary searches for verification and call gas
//! - Pre-verification gas with per-chain data availability fees
//!
//! ## Feature Flags
//!
//! - `test-utils`: Export mocks and utilities for testing.

mod estimation;
#[cfg(feature = "test-utils")]
pub use estimation::MockGasEstimator;
pub use estimation::{
    EstimationParams, ExecutionResult, GasEstimationError, GasEstimator, GasEstimatorImpl,
    SearchOverrides, Settings as EstimationSettings, SimulatedOperation, SimulationCapabilities,
    SimulationResult, VerificationGasEstimate, VerificationRoundArgs, DEFAULT_TOO_LOW_REASONS,
};
