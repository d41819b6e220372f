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

use std::time::Instant;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolInterface;
use opgas_contracts::common::VerificationGasEstimator::VerificationGasEstimatorErrors;
use opgas_provider::EvmProvider;
use opgas_types::{GasOverrides, ValidTimeRange, ValidationRevert};
use tracing::{debug, instrument};

use super::{
    classify, run_continuation_search, simulate::Simulator, GasEstimationError, SearchBounds,
    SearchOutcome, SearchOverrides, SearchSignal, Settings, SimulatedOperation, SimulationResult,
    VerificationGasEstimate, VerificationRoundArgs,
};

/// Finds the smallest verification gas limits that let an operation validate
pub(crate) struct VerificationGasSearch<'a, P> {
    simulator: &'a Simulator<'a, P>,
    settings: &'a Settings,
    overrides: SearchOverrides,
}

impl<'a, P: EvmProvider> VerificationGasSearch<'a, P> {
    pub(crate) fn new(
        simulator: &'a Simulator<'a, P>,
        settings: &'a Settings,
        overrides: SearchOverrides,
    ) -> Self {
        Self {
            simulator,
            settings,
            overrides,
        }
    }

    #[instrument(skip_all)]
    pub(crate) async fn estimate_verification_gas<UO: SimulatedOperation>(
        &self,
        op: &UO,
    ) -> Result<VerificationGasEstimate, GasEstimationError> {
        let timer = Instant::now();
        let account_bounds = self.settings.verification_bounds(&self.overrides)?;

        if !UO::ON_CHAIN_VERIFICATION_SEARCH {
            let (verification_gas_limit, valid_time_range) =
                self.binary_search(op, &account_bounds).await?;
            debug!(
                "verification gas search took {} ms",
                timer.elapsed().as_millis()
            );
            return Ok(VerificationGasEstimate {
                verification_gas_limit,
                paymaster_verification_gas_limit: None,
                valid_time_range,
            });
        }

        let estimate = if op.paymaster().is_some() {
            let paymaster_bounds = self.settings.paymaster_verification_bounds(&self.overrides)?;
            let (account, paymaster) = tokio::try_join!(
                self.on_chain_search(op, false, &account_bounds),
                self.on_chain_search(op, true, &paymaster_bounds),
            )?;
            VerificationGasEstimate {
                verification_gas_limit: account.gas_estimate,
                paymaster_verification_gas_limit: Some(paymaster.gas_estimate),
                valid_time_range: account.time_range.intersect(paymaster.time_range),
            }
        } else {
            let account = self.on_chain_search(op, false, &account_bounds).await?;
            VerificationGasEstimate {
                verification_gas_limit: account.gas_estimate,
                paymaster_verification_gas_limit: None,
                valid_time_range: account.time_range,
            }
        };
        debug!(
            "verification gas search took {} ms",
            timer.elapsed().as_millis()
        );
        Ok(estimate)
    }

    /// Binary search over full `simulateHandleOp` calls with the call gas
    /// limit zeroed.
    ///
    /// The first probe at the upper bound must succeed. Its gas use then
    /// shrinks the upper bound to a multiple of what validation needed.
    async fn binary_search<UO: SimulatedOperation>(
        &self,
        op: &UO,
        bounds: &SearchBounds,
    ) -> Result<(U256, ValidTimeRange), GasEstimationError> {
        let mut lower = bounds.lower;
        let mut upper = bounds.upper;

        let initial = match self.probe(op, upper).await? {
            SimulationResult::Execution(result) => result,
            SimulationResult::Failed(revert) => {
                return Err(GasEstimationError::RevertInValidation(revert))
            }
        };
        let mut time_range = initial.valid_time_range;
        let gas_used = initial
            .pre_op_gas
            .saturating_sub(op.pre_verification_gas());
        let reduced = bounds.multiplier.saturating_mul(gas_used);
        if reduced > lower {
            upper = upper.min(reduced);
        }

        let mut best = None;
        let mut num_rounds = 1u32;
        while upper - lower > bounds.cutoff {
            let mid = (lower + upper) / U256::from(2);
            num_rounds += 1;
            match self.probe(op, mid).await? {
                SimulationResult::Execution(result) => {
                    upper = mid;
                    best = Some(mid);
                    time_range = result.valid_time_range;
                }
                SimulationResult::Failed(revert) if self.settings.is_too_low(&revert) => {
                    lower = mid;
                }
                SimulationResult::Failed(revert) => {
                    return Err(GasEstimationError::RevertInValidation(revert))
                }
            }
        }

        let gas = match best {
            Some(gas) => gas,
            None => match self.probe(op, upper).await? {
                SimulationResult::Execution(result) => {
                    time_range = result.valid_time_range;
                    upper
                }
                SimulationResult::Failed(revert) if self.settings.is_too_low(&revert) => {
                    return Err(GasEstimationError::SearchExhausted { lower, upper })
                }
                SimulationResult::Failed(revert) => {
                    return Err(GasEstimationError::RevertInValidation(revert))
                }
            },
        };
        debug!("verification gas binary search used {num_rounds} simulations");

        Ok((gas, time_range))
    }

    async fn probe<UO: SimulatedOperation>(
        &self,
        op: &UO,
        verification_gas_limit: U256,
    ) -> Result<SimulationResult, GasEstimationError> {
        let probe = op.with_gas(&GasOverrides {
            verification_gas_limit: Some(verification_gas_limit),
            call_gas_limit: Some(U256::ZERO),
            ..Default::default()
        });
        self.simulator
            .simulate_handle_op(&probe, Address::ZERO, Bytes::new())
            .await
    }

    async fn on_chain_search<UO: SimulatedOperation>(
        &self,
        op: &UO,
        is_paymaster: bool,
        bounds: &SearchBounds,
    ) -> Result<SearchOutcome, GasEstimationError> {
        let probe = op.with_gas(&GasOverrides {
            call_gas_limit: Some(U256::ZERO),
            verification_gas_limit: Some(U256::from(self.settings.max_verification_gas)),
            paymaster_verification_gas_limit: Some(U256::from(
                self.settings.max_paymaster_verification_gas,
            )),
            ..Default::default()
        });
        let probe = &probe;
        let rounding = bounds.rounding;

        let outcome = run_continuation_search(
            move |min_gas, max_gas, is_continuation| {
                self.on_chain_round(
                    probe,
                    VerificationRoundArgs {
                        is_paymaster,
                        min_gas,
                        max_gas,
                        rounding,
                        is_continuation,
                    },
                )
            },
            bounds,
            |revert_data| {
                GasEstimationError::RevertInValidation(match UO::classify_revert(&revert_data) {
                    Ok(SimulationResult::Failed(revert)) => revert,
                    _ => ValidationRevert::from_revert_data(&revert_data),
                })
            },
        )
        .await?;
        debug!(
            "{} verification gas search used {} rounds",
            if is_paymaster { "paymaster" } else { "account" },
            outcome.num_rounds
        );

        Ok(outcome)
    }

    async fn on_chain_round<UO: SimulatedOperation>(
        &self,
        op: &UO,
        args: VerificationRoundArgs,
    ) -> Result<SearchSignal, GasEstimationError> {
        let data = op.estimate_verification_gas_calldata(args).ok_or_else(|| {
            GasEstimationError::Unsupported(format!(
                "entry point {} has no on-chain verification gas search",
                UO::entry_point_version()
            ))
        })?;

        let revert_data = match self.simulator.call_entry_point(data).await {
            Ok(ret) => {
                return Err(GasEstimationError::UnexpectedResponse {
                    message: "estimateVerificationGas returned without reverting".to_string(),
                    payload: ret.to_string(),
                })
            }
            Err(err) => classify::revert_data(err)?,
        };

        if let Ok(signal) = VerificationGasEstimatorErrors::abi_decode(&revert_data) {
            return Ok(match signal {
                VerificationGasEstimatorErrors::EstimateVerificationGasResult(result) => {
                    SearchSignal::Result {
                        gas_estimate: result.gasEstimate,
                        time_range: ValidTimeRange::new(
                            result.validAfter.to(),
                            result.validUntil.to(),
                        ),
                        num_rounds: result.numRounds,
                    }
                }
                VerificationGasEstimatorErrors::EstimateVerificationGasContinuation(cont) => {
                    SearchSignal::Continuation {
                        min_gas: cont.minGas,
                        max_gas: cont.maxGas,
                        num_rounds: cont.numRounds,
                    }
                }
                VerificationGasEstimatorErrors::EstimateVerificationGasRevertAtMax(revert) => {
                    SearchSignal::RevertAtMax(revert.revertData)
                }
            });
        }

        match UO::classify_revert(&revert_data)? {
            SimulationResult::Failed(revert) => Err(GasEstimationError::RevertInValidation(revert)),
            SimulationResult::Execution(_) => Err(classify::unrecognized(
                "estimateVerificationGas revert",
                &revert_data,
            )),
        }
    }
}
