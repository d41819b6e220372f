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
use alloy_sol_types::{SolCall, SolInterface};
use opgas_contracts::common::CallGasEstimator::{
    self, CallGasEstimatorErrors, EstimateCallGasArgs,
};
use opgas_provider::EvmProvider;
use opgas_types::{chain::ChainSpec, GasOverrides};
use opgas_utils::eth;
use tracing::{debug, instrument};

use super::{
    classify, run_continuation_search,
    simulate::{self, Simulator},
    GasEstimationError, SearchOverrides, SearchSignal, Settings, SimulatedOperation,
    SimulationResult, SimulationTier,
};

/// Finds the call gas limit an operation's execution needs
pub(crate) struct CallGasSearch<'a, P> {
    simulator: &'a Simulator<'a, P>,
    settings: &'a Settings,
    chain_spec: &'a ChainSpec,
    overrides: SearchOverrides,
}

impl<'a, P: EvmProvider> CallGasSearch<'a, P> {
    pub(crate) fn new(
        simulator: &'a Simulator<'a, P>,
        settings: &'a Settings,
        chain_spec: &'a ChainSpec,
        overrides: SearchOverrides,
    ) -> Self {
        Self {
            simulator,
            settings,
            chain_spec,
            overrides,
        }
    }

    #[instrument(skip_all)]
    pub(crate) async fn estimate_call_gas<UO: SimulatedOperation>(
        &self,
        op: &UO,
    ) -> Result<U256, GasEstimationError> {
        let timer = Instant::now();
        let call_gas_limit = match self.simulator.tier() {
            SimulationTier::Full => self.on_chain_search(op).await?,
            SimulationTier::StateOnly => self.from_gas_paid(op).await?,
            SimulationTier::Degraded => {
                self.simulator
                    .simulate_with_fallback_gas(op, self.chain_spec)
                    .await?
                    .call_gas_limit
            }
        };
        debug!("call gas estimation took {} ms", timer.elapsed().as_millis());
        Ok(call_gas_limit)
    }

    /// Runs the operation with the call gas estimator as the target of
    /// `simulateHandleOp`, following its continuations.
    async fn on_chain_search<UO: SimulatedOperation>(
        &self,
        op: &UO,
    ) -> Result<U256, GasEstimationError> {
        let bounds = self.settings.call_bounds(&self.overrides)?;
        let probe = op.with_gas(&GasOverrides {
            call_gas_limit: Some(U256::ZERO),
            verification_gas_limit: Some(U256::from(self.settings.max_verification_gas)),
            paymaster_verification_gas_limit: Some(U256::from(
                self.settings.max_paymaster_verification_gas,
            )),
            ..Default::default()
        });
        let probe = &probe;
        let sender = op.sender();
        let call_data = op.call_data().clone();
        let rounding = bounds.rounding;

        let outcome = run_continuation_search(
            move |min_gas, max_gas, is_continuation| {
                self.on_chain_round(
                    probe,
                    EstimateCallGasArgs {
                        sender,
                        callData: call_data.clone(),
                        minGas: min_gas,
                        maxGas: max_gas,
                        rounding,
                        isContinuation: is_continuation,
                    },
                )
            },
            &bounds,
            |revert_data| match eth::parse_revert_message(&revert_data) {
                Some(message) => GasEstimationError::RevertInCallWithMessage(message),
                None => GasEstimationError::RevertInCallWithBytes(revert_data),
            },
        )
        .await?;
        debug!("call gas search used {} rounds", outcome.num_rounds);

        Ok(outcome.gas_estimate)
    }

    async fn on_chain_round<UO: SimulatedOperation>(
        &self,
        op: &UO,
        args: EstimateCallGasArgs,
    ) -> Result<SearchSignal, GasEstimationError> {
        let target_call_data = CallGasEstimator::estimateCallGasCall { args }
            .abi_encode()
            .into();
        let result = match self
            .simulator
            .simulate_handle_op(op, self.simulator.entry_point(), target_call_data)
            .await?
        {
            SimulationResult::Execution(result) => result,
            SimulationResult::Failed(revert) => {
                return Err(GasEstimationError::RevertInValidation(revert))
            }
        };

        match CallGasEstimatorErrors::abi_decode(&result.target_result) {
            Ok(CallGasEstimatorErrors::EstimateCallGasResult(ret)) => Ok(SearchSignal::Result {
                gas_estimate: ret.gasEstimate,
                time_range: result.valid_time_range,
                num_rounds: ret.numRounds,
            }),
            Ok(CallGasEstimatorErrors::EstimateCallGasContinuation(cont)) => {
                Ok(SearchSignal::Continuation {
                    min_gas: cont.minGas,
                    max_gas: cont.maxGas,
                    num_rounds: cont.numRounds,
                })
            }
            Ok(CallGasEstimatorErrors::EstimateCallGasRevertAtMax(revert)) => {
                Ok(SearchSignal::RevertAtMax(revert.revertData))
            }
            Err(_) => Err(classify::unrecognized(
                "estimateCallGas result",
                &result.target_result,
            )),
        }
    }

    /// Simulates once at the call gas ceiling against the deployed entry
    /// point and recovers the gas used from the amount paid.
    async fn from_gas_paid<UO: SimulatedOperation>(
        &self,
        op: &UO,
    ) -> Result<U256, GasEstimationError> {
        let fee = U256::from(self.chain_spec.fallback_max_fee_per_gas);
        let probe = op.with_gas(&GasOverrides {
            call_gas_limit: Some(U256::from(self.settings.max_call_gas)),
            verification_gas_limit: Some(U256::from(self.settings.max_verification_gas)),
            max_fee_per_gas: Some(fee),
            max_priority_fee_per_gas: Some(fee),
            paymaster_verification_gas_limit: Some(U256::from(
                self.settings.max_paymaster_verification_gas,
            )),
            ..Default::default()
        });

        match self
            .simulator
            .simulate_handle_op(&probe, Address::ZERO, Bytes::new())
            .await?
        {
            SimulationResult::Execution(result) => simulate::call_gas_from_payment(&result, fee),
            SimulationResult::Failed(revert) => Err(GasEstimationError::RevertInValidation(revert)),
        }
    }
}
