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

use std::{marker::PhantomData, sync::Arc};

use alloy_primitives::{Address, U256};
use opgas_provider::{DAGasOracle, EvmProvider};
use opgas_types::{chain::ChainSpec, GasEstimate};
use opgas_utils::timer::HistogramTimer;
use tokio::join;
use tracing::{debug, instrument};

use super::{
    estimate_call_gas::CallGasSearch, estimate_verification_gas::VerificationGasSearch,
    pre_verification_gas::calculate_pre_verification_gas, simulate::Simulator, EstimationParams,
    GasEstimationError, GasEstimator, Metrics, SearchOverrides, Settings, SimulatedOperation,
    SimulationCapabilities, SimulationTier, VerificationGasEstimate,
};

/// Gas estimator for the entry point of one version
pub struct GasEstimatorImpl<UO, P> {
    chain_spec: ChainSpec,
    entry_point: Address,
    provider: P,
    da_gas_oracle: Arc<dyn DAGasOracle>,
    settings: Settings,
    metrics: Metrics,
    _uo_type: PhantomData<UO>,
}

#[async_trait::async_trait]
impl<UO, P> GasEstimator for GasEstimatorImpl<UO, P>
where
    UO: SimulatedOperation,
    P: EvmProvider + 'static,
{
    type UO = UO;

    #[instrument(skip_all, fields(op = ?params.op.id()))]
    async fn estimate_user_operation_gas(
        &self,
        params: EstimationParams<UO>,
    ) -> Result<GasEstimate, GasEstimationError> {
        let timer = HistogramTimer::start(self.metrics.total_gas_estimate_ms.clone());
        if self.da_gas_oracle.requires_base_fee() && params.base_fee.is_none() {
            return Err(GasEstimationError::MissingInput("base fee"));
        }

        let simulator = self.simulator(&params)?;
        let EstimationParams {
            op,
            base_fee,
            overrides,
            ..
        } = params;

        // Not try_join! so the reported error does not depend on which branch fails first
        let (verification, call_gas_limit, pre_verification_gas) =
            if simulator.tier() == SimulationTier::Degraded {
                let (degraded, pre_verification_gas) = join!(
                    simulator.simulate_with_fallback_gas(&op, &self.chain_spec),
                    self.pre_verification_gas(&op, base_fee),
                );
                let degraded = degraded?;
                (
                    VerificationGasEstimate {
                        verification_gas_limit: degraded.verification_gas_limit,
                        paymaster_verification_gas_limit: None,
                        valid_time_range: degraded.valid_time_range,
                    },
                    degraded.call_gas_limit,
                    pre_verification_gas?,
                )
            } else {
                let verification_op = op.clone();
                let call_op = op.clone();
                let (verification, call_gas_limit, pre_verification_gas) = join!(
                    self.verification_gas(&simulator, &verification_op, overrides),
                    self.call_gas(&simulator, &call_op, overrides),
                    self.pre_verification_gas(&op, base_fee),
                );
                (verification?, call_gas_limit?, pre_verification_gas?)
            };
        debug!("gas estimation took {} ms", timer.elapsed().as_millis());

        Ok(self.gas_estimate(&op, pre_verification_gas, verification, call_gas_limit))
    }

    #[instrument(skip_all, fields(op = ?params.op.id()))]
    async fn estimate_verification_gas_limit(
        &self,
        params: EstimationParams<UO>,
    ) -> Result<VerificationGasEstimate, GasEstimationError> {
        let simulator = self.simulator(&params)?;
        self.verification_gas(&simulator, &params.op, params.overrides)
            .await
    }

    #[instrument(skip_all, fields(op = ?params.op.id()))]
    async fn estimate_call_gas_limit(
        &self,
        params: EstimationParams<UO>,
    ) -> Result<U256, GasEstimationError> {
        let simulator = self.simulator(&params)?;
        self.call_gas(&simulator, &params.op, params.overrides)
            .await
    }

    #[instrument(skip_all, fields(op = ?params.op.id()))]
    async fn calculate_pre_verification_gas(
        &self,
        params: EstimationParams<UO>,
    ) -> Result<U256, GasEstimationError> {
        self.pre_verification_gas(&params.op, params.base_fee)
            .await
    }

    fn set_entry_point_address(&mut self, address: Address) {
        self.entry_point = address;
    }
}

impl<UO, P> GasEstimatorImpl<UO, P>
where
    UO: SimulatedOperation,
    P: EvmProvider + 'static,
{
    /// Create a new gas estimator for the chain's entry point of `UO`'s version
    pub fn new(
        chain_spec: ChainSpec,
        provider: P,
        da_gas_oracle: Arc<dyn DAGasOracle>,
        settings: Settings,
    ) -> Result<Self, GasEstimationError> {
        if let Some(err) = settings.validate() {
            return Err(GasEstimationError::InvalidSettings(err));
        }

        Ok(Self {
            entry_point: chain_spec.entry_point_address(UO::entry_point_version()),
            chain_spec,
            provider,
            da_gas_oracle,
            settings,
            metrics: Metrics::default(),
            _uo_type: PhantomData,
        })
    }

    /// The entry point estimations run against
    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    fn simulator(
        &self,
        params: &EstimationParams<UO>,
    ) -> Result<Simulator<'_, P>, GasEstimationError> {
        let capabilities = params
            .capabilities
            .unwrap_or_else(|| SimulationCapabilities::from_chain_spec(&self.chain_spec));
        let tier = SimulationTier::new(
            capabilities,
            self.settings
                .simulator_bytecode(UO::entry_point_version())
                .is_some(),
        );
        debug!("simulating at {tier:?} tier");

        Simulator::new(
            &self.provider,
            self.entry_point,
            tier,
            &self.settings,
            params.state_override.as_ref(),
            &params.op,
        )
    }

    async fn verification_gas(
        &self,
        simulator: &Simulator<'_, P>,
        op: &UO,
        overrides: SearchOverrides,
    ) -> Result<VerificationGasEstimate, GasEstimationError> {
        let _timer = HistogramTimer::start(self.metrics.vgl_estimate_ms.clone());
        if simulator.tier() == SimulationTier::Degraded {
            let degraded = simulator
                .simulate_with_fallback_gas(op, &self.chain_spec)
                .await?;
            return Ok(VerificationGasEstimate {
                verification_gas_limit: degraded.verification_gas_limit,
                paymaster_verification_gas_limit: None,
                valid_time_range: degraded.valid_time_range,
            });
        }

        VerificationGasSearch::new(simulator, &self.settings, overrides)
            .estimate_verification_gas(op)
            .await
    }

    async fn call_gas(
        &self,
        simulator: &Simulator<'_, P>,
        op: &UO,
        overrides: SearchOverrides,
    ) -> Result<U256, GasEstimationError> {
        let _timer = HistogramTimer::start(self.metrics.cgl_estimate_ms.clone());
        CallGasSearch::new(simulator, &self.settings, &self.chain_spec, overrides)
            .estimate_call_gas(op)
            .await
    }

    async fn pre_verification_gas(
        &self,
        op: &UO,
        base_fee: Option<U256>,
    ) -> Result<U256, GasEstimationError> {
        let _timer = HistogramTimer::start(self.metrics.pvg_estimate_ms.clone());
        calculate_pre_verification_gas(
            &self.chain_spec,
            self.entry_point,
            &*self.da_gas_oracle,
            op,
            base_fee,
        )
        .await
    }

    fn gas_estimate(
        &self,
        op: &UO,
        pre_verification_gas: U256,
        verification: VerificationGasEstimate,
        call_gas_limit: U256,
    ) -> GasEstimate {
        let paymaster_post_op_gas_limit = op.paymaster_post_op_gas_limit().map(|limit| {
            if limit.is_zero() {
                U256::from(self.settings.default_paymaster_post_op_gas_limit)
            } else {
                limit
            }
        });
        let range = verification.valid_time_range;

        GasEstimate {
            pre_verification_gas,
            verification_gas_limit: verification.verification_gas_limit,
            call_gas_limit,
            paymaster_verification_gas_limit: verification.paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit,
            valid_after: (range.valid_after != 0).then_some(range.valid_after),
            valid_until: (range.valid_until != u64::MAX).then_some(range.valid_until),
        }
    }
}
