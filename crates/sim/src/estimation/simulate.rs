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
use opgas_provider::{EvmCall, EvmProvider, ProviderResult, StateOverride};
use opgas_types::{chain::ChainSpec, GasOverrides, UserOperation, ValidTimeRange};
use tracing::instrument;

use super::{
    classify, ExecutionResult, GasEstimationError, Settings, SimulationResult, SimulationTier,
};

/// Arguments of one on-chain verification search round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationRoundArgs {
    /// Search the paymaster's verification gas instead of the account's
    pub is_paymaster: bool,
    /// Lower bound of this round
    pub min_gas: U256,
    /// Upper bound of this round
    pub max_gas: U256,
    /// Guesses are rounded up to a multiple of this
    pub rounding: U256,
    /// True for every call after the first
    pub is_continuation: bool,
}

/// Entry point version specific encoding and decoding used during estimation
pub trait SimulatedOperation: UserOperation {
    /// True if the deployed entry point exposes `simulateHandleOp`, so the
    /// operation can be simulated without substituting simulator code
    const DEPLOYED_SIMULATE_HANDLE_OP: bool;

    /// True if verification gas is searched on-chain by the simulator rather
    /// than by repeated `simulateHandleOp` calls
    const ON_CHAIN_VERIFICATION_SEARCH: bool;

    /// Calldata of `simulateHandleOp` with the given target call
    fn simulate_handle_op_calldata(&self, target: Address, target_call_data: Bytes) -> Bytes;

    /// Decodes the return data of a `simulateHandleOp` call that did not revert
    fn decode_simulate_handle_op_return(
        data: &Bytes,
    ) -> Result<SimulationResult, GasEstimationError>;

    /// Decodes entry point revert data
    fn classify_revert(data: &Bytes) -> Result<SimulationResult, GasEstimationError>;

    /// Calldata of the simulator's on-chain verification gas search, `None`
    /// when the version is estimated by the host driven search
    fn estimate_verification_gas_calldata(&self, args: VerificationRoundArgs) -> Option<Bytes>;

    /// The paymaster post-op gas limit set on the operation
    fn paymaster_post_op_gas_limit(&self) -> Option<U256>;
}

/// Estimates derived from a single simulation without overrides
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DegradedEstimate {
    pub(crate) verification_gas_limit: U256,
    pub(crate) call_gas_limit: U256,
    pub(crate) valid_time_range: ValidTimeRange,
}

/// Issues simulation calls to one entry point with a fixed set of overrides
pub(crate) struct Simulator<'a, P> {
    provider: &'a P,
    entry_point: Address,
    tier: SimulationTier,
    state_override: Option<StateOverride>,
    gas_cap: u64,
}

impl<'a, P: EvmProvider> Simulator<'a, P> {
    /// Builds the overrides for simulating `op` at `tier`.
    ///
    /// Fails when the entry point version cannot be simulated at that tier.
    pub(crate) fn new<UO: SimulatedOperation>(
        provider: &'a P,
        entry_point: Address,
        tier: SimulationTier,
        settings: &Settings,
        caller_override: Option<&StateOverride>,
        op: &UO,
    ) -> Result<Self, GasEstimationError> {
        if tier != SimulationTier::Full && !UO::DEPLOYED_SIMULATE_HANDLE_OP {
            return Err(GasEstimationError::Unsupported(format!(
                "entry point {} can only be simulated with a code override",
                UO::entry_point_version()
            )));
        }

        let state_override = match tier {
            SimulationTier::Degraded => None,
            SimulationTier::StateOnly => Some(simulation_overrides(
                caller_override,
                entry_point,
                None,
                op.sender(),
                settings.sender_balance_override,
            )),
            SimulationTier::Full => Some(simulation_overrides(
                caller_override,
                entry_point,
                settings.simulator_bytecode(UO::entry_point_version()),
                op.sender(),
                settings.sender_balance_override,
            )),
        };

        Ok(Self {
            provider,
            entry_point,
            tier,
            state_override,
            gas_cap: settings.simulation_gas_cap,
        })
    }

    pub(crate) fn entry_point(&self) -> Address {
        self.entry_point
    }

    pub(crate) fn tier(&self) -> SimulationTier {
        self.tier
    }

    /// Runs `simulateHandleOp` and classifies the outcome
    #[instrument(skip_all, fields(target = %target))]
    pub(crate) async fn simulate_handle_op<UO: SimulatedOperation>(
        &self,
        op: &UO,
        target: Address,
        target_call_data: Bytes,
    ) -> Result<SimulationResult, GasEstimationError> {
        let ret = self
            .call_entry_point(op.simulate_handle_op_calldata(target, target_call_data))
            .await;
        classify::classify_simulate_handle_op::<UO>(ret)
    }

    /// Calls the entry point with this simulator's overrides
    pub(crate) async fn call_entry_point(&self, data: Bytes) -> ProviderResult<Bytes> {
        self.provider
            .call(
                EvmCall {
                    to: self.entry_point,
                    data,
                    from: None,
                    gas: Some(self.gas_cap),
                    state_override: self.state_override.clone(),
                },
                None,
            )
            .await
    }

    /// Simulates once with the chain's fallback gas values and derives both
    /// limits from the result.
    ///
    /// `verificationGasLimit = preOpGas - preVerificationGas` and
    /// `callGasLimit = paid / maxFeePerGas - preOpGas`.
    #[instrument(skip_all)]
    pub(crate) async fn simulate_with_fallback_gas<UO: SimulatedOperation>(
        &self,
        op: &UO,
        chain_spec: &ChainSpec,
    ) -> Result<DegradedEstimate, GasEstimationError> {
        let fee = U256::from(chain_spec.fallback_max_fee_per_gas);
        let pre_verification_gas = U256::from(chain_spec.fallback_pre_verification_gas);
        let verification_gas_limit = U256::from(chain_spec.fallback_verification_gas_limit);
        let probe = op.with_gas(&GasOverrides {
            pre_verification_gas: Some(pre_verification_gas),
            verification_gas_limit: Some(verification_gas_limit),
            call_gas_limit: Some(U256::from(chain_spec.fallback_call_gas_limit)),
            max_fee_per_gas: Some(fee),
            max_priority_fee_per_gas: Some(fee),
            paymaster_verification_gas_limit: Some(verification_gas_limit),
        });

        let result = match self
            .simulate_handle_op(&probe, Address::ZERO, Bytes::new())
            .await?
        {
            SimulationResult::Execution(result) => result,
            SimulationResult::Failed(revert) => {
                return Err(GasEstimationError::RevertInValidation(revert))
            }
        };

        let verification_gas_limit = result
            .pre_op_gas
            .checked_sub(pre_verification_gas)
            .ok_or_else(|| {
                GasEstimationError::InvalidSimulationResult(format!(
                    "preOpGas {} is below preVerificationGas {pre_verification_gas}",
                    result.pre_op_gas
                ))
            })?;
        let call_gas_limit = call_gas_from_payment(&result, fee)?;

        Ok(DegradedEstimate {
            verification_gas_limit,
            call_gas_limit,
            valid_time_range: result.valid_time_range,
        })
    }
}

/// Gas charged beyond `preOpGas`, recovered from the amount paid at `fee` per gas
pub(crate) fn call_gas_from_payment(
    result: &ExecutionResult,
    fee: U256,
) -> Result<U256, GasEstimationError> {
    if fee.is_zero() {
        return Err(GasEstimationError::InvalidSettings(
            "fallback max fee per gas cannot be zero".to_string(),
        ));
    }
    let gas_paid = result.paid / fee;
    gas_paid.checked_sub(result.pre_op_gas).ok_or_else(|| {
        GasEstimationError::InvalidSimulationResult(format!(
            "gas paid {gas_paid} is below preOpGas {}",
            result.pre_op_gas
        ))
    })
}

/// Merges the engine's overrides into the caller's.
///
/// At the entry point only `code` is replaced. The sender gets a large balance
/// unless the caller already chose one. All other caller fields are kept.
pub(crate) fn simulation_overrides(
    caller_override: Option<&StateOverride>,
    entry_point: Address,
    simulator_code: Option<&Bytes>,
    sender: Address,
    sender_balance: U256,
) -> StateOverride {
    let mut overrides = caller_override.cloned().unwrap_or_default();
    if let Some(code) = simulator_code {
        overrides.entry(entry_point).or_default().code = Some(code.clone());
    }
    overrides
        .entry(sender)
        .or_default()
        .balance
        .get_or_insert(sender_balance);
    overrides
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes, B256};
    use opgas_provider::{AccountOverride, MockEvmProvider, ProviderError};
    use opgas_types::{v0_6, v0_7};

    use super::*;
    use crate::estimation::test_utils::{execution_result_v0_6, failed_op_v0_6};

    const ENTRY_POINT: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");
    const SENDER: Address = address!("f497A8026717FbbA3944c3dd2533c0716b7685e2");

    fn op() -> v0_6::UserOperation {
        v0_6::UserOperation {
            sender: SENDER,
            call_data: bytes!("b61d27f6"),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_preserves_caller_fields() {
        let slot = B256::with_last_byte(1);
        let mut caller = StateOverride::default();
        caller.insert(
            ENTRY_POINT,
            AccountOverride {
                balance: Some(U256::from(7)),
                nonce: Some(3),
                code: Some(bytes!("00")),
                state_diff: Some([(slot, B256::with_last_byte(2))].into_iter().collect()),
                ..Default::default()
            },
        );

        let merged = simulation_overrides(
            Some(&caller),
            ENTRY_POINT,
            Some(&bytes!("6080")),
            SENDER,
            U256::MAX,
        );

        let ep = &merged[&ENTRY_POINT];
        assert_eq!(ep.code, Some(bytes!("6080")));
        assert_eq!(ep.balance, Some(U256::from(7)));
        assert_eq!(ep.nonce, Some(3));
        assert_eq!(
            ep.state_diff.as_ref().and_then(|d| d.get(&slot)).copied(),
            Some(B256::with_last_byte(2))
        );
        assert_eq!(merged[&SENDER].balance, Some(U256::MAX));
        // the caller's map is untouched
        assert_eq!(caller[&ENTRY_POINT].code, Some(bytes!("00")));
    }

    #[test]
    fn test_caller_sender_balance_wins() {
        let mut caller = StateOverride::default();
        caller.insert(
            SENDER,
            AccountOverride {
                balance: Some(U256::from(1)),
                nonce: Some(9),
                ..Default::default()
            },
        );

        let merged = simulation_overrides(Some(&caller), ENTRY_POINT, None, SENDER, U256::MAX);
        assert_eq!(merged[&SENDER].balance, Some(U256::from(1)));
        assert_eq!(merged[&SENDER].nonce, Some(9));
        assert!(!merged.contains_key(&ENTRY_POINT));
    }

    #[tokio::test]
    async fn test_tier_overrides() {
        let settings = Settings {
            simulator_bytecode_v0_6: Some(bytes!("6080")),
            ..Default::default()
        };
        let mut provider = MockEvmProvider::new();
        provider
            .expect_call()
            .withf(|call, _| {
                let overrides = call.state_override.as_ref().unwrap();
                overrides[&ENTRY_POINT].code == Some(bytes!("6080"))
                    && overrides[&SENDER].balance == Some(U256::from(u128::MAX))
                    && call.gas == Some(50_000_000)
            })
            .times(1)
            .returning(|_, _| Err(execution_result_v0_6(1, 0, true, Bytes::new())));

        let simulator = Simulator::new(
            &provider,
            ENTRY_POINT,
            SimulationTier::Full,
            &settings,
            None,
            &op(),
        )
        .unwrap();
        let result = simulator
            .simulate_handle_op(&op(), Address::ZERO, Bytes::new())
            .await
            .unwrap();
        assert!(matches!(result, SimulationResult::Execution(_)));
    }

    #[tokio::test]
    async fn test_degraded_sends_no_overrides() {
        let spec = ChainSpec {
            fallback_pre_verification_gas: 500,
            ..Default::default()
        };
        let mut provider = MockEvmProvider::new();
        provider
            .expect_call()
            .withf(|call, _| call.state_override.is_none())
            .times(1)
            .returning(|_, _| Err(execution_result_v0_6(1_000, 3_000_000_000, true, Bytes::new())));

        let simulator = Simulator::new(
            &provider,
            ENTRY_POINT,
            SimulationTier::Degraded,
            &Settings::default(),
            None,
            &op(),
        )
        .unwrap();
        let estimate = simulator
            .simulate_with_fallback_gas(&op(), &spec)
            .await
            .unwrap();

        assert_eq!(estimate.verification_gas_limit, U256::from(500));
        // 3_000_000_000 / 1_000_000 - 1_000
        assert_eq!(estimate.call_gas_limit, U256::from(2_000));
    }

    #[tokio::test]
    async fn test_degraded_underflow() {
        let spec = ChainSpec {
            fallback_pre_verification_gas: 500,
            ..Default::default()
        };
        let mut provider = MockEvmProvider::new();
        provider.expect_call().returning(|_, _| {
            Err(execution_result_v0_6(
                1_000_000,
                3_000_000_000,
                true,
                Bytes::new(),
            ))
        });

        let simulator = Simulator::new(
            &provider,
            ENTRY_POINT,
            SimulationTier::Degraded,
            &Settings::default(),
            None,
            &op(),
        )
        .unwrap();
        let err = simulator
            .simulate_with_fallback_gas(&op(), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, GasEstimationError::InvalidSimulationResult(_)));
    }

    #[tokio::test]
    async fn test_degraded_failure_is_fatal() {
        let mut provider = MockEvmProvider::new();
        provider
            .expect_call()
            .times(1)
            .returning(|_, _| Err(failed_op_v0_6("AA40 over verificationGasLimit")));

        let simulator = Simulator::new(
            &provider,
            ENTRY_POINT,
            SimulationTier::Degraded,
            &Settings::default(),
            None,
            &op(),
        )
        .unwrap();
        let err = simulator
            .simulate_with_fallback_gas(&op(), &ChainSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GasEstimationError::RevertInValidation(_)));
    }

    #[test]
    fn test_v0_7_requires_code_override() {
        let provider = MockEvmProvider::new();
        for tier in [SimulationTier::StateOnly, SimulationTier::Degraded] {
            let err = Simulator::new(
                &provider,
                ENTRY_POINT,
                tier,
                &Settings::default(),
                None,
                &v0_7::UserOperation::default(),
            )
            .err()
            .unwrap();
            assert!(matches!(err, GasEstimationError::Unsupported(_)));
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mut provider = MockEvmProvider::new();
        provider
            .expect_call()
            .returning(|_, _| Err(ProviderError::Transport("timeout".to_string())));

        let simulator = Simulator::new(
            &provider,
            ENTRY_POINT,
            SimulationTier::StateOnly,
            &Settings::default(),
            None,
            &op(),
        )
        .unwrap();
        let err = simulator
            .simulate_handle_op(&op(), Address::ZERO, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GasEstimationError::Provider(ProviderError::Transport(_))
        ));
    }
}
