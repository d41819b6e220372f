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

use std::future::Future;

use alloy_primitives::{Address, Bytes, U256};
use metrics::Histogram;
use metrics_derive::Metrics;
#[cfg(feature = "test-utils")]
use mockall::automock;
use opgas_provider::{ProviderError, StateOverride};
use opgas_types::{
    chain::ChainSpec, EntryPointVersion, GasEstimate, UserOperation, ValidTimeRange,
    ValidationRevert,
};

mod classify;
pub use classify::{ExecutionResult, SimulationResult};

mod simulate;
pub use simulate::{SimulatedOperation, VerificationRoundArgs};

mod estimate_call_gas;
mod estimate_verification_gas;
mod pre_verification_gas;

mod estimator;
pub use estimator::GasEstimatorImpl;

mod v0_6;
mod v0_7;

#[cfg(test)]
mod test_utils;

/// Entry point revert reasons meaning "the gas limit was too low", all other
/// failures end a search
pub const DEFAULT_TOO_LOW_REASONS: &[&str] = &[
    "AA13 initCode failed or OOG",
    "AA23 reverted (or OOG)",
    "AA23 reverted",
    "AA33 reverted (or OOG)",
    "AA33 reverted",
    "AA40 over verificationGasLimit",
    "AA41 too little verificationGas",
    "AA51 prefund below actualGasCost",
    "return data out of bounds",
    "validation OOG",
];

/// Error type for gas estimation
#[derive(Debug, thiserror::Error)]
pub enum GasEstimationError {
    /// Error from provider
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The node answered with a shape that could not be decoded
    #[error("unexpected response: {message}")]
    UnexpectedResponse {
        /// What was expected
        message: String,
        /// Raw payload, hex or JSON
        payload: String,
    },
    /// Validation reverted
    #[error("{0}")]
    RevertInValidation(ValidationRevert),
    /// Call reverted with a string message
    #[error("user operation's call reverted: {0}")]
    RevertInCallWithMessage(String),
    /// Call reverted with bytes
    #[error("user operation's call reverted: {0:#x}")]
    RevertInCallWithBytes(Bytes),
    /// Binary search converged without a successful simulation
    #[error("gas search converged between {lower} and {upper} without a successful simulation")]
    SearchExhausted {
        /// Final lower bound
        lower: U256,
        /// Final upper bound
        upper: U256,
    },
    /// The on-chain search kept asking for more rounds
    #[error("gas estimation failed to converge after {0} calls")]
    MaxRoundsExceeded(u32),
    /// A continuation returned bounds no narrower than the previous call
    #[error("gas search made no progress between {min_gas} and {max_gas}")]
    ContinuationStalled {
        /// Lower bound of the stalled round
        min_gas: U256,
        /// Upper bound of the stalled round
        max_gas: U256,
    },
    /// A required input was not provided
    #[error("missing required input: {0}")]
    MissingInput(&'static str),
    /// Search bounds or settings are inconsistent
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    /// Simulation returned values that cannot produce an estimate
    #[error("invalid simulation result: {0}")]
    InvalidSimulationResult(String),
    /// The requested estimation is not possible with the node's capabilities
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Settings for gas estimation
#[derive(Clone, Debug)]
pub struct Settings {
    /// Lower bound of the host driven verification search
    pub verification_lower_bound: u128,
    /// Upper bound of the verification searches
    pub verification_upper_bound: u128,
    /// The host driven verification search stops once its bounds are this close
    pub verification_cutoff: u128,
    /// The upper bound is reduced to this multiple of the gas used by the first probe
    pub verification_upper_bound_multiplier: u64,
    /// Verification gas limit set on operations while probing call gas
    pub max_verification_gas: u128,
    /// Paymaster verification gas limit used while probing and as the paymaster search ceiling
    pub max_paymaster_verification_gas: u128,
    /// Upper bound of the call gas search
    pub max_call_gas: u128,
    /// On-chain searches round every guess up to a multiple of this
    pub rounding: u128,
    /// The maximum number of calls an on-chain search may make
    pub max_gas_estimation_rounds: u32,
    /// Gas limit of every simulation `eth_call`
    pub simulation_gas_cap: u64,
    /// Balance given to the sender by the state override
    pub sender_balance_override: U256,
    /// Revert reasons that raise the lower bound of the host driven search
    pub too_low_reasons: Vec<String>,
    /// Paymaster post-op gas limit reported when the operation does not set one
    pub default_paymaster_post_op_gas_limit: u128,
    /// Simulator build substituted at the v0.6 entry point address
    pub simulator_bytecode_v0_6: Option<Bytes>,
    /// Simulator build substituted at the v0.7 entry point address
    pub simulator_bytecode_v0_7: Option<Bytes>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verification_lower_bound: 0,
            verification_upper_bound: 10_000_000,
            verification_cutoff: 20_000,
            verification_upper_bound_multiplier: 6,
            max_verification_gas: 10_000_000,
            max_paymaster_verification_gas: 10_000_000,
            max_call_gas: 20_000_000,
            rounding: 1,
            max_gas_estimation_rounds: 10,
            simulation_gas_cap: 50_000_000,
            sender_balance_override: U256::from(u128::MAX),
            too_low_reasons: DEFAULT_TOO_LOW_REASONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
            default_paymaster_post_op_gas_limit: 0,
            simulator_bytecode_v0_6: None,
            simulator_bytecode_v0_7: None,
        }
    }
}

impl Settings {
    /// Check if the settings are valid
    pub fn validate(&self) -> Option<String> {
        if self.verification_lower_bound >= self.verification_upper_bound {
            return Some(
                "verification_lower_bound must be lower than verification_upper_bound".to_string(),
            );
        }
        if self.verification_cutoff == 0 {
            return Some("verification_cutoff cannot be zero".to_string());
        }
        if self.verification_upper_bound_multiplier == 0 {
            return Some("verification_upper_bound_multiplier cannot be zero".to_string());
        }
        if self.rounding == 0 {
            return Some("rounding cannot be zero".to_string());
        }
        if self.max_gas_estimation_rounds == 0 {
            return Some("max_gas_estimation_rounds cannot be zero".to_string());
        }
        if u128::from(self.simulation_gas_cap)
            < self.max_verification_gas.saturating_add(self.max_call_gas)
        {
            return Some(
                "simulation_gas_cap cannot be lower than max_verification_gas + max_call_gas"
                    .to_string(),
            );
        }
        if self.too_low_reasons.is_empty() {
            return Some("too_low_reasons cannot be empty".to_string());
        }
        None
    }

    /// Simulator bytecode configured for an entry point version
    pub fn simulator_bytecode(&self, version: EntryPointVersion) -> Option<&Bytes> {
        match version {
            EntryPointVersion::V0_6 => self.simulator_bytecode_v0_6.as_ref(),
            EntryPointVersion::V0_7 => self.simulator_bytecode_v0_7.as_ref(),
        }
    }

    /// True if the entry point reason of `revert` marks a gas limit that was too low
    pub fn is_too_low(&self, revert: &ValidationRevert) -> bool {
        revert
            .entry_point_reason()
            .map(str::trim)
            .is_some_and(|reason| self.too_low_reasons.iter().any(|r| r == reason))
    }

    pub(crate) fn verification_bounds(
        &self,
        overrides: &SearchOverrides,
    ) -> Result<SearchBounds, GasEstimationError> {
        self.resolve_bounds(
            overrides
                .verification_lower_bound
                .unwrap_or(self.verification_lower_bound),
            overrides
                .verification_upper_bound
                .unwrap_or(self.verification_upper_bound),
            overrides,
        )
    }

    /// The paymaster search always spans the configured paymaster range
    pub(crate) fn paymaster_verification_bounds(
        &self,
        overrides: &SearchOverrides,
    ) -> Result<SearchBounds, GasEstimationError> {
        self.resolve_bounds(
            self.verification_lower_bound,
            self.max_paymaster_verification_gas,
            overrides,
        )
    }

    pub(crate) fn call_bounds(
        &self,
        overrides: &SearchOverrides,
    ) -> Result<SearchBounds, GasEstimationError> {
        self.resolve_bounds(
            overrides.call_gas_lower_bound.unwrap_or(0),
            overrides.call_gas_upper_bound.unwrap_or(self.max_call_gas),
            overrides,
        )
    }

    fn resolve_bounds(
        &self,
        lower: u128,
        upper: u128,
        overrides: &SearchOverrides,
    ) -> Result<SearchBounds, GasEstimationError> {
        let bounds = SearchBounds {
            lower: U256::from(lower),
            upper: U256::from(upper),
            cutoff: U256::from(overrides.cutoff.unwrap_or(self.verification_cutoff)),
            multiplier: U256::from(
                overrides
                    .multiplier
                    .unwrap_or(self.verification_upper_bound_multiplier),
            ),
            rounding: U256::from(overrides.rounding.unwrap_or(self.rounding)),
            max_rounds: overrides
                .max_rounds
                .unwrap_or(self.max_gas_estimation_rounds),
        };

        if bounds.lower >= bounds.upper {
            return Err(GasEstimationError::InvalidSettings(format!(
                "lower bound {} must be below upper bound {}",
                bounds.lower, bounds.upper
            )));
        }
        if bounds.cutoff.is_zero() || bounds.multiplier.is_zero() || bounds.rounding.is_zero() {
            return Err(GasEstimationError::InvalidSettings(
                "cutoff, multiplier and rounding must be non-zero".to_string(),
            ));
        }
        if bounds.max_rounds == 0 {
            return Err(GasEstimationError::InvalidSettings(
                "max rounds must be non-zero".to_string(),
            ));
        }
        Ok(bounds)
    }
}

/// Per request replacements for the search parameters in [`Settings`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchOverrides {
    /// Lower bound of the account verification search
    pub verification_lower_bound: Option<u128>,
    /// Upper bound of the account verification search
    pub verification_upper_bound: Option<u128>,
    /// Lower bound of the call gas search
    pub call_gas_lower_bound: Option<u128>,
    /// Upper bound of the call gas search
    pub call_gas_upper_bound: Option<u128>,
    /// Host driven search cutoff
    pub cutoff: Option<u128>,
    /// Host driven search upper bound multiplier
    pub multiplier: Option<u64>,
    /// On-chain search rounding
    pub rounding: Option<u128>,
    /// Maximum number of on-chain search calls
    pub max_rounds: Option<u32>,
}

/// Resolved search parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SearchBounds {
    pub(crate) lower: U256,
    pub(crate) upper: U256,
    pub(crate) cutoff: U256,
    pub(crate) multiplier: U256,
    pub(crate) rounding: U256,
    pub(crate) max_rounds: u32,
}

/// What the node will honor on `eth_call`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulationCapabilities {
    /// State overrides are accepted
    pub state_override: bool,
    /// Code overrides are applied reliably
    pub code_override: bool,
}

impl SimulationCapabilities {
    /// Capabilities declared by a chain spec
    pub fn from_chain_spec(chain_spec: &ChainSpec) -> Self {
        Self {
            state_override: chain_spec.supports_state_override,
            code_override: chain_spec.supports_code_override,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SimulationTier {
    /// Simulator code and sender balance are overridden
    Full,
    /// Only the sender balance is overridden, the deployed entry point runs
    StateOnly,
    /// No overrides, estimates come from one simulation with fixed gas values
    Degraded,
}

impl SimulationTier {
    pub(crate) fn new(capabilities: SimulationCapabilities, has_bytecode: bool) -> Self {
        match capabilities {
            SimulationCapabilities {
                state_override: false,
                ..
            } => Self::Degraded,
            SimulationCapabilities {
                code_override: true,
                ..
            } if has_bytecode => Self::Full,
            _ => Self::StateOnly,
        }
    }
}

/// Parameters of a single estimation request
#[derive(Clone, Debug)]
pub struct EstimationParams<UO> {
    /// Operation to estimate, never modified
    pub op: UO,
    /// Node capabilities, the chain spec's when unset
    pub capabilities: Option<SimulationCapabilities>,
    /// Caller state overrides merged into every simulation
    pub state_override: Option<StateOverride>,
    /// Current base fee, needed by some data availability oracles
    pub base_fee: Option<U256>,
    /// Search parameter overrides
    pub overrides: SearchOverrides,
}

impl<UO> EstimationParams<UO> {
    /// Parameters with everything but the operation left to defaults
    pub fn new(op: UO) -> Self {
        Self {
            op,
            capabilities: None,
            state_override: None,
            base_fee: None,
            overrides: SearchOverrides::default(),
        }
    }
}

/// Result of a verification gas search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerificationGasEstimate {
    /// Verification gas limit
    pub verification_gas_limit: U256,
    /// Paymaster verification gas limit, v0.7 operations with a paymaster only
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Window reported by account and paymaster validation
    pub valid_time_range: ValidTimeRange,
}

/// Gas estimator trait
#[cfg_attr(feature = "test-utils", automock(type UO = opgas_types::v0_6::UserOperation;))]
#[async_trait::async_trait]
pub trait GasEstimator: Send + Sync {
    /// The user operation type estimated by this gas estimator
    type UO: UserOperation;

    /// Estimates every gas field of an operation.
    ///
    /// Verification, call and pre-verification gas are estimated concurrently,
    /// each on its own copy of the operation.
    async fn estimate_user_operation_gas(
        &self,
        params: EstimationParams<Self::UO>,
    ) -> Result<GasEstimate, GasEstimationError>;

    /// Estimates the verification gas limits and validity window
    async fn estimate_verification_gas_limit(
        &self,
        params: EstimationParams<Self::UO>,
    ) -> Result<VerificationGasEstimate, GasEstimationError>;

    /// Estimates the call gas limit
    async fn estimate_call_gas_limit(
        &self,
        params: EstimationParams<Self::UO>,
    ) -> Result<U256, GasEstimationError>;

    /// Calculates pre-verification gas, including data availability fees
    async fn calculate_pre_verification_gas(
        &self,
        params: EstimationParams<Self::UO>,
    ) -> Result<U256, GasEstimationError>;

    /// Replaces the entry point used by later estimations
    fn set_entry_point_address(&mut self, address: Address);
}

#[derive(Metrics)]
#[metrics(scope = "gas_estimator")]
struct Metrics {
    #[metric(describe = "the distribution of total gas estimate time.")]
    total_gas_estimate_ms: Histogram,
    #[metric(describe = "the distribution of pvg estimate time.")]
    pvg_estimate_ms: Histogram,
    #[metric(describe = "the distribution of vgl estimate time.")]
    vgl_estimate_ms: Histogram,
    #[metric(describe = "the distribution of cgl estimate time.")]
    cgl_estimate_ms: Histogram,
}

/// Signal reverted by an on-chain search round
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SearchSignal {
    Result {
        gas_estimate: U256,
        time_range: ValidTimeRange,
        num_rounds: U256,
    },
    Continuation {
        min_gas: U256,
        max_gas: U256,
        num_rounds: U256,
    },
    RevertAtMax(Bytes),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SearchOutcome {
    pub(crate) gas_estimate: U256,
    pub(crate) time_range: ValidTimeRange,
    pub(crate) num_rounds: U256,
}

/// Drives an on-chain search until it reports a result.
///
/// Each continuation is re-issued with exactly the bounds it returned and
/// `is_continuation` set. A continuation that does not narrow the bounds, or
/// running out of calls, ends the search with an error.
pub(crate) async fn run_continuation_search<F, Fut, R>(
    mut round_fn: F,
    bounds: &SearchBounds,
    revert_at_max: R,
) -> Result<SearchOutcome, GasEstimationError>
where
    F: FnMut(U256, U256, bool) -> Fut,
    Fut: Future<Output = Result<SearchSignal, GasEstimationError>>,
    R: FnOnce(Bytes) -> GasEstimationError,
{
    let mut min_gas = bounds.lower;
    let mut max_gas = bounds.upper;
    let mut is_continuation = false;
    let mut num_rounds = U256::ZERO;

    for _ in 0..bounds.max_rounds {
        match round_fn(min_gas, max_gas, is_continuation).await? {
            SearchSignal::Result {
                gas_estimate,
                time_range,
                num_rounds: ret_num_rounds,
            } => {
                return Ok(SearchOutcome {
                    gas_estimate,
                    time_range,
                    num_rounds: num_rounds.saturating_add(ret_num_rounds),
                });
            }
            SearchSignal::RevertAtMax(revert_data) => return Err(revert_at_max(revert_data)),
            SearchSignal::Continuation {
                min_gas: ret_min_gas,
                max_gas: ret_max_gas,
                num_rounds: ret_num_rounds,
            } => {
                if ret_min_gas <= min_gas && ret_max_gas >= max_gas {
                    return Err(GasEstimationError::ContinuationStalled { min_gas, max_gas });
                }
                tracing::debug!("search continues between {ret_min_gas} and {ret_max_gas}");
                min_gas = ret_min_gas;
                max_gas = ret_max_gas;
                is_continuation = true;
                num_rounds = num_rounds.saturating_add(ret_num_rounds);
            }
        }
    }

    Err(GasEstimationError::MaxRoundsExceeded(bounds.max_rounds))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn bounds() -> SearchBounds {
        Settings::default()
            .call_bounds(&SearchOverrides::default())
            .unwrap()
    }

    fn unexpected_revert(_: Bytes) -> GasEstimationError {
        GasEstimationError::RevertInCallWithMessage("unexpected".to_string())
    }

    #[tokio::test]
    async fn test_continuation_reissues_returned_bounds() {
        let calls = Mutex::new(vec![]);
        let outcome = run_continuation_search(
            |min_gas, max_gas, is_continuation| {
                calls.lock().unwrap().push((min_gas, max_gas, is_continuation));
                let round = calls.lock().unwrap().len();
                async move {
                    Ok(match round {
                        1 => SearchSignal::Continuation {
                            min_gas: U256::from(1_000),
                            max_gas: U256::from(500_000),
                            num_rounds: U256::from(3),
                        },
                        2 => SearchSignal::Continuation {
                            min_gas: U256::from(40_000),
                            max_gas: U256::from(60_000),
                            num_rounds: U256::from(3),
                        },
                        _ => SearchSignal::Result {
                            gas_estimate: U256::from(50_000),
                            time_range: ValidTimeRange::all_time(),
                            num_rounds: U256::from(2),
                        },
                    })
                }
            },
            &bounds(),
            unexpected_revert,
        )
        .await
        .unwrap();

        assert_eq!(outcome.gas_estimate, U256::from(50_000));
        assert_eq!(outcome.num_rounds, U256::from(8));
        assert_eq!(
            calls.into_inner().unwrap(),
            vec![
                (U256::ZERO, U256::from(20_000_000), false),
                (U256::from(1_000), U256::from(500_000), true),
                (U256::from(40_000), U256::from(60_000), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_result_stops_search() {
        let mut calls = 0;
        let outcome = run_continuation_search(
            |_, _, _| {
                calls += 1;
                async {
                    Ok(SearchSignal::Result {
                        gas_estimate: U256::from(21_000),
                        time_range: ValidTimeRange::new(5, 10),
                        num_rounds: U256::from(1),
                    })
                }
            },
            &bounds(),
            unexpected_revert,
        )
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(outcome.time_range, ValidTimeRange::new(5, 10));
    }

    #[tokio::test]
    async fn test_revert_at_max() {
        let err = run_continuation_search(
            |_, _, _| async { Ok(SearchSignal::RevertAtMax(Bytes::from_static(b"\x01"))) },
            &bounds(),
            GasEstimationError::RevertInCallWithBytes,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GasEstimationError::RevertInCallWithBytes(b) if b.len() == 1));
    }

    #[tokio::test]
    async fn test_stalled_continuation() {
        let err = run_continuation_search(
            |min_gas, max_gas, _| async move {
                Ok(SearchSignal::Continuation {
                    min_gas,
                    max_gas,
                    num_rounds: U256::from(1),
                })
            },
            &bounds(),
            unexpected_revert,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GasEstimationError::ContinuationStalled { .. }));
    }

    #[tokio::test]
    async fn test_max_rounds() {
        let bounds = Settings::default()
            .call_bounds(&SearchOverrides {
                max_rounds: Some(3),
                ..Default::default()
            })
            .unwrap();
        let mut calls = 0u32;
        let err = run_continuation_search(
            |min_gas, max_gas, _| {
                calls += 1;
                async move {
                    Ok(SearchSignal::Continuation {
                        min_gas: min_gas + U256::from(1),
                        max_gas,
                        num_rounds: U256::from(1),
                    })
                }
            },
            &bounds,
            unexpected_revert,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GasEstimationError::MaxRoundsExceeded(3)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_too_low_reasons() {
        let settings = Settings::default();
        for reason in DEFAULT_TOO_LOW_REASONS {
            assert!(settings.is_too_low(&ValidationRevert::EntryPoint(reason.to_string())));
        }
        assert!(settings.is_too_low(&ValidationRevert::Operation {
            entry_point_reason: "AA23 reverted".to_string(),
            inner_revert_data: Bytes::new(),
            inner_revert_reason: None,
        }));

        for reason in [
            "",
            "garbage",
            "AA21 didn't pay prefund",
            "AA40",
            "AA40 over verificationGasLimit and more",
        ] {
            assert!(!settings.is_too_low(&ValidationRevert::EntryPoint(reason.to_string())));
        }
        assert!(!settings.is_too_low(&ValidationRevert::Unknown(Bytes::new())));
    }

    #[test]
    fn test_settings_validate() {
        assert_eq!(Settings::default().validate(), None);
        let settings = Settings {
            verification_cutoff: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_some());
        let settings = Settings {
            verification_lower_bound: 10,
            verification_upper_bound: 10,
            ..Default::default()
        };
        assert!(settings.validate().is_some());

        // each probe alone fits, both together do not
        let settings = Settings {
            max_verification_gas: 10_000_000,
            max_call_gas: 20_000_000,
            simulation_gas_cap: 25_000_000,
            ..Default::default()
        };
        assert!(settings
            .validate()
            .is_some_and(|e| e.contains("max_verification_gas + max_call_gas")));
        let settings = Settings {
            simulation_gas_cap: 30_000_000,
            ..settings
        };
        assert_eq!(settings.validate(), None);
    }

    #[test]
    fn test_override_bounds() {
        let settings = Settings::default();
        let bounds = settings
            .verification_bounds(&SearchOverrides {
                verification_upper_bound: Some(500_000),
                cutoff: Some(1_000),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(bounds.lower, U256::ZERO);
        assert_eq!(bounds.upper, U256::from(500_000));
        assert_eq!(bounds.cutoff, U256::from(1_000));
        assert_eq!(bounds.multiplier, U256::from(6));

        let err = settings
            .call_bounds(&SearchOverrides {
                call_gas_lower_bound: Some(30_000_000),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, GasEstimationError::InvalidSettings(_)));
    }

    #[test]
    fn test_override_bounds_are_scoped() {
        let settings = Settings::default();
        let overrides = SearchOverrides {
            verification_upper_bound: Some(150_000),
            ..Default::default()
        };

        let verification = settings.verification_bounds(&overrides).unwrap();
        assert_eq!(verification.upper, U256::from(150_000));

        let call = settings.call_bounds(&overrides).unwrap();
        assert_eq!(call.lower, U256::ZERO);
        assert_eq!(call.upper, U256::from(settings.max_call_gas));

        let paymaster = settings.paymaster_verification_bounds(&overrides).unwrap();
        assert_eq!(
            paymaster.upper,
            U256::from(settings.max_paymaster_verification_gas)
        );

        let call = settings
            .call_bounds(&SearchOverrides {
                call_gas_upper_bound: Some(400_000),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(call.upper, U256::from(400_000));
        assert_eq!(
            settings.verification_bounds(&SearchOverrides {
                call_gas_upper_bound: Some(400_000),
                ..Default::default()
            })
            .unwrap()
            .upper,
            U256::from(settings.verification_upper_bound)
        );
    }

    #[test]
    fn test_simulation_tier() {
        let full = SimulationCapabilities {
            state_override: true,
            code_override: true,
        };
        assert_eq!(SimulationTier::new(full, true), SimulationTier::Full);
        assert_eq!(SimulationTier::new(full, false), SimulationTier::StateOnly);
        assert_eq!(
            SimulationTier::new(
                SimulationCapabilities {
                    state_override: true,
                    code_override: false
                },
                true
            ),
            SimulationTier::StateOnly
        );
        assert_eq!(
            SimulationTier::new(
                SimulationCapabilities {
                    state_override: false,
                    code_override: true
                },
                true
            ),
            SimulationTier::Degraded
        );
    }
}
