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

use std::{fs, path::Path, str::FromStr, time::Duration};

use alloy_primitives::{Address, Bytes, U256};
use anyhow::Context;
use clap::{builder::PossibleValuesParser, Args, Parser, Subcommand, ValueEnum};
use opgas_provider::{EvmProvider, StateOverride};
use opgas_sim::{
    EstimationParams, EstimationSettings, GasEstimator, GasEstimatorImpl, SearchOverrides,
    SimulatedOperation, SimulationCapabilities,
};
use opgas_types::{chain::ChainSpec, v0_6, v0_7, EntryPointVersion, UserOperation};
use serde::de::DeserializeOwned;
use serde_json::json;

mod chain_spec;
mod tracing;

/// Main entry point for the CLI
///
/// Parses the CLI arguments, runs the subcommand and prints its result as JSON.
pub async fn run() -> anyhow::Result<()> {
    let opt = Cli::parse();
    let _guard = tracing::configure_logging(&opt.logs)?;
    tracing::debug!("Parsed CLI options: {:#?}", opt);

    let chain_spec = chain_spec::resolve_chain_spec(
        opt.common.network.as_deref(),
        opt.common.chain_spec.as_deref(),
    )?;
    tracing::info!("Chain spec: {:#?}", chain_spec);

    let output = match opt.command {
        Command::Estimate(args) => estimate(chain_spec, &opt.common, &args).await?,
        Command::Hash(args) => hash(&chain_spec, &args)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate command
    ///
    /// Estimates the gas limits of a user operation against a node
    #[command(name = "estimate")]
    Estimate(Box<EstimateArgs>),

    /// Hash command
    ///
    /// Prints the hash of a user operation, no node required
    #[command(name = "hash")]
    Hash(HashArgs),
}

/// CLI common options
#[derive(Debug, Args)]
#[command(next_help_heading = "Common")]
struct CommonArgs {
    /// Network flag
    #[arg(
        long = "network",
        name = "network",
        env = "NETWORK",
        value_parser = PossibleValuesParser::new(chain_spec::HARDCODED_CHAIN_SPECS),
        global = true)
    ]
    network: Option<String>,

    /// Chain spec file path
    #[arg(
        long = "chain_spec",
        name = "chain_spec",
        env = "CHAIN_SPEC",
        global = true
    )]
    chain_spec: Option<String>,

    /// ETH Node HTTP URL to connect to
    #[arg(
        long = "node_http",
        name = "node_http",
        env = "NODE_HTTP",
        global = true
    )]
    node_http: Option<String>,
}

/// Which part of the estimate to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Component {
    All,
    VerificationGas,
    CallGas,
    PreVerificationGas,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Estimate")]
struct EstimateArgs {
    /// Entry point version of the operation
    #[arg(
        long = "entry_point_version",
        name = "entry_point_version",
        env = "ENTRY_POINT_VERSION",
        default_value = "v0.7"
    )]
    entry_point_version: EntryPointVersion,

    /// User operation JSON, or `@path` to a file containing it
    #[arg(long = "user_operation", name = "user_operation")]
    user_operation: String,

    /// Component to estimate
    #[arg(
        long = "component",
        name = "component",
        value_enum,
        default_value = "all"
    )]
    component: Component,

    /// Entry point address, the chain spec's address for the version if unset
    #[arg(long = "entry_point", name = "entry_point", env = "ENTRY_POINT")]
    entry_point: Option<Address>,

    /// Base fee in wei, read from the pending block when the chain needs one
    #[arg(long = "base_fee", name = "base_fee")]
    base_fee: Option<u128>,

    /// JSON file of state overrides applied to every simulation
    #[arg(long = "state_override", name = "state_override")]
    state_override: Option<String>,

    /// Treat the node as not supporting state overrides
    #[arg(long = "no_state_override", name = "no_state_override")]
    no_state_override: bool,

    /// Treat the node as not supporting code overrides
    #[arg(long = "no_code_override", name = "no_code_override")]
    no_code_override: bool,

    /// Hex file with the v0.6 simulator build
    #[arg(
        long = "simulator_bytecode_v0_6",
        name = "simulator_bytecode_v0_6",
        env = "SIMULATOR_BYTECODE_V0_6"
    )]
    simulator_bytecode_v0_6: Option<String>,

    /// Hex file with the v0.7 simulator build
    #[arg(
        long = "simulator_bytecode_v0_7",
        name = "simulator_bytecode_v0_7",
        env = "SIMULATOR_BYTECODE_V0_7"
    )]
    simulator_bytecode_v0_7: Option<String>,

    /// Verification gas ceiling of the searches
    #[arg(
        long = "max_verification_gas",
        name = "max_verification_gas",
        env = "MAX_VERIFICATION_GAS",
        default_value = "10000000"
    )]
    max_verification_gas: u128,

    /// Paymaster verification gas ceiling of the searches
    #[arg(
        long = "max_paymaster_verification_gas",
        name = "max_paymaster_verification_gas",
        env = "MAX_PAYMASTER_VERIFICATION_GAS",
        default_value = "10000000"
    )]
    max_paymaster_verification_gas: u128,

    /// Call gas ceiling of the search
    #[arg(
        long = "max_call_gas",
        name = "max_call_gas",
        env = "MAX_CALL_GAS",
        default_value = "20000000"
    )]
    max_call_gas: u128,

    /// Maximum number of calls an on-chain search may make
    #[arg(
        long = "max_gas_estimation_rounds",
        name = "max_gas_estimation_rounds",
        env = "MAX_GAS_ESTIMATION_ROUNDS",
        default_value = "10"
    )]
    max_gas_estimation_rounds: u32,

    /// Gas limit of every simulation call
    #[arg(
        long = "simulation_gas_cap",
        name = "simulation_gas_cap",
        env = "SIMULATION_GAS_CAP",
        default_value = "50000000"
    )]
    simulation_gas_cap: u64,

    /// Paymaster post-op gas limit reported when the operation sets none
    #[arg(
        long = "default_paymaster_post_op_gas_limit",
        name = "default_paymaster_post_op_gas_limit",
        env = "DEFAULT_PAYMASTER_POST_OP_GAS_LIMIT",
        default_value = "0"
    )]
    default_paymaster_post_op_gas_limit: u128,

    /// Verification search lower bound override
    #[arg(
        long = "search.verification_lower_bound",
        name = "search.verification_lower_bound"
    )]
    verification_lower_bound: Option<u128>,

    /// Verification search upper bound override
    #[arg(
        long = "search.verification_upper_bound",
        name = "search.verification_upper_bound"
    )]
    verification_upper_bound: Option<u128>,

    /// Call gas search lower bound override
    #[arg(
        long = "search.call_gas_lower_bound",
        name = "search.call_gas_lower_bound"
    )]
    call_gas_lower_bound: Option<u128>,

    /// Call gas search upper bound override
    #[arg(
        long = "search.call_gas_upper_bound",
        name = "search.call_gas_upper_bound"
    )]
    call_gas_upper_bound: Option<u128>,

    /// Host driven search cutoff override
    #[arg(long = "search.cutoff", name = "search.cutoff")]
    cutoff: Option<u128>,

    /// Host driven search upper bound multiplier override
    #[arg(long = "search.multiplier", name = "search.multiplier")]
    multiplier: Option<u64>,

    /// On-chain search rounding override
    #[arg(long = "search.rounding", name = "search.rounding")]
    rounding: Option<u128>,

    /// On-chain search round cap override
    #[arg(long = "search.max_rounds", name = "search.max_rounds")]
    max_rounds: Option<u32>,

    /// Seconds before the estimation is abandoned
    #[arg(
        long = "timeout_seconds",
        name = "timeout_seconds",
        env = "TIMEOUT_SECONDS",
        default_value = "60"
    )]
    timeout_seconds: u64,
}

impl EstimateArgs {
    fn settings(&self) -> anyhow::Result<EstimationSettings> {
        Ok(EstimationSettings {
            max_verification_gas: self.max_verification_gas,
            max_paymaster_verification_gas: self.max_paymaster_verification_gas,
            max_call_gas: self.max_call_gas,
            max_gas_estimation_rounds: self.max_gas_estimation_rounds,
            simulation_gas_cap: self.simulation_gas_cap,
            default_paymaster_post_op_gas_limit: self.default_paymaster_post_op_gas_limit,
            simulator_bytecode_v0_6: self
                .simulator_bytecode_v0_6
                .as_deref()
                .map(read_bytecode)
                .transpose()?,
            simulator_bytecode_v0_7: self
                .simulator_bytecode_v0_7
                .as_deref()
                .map(read_bytecode)
                .transpose()?,
            ..Default::default()
        })
    }

    fn search_overrides(&self) -> SearchOverrides {
        SearchOverrides {
            verification_lower_bound: self.verification_lower_bound,
            verification_upper_bound: self.verification_upper_bound,
            call_gas_lower_bound: self.call_gas_lower_bound,
            call_gas_upper_bound: self.call_gas_upper_bound,
            cutoff: self.cutoff,
            multiplier: self.multiplier,
            rounding: self.rounding,
            max_rounds: self.max_rounds,
        }
    }

    fn capabilities(&self, chain_spec: &ChainSpec) -> Option<SimulationCapabilities> {
        if !self.no_state_override && !self.no_code_override {
            return None;
        }
        let declared = SimulationCapabilities::from_chain_spec(chain_spec);
        Some(SimulationCapabilities {
            state_override: declared.state_override && !self.no_state_override,
            code_override: declared.code_override && !self.no_code_override,
        })
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Hash")]
struct HashArgs {
    /// Entry point version of the operation
    #[arg(
        long = "entry_point_version",
        name = "entry_point_version",
        env = "ENTRY_POINT_VERSION",
        default_value = "v0.7"
    )]
    entry_point_version: EntryPointVersion,

    /// User operation JSON, or `@path` to a file containing it
    #[arg(long = "user_operation", name = "user_operation")]
    user_operation: String,

    /// Entry point address, the chain spec's address for the version if unset
    #[arg(long = "entry_point", name = "entry_point", env = "ENTRY_POINT")]
    entry_point: Option<Address>,
}

/// CLI options for logging
#[derive(Debug, Args)]
#[command(next_help_heading = "Logging")]
pub struct LogsArgs {
    /// Log file
    ///
    /// If not provided, logs will be written to stderr
    #[arg(
        long = "log.file",
        name = "log.file",
        env = "LOG_FILE",
        default_value = None,
        global = true
    )]
    file: Option<String>,

    /// Log JSON
    ///
    /// If set, logs will be written in JSON format
    #[arg(
        long = "log.json",
        name = "log.json",
        env = "LOG_JSON",
        required = false,
        num_args = 0,
        global = true
    )]
    json: bool,
}

/// CLI options
#[derive(Debug, Parser)]
#[clap(name = "opgas", version, about = "ERC-4337 user operation gas estimation")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(flatten)]
    common: CommonArgs,

    #[clap(flatten)]
    logs: LogsArgs,
}

async fn estimate(
    chain_spec: ChainSpec,
    common: &CommonArgs,
    args: &EstimateArgs,
) -> anyhow::Result<serde_json::Value> {
    let node_http = common
        .node_http
        .as_deref()
        .context("must provide node_http")?;
    let provider = opgas_provider::new_alloy_evm_provider(node_http)?;

    let chain_id = provider.get_chain_id().await?;
    if chain_id != chain_spec.id {
        tracing::warn!(
            "node reports chain id {chain_id}, chain spec {} expects {}",
            chain_spec.name,
            chain_spec.id
        );
    }

    let estimate = async {
        match args.entry_point_version {
            EntryPointVersion::V0_6 => {
                estimate_with::<v0_6::UserOperation, _>(chain_spec, provider, args).await
            }
            EntryPointVersion::V0_7 => {
                estimate_with::<v0_7::UserOperation, _>(chain_spec, provider, args).await
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(args.timeout_seconds), estimate)
        .await
        .with_context(|| format!("estimation timed out after {}s", args.timeout_seconds))?
}

async fn estimate_with<UO, P>(
    chain_spec: ChainSpec,
    provider: P,
    args: &EstimateArgs,
) -> anyhow::Result<serde_json::Value>
where
    UO: SimulatedOperation + DeserializeOwned,
    P: EvmProvider + Clone + 'static,
{
    let op: UO = read_json(&args.user_operation)?;
    let state_override = args
        .state_override
        .as_deref()
        .map(|path| read_json::<StateOverride>(&format!("@{path}")))
        .transpose()?;
    let capabilities = args.capabilities(&chain_spec);

    let da_gas_oracle = opgas_provider::new_da_gas_oracle(&chain_spec, provider.clone());
    let base_fee = match args.base_fee {
        Some(base_fee) => Some(U256::from(base_fee)),
        None if da_gas_oracle.requires_base_fee() => {
            Some(U256::from(provider.get_pending_base_fee().await?))
        }
        None => None,
    };

    let mut estimator =
        GasEstimatorImpl::<UO, P>::new(chain_spec, provider, da_gas_oracle, args.settings()?)?;
    if let Some(entry_point) = args.entry_point {
        estimator.set_entry_point_address(entry_point);
    }
    tracing::info!("Estimating against entry point {}", estimator.entry_point());

    let params = EstimationParams {
        op,
        capabilities,
        state_override,
        base_fee,
        overrides: args.search_overrides(),
    };

    Ok(match args.component {
        Component::All => serde_json::to_value(estimator.estimate_user_operation_gas(params).await?)?,
        Component::VerificationGas => {
            let estimate = estimator.estimate_verification_gas_limit(params).await?;
            json!({
                "verificationGasLimit": estimate.verification_gas_limit,
                "paymasterVerificationGasLimit": estimate.paymaster_verification_gas_limit,
                "validAfter": estimate.valid_time_range.valid_after,
                "validUntil": estimate.valid_time_range.valid_until,
            })
        }
        Component::CallGas => json!({
            "callGasLimit": estimator.estimate_call_gas_limit(params).await?,
        }),
        Component::PreVerificationGas => json!({
            "preVerificationGas": estimator.calculate_pre_verification_gas(params).await?,
        }),
    })
}

fn hash(chain_spec: &ChainSpec, args: &HashArgs) -> anyhow::Result<serde_json::Value> {
    let entry_point = args
        .entry_point
        .unwrap_or_else(|| chain_spec.entry_point_address(args.entry_point_version));
    let hash = match args.entry_point_version {
        EntryPointVersion::V0_6 => read_json::<v0_6::UserOperation>(&args.user_operation)?
            .hash(entry_point, chain_spec.id),
        EntryPointVersion::V0_7 => read_json::<v0_7::UserOperation>(&args.user_operation)?
            .hash(entry_point, chain_spec.id),
    };

    Ok(json!({
        "userOpHash": hash,
        "entryPoint": entry_point,
        "chainId": chain_spec.id,
    }))
}

/// Parses JSON given inline or, prefixed with `@`, from a file
fn read_json<T: DeserializeOwned>(input: &str) -> anyhow::Result<T> {
    match input.strip_prefix('@') {
        Some(path) => {
            let contents =
                fs::read_to_string(path).with_context(|| format!("should read {path}"))?;
            serde_json::from_str(&contents).with_context(|| format!("should parse {path}"))
        }
        None => serde_json::from_str(input).context("should parse inline JSON"),
    }
}

fn read_bytecode(path: &str) -> anyhow::Result<Bytes> {
    let contents = fs::read_to_string(Path::new(path))
        .with_context(|| format!("should read simulator bytecode {path}"))?;
    Bytes::from_str(contents.trim())
        .with_context(|| format!("simulator bytecode {path} should be hex"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_estimate() {
        let cli = Cli::try_parse_from([
            "opgas",
            "--network",
            "optimism",
            "estimate",
            "--entry_point_version",
            "v0.6",
            "--user_operation",
            "{}",
            "--component",
            "call-gas",
            "--search.max_rounds",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.common.network.as_deref(), Some("optimism"));
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate command");
        };
        assert_eq!(args.entry_point_version, EntryPointVersion::V0_6);
        assert_eq!(args.component, Component::CallGas);
        assert_eq!(args.search_overrides().max_rounds, Some(4));
        assert_eq!(args.timeout_seconds, 60);
    }

    #[test]
    fn test_capability_flags() {
        let cli = Cli::try_parse_from([
            "opgas",
            "estimate",
            "--user_operation",
            "{}",
            "--no_code_override",
        ])
        .unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate command");
        };

        assert_eq!(
            args.capabilities(&ChainSpec::default()),
            Some(SimulationCapabilities {
                state_override: true,
                code_override: false,
            })
        );
    }

    #[test]
    fn test_hash() {
        let chain_spec = ChainSpec {
            id: 1,
            ..Default::default()
        };
        let op = r#"{
            "sender": "0xf497A8026717FbbA3944c3dd2533c0716b7685e2",
            "nonce": "0x0",
            "callData": "0x"
        }"#;
        let args = HashArgs {
            entry_point_version: EntryPointVersion::V0_7,
            user_operation: op.to_string(),
            entry_point: None,
        };

        let output = hash(&chain_spec, &args).unwrap();
        assert_eq!(output["chainId"], 1);
        assert!(output["entryPoint"]
            .as_str()
            .unwrap()
            .eq_ignore_ascii_case("0x0000000071727De22E5E9d8BAf0edAc6f37da032"));
        assert!(output["userOpHash"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_read_json_inline_error() {
        assert!(read_json::<v0_6::UserOperation>("not json").is_err());
    }
}
