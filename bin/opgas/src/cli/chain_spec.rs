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

use anyhow::{bail, Context};
use config::{Config, Environment, File, FileFormat};
use opgas_types::chain::ChainSpec;
use paste::paste;

/// Resolve the chain spec from the network flag and a chain spec file.
///
/// Sources are layered, later ones winning: defaults, the `base` network
/// named by any other source, the file, the network flag, then `CHAIN_*`
/// environment variables.
pub fn resolve_chain_spec(
    network: Option<&str>,
    file: Option<&str>,
) -> anyhow::Result<ChainSpec> {
    let network = network.map(str::to_lowercase);
    let network_spec = network
        .as_deref()
        .map(hardcoded_chain_spec)
        .transpose()?;

    let base = layered(Config::builder(), file, network_spec)
        .build()
        .context("should build chain spec overrides")?
        .get::<String>("base")
        .ok();

    let default =
        serde_json::to_string(&ChainSpec::default()).context("should serialize default spec")?;
    let mut builder =
        Config::builder().add_source(File::from_str(default.as_str(), FileFormat::Json));
    if let Some(base) = base {
        builder = builder.add_source(File::from_str(
            hardcoded_chain_spec(&base.to_lowercase())?,
            FileFormat::Toml,
        ));
    }
    let config = layered(builder, file, network_spec)
        .build()
        .context("should build chain spec")?;

    match config.get::<u64>("id") {
        Ok(0) => bail!("chain id must be non-zero"),
        Ok(_) => {}
        Err(_) => bail!("chain id must be defined"),
    }

    config
        .try_deserialize()
        .context("chain spec should deserialize")
}

fn layered(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
    file: Option<&str>,
    network_spec: Option<&'static str>,
) -> config::ConfigBuilder<config::builder::DefaultState> {
    if let Some(file) = file {
        builder = builder.add_source(File::with_name(file));
    }
    if let Some(spec) = network_spec {
        builder = builder.add_source(File::from_str(spec, FileFormat::Toml));
    }
    builder.add_source(Environment::with_prefix("CHAIN"))
}

macro_rules! define_hardcoded_chain_specs {
    ($($network:ident),+) => {
        paste! {
            $(
                const [< $network:upper _SPEC >]: &str = include_str!(concat!("../../chain_specs/", stringify!($network), ".toml"));
            )+

            fn hardcoded_chain_spec(network: &str) -> anyhow::Result<&'static str> {
                match network {
                    $(
                        stringify!($network) => Ok([< $network:upper _SPEC >]),
                    )+
                    _ => bail!("unknown hardcoded network: {network}"),
                }
            }

            pub const HARDCODED_CHAIN_SPECS: &[&'static str] = &[$(stringify!($network),)+];
        }
    };
}

define_hardcoded_chain_specs!(
    ethereum, optimism, base, arbitrum, mantle, scroll, morph, sei, kakarot
);

#[cfg(test)]
mod tests {
    use opgas_types::chain::DAGasOracleType;

    use super::*;

    #[test]
    fn test_every_hardcoded_spec_resolves() {
        for network in HARDCODED_CHAIN_SPECS {
            let spec = resolve_chain_spec(Some(network), None).unwrap();
            assert_ne!(spec.id, 0, "{network}");
        }
    }

    #[test]
    fn test_base_inherits_optimism() {
        let spec = resolve_chain_spec(Some("base"), None).unwrap();
        assert_eq!(spec.id, 8453);
        assert_eq!(spec.name, "Base");
        assert_eq!(spec.da_gas_oracle_type, DAGasOracleType::OptimismBedrock);
    }

    #[test]
    fn test_degraded_networks() {
        let spec = resolve_chain_spec(Some("sei"), None).unwrap();
        assert!(!spec.supports_state_override);
        assert_eq!(spec.fallback_verification_gas_limit, 5_000_000);
    }

    #[test]
    fn test_missing_chain_id() {
        assert!(resolve_chain_spec(None, None).is_err());
    }

    #[test]
    fn test_unknown_network() {
        assert!(resolve_chain_spec(Some("unknown"), None).is_err());
    }
}
