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

use alloy_provider::{ProviderBuilder, RootProvider};
use alloy_rpc_client::ClientBuilder;
use alloy_transport::layers::RetryBackoffLayer;
use anyhow::Context;
use url::Url;

use self::{evm::AlloyEvmProvider, metrics::AlloyMetricLayer};

pub(crate) mod evm;
pub(crate) mod metrics;

/// Create a new alloy evm provider from a given RPC URL
pub fn new_alloy_evm_provider(rpc_url: &str) -> anyhow::Result<AlloyEvmProvider<RootProvider>> {
    let provider = new_alloy_provider(rpc_url)?;
    Ok(AlloyEvmProvider::new(provider))
}

/// Create a new alloy provider from a given RPC URL
///
/// Requests are retried with backoff on rate limiting and recorded by the
/// RPC metrics layer. No fillers are installed, calls are sent exactly as built.
pub fn new_alloy_provider(rpc_url: &str) -> anyhow::Result<RootProvider> {
    let url = Url::parse(rpc_url).context("invalid rpc url")?;
    let metric_layer = AlloyMetricLayer::default();
    // TODO: make the retry budget configurable, a large CUPS value disables throttling for now
    let retry_layer = RetryBackoffLayer::new(10, 500, 1_000_000);
    let client = ClientBuilder::default()
        .layer(retry_layer)
        .layer(metric_layer)
        .http(url);
    let provider = ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_client(client);
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url() {
        assert!(new_alloy_provider("not a url").is_err());
    }

    #[tokio::test]
    async fn test_valid_url() {
        assert!(new_alloy_evm_provider("http://localhost:8545").is_ok());
    }
}
