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

use std::io;

pub use tracing::*;
use tracing::{subscriber::Interest, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use super::LogsArgs;

/// Installs the global subscriber.
///
/// Logs go to stderr unless a file is given, stdout only carries results.
pub fn configure_logging(config: &LogsArgs) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = match &config.file {
        Some(log_file) => {
            tracing_appender::non_blocking(tracing_appender::rolling::never(".", log_file))
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(writer);
    let fmt_layer = if config.json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.pretty().boxed()
    };

    subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt_layer)
            .with(TransportNoiseFilter),
    )?;

    // `log` records from dependencies
    LogTracer::init()?;

    Ok(guard)
}

const NOISY_TARGETS: &[&str] = &["h2", "hyper", "reqwest", "alloy_transport_http"];

struct TransportNoiseFilter;

impl<S: Subscriber> Layer<S> for TransportNoiseFilter {
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if NOISY_TARGETS
            .iter()
            .any(|target| metadata.target().starts_with(target))
        {
            Interest::never()
        } else {
            Interest::always()
        }
    }
}
