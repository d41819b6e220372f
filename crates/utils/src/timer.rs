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

//! Scoped timers that feed metrics histograms.

use std::time::{Duration, Instant};

use metrics::Histogram;

/// Records the time between its creation and drop into a histogram, in milliseconds.
///
/// ```ignore
/// let _timer = HistogramTimer::start(metrics.estimate_ms.clone());
/// // ... timed work, recorded when `_timer` goes out of scope
/// ```
pub struct HistogramTimer {
    started: Instant,
    histogram: Histogram,
}

impl HistogramTimer {
    /// Starts a timer recording into `histogram`
    pub fn start(histogram: Histogram) -> Self {
        Self {
            started: Instant::now(),
            histogram,
        }
    }

    /// Time since the timer started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.record(self.elapsed().as_secs_f64() * 1_000.0);
    }
}
