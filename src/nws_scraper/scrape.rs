// nws_scraper - Prometheus gauges for the latest api.weather.gov observation
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::{ClientError, WeatherGovClient};
use crate::metrics::ObservationMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Polling,
    Backoff,
}

/// Periodically fetch the latest observation for a station and update gauges from it.
///
/// Polls are strictly sequential. After a successful poll the loop waits `interval` before
/// polling again, after a failed one it waits `backoff`. Failures are never fatal and the
/// backoff does not grow.
#[derive(Debug)]
pub struct ScrapeLoop {
    client: WeatherGovClient,
    metrics: Arc<ObservationMetrics>,
    station: String,
    interval: Duration,
    backoff: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ScrapeLoop {
    pub fn new(
        client: WeatherGovClient,
        metrics: Arc<ObservationMetrics>,
        station: &str,
        interval: Duration,
        backoff: Duration,
    ) -> Self {
        ScrapeLoop {
            client,
            metrics,
            station: station.to_owned(),
            interval,
            backoff,
            shutdown: None,
        }
    }

    /// Stop the loop at its next wait once `true` is sent on the channel.
    ///
    /// If the sending half is dropped without sending `true`, the loop runs forever.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Fetch the latest observation once and update gauges from it.
    ///
    /// Returns the number of gauges that were updated.
    pub async fn poll_once(&self) -> Result<usize, ClientError> {
        let obs = self
            .client
            .observation(&self.station)
            .instrument(tracing::span!(Level::DEBUG, "nws_observation"))
            .await?;

        let updated = self.metrics.observe(&obs);
        tracing::info!(
            message = "fetched new observation",
            observation = %obs.id,
            gauges_updated = updated,
            wind = %obs.properties.wind_cardinal().map(|c| c.to_string()).unwrap_or_default(),
        );

        Ok(updated)
    }

    /// Run until shutdown is signaled or forever if there is no way to signal it.
    pub async fn run(mut self) {
        tracing::info!(
            message = "observation polling started",
            api_url = %self.client.base_url(),
            station = %self.station,
        );

        let mut state = ScrapeState::Polling;
        loop {
            state = match state {
                ScrapeState::Polling => match self.poll_once().await {
                    Ok(_) => {
                        tracing::debug!(
                            message = "waiting for next poll",
                            delay_secs = self.interval.as_secs_f64(),
                        );

                        if !self.wait(self.interval).await {
                            break;
                        }

                        ScrapeState::Polling
                    }
                    Err(e) => {
                        tracing::error!(
                            message = "failed to fetch observation",
                            station = %self.station,
                            error = %e,
                            delay_secs = self.backoff.as_secs_f64(),
                        );

                        ScrapeState::Backoff
                    }
                },
                ScrapeState::Backoff => {
                    if !self.wait(self.backoff).await {
                        break;
                    }

                    ScrapeState::Polling
                }
            };
        }

        tracing::info!(message = "observation polling stopped", station = %self.station);
    }

    /// Sleep for `delay`, returning `false` if shutdown was signaled first.
    async fn wait(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = shutdown_signaled(&mut self.shutdown) => false,
        }
    }
}

async fn shutdown_signaled(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
        None => std::future::pending().await,
    }
}
