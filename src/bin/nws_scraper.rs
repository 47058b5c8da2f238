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

use clap::Parser;
use nws_scraper::client::WeatherGovClient;
use nws_scraper::http::RequestContext;
use nws_scraper::metrics::ObservationMetrics;
use nws_scraper::scrape::ScrapeLoop;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tokio::sync::watch;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const DEFAULT_REFRESH_SECS: u64 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STATION: &str = "KPHL";
const DEFAULT_API_URL: &str = "https://api.weather.gov/";

#[derive(Debug, Parser)]
#[clap(name = "nws_scraper", version = clap::crate_version!())]
struct NwsScraperApplication {
    /// NWS weather station ID to fetch observations for
    #[clap(long, default_value_t = DEFAULT_STATION.into())]
    station: String,

    /// Base URL for the Weather.gov API. A bare host name uses https.
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Enable verbose logging, equivalent to '--log-level debug' unless a more verbose level
    /// is already set.
    #[clap(long)]
    verbose: bool,

    /// Fetch the latest observation from the Weather.gov API at this interval, in seconds.
    #[clap(long, default_value_t = DEFAULT_REFRESH_SECS)]
    refresh_secs: u64,

    /// Wait this long after a failed fetch before trying again, in seconds. Defaults to
    /// the refresh interval.
    #[clap(long)]
    backoff_secs: Option<u64>,

    /// Timeout for fetching observations from the Weather.gov API, in seconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Address to bind to. By default, nws_scraper will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

impl NwsScraperApplication {
    fn max_level(&self) -> Level {
        if self.verbose {
            self.log_level.max(Level::DEBUG)
        } else {
            self.log_level
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = NwsScraperApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.max_level())
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_secs(opts.timeout_secs);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = WeatherGovClient::new(http_client, &opts.api_url).unwrap_or_else(|e| {
        tracing::error!(message = "invalid API URL", api_url = %opts.api_url, error = %e);
        process::exit(1)
    });

    let metrics = Arc::new(ObservationMetrics::new());
    let context = Arc::new(RequestContext::new(metrics.clone()));
    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    let refresh = Duration::from_secs(opts.refresh_secs);
    let backoff = opts.backoff_secs.map(Duration::from_secs).unwrap_or(refresh);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scrape = ScrapeLoop::new(client, metrics, &opts.station, refresh, backoff).with_shutdown(shutdown_rx);
    let scrape_handle = tokio::spawn(scrape.run());

    let server = server.serve(nws_scraper::http::app(context).into_make_service());
    tracing::info!(message = "server started", address = %server.local_addr());

    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    scrape_handle.await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
