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

//! Prometheus gauges for the latest api.weather.gov observation
//!
//! ## Features
//!
//! `nws_scraper` polls the latest observation for a single [NWS station] using the
//! [api.weather.gov] API and republishes a fixed set of readings as Prometheus gauges. Readings
//! are published in the units the API reports them in. When a reading is missing from an
//! observation, its gauge keeps the last value that was seen.
//!
//! * `nws_humidity` - Relative humidity (0-100).
//! * `nws_temperature` - Temperature, in degrees celsius.
//! * `nws_dewpoint` - Dewpoint, in degrees celsius.
//! * `nws_wind_direction` - Wind direction, in degrees.
//! * `nws_wind_speed` - Wind speed, as reported by the station.
//! * `nws_barometric_pressure` - Barometric pressure, in pascals.
//! * `nws_visibility` - Visibility, in meters.
//!
//! [NWS station]: https://www.weather.gov/documentation/services-web-api#/default/obs_stations
//! [api.weather.gov]: https://www.weather.gov/documentation/services-web-api
//!
//! ## Usage
//!
//! Pick a station (for example `KPHL` for Philadelphia International Airport) and run
//!
//! ```text
//! ./nws_scraper --station KPHL
//! ```
//!
//! The latest observation is fetched every `--refresh-secs` seconds (100 by default). When a
//! fetch fails, the error is logged and another attempt is made after `--backoff-secs` seconds
//! (the refresh interval by default). Failures never stop the process.
//!
//! ### Prometheus
//!
//! Gauges are exposed on port `8080` at `/metrics`. Add the host running `nws_scraper` as a
//! target under the Prometheus `scrape_configs` section.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: nws_scraper
//!   static_configs:
//!   - targets: ['example:8080']
//! ```
//!

pub mod client;
pub mod http;
pub mod metrics;
pub mod scrape;
