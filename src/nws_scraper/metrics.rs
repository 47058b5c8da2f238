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

use crate::client::{Measurement, Observation, ObservationProperties};
use prometheus_client::encoding::text;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::fmt;
use std::sync::atomic::AtomicU64;

const NAMESPACE: &str = "nws";

/// Content type of the text produced by `ObservationMetrics::render()`.
pub const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// A reading from an observation that is published as a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Humidity,
    Temperature,
    Dewpoint,
    WindDirection,
    WindSpeed,
    BarometricPressure,
    Visibility,
}

impl Quantity {
    pub const ALL: [Quantity; 7] = [
        Quantity::Humidity,
        Quantity::Temperature,
        Quantity::Dewpoint,
        Quantity::WindDirection,
        Quantity::WindSpeed,
        Quantity::BarometricPressure,
        Quantity::Visibility,
    ];

    /// Name of the gauge, without the "nws_" prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Humidity => "humidity",
            Self::Temperature => "temperature",
            Self::Dewpoint => "dewpoint",
            Self::WindDirection => "wind_direction",
            Self::WindSpeed => "wind_speed",
            Self::BarometricPressure => "barometric_pressure",
            Self::Visibility => "visibility",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Self::Humidity => "Relative humidity (0-100)",
            Self::Temperature => "Temperature in celsius",
            Self::Dewpoint => "Dewpoint in celsius",
            Self::WindDirection => "Wind direction in degrees",
            Self::WindSpeed => "Wind speed in the units reported by the station",
            Self::BarometricPressure => "Barometric pressure in pascals",
            Self::Visibility => "Visibility in meters",
        }
    }

    fn measurement<'a>(&self, props: &'a ObservationProperties) -> &'a Measurement {
        match self {
            Self::Humidity => &props.relative_humidity,
            Self::Temperature => &props.temperature,
            Self::Dewpoint => &props.dewpoint,
            Self::WindDirection => &props.wind_direction,
            Self::WindSpeed => &props.wind_speed,
            Self::BarometricPressure => &props.barometric_pressure,
            Self::Visibility => &props.visibility,
        }
    }

    /// Value of this quantity in the observation, if it was measured.
    pub fn value(&self, obs: &Observation) -> Option<f64> {
        self.measurement(&obs.properties).value
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", NAMESPACE, self.name())
    }
}

/// Holder for gauges that can be set from an `Observation` response.
///
/// All gauges are created and registered upon call to `ObservationMetrics::new()` and share
/// the prefix "nws_". Gauges are atomic so they may be set by the scrape loop while being
/// rendered for an HTTP request. There is no consistency between gauges: a render may see
/// some values from the newest observation and others from the one before it.
#[derive(Debug)]
pub struct ObservationMetrics {
    registry: Registry,
    humidity: Gauge<f64, AtomicU64>,
    temperature: Gauge<f64, AtomicU64>,
    dewpoint: Gauge<f64, AtomicU64>,
    wind_direction: Gauge<f64, AtomicU64>,
    wind_speed: Gauge<f64, AtomicU64>,
    barometric_pressure: Gauge<f64, AtomicU64>,
    visibility: Gauge<f64, AtomicU64>,
}

impl ObservationMetrics {
    pub fn new() -> Self {
        let mut metrics = Self {
            registry: Registry::with_prefix(NAMESPACE),
            humidity: Gauge::default(),
            temperature: Gauge::default(),
            dewpoint: Gauge::default(),
            wind_direction: Gauge::default(),
            wind_speed: Gauge::default(),
            barometric_pressure: Gauge::default(),
            visibility: Gauge::default(),
        };

        for quantity in Quantity::ALL {
            let gauge = metrics.gauge(quantity).clone();
            metrics.registry.register(quantity.name(), quantity.help(), gauge);
        }

        metrics
    }

    fn gauge(&self, quantity: Quantity) -> &Gauge<f64, AtomicU64> {
        match quantity {
            Quantity::Humidity => &self.humidity,
            Quantity::Temperature => &self.temperature,
            Quantity::Dewpoint => &self.dewpoint,
            Quantity::WindDirection => &self.wind_direction,
            Quantity::WindSpeed => &self.wind_speed,
            Quantity::BarometricPressure => &self.barometric_pressure,
            Quantity::Visibility => &self.visibility,
        }
    }

    /// Overwrite the current value of a gauge.
    pub fn set(&self, quantity: Quantity, value: f64) {
        self.gauge(quantity).set(value);
    }

    /// Current value of a gauge. Gauges that have never been set are zero.
    pub fn get(&self, quantity: Quantity) -> f64 {
        self.gauge(quantity).get()
    }

    /// Set gauges from the provided observation if the relevant value exists.
    ///
    /// If the observation doesn't contain a value for a particular gauge, the gauge will
    /// not be updated. Returns the number of gauges that were updated.
    pub fn observe(&self, obs: &Observation) -> usize {
        let mut updated = 0;
        for quantity in Quantity::ALL {
            if let Some(v) = quantity.value(obs) {
                self.set(quantity, v);
                updated += 1;
            }
        }

        updated
    }

    /// Render the current value of every gauge in the OpenMetrics text format.
    pub fn render(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        text::encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for ObservationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
