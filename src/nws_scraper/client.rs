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

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    InvalidUrl(String),
    Transport(reqwest::Error),
    UpstreamStatus { status: StatusCode, body: String },
    Decode(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(u) => write!(f, "invalid API URL {}", u),
            Self::Transport(e) => write!(f, "{}", e),
            Self::UpstreamStatus { status, body } => write!(f, "unexpected status {}: {}", status, body),
            Self::Decode(e) => write!(f, "unable to decode observation: {}", e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Client for the latest observation of a station from api.weather.gov.
///
/// Each call to `observation()` makes exactly one request. There are no retries and nothing
/// is cached between calls. Any timeout must be configured on the `reqwest::Client` passed in.
#[derive(Debug)]
pub struct WeatherGovClient {
    client: Client,
    base_url: Url,
}

impl WeatherGovClient {
    const USER_AGENT: &'static str = "nws_scraper Prometheus Exporter (https://github.com/56quarters/nws_exporter)";
    const JSON_RESPONSE: &'static str = "application/geo+json";

    /// Create a new client for the API at `api_url`.
    ///
    /// The URL may be a bare host name (`api.weather.gov`) in which case `https` is assumed.
    /// Any path in the URL is kept as a prefix for requests.
    pub fn new(client: Client, api_url: &str) -> Result<Self, ClientError> {
        let base_url = parse_base_url(api_url)?;
        Ok(WeatherGovClient { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn observation(&self, station: &str) -> Result<Observation, ClientError> {
        let request_url = self.observation_url(station)?;
        tracing::debug!(message = "making latest observation request", url = %request_url);

        let res = self
            .client
            .get(request_url)
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = res.status();
        let body = res.bytes().await.map_err(ClientError::Transport)?;
        if !status.is_success() {
            return Err(ClientError::UpstreamStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Observation::from_json(&body)
    }

    fn observation_url(&self, station: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("stations")
            .push(station)
            .push("observations")
            .push("latest");

        Ok(url)
    }
}

fn parse_base_url(api_url: &str) -> Result<Url, ClientError> {
    let candidate = if api_url.contains("://") {
        api_url.to_owned()
    } else {
        format!("https://{}", api_url)
    };

    match Url::parse(&candidate) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        _ => Err(ClientError::InvalidUrl(api_url.to_owned())),
    }
}

/// Decode a field, falling back to its default when it is null or has an unexpected shape.
///
/// The observations feed is inconsistent about types for fields that aren't always measured
/// (wind gust, precipitation, 24 hour extremes), so only the top level structure of a document
/// is allowed to fail decoding.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Observation {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub type_: String,
    #[serde(default, deserialize_with = "lenient")]
    pub geometry: Option<Geometry>,
    pub properties: ObservationProperties,
}

impl Observation {
    /// Decode an observation document, failing only if the body isn't JSON or has no properties.
    pub fn from_json(body: &[u8]) -> Result<Self, ClientError> {
        serde_json::from_slice(body).map_err(ClientError::Decode)
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Geometry {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub type_: String,
    #[serde(default, deserialize_with = "lenient")]
    pub coordinates: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObservationProperties {
    #[serde(rename = "@id", default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(rename = "@type", default, deserialize_with = "lenient")]
    pub type_: String,
    #[serde(default, deserialize_with = "lenient")]
    pub elevation: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub station: String,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub raw_message: Option<String>,
    #[serde(rename = "textDescription", default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub present_weather: Vec<Weather>,
    #[serde(default, deserialize_with = "lenient")]
    pub temperature: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub dewpoint: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub wind_direction: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub wind_speed: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub wind_gust: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub barometric_pressure: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub sea_level_pressure: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub visibility: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub max_temperature_last_24_hours: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub min_temperature_last_24_hours: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub precipitation_last_hour: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub precipitation_last_3_hours: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub precipitation_last_6_hours: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub relative_humidity: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub wind_chill: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub heat_index: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub cloud_layers: Vec<CloudLayer>,
}

impl ObservationProperties {
    /// Cardinal direction the wind is blowing from, if wind direction was measured.
    pub fn wind_cardinal(&self) -> Option<Cardinal> {
        self.wind_direction.value.map(Cardinal::from_degrees)
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    #[serde(default, deserialize_with = "lenient")]
    pub weather: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub raw_string: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub intensity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub modifier: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CloudLayer {
    #[serde(default, deserialize_with = "lenient")]
    pub base: Measurement,
    #[serde(default, deserialize_with = "lenient")]
    pub amount: Option<String>,
}

/// A single reading along with its WMO unit code and quality control flag.
///
/// Units are passed along exactly as the API reports them, no conversion is done.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    #[serde(default, deserialize_with = "lenient")]
    pub unit_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub quality_control: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinal {
    North,
    East,
    South,
    West,
}

impl Cardinal {
    pub fn from_degrees(degrees: f64) -> Self {
        if (0.0..45.0).contains(&degrees) || (degrees > 315.0 && degrees <= 360.0) {
            Self::North
        } else if (45.0..=135.0).contains(&degrees) {
            Self::East
        } else if degrees > 135.0 && degrees < 225.0 {
            Self::South
        } else {
            Self::West
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "North",
            Self::East => "East",
            Self::South => "South",
            Self::West => "West",
        };

        f.write_str(name)
    }
}
