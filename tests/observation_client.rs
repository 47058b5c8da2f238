//! Observation client tests against a local stand-in for api.weather.gov

use axum::extract::Path;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Router, Server};
use nws_scraper::client::{ClientError, WeatherGovClient};
use nws_scraper::metrics::{ObservationMetrics, Quantity};
use reqwest::Client;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

const SAMPLE: &str = include_str!("fixtures/latest_observation.json");

/// Start a server for the router and return its base URL.
async fn start_upstream(router: Router) -> String {
    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = Server::try_bind(&addr)
        .expect("failed to bind random port")
        .serve(router.into_make_service());
    let local = server.local_addr();

    tokio::spawn(server);
    format!("http://{}/", local)
}

fn client_for(base_url: &str, timeout: Duration) -> WeatherGovClient {
    let http = Client::builder().timeout(timeout).build().unwrap();
    WeatherGovClient::new(http, base_url).unwrap()
}

async fn latest(Path(station): Path<String>, headers: HeaderMap) -> Response {
    if station != "KPHL" {
        return (StatusCode::NOT_FOUND, "unknown station").into_response();
    }

    let accept = headers.get(ACCEPT).and_then(|v| v.to_str().ok());
    if accept != Some("application/geo+json") {
        return StatusCode::NOT_ACCEPTABLE.into_response();
    }

    ([(CONTENT_TYPE, "application/geo+json")], SAMPLE).into_response()
}

#[tokio::test]
async fn test_observation_success() {
    let router = Router::new().route("/stations/:station/observations/latest", get(latest));
    let base = start_upstream(router).await;
    let client = client_for(&base, Duration::from_secs(5));

    let obs = client.observation("KPHL").await.unwrap();
    let metrics = ObservationMetrics::new();

    assert_eq!(7, metrics.observe(&obs));
    assert_eq!(62.5, metrics.get(Quantity::Humidity));
    assert_eq!(18.2, metrics.get(Quantity::Temperature));
    assert_eq!(10.6, metrics.get(Quantity::Dewpoint));
    assert_eq!(270.0, metrics.get(Quantity::WindDirection));
    assert_eq!(16.56, metrics.get(Quantity::WindSpeed));
    assert_eq!(101560.0, metrics.get(Quantity::BarometricPressure));
    assert_eq!(16090.0, metrics.get(Quantity::Visibility));
}

#[tokio::test]
async fn test_observation_unknown_station() {
    let router = Router::new().route("/stations/:station/observations/latest", get(latest));
    let base = start_upstream(router).await;
    let client = client_for(&base, Duration::from_secs(5));

    match client.observation("KXYZ").await {
        Err(ClientError::UpstreamStatus { status, body }) => {
            assert_eq!(404, status.as_u16());
            assert_eq!("unknown station", body);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_observation_service_unavailable() {
    let router = Router::new().route(
        "/stations/:station/observations/latest",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "service unavailable") }),
    );
    let base = start_upstream(router).await;
    let client = client_for(&base, Duration::from_secs(5));

    match client.observation("KPHL").await {
        Err(ClientError::UpstreamStatus { status, body }) => {
            assert_eq!(503, status.as_u16());
            assert_eq!("service unavailable", body);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_observation_invalid_json() {
    let router = Router::new().route(
        "/stations/:station/observations/latest",
        get(|| async { ([(CONTENT_TYPE, "application/geo+json")], "{\"properties\": {\"temperature\":") }),
    );
    let base = start_upstream(router).await;
    let client = client_for(&base, Duration::from_secs(5));

    let res = client.observation("KPHL").await;
    assert!(matches!(res, Err(ClientError::Decode(_))), "unexpected result {:?}", res);
}

#[tokio::test]
async fn test_observation_connection_refused() {
    // Bind and immediately release a port so nothing is listening on it
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let client = client_for(&format!("http://{}/", addr), Duration::from_secs(5));
    let res = client.observation("KPHL").await;
    assert!(matches!(res, Err(ClientError::Transport(_))), "unexpected result {:?}", res);
}

#[tokio::test]
async fn test_observation_timeout() {
    let router = Router::new().route(
        "/stations/:station/observations/latest",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            SAMPLE
        }),
    );
    let base = start_upstream(router).await;
    let client = client_for(&base, Duration::from_millis(100));

    match client.observation("KPHL").await {
        Err(ClientError::Transport(e)) => assert!(e.is_timeout()),
        other => panic!("unexpected result {:?}", other),
    }
}
