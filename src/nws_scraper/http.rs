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

use crate::metrics::{ObservationMetrics, TEXT_FORMAT};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Global state shared between all HTTP requests via `Arc`.
#[derive(Debug)]
pub struct RequestContext {
    metrics: Arc<ObservationMetrics>,
}

impl RequestContext {
    pub fn new(metrics: Arc<ObservationMetrics>) -> Self {
        Self { metrics }
    }
}

/// Create a router that renders all gauges at `/metrics`. Any other path is a 404.
pub fn app(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    match context.metrics.render() {
        Ok(buf) => {
            tracing::debug!(message = "encoded metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, TEXT_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
