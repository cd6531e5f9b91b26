use crate::metrics::{BalanceMetrics, TEXT_CONTENT_TYPE};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use std::path::Path;
use tracing::{debug, error};

pub const METRICS_PATH: &str = "/metrics";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const PLAIN_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Route a request: `/metrics` renders the registry, every other path serves
/// the index page. Only `GET` and `HEAD` are accepted.
pub async fn handle_request(
    method: &Method,
    path: &str,
    metrics: &BalanceMetrics,
    index_file: &Path,
) -> Response<Full<Bytes>> {
    if *method != Method::GET && *method != Method::HEAD {
        let mut response = text_response(
            StatusCode::METHOD_NOT_ALLOWED,
            PLAIN_CONTENT_TYPE,
            "Method Not Allowed\n",
        );
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        return response;
    }

    match path {
        METRICS_PATH => handle_metrics(metrics),
        _ => handle_index(index_file).await,
    }
}

fn handle_metrics(metrics: &BalanceMetrics) -> Response<Full<Bytes>> {
    match metrics.render() {
        Ok(body) => text_response(StatusCode::OK, TEXT_CONTENT_TYPE, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                PLAIN_CONTENT_TYPE,
                "Internal Server Error\n",
            )
        }
    }
}

async fn handle_index(index_file: &Path) -> Response<Full<Bytes>> {
    match tokio::fs::read(index_file).await {
        Ok(contents) => text_response(StatusCode::OK, HTML_CONTENT_TYPE, contents),
        Err(e) => {
            debug!("Cannot read index file {}: {}", index_file.display(), e);
            text_response(StatusCode::NOT_FOUND, PLAIN_CONTENT_TYPE, "404 page not found\n")
        }
    }
}

pub fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
