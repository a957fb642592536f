use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    body::Incoming,
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::{convert::Infallible, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::report_store::ReportStore;

/// Serve the JSON view of the latest report until `cancel` fires.
pub async fn run_http_server(
    address: String,
    store: Arc<ReportStore>,
    staleness_threshold_secs: u64,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(&address).await?;
    info!("🌐 HTTP API listening on http://{}", address);

    loop {
        let (stream, _) = tokio::select! {
            _ = cancel.cancelled() => {
                info!("HTTP API shutting down");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };
        let io = TokioIo::new(stream);
        let store = store.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let store = store.clone();
                async move { handle_request(req, store, staleness_threshold_secs).await }
            });

            if let Err(err) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    store: Arc<ReportStore>,
    staleness_threshold_secs: u64,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(route(req.method(), req.uri().path(), &store, staleness_threshold_secs))
}

fn route(
    method: &Method,
    path: &str,
    store: &ReportStore,
    staleness_threshold_secs: u64,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/api/traffic") => {
            respond(StatusCode::OK, Some("application/json"), get_traffic(store))
        }
        (&Method::GET, "/api/status") => respond(
            StatusCode::OK,
            Some("application/json"),
            get_status(store, staleness_threshold_secs).to_string(),
        ),
        (&Method::GET, "/health") => {
            if store.is_stale(staleness_threshold_secs) {
                respond(StatusCode::SERVICE_UNAVAILABLE, Some("text/plain"), "stale")
            } else {
                respond(StatusCode::OK, Some("text/plain"), "ok")
            }
        }
        _ => respond(StatusCode::NOT_FOUND, None, "Not Found"),
    }
}

fn respond(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

fn get_traffic(store: &ReportStore) -> String {
    match store.get_latest_report() {
        Some(report) => serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string()),
        None => r#"{"error":"no data available"}"#.to_string(),
    }
}

fn get_status(store: &ReportStore, staleness_threshold_secs: u64) -> serde_json::Value {
    json!({
        "poll": store.status(),
        "stale": store.is_stale(staleness_threshold_secs),
        "staleness_threshold_secs": staleness_threshold_secs,
    })
}
