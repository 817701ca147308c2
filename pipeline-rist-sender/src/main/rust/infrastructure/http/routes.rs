use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::application::services::PipelineController;
use crate::domain::errors::DomainError;

/// Largest configuration document accepted over HTTP
const MAX_CONFIG_BYTES: u64 = 1024 * 1024;

/// Health check response structure
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Control surface: raw config read/write, apply, status and health
pub fn routes(
    controller: Arc<PipelineController>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let with_controller = warp::any().map(move || controller.clone());

    let get_config = warp::path!("api" / "config" / "raw")
        .and(warp::get())
        .and(with_controller.clone())
        .and_then(get_config_raw);

    let set_config = warp::path!("api" / "config" / "raw")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_CONFIG_BYTES))
        .and(warp::body::bytes())
        .and(with_controller.clone())
        .and_then(set_config_raw);

    let apply = warp::path!("api" / "apply")
        .and(warp::post())
        .and(with_controller.clone())
        .and_then(apply_config);

    let status = warp::path!("api" / "status")
        .and(warp::get())
        .and(with_controller)
        .and_then(pipeline_status);

    let health = warp::path!("health").and(warp::get()).map(|| {
        let response = HealthResponse {
            status: "healthy",
            service: "pipeline-rist-sender",
            version: env!("CARGO_PKG_VERSION"),
        };
        warp::reply::json(&response).into_response()
    });

    get_config
        .or(set_config)
        .unify()
        .or(apply)
        .unify()
        .or(status)
        .unify()
        .or(health)
        .unify()
}

/// Bind the control surface and serve until `shutdown` resolves
pub async fn serve(
    controller: Arc<PipelineController>,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (addr, server): (SocketAddr, _) = warp::serve(routes(controller))
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), shutdown)?;

    tracing::info!("Control surface listening on http://{}", addr);
    server.await;
    Ok(())
}

async fn get_config_raw(controller: Arc<PipelineController>) -> Result<Response, Infallible> {
    let result = run_blocking(move || controller.store().read_raw()).await;
    Ok(match result {
        Ok(text) => text_reply(text, StatusCode::OK),
        Err(e) => error_reply(e),
    })
}

async fn set_config_raw(
    body: warp::hyper::body::Bytes,
    controller: Arc<PipelineController>,
) -> Result<Response, Infallible> {
    let text = match String::from_utf8(body.to_vec()) {
        Ok(text) => text,
        Err(e) => {
            return Ok(error_reply(DomainError::ConfigFormat(e.to_string())));
        }
    };

    let result = run_blocking(move || controller.store().write_raw(&text)).await;
    Ok(match result {
        Ok(()) => text_reply("OK".to_string(), StatusCode::OK),
        Err(e) => {
            tracing::warn!("Rejected configuration: {}", e);
            error_reply(e)
        }
    })
}

async fn apply_config(controller: Arc<PipelineController>) -> Result<Response, Infallible> {
    // apply can block for the stop grace period
    let result = run_blocking(move || controller.apply()).await;
    Ok(match result {
        Ok(()) => text_reply("reloaded".to_string(), StatusCode::OK),
        Err(e) => {
            tracing::error!("Apply failed: {}", e);
            error_reply(e)
        }
    })
}

async fn pipeline_status(controller: Arc<PipelineController>) -> Result<Response, Infallible> {
    let result = run_blocking(move || Ok(controller.status())).await;
    Ok(match result {
        Ok(status) => warp::reply::json(&status).into_response(),
        Err(e) => error_reply(e),
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(DomainError::TaskFailed(e.to_string())))
}

fn text_reply(body: String, status: StatusCode) -> Response {
    warp::reply::with_status(body, status).into_response()
}

fn error_reply(error: DomainError) -> Response {
    let status = match error {
        DomainError::ConfigFormat(_) | DomainError::ConfigSemantic(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    text_reply(error.to_string(), status)
}
