//! HTTP server for the generate-banter endpoint, with CORS and /health.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{any, get},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::validate::validate_request;
use crate::generation::BanterGenerator;
use crate::types::{ErrorBody, GenerateResponse, PipelineError, PipelineResult};

/// Shared state passed to all handlers via axum State.
pub struct ServerState {
    pub generator: Arc<dyn BanterGenerator>,
}

/// Serves `POST /generate-banter` in front of a generator.
pub struct EndpointServer {
    state: Arc<ServerState>,
}

impl EndpointServer {
    pub fn new(generator: Arc<dyn BanterGenerator>) -> Self {
        Self {
            state: Arc::new(ServerState { generator }),
        }
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> PipelineResult<()> {
        let app = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("generate-banter endpoint listening on {addr}");

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Router for the endpoint, usable without binding a socket.
pub fn router(generator: Arc<dyn BanterGenerator>) -> Router {
    build_router(Arc::new(ServerState { generator }))
}

fn build_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/generate-banter", any(handle_generate))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

async fn handle_generate(State(state): State<Arc<ServerState>>, method: Method, body: Bytes) -> Response {
    if method == Method::OPTIONS {
        return (StatusCode::OK, "ok").into_response();
    }
    if method != Method::POST {
        return error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let request = match validate_request(&body) {
        Ok(request) => request,
        Err(e) => return pipeline_error_response(&e),
    };

    match state.generator.generate(&request.image_url).await {
        Ok(excerpts) => {
            tracing::info!(count = excerpts.len(), "Generated banter");
            AxumJson(GenerateResponse::from_excerpts(&excerpts)).into_response()
        }
        Err(e) => {
            tracing::warn!("Banter generation failed: {e}");
            pipeline_error_response(&PipelineError::from(e))
        }
    }
}

async fn handle_health() -> Response {
    AxumJson(serde_json::json!({ "status": "ok" })).into_response()
}

fn pipeline_error_response(err: &PipelineError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, AxumJson(ErrorBody::new(message))).into_response()
}
