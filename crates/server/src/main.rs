mod api;
mod config;
mod conversation;
mod cors;
mod db;
mod error;
mod generation;
mod session;
mod store;
mod validation;

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{
    api::AppState,
    config::ServerConfig,
    db::pool::{create_lazy_pg_pool, PoolConfig},
    error::{
        attach_request_id_header, request_id_from_headers_or_generate, with_request_id_scope,
        ApiError, ErrorCode, REQUEST_ID_HEADER,
    },
    generation::{AnthropicClient, AnthropicConfig, GenerationClient},
    store::{PersistenceGateway, PgStore, Store},
    validation::MAX_REST_BODY_BYTES,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .context("invalid GPULAW_SERVER_LOG_FILTER directive")?,
        )
        .init();

    let store = build_store(&config).await?;
    let gateway = PersistenceGateway::new(store);

    if config.seed_demo {
        match gateway.seed_demo(&config.owner_id).await {
            Ok(count) => info!(count, owner_id = %config.owner_id, "demo cases seeded"),
            Err(error) => warn!(%error, "demo seeding failed; continuing"),
        }
    }

    let generation: Arc<dyn GenerationClient> = Arc::new(AnthropicClient::new(AnthropicConfig {
        api_key: config.anthropic.api_key.clone(),
        base_url: config.anthropic.base_url.clone(),
        model: config.anthropic.model.clone(),
        check_model: config.anthropic.check_model.clone(),
    }));
    if config.anthropic.api_key.is_none() {
        warn!("ANTHROPIC_API_KEY is not set; generation will serve fallback documents");
    }

    let state =
        AppState::new(gateway, generation, config.chat_token_budget, config.owner_id.clone());
    let app = build_router(api::router(state), config.cors_origins.as_deref());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.listen_addr))?;

    info!(listen_addr = %config.listen_addr, model = %config.anthropic.model, "starting gpulaw server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gpulaw server exited unexpectedly")
}

/// The pool connects lazily, so an unreachable database never blocks
/// startup; migrations that fail here are retried on first store use.
async fn build_store(config: &ServerConfig) -> anyhow::Result<Store> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("GPULAW_SERVER_DATABASE_URL is not set; running without durable storage");
        return Ok(Store::Detached);
    };

    let pool = create_lazy_pg_pool(database_url, PoolConfig::from_env())
        .context("invalid PostgreSQL configuration")?;

    let store = PgStore::new(pool);
    match store.ensure_schema().await {
        Ok(()) => info!("database migrations applied"),
        Err(error) => warn!(%error, "database migrations not applied; retrying on first use"),
    }

    Ok(Store::Postgres(store))
}

fn build_router(api_router: Router, cors_origins: Option<&str>) -> Router {
    apply_middleware(Router::new().route("/healthz", get(healthz)).merge(api_router))
        .layer(cors::cors_layer(cors_origins))
}

fn apply_middleware(router: Router) -> Router {
    router
        .layer(DefaultBodyLimit::max(MAX_REST_BODY_BYTES))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}

async fn panic_handler(mut request: Request<Body>, next: Next) -> Response {
    let request_id = ensure_request_id(&mut request);
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, %request_id, "request handling panicked");
            ApiError::from_code(ErrorCode::InternalError)
                .with_request_id(request_id)
                .into_response()
        }
    }
}

/// Reuse the caller's `x-request-id` or assign one, so every layer below
/// sees the same id.
fn ensure_request_id(request: &mut Request<Body>) -> String {
    let request_id = request_id_from_headers_or_generate(request.headers());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    request_id
}

async fn request_context_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = ensure_request_id(&mut request);

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = with_request_id_scope(request_id.clone(), next.run(request)).await;
    attach_request_id_header(&mut response, &request_id);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use super::{apply_middleware, build_router, MAX_REST_BODY_BYTES};
    use crate::api::test_support::{body_json, test_app};
    use crate::generation::testing::MockGenerationClient;

    fn test_router() -> Router {
        build_router(test_app(MockGenerationClient::default()).router, None)
    }

    #[tokio::test]
    async fn health_check_has_request_id_header() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("healthz request should build"),
            )
            .await
            .expect("healthz request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn supplied_request_id_is_echoed_into_error_bodies() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/v1/documents/missing")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should return a response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-request-id"], "req-42");
        assert_eq!(body_json(response).await["error"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn panic_handler_returns_internal_server_error() {
        async fn panic_route() -> &'static str {
            panic!("test panic");
        }

        let app = apply_middleware(Router::new().route("/panic", get(panic_route)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/panic")
                    .body(Body::empty())
                    .expect("panic request should build"),
            )
            .await
            .expect("panic request should return a response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn request_body_limit_is_enforced() {
        async fn echo(body: String) -> String {
            body
        }

        let oversized_body = "a".repeat(MAX_REST_BODY_BYTES + 1);
        let app = apply_middleware(Router::new().route("/echo", post(echo)));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/echo")
                    .header("content-type", "text/plain")
                    .body(Body::from(oversized_body))
                    .expect("echo request should build"),
            )
            .await
            .expect("echo request should return a response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_preflight_allows_session_headers() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/v1/cases")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "x-gpulaw-session")
                    .body(Body::empty())
                    .expect("preflight request should build"),
            )
            .await
            .expect("preflight should return a response");

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }
}
