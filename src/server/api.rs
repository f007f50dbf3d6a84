use crate::config::TlsConfig;
use crate::models::analytics::AnalyticsSummary;
use crate::models::chat::Conversation;
use crate::relay::ChatRelay;
use crate::server::errors::ApiError;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Body,
    extract::{ rejection::JsonRejection, State },
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use governor::DefaultDirectRateLimiter;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn };

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/analytics", get(analytics_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState,
    tls: Option<&TlsConfig>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);

    match tls {
        Some(tls) => {
            // Both ring and aws-lc-rs may be compiled in; pick one explicitly.
            let _ = rustls::crypto::ring::default_provider().install_default();
            info!(
                "TLS enabled. Loading certificate from '{}' and key from '{}'",
                tls.cert_path,
                tls.key_path
            );
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &tls.cert_path,
                &tls.key_path
            ).await?;
            info!("Starting HTTPS server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await
                .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;
            info!("Starting HTTP server on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<Conversation>, JsonRejection>,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Chat rate limit exceeded; rejecting request");
            return Err(ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests"));
        }
    }

    let Json(conversation) = payload.map_err(|rejection| {
        warn!("Rejected chat payload: {}", rejection.body_text());
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let stream = state.relay.relay(conversation).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    ).into_response())
}

async fn analytics_handler() -> Json<AnalyticsSummary> {
    Json(AnalyticsSummary::current())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
