use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::config::ServerConfig;
use crate::error::ChartError;
use crate::input::{Fetch, QueryParams, UreqFetcher};
use crate::service::ChartService;

const CACHE_CONTROL: &str = "public, max-age=604800";

/// A 1x1 white PNG, served when even the error image cannot be drawn.
const FALLBACK_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
    0x77, 0x53, 0xde, 0x00, 0x00, 0x00, 0x0c, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0xf8,
    0xff, 0xff, 0x3f, 0x00, 0x05, 0xfe, 0x02, 0xfe, 0x33, 0x12, 0x95, 0x14, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub fn router(service: ChartService) -> Router {
    Router::new()
        .route("/chart", get(chart))
        .with_state(service)
}

/// Bind, serve until Ctrl-C or SIGTERM, then drain.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let fetcher: Arc<dyn Fetch> = Arc::new(UreqFetcher::new(config.fetch_timeout_secs));
    let service = tokio::task::spawn_blocking(move || ChartService::new(config, fetcher)).await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Chart server listening on http://{}", addr);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Chart server stopped");
    Ok(())
}

async fn chart(
    State(service): State<ChartService>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => QueryParams::new(params),
        Err(rejection) => {
            let err = ChartError::malformed(rejection.body_text());
            tracing::error!(kind = err.kind(), error = %err, "unreadable query string");
            return error_response(service, err).await;
        }
    };

    let worker = service.clone();
    match tokio::task::spawn_blocking(move || worker.render_query(&params)).await {
        Ok(Ok(png)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, CACHE_CONTROL),
            ],
            png,
        )
            .into_response(),
        Ok(Err(err)) => error_response(service, err).await,
        Err(join) => {
            tracing::error!(error = %join, "chart worker failed");
            error_response(service, ChartError::render("Chart worker failed")).await
        }
    }
}

async fn error_response(service: ChartService, err: ChartError) -> Response {
    let message = err.to_string();
    let png = match tokio::task::spawn_blocking(move || service.error_png(&err)).await {
        Ok(Ok(png)) => png,
        failed => {
            tracing::error!(?failed, %message, "could not draw error image");
            FALLBACK_PNG.to_vec()
        }
    };
    error_png_response(png)
}

fn error_png_response(png: Vec<u8>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "image/png")],
        png,
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::raster::is_png;

    #[test]
    fn fallback_image_is_a_decodable_png() {
        assert!(is_png(FALLBACK_PNG));
        let pixmap = tiny_skia::Pixmap::decode_png(FALLBACK_PNG).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (1, 1));
    }

    #[test]
    fn fallback_response_is_still_an_image() {
        let response = error_png_response(FALLBACK_PNG.to_vec());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }
}
