//! # Gatewayエンドポイント
//!
//! - `POST /upload` — 署名付きアップロードURL発行
//! - `OPTIONS /upload` — プリフライト
//!
//! 全レスポンス（エラー・404含む）にCORSヘッダーを付与する。

pub mod upload;

pub use upload::{handle_upload, handle_upload_preflight};

use std::sync::Arc;

use axum::http::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::config::GatewayState;

/// ルーターを構築する。
pub fn router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/upload",
            axum::routing::post(handle_upload).options(handle_upload_preflight),
        )
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(axum::middleware::map_response(with_cors_headers))
        .with_state(state)
}

async fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
