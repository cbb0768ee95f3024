//! # /upload
//!
//! 署名付きアップロードURL（PUT、有効期限10分）の発行。
//! 発行したURLはサーバー側で記録しない。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use upload_gateway_types::{UploadRequest, UploadResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /upload — 署名付きURL発行。
///
/// ボディはリクエストのContent-Typeヘッダーに関係なくJSONとして解釈する。
/// パースに失敗した場合は署名機関を呼び出さずに400を返す。
pub async fn handle_upload(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request: UploadRequest =
        serde_json::from_slice(&body).map_err(|e| GatewayError::BadRequest(e.to_string()))?;

    let issued = state
        .url_signer
        .issue_upload_url(&request.content_type)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "署名付きURLの発行に失敗"))?;

    let encoded = serde_json::to_vec(&UploadResponse { url: issued.url }).map_err(|e| {
        tracing::error!(error = %e, "レスポンスのエンコードに失敗");
        GatewayError::Internal(format!("レスポンスのエンコードに失敗: {e}"))
    })?;

    tracing::info!(
        object_path = %issued.object_path,
        content_type = %request.content_type,
        expires_at = %issued.expires_at,
        "署名付きURLを発行しました"
    );

    Ok(([(CONTENT_TYPE, "application/json")], encoded).into_response())
}

/// OPTIONS /upload — プリフライト。
/// 署名機関の状態に関係なく常に200（ボディなし）。
pub async fn handle_upload_preflight() -> StatusCode {
    StatusCode::OK
}
