//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。
//! レスポンスはステータスコード + プレーンテキストのエラーメッセージ。

use axum::http::StatusCode;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト（ボディのパース失敗、contentType欠落）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 署名機関への委譲に失敗（到達不能、エラー応答、署名のデコード失敗）
    #[error("署名に失敗: {0}")]
    Signing(String),
    /// ストレージ管理APIの操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー（レスポンスのエンコード失敗等）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Signing(_) | GatewayError::Storage(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GatewayError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (GatewayError::Signing("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
