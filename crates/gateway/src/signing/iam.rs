//! # IAM signBlob 署名機関
//!
//! サービスアカウントの秘密鍵による署名をIAM APIに委譲する。
//! リクエスト・レスポンスともに署名対象と署名はBase64 (Standard)。

use std::sync::Arc;

use base64::Engine;
use upload_gateway_types::{SignBlobRequest, SignBlobResponse};

use super::SigningAuthority;
use crate::auth::TokenSource;
use crate::error::GatewayError;

/// Base64エンジン（Standard）
pub(crate) fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// IAM `projects.serviceAccounts.signBlob` を使う署名機関。
pub struct IamSigningAuthority {
    http_client: reqwest::Client,
    /// IAM APIのベースURL（例: "https://iam.googleapis.com"）
    endpoint: String,
    /// `projects/{project}/serviceAccounts/{email}`
    service_account_resource: String,
    tokens: Arc<TokenSource>,
}

impl IamSigningAuthority {
    pub fn new(
        http_client: reqwest::Client,
        endpoint: String,
        service_account_resource: String,
        tokens: Arc<TokenSource>,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            service_account_resource,
            tokens,
        }
    }

    fn sign_blob_url(&self) -> String {
        format!(
            "{}/v1/{}:signBlob",
            self.endpoint.trim_end_matches('/'),
            self.service_account_resource
        )
    }
}

#[async_trait::async_trait]
impl SigningAuthority for IamSigningAuthority {
    async fn sign_blob(&self, payload: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let auth_headers = self
            .tokens
            .headers()
            .await
            .map_err(|e| GatewayError::Signing(format!("認証ヘッダー取得失敗: {e}")))?;

        let request = SignBlobRequest {
            bytes_to_sign: b64().encode(payload),
        };

        let response = self
            .http_client
            .post(self.sign_blob_url())
            .headers(auth_headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "signBlobの送信に失敗");
                GatewayError::Signing(format!("HTTP送信失敗: {e}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Signing(format!("レスポンス読み取り失敗: {e}")))?;

        if !status.is_success() {
            tracing::warn!(%status, "署名機関がエラーを返しました");
            return Err(GatewayError::Signing(format!(
                "署名機関がエラーを返しました: HTTP {status} - {body}"
            )));
        }

        let parsed: SignBlobResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Signing(format!("レスポンスのパースに失敗: {e}")))?;

        b64()
            .decode(&parsed.signature)
            .map_err(|e| GatewayError::Signing(format!("署名のBase64デコードに失敗: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::Json;

    const RESOURCE: &str = "projects/demo/serviceAccounts/demo@appspot.gserviceaccount.com";

    fn authority(port: u16) -> IamSigningAuthority {
        IamSigningAuthority::new(
            reqwest::Client::new(),
            format!("http://127.0.0.1:{port}"),
            RESOURCE.to_string(),
            Arc::new(TokenSource::fixed("test-token")),
        )
    }

    /// 署名対象がBase64で送られ、返却された署名がデコードされることを確認
    #[tokio::test]
    async fn test_sign_blob_roundtrip() {
        let app = axum::Router::new().fallback(
            |uri: Uri, headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(uri.path(), format!("/v1/{RESOURCE}:signBlob"));
                assert_eq!(headers.get("authorization").unwrap(), "Bearer test-token");

                let bytes = b64()
                    .decode(body["bytesToSign"].as_str().unwrap())
                    .unwrap();
                let mut signature = b"sig:".to_vec();
                signature.extend_from_slice(&bytes);

                Json(serde_json::json!({
                    "keyId": "key-1",
                    "signature": b64().encode(signature),
                }))
            },
        );
        let port = crate::test_helpers::start_mock_server(app).await;

        let signature = authority(port).sign_blob(b"payload").await.unwrap();
        assert_eq!(signature, b"sig:payload");
    }

    #[tokio::test]
    async fn test_sign_blob_error_status() {
        let app = axum::Router::new().fallback(|| async {
            (StatusCode::FORBIDDEN, "iam.serviceAccounts.signBlob denied").into_response()
        });
        let port = crate::test_helpers::start_mock_server(app).await;

        let err = authority(port).sign_blob(b"payload").await.unwrap_err();
        assert!(matches!(err, GatewayError::Signing(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[tokio::test]
    async fn test_sign_blob_undecodable_signature() {
        let app = axum::Router::new().fallback(|| async {
            Json(serde_json::json!({ "keyId": "k", "signature": "***not base64***" }))
        });
        let port = crate::test_helpers::start_mock_server(app).await;

        let err = authority(port).sign_blob(b"payload").await.unwrap_err();
        assert!(matches!(err, GatewayError::Signing(_)));
    }

    #[tokio::test]
    async fn test_sign_blob_unreachable() {
        // 何も待ち受けていないポート
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = authority(port).sign_blob(b"payload").await.unwrap_err();
        assert!(matches!(err, GatewayError::Signing(_)));
    }
}
