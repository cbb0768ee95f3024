//! # GCS バケット管理
//!
//! Cloud Storage JSON APIでバケットの存在確認と作成を行う。

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use upload_gateway_types::BucketResource;

use super::BucketAdmin;
use crate::auth::TokenSource;
use crate::error::GatewayError;

/// Cloud Storage JSON APIによるバケット管理。
pub struct GcsBucketAdmin {
    http_client: reqwest::Client,
    /// ストレージAPIのベースURL（例: "https://storage.googleapis.com"）
    endpoint: String,
    project_id: String,
    bucket: String,
    tokens: Arc<TokenSource>,
}

impl GcsBucketAdmin {
    pub fn new(
        http_client: reqwest::Client,
        endpoint: String,
        project_id: String,
        bucket: String,
        tokens: Arc<TokenSource>,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            bucket,
            tokens,
        }
    }

    async fn auth_headers(&self) -> Result<HeaderMap, GatewayError> {
        self.tokens
            .headers()
            .await
            .map_err(|e| GatewayError::Storage(format!("認証ヘッダー取得失敗: {e}")))
    }

    async fn create_bucket(&self, auth_headers: HeaderMap) -> Result<(), GatewayError> {
        let url = format!("{}/storage/v1/b", self.endpoint);
        let response = self
            .http_client
            .post(&url)
            .query(&[("project", self.project_id.as_str())])
            .headers(auth_headers)
            .json(&BucketResource {
                name: self.bucket.clone(),
            })
            .send()
            .await
            .map_err(|e| GatewayError::Storage(format!("バケット作成の送信に失敗: {e}")))?;

        match response.status() {
            s if s.is_success() => {
                tracing::info!(bucket = %self.bucket, "バケットを作成しました");
                Ok(())
            }
            // 別のレプリカが先に作成した
            StatusCode::CONFLICT => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(GatewayError::Storage(format!(
                    "バケット作成に失敗: HTTP {status} - {body}"
                )))
            }
        }
    }
}

#[async_trait::async_trait]
impl BucketAdmin for GcsBucketAdmin {
    async fn ensure_bucket_exists(&self) -> Result<(), GatewayError> {
        let auth_headers = self.auth_headers().await?;
        let url = format!("{}/storage/v1/b/{}", self.endpoint, self.bucket);

        let response = self
            .http_client
            .get(&url)
            .headers(auth_headers.clone())
            .send()
            .await
            .map_err(|e| GatewayError::Storage(format!("バケット確認の送信に失敗: {e}")))?;

        match response.status() {
            s if s.is_success() => {
                tracing::info!(bucket = %self.bucket, "バケットは既に存在します");
                Ok(())
            }
            StatusCode::NOT_FOUND => self.create_bucket(auth_headers).await,
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(GatewayError::Storage(format!(
                    "バケット確認に失敗: HTTP {status} - {body}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::extract::{Path, Query};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Json;

    fn admin(port: u16) -> GcsBucketAdmin {
        GcsBucketAdmin::new(
            reqwest::Client::new(),
            format!("http://127.0.0.1:{port}/"),
            "demo".to_string(),
            "demo".to_string(),
            Arc::new(TokenSource::fixed("test-token")),
        )
    }

    #[tokio::test]
    async fn test_existing_bucket_is_not_created() {
        let created = Arc::new(AtomicBool::new(false));
        let flag = created.clone();
        let app = axum::Router::new()
            .route(
                "/storage/v1/b/{bucket}",
                get(|Path(bucket): Path<String>| async move {
                    Json(BucketResource { name: bucket })
                }),
            )
            .route(
                "/storage/v1/b",
                post(move || {
                    let flag = flag.clone();
                    async move {
                        flag.store(true, Ordering::SeqCst);
                        StatusCode::OK
                    }
                }),
            );
        let port = crate::test_helpers::start_mock_server(app).await;

        admin(port).ensure_bucket_exists().await.unwrap();
        assert!(!created.load(Ordering::SeqCst));
    }

    /// 404の場合にプロジェクト指定でバケットが作成されることを確認
    #[tokio::test]
    async fn test_missing_bucket_is_created() {
        let created = Arc::new(AtomicBool::new(false));
        let flag = created.clone();
        let app = axum::Router::new()
            .route(
                "/storage/v1/b/{bucket}",
                get(|| async { StatusCode::NOT_FOUND }),
            )
            .route(
                "/storage/v1/b",
                post(
                    move |Query(q): Query<std::collections::HashMap<String, String>>,
                          Json(body): Json<BucketResource>| {
                        let flag = flag.clone();
                        async move {
                            assert_eq!(q.get("project").map(String::as_str), Some("demo"));
                            assert_eq!(body.name, "demo");
                            flag.store(true, Ordering::SeqCst);
                            Json(body)
                        }
                    },
                ),
            );
        let port = crate::test_helpers::start_mock_server(app).await;

        admin(port).ensure_bucket_exists().await.unwrap();
        assert!(created.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_conflict_is_success() {
        let app = axum::Router::new()
            .route("/storage/v1/b/{bucket}", get(|| async { StatusCode::NOT_FOUND }))
            .route("/storage/v1/b", post(|| async { StatusCode::CONFLICT }));
        let port = crate::test_helpers::start_mock_server(app).await;

        admin(port).ensure_bucket_exists().await.unwrap();
    }

    #[tokio::test]
    async fn test_lookup_error_is_reported() {
        let app = axum::Router::new().route(
            "/storage/v1/b/{bucket}",
            get(|| async { (StatusCode::FORBIDDEN, "no access").into_response() }),
        );
        let port = crate::test_helpers::start_mock_server(app).await;

        let err = admin(port).ensure_bucket_exists().await.unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
        assert!(err.to_string().contains("no access"));
    }
}
