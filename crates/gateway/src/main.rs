//! # Upload Gateway
//!
//! クラウドオブジェクトストレージへの書き込み専用・期限付きアップロード許可を発行する。
//! クライアントはストレージの認証情報を持たずに、返却された署名付きURLへ直接PUTする。
//!
//! ## 役割
//! - 衝突しにくいオブジェクトキーの生成
//! - 正規化リクエストの構築と署名機関（IAM signBlob）への署名委譲
//! - 署名付きURLの組み立て
//!
//! ## API エンドポイント
//! - `POST /upload` — 署名付きURL発行
//! - `OPTIONS /upload` — プリフライト
//!
//! ## 起動シーケンス
//! 1. 環境変数から設定を解決
//! 2. アップロード先バケットの存在確認（なければ作成）
//! 3. `0.0.0.0:{PORT}` で待ち受け開始

mod auth;
mod config;
mod endpoints;
mod error;
mod key;
mod signed_url;
mod signing;
mod storage;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::auth::TokenSource;
use crate::config::{GatewayConfig, GatewayState};
use crate::key::KeyGenerator;
use crate::signed_url::UrlSigner;
use crate::signing::IamSigningAuthority;
use crate::storage::{BucketAdmin, GcsBucketAdmin};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        project_id = %config.project_id,
        bucket = %config.bucket,
        signer = %config.service_account_email,
        scheme = %config.scheme,
        "設定を読み込みました"
    );

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let tokens = Arc::new(match &config.static_access_token {
        Some(token) => {
            tracing::warn!("GOOGLE_OAUTH_ACCESS_TOKENを使用します（開発環境用）");
            TokenSource::fixed(token.clone())
        }
        None => TokenSource::application_default()?,
    });

    // バケットのプロビジョニング（起動時に一度だけ）
    if config.skip_bucket_check {
        tracing::warn!("SKIP_BUCKET_CHECKが設定されています。バケット確認を省略します");
    } else {
        let bucket_admin = GcsBucketAdmin::new(
            http_client.clone(),
            config.storage_api_endpoint.clone(),
            config.project_id.clone(),
            config.bucket.clone(),
            tokens.clone(),
        );
        bucket_admin.ensure_bucket_exists().await?;
    }

    let authority = IamSigningAuthority::new(
        http_client,
        config.iam_endpoint.clone(),
        config.service_account_resource(),
        tokens,
    );

    let state = Arc::new(GatewayState {
        url_signer: UrlSigner::new(
            config.signer_config(),
            Arc::new(KeyGenerator::new()),
            Arc::new(authority),
        ),
    });

    let app = endpoints::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Gatewayを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
