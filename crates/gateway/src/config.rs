//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ解決され、必要なコンポーネントに注入される。

use std::time::Duration;

use anyhow::Context;

use crate::signed_url::{SignerConfig, SigningScheme, UrlSigner};

/// 待ち受けポートのデフォルト
pub const DEFAULT_PORT: u16 = 8080;

/// 外部API呼び出しのタイムアウトのデフォルト（秒）
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// GCPプロジェクトID（`GOOGLE_CLOUD_PROJECT`）
    pub project_id: String,
    /// アップロード先バケット（`UPLOAD_BUCKET`、未設定時はプロジェクトID）
    pub bucket: String,
    /// 署名者サービスアカウント（`SERVICE_ACCOUNT_EMAIL`）
    pub service_account_email: String,
    /// 待ち受けポート（`PORT`）
    pub port: u16,
    /// 署名方式（`SIGNING_SCHEME`）
    pub scheme: SigningScheme,
    /// 発行URLのホスト名（`STORAGE_HOST`）
    pub storage_host: String,
    /// ストレージ管理APIのベースURL（`STORAGE_API_ENDPOINT`）
    pub storage_api_endpoint: String,
    /// IAM APIのベースURL（`IAM_ENDPOINT`）
    pub iam_endpoint: String,
    /// 固定アクセストークン（`GOOGLE_OAUTH_ACCESS_TOKEN`、開発環境用）
    pub static_access_token: Option<String>,
    /// 外部API呼び出しのタイムアウト（`SIGNER_TIMEOUT_SECS`）
    pub http_timeout: Duration,
    /// 起動時のバケット確認を省略する（`SKIP_BUCKET_CHECK`）
    pub skip_bucket_check: bool,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から構築する。空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let project_id = get("GOOGLE_CLOUD_PROJECT")
            .context("GOOGLE_CLOUD_PROJECTが未設定です")?;
        let bucket = get("UPLOAD_BUCKET").unwrap_or_else(|| project_id.clone());
        let service_account_email = get("SERVICE_ACCOUNT_EMAIL")
            .unwrap_or_else(|| format!("{project_id}@appspot.gserviceaccount.com"));

        let port = match get("PORT") {
            Some(p) => p
                .parse::<u16>()
                .with_context(|| format!("PORTが不正です: {p}"))?,
            None => DEFAULT_PORT,
        };

        let scheme = match get("SIGNING_SCHEME") {
            Some(s) => s.parse::<SigningScheme>().map_err(anyhow::Error::msg)?,
            None => SigningScheme::default(),
        };

        let http_timeout_secs = match get("SIGNER_TIMEOUT_SECS") {
            Some(s) => s
                .parse::<u64>()
                .with_context(|| format!("SIGNER_TIMEOUT_SECSが不正です: {s}"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            project_id,
            bucket,
            service_account_email,
            port,
            scheme,
            storage_host: get("STORAGE_HOST")
                .unwrap_or_else(|| "storage.googleapis.com".to_string()),
            storage_api_endpoint: get("STORAGE_API_ENDPOINT")
                .unwrap_or_else(|| "https://storage.googleapis.com".to_string()),
            iam_endpoint: get("IAM_ENDPOINT")
                .unwrap_or_else(|| "https://iam.googleapis.com".to_string()),
            static_access_token: get("GOOGLE_OAUTH_ACCESS_TOKEN"),
            http_timeout: Duration::from_secs(http_timeout_secs),
            skip_bucket_check: get("SKIP_BUCKET_CHECK").is_some_and(|v| v == "true"),
        })
    }

    /// IAM上のサービスアカウントのリソース名。
    pub fn service_account_resource(&self) -> String {
        format!(
            "projects/{}/serviceAccounts/{}",
            self.project_id, self.service_account_email
        )
    }

    /// URL署名器に注入する設定。
    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            bucket: self.bucket.clone(),
            google_access_id: self.service_account_email.clone(),
            storage_host: self.storage_host.clone(),
            scheme: self.scheme,
        }
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// 署名付きアップロードURLの発行者
    pub url_signer: UrlSigner,
}
