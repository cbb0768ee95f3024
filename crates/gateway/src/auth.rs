//! # 認証ヘッダー
//!
//! 署名機関（IAM）とストレージ管理APIの呼び出しに付与する認証ヘッダーを供給する。
//!
//! - `GOOGLE_OAUTH_ACCESS_TOKEN` が設定されていれば固定トークン（開発環境用）
//! - それ以外はApplication Default Credentials（`google-cloud-auth`）。
//!   Cloud Run / GCEではメタデータサーバーのトークンが使われ、更新とキャッシュはライブラリが行う

use axum::http::header::AUTHORIZATION;
use axum::http::{Extensions, HeaderMap, HeaderValue};
use google_cloud_auth::credentials::{Builder, CacheableResource, Credentials};

/// 認証ヘッダーの供給元。
pub enum TokenSource {
    /// 固定のBearerトークン
    Fixed(String),
    /// Application Default Credentials
    Adc(Credentials),
}

impl TokenSource {
    /// 固定トークンを返すTokenSourceを作成する。
    pub fn fixed(token: impl Into<String>) -> Self {
        TokenSource::Fixed(token.into())
    }

    /// Application Default CredentialsからTokenSourceを作成する。
    pub fn application_default() -> anyhow::Result<Self> {
        let credentials = Builder::default().build()?;
        Ok(TokenSource::Adc(credentials))
    }

    /// リクエストに付与する認証ヘッダーを返す。
    pub async fn headers(&self) -> Result<HeaderMap, String> {
        match self {
            TokenSource::Fixed(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| format!("固定トークンが不正です: {e}"))?;
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value);
                Ok(headers)
            }
            TokenSource::Adc(credentials) => {
                match credentials
                    .headers(Extensions::new())
                    .await
                    .map_err(|e| format!("認証情報の取得に失敗: {e}"))?
                {
                    CacheableResource::New { data, .. } => Ok(data),
                    // エンティティタグを渡していないので発生しない
                    CacheableResource::NotModified => {
                        Err("認証ヘッダーが返されませんでした".to_string())
                    }
                }
            }
        }
    }
}
