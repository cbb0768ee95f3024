//! # 署名付きアップロードURL
//!
//! 正規化リクエスト（メソッド・リソースパス・有効期限・Content-Type）を組み立て、
//! その署名を外部の署名機関に委譲し、署名と合わせて完全修飾URLを構築する。
//!
//! ## 処理の流れ
//! 1. オブジェクトパス生成（`KeyGenerator`）
//! 2. 正規化リクエスト・署名対象文字列の構築
//! 3. 署名機関による署名（ロックを保持せずに待機）
//! 4. URL組み立て
//!
//! いずれかの段階で失敗した場合はURLを発行しない。生成済みのキーは破棄され、再利用されない。
//!
//! ## 署名方式
//! - V4: `GOOG4-RSA-SHA256`。有効期限は `X-Goog-Date` + `X-Goog-Expires`（秒）
//! - V2: `GoogleAccessId` / `Expires`（UNIX秒）/ `Signature`（Base64）

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::GatewayError;
use crate::key::KeyGenerator;
use crate::signing::SigningAuthority;

/// 発行するURLの有効期間（リクエストごとに変更不可）
pub const UPLOAD_URL_EXPIRY: Duration = Duration::from_secs(10 * 60);

/// V4署名アルゴリズム名
const V4_ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// V4署名でペイロードを署名対象にしないことを示す値
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// 署名方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningScheme {
    /// 旧方式（`GoogleAccessId` / `Expires` / `Signature`）
    V2,
    /// `GOOG4-RSA-SHA256`
    #[default]
    V4,
}

impl FromStr for SigningScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v2" => Ok(SigningScheme::V2),
            "v4" => Ok(SigningScheme::V4),
            other => Err(format!("未知の署名方式: {other}（v2 または v4）")),
        }
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningScheme::V2 => f.write_str("v2"),
            SigningScheme::V4 => f.write_str("v4"),
        }
    }
}

/// URL署名器の設定。起動時に一度だけ解決される。
#[derive(Debug, Clone)]
pub struct SignerConfig {
    /// アップロード先バケット名
    pub bucket: String,
    /// 署名者のサービスアカウント（メールアドレス）
    pub google_access_id: String,
    /// 発行URLのホスト名（例: "storage.googleapis.com"）
    pub storage_host: String,
    /// 署名方式
    pub scheme: SigningScheme,
}

/// 1リクエスト分の署名オプション。永続化されない。
#[derive(Debug, Clone)]
pub struct SignedUrlOptions<'a> {
    pub google_access_id: &'a str,
    pub method: &'static str,
    pub expires_at: DateTime<Utc>,
    pub content_type: &'a str,
    pub scheme: SigningScheme,
}

/// 発行済みの署名付きURL。
#[derive(Debug, Clone)]
pub struct IssuedUrl {
    pub url: String,
    pub object_path: String,
    pub expires_at: DateTime<Utc>,
}

/// 署名前のリクエスト。`string_to_sign` を署名機関に渡し、
/// 得られた署名を `finish` でURLに埋め込む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnsignedUrl {
    scheme: SigningScheme,
    /// `https://{host}/{bucket}/{object}`
    base_url: String,
    /// 署名パラメータを除いたクエリ文字列
    query: String,
    pub(crate) string_to_sign: String,
}

impl UnsignedUrl {
    /// 署名をクエリに付与して完全なURLを返す。
    pub(crate) fn finish(self, signature: &[u8]) -> String {
        match self.scheme {
            SigningScheme::V4 => format!(
                "{}?{}&X-Goog-Signature={}",
                self.base_url,
                self.query,
                hex::encode(signature)
            ),
            SigningScheme::V2 => format!(
                "{}?{}&Signature={}",
                self.base_url,
                self.query,
                urlencoding::encode(&base64::engine::general_purpose::STANDARD.encode(signature))
            ),
        }
    }
}

/// 署名付きアップロードURLの発行者。
pub struct UrlSigner {
    config: SignerConfig,
    keys: Arc<KeyGenerator>,
    authority: Arc<dyn SigningAuthority>,
}

impl UrlSigner {
    pub fn new(
        config: SignerConfig,
        keys: Arc<KeyGenerator>,
        authority: Arc<dyn SigningAuthority>,
    ) -> Self {
        Self {
            config,
            keys,
            authority,
        }
    }

    /// 現在時刻を発行時刻として署名付きPUT URLを発行する。
    pub async fn issue_upload_url(&self, content_type: &str) -> Result<IssuedUrl, GatewayError> {
        self.issue_upload_url_at(content_type, Utc::now()).await
    }

    /// 指定時刻を発行時刻として署名付きPUT URLを発行する。
    pub async fn issue_upload_url_at(
        &self,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedUrl, GatewayError> {
        // クライアントのHTTPスタックは前後の空白を落として送る
        let content_type = content_type.trim();
        let object_path = self.keys.object_path(content_type);

        let expiry = chrono::Duration::from_std(UPLOAD_URL_EXPIRY)
            .map_err(|e| GatewayError::Internal(format!("有効期限の変換に失敗: {e}")))?;
        let options = SignedUrlOptions {
            google_access_id: &self.config.google_access_id,
            method: "PUT",
            expires_at: now + expiry,
            content_type,
            scheme: self.config.scheme,
        };

        let unsigned = build_unsigned_url(&self.config, &object_path, &options, now);
        let signature = self
            .authority
            .sign_blob(unsigned.string_to_sign.as_bytes())
            .await?;
        let url = unsigned.finish(&signature);

        tracing::debug!(
            object_path = %object_path,
            content_type = %content_type,
            scheme = %self.config.scheme,
            "署名付きURLを発行"
        );

        Ok(IssuedUrl {
            url,
            object_path,
            expires_at: options.expires_at,
        })
    }
}

/// 署名方式に応じて署名前のリクエストを構築する。
pub(crate) fn build_unsigned_url(
    config: &SignerConfig,
    object_path: &str,
    options: &SignedUrlOptions<'_>,
    now: DateTime<Utc>,
) -> UnsignedUrl {
    let resource_path = format!("/{}/{}", config.bucket, encode_path(object_path));
    let base_url = format!("https://{}{}", config.storage_host, resource_path);

    match options.scheme {
        SigningScheme::V4 => {
            let (query, string_to_sign) =
                v4_query_and_string_to_sign(&config.storage_host, &resource_path, options, now);
            UnsignedUrl {
                scheme: SigningScheme::V4,
                base_url,
                query,
                string_to_sign,
            }
        }
        SigningScheme::V2 => {
            let expires = options.expires_at.timestamp();
            let string_to_sign = format!(
                "{}\n\n{}\n{}\n{}",
                options.method, options.content_type, expires, resource_path
            );
            let query = format!(
                "GoogleAccessId={}&Expires={}",
                urlencoding::encode(options.google_access_id),
                expires
            );
            UnsignedUrl {
                scheme: SigningScheme::V2,
                base_url,
                query,
                string_to_sign,
            }
        }
    }
}

/// V4の正規化クエリと署名対象文字列を構築する。
fn v4_query_and_string_to_sign(
    host: &str,
    resource_path: &str,
    options: &SignedUrlOptions<'_>,
    now: DateTime<Utc>,
) -> (String, String) {
    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let credential_scope = format!("{}/auto/storage/goog4_request", now.format("%Y%m%d"));
    let expires_secs = (options.expires_at - now).num_seconds();

    // ヘッダー名は小文字・辞書順
    let mut headers: Vec<(&str, &str)> = Vec::with_capacity(2);
    if !options.content_type.is_empty() {
        headers.push(("content-type", options.content_type));
    }
    headers.push(("host", host));
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();

    let mut params = vec![
        ("X-Goog-Algorithm", V4_ALGORITHM.to_string()),
        (
            "X-Goog-Credential",
            format!("{}/{credential_scope}", options.google_access_id),
        ),
        ("X-Goog-Date", timestamp.clone()),
        ("X-Goog-Expires", expires_secs.to_string()),
        ("X-Goog-SignedHeaders", signed_headers.clone()),
    ];
    params.sort_by(|a, b| a.0.cmp(&b.0));
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{resource_path}\n{query}\n{canonical_headers}\n{signed_headers}\n{UNSIGNED_PAYLOAD}",
        options.method
    );
    let string_to_sign = format!(
        "{V4_ALGORITHM}\n{timestamp}\n{credential_scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    (query, string_to_sign)
}

/// パスをセグメントごとにパーセントエンコードする（`/` は区切りとして残す）。
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
