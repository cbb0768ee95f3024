//! # バケット管理
//!
//! 起動時に一度だけ実行する、アップロード先バケットの冪等なプロビジョニング。
//! リクエスト処理とは分離されており、テストではモックに差し替えられる。
//! GCS JSON API実装は `gcs` サブモジュールを参照。

pub mod gcs;

pub use gcs::GcsBucketAdmin;

use crate::error::GatewayError;

/// バケット管理の抽象インターフェース。
#[async_trait::async_trait]
pub trait BucketAdmin: Send + Sync {
    /// バケットが存在しなければ作成する。既に存在する場合は何もしない。
    async fn ensure_bucket_exists(&self) -> Result<(), GatewayError>;
}
