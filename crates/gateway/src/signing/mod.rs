//! # 署名機関
//!
//! 秘密鍵を保持する外部の署名機関への委譲を抽象化する。
//! 本Gatewayは秘密鍵を持たず、正規化リクエストのバイト列に対する署名だけを受け取る。
//!
//! ## 実装
//! - `IamSigningAuthority`: IAM `serviceAccounts.signBlob` を呼び出す（本番用）

pub mod iam;

pub use iam::IamSigningAuthority;

use crate::error::GatewayError;

/// 署名機関の抽象インターフェース。
///
/// 署名者のアイデンティティは実装側が保持する。
#[async_trait::async_trait]
pub trait SigningAuthority: Send + Sync {
    /// 任意のバイト列に対する署名（RSA-SHA256）を取得する。
    ///
    /// 到達不能・エラー応答・署名のデコード失敗はいずれも `GatewayError::Signing`。
    async fn sign_blob(&self, payload: &[u8]) -> Result<Vec<u8>, GatewayError>;
}
