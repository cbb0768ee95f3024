//! # Upload Gateway 共有型定義
//!
//! HTTP API、署名機関（IAM signBlob）、ストレージ管理APIで
//! やり取りされるデータ構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - Base64 (Standard): 署名対象バイト列、署名
//! - JSONのフィールド名は各APIの表記（camelCase / snake_case）に合わせる

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// POST /upload
// ---------------------------------------------------------------------------

/// クライアントからのアップロード許可リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    /// アップロードするファイルのMIMEタイプ（ホワイトリスト検証なし）
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// アップロード許可レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// 署名付きアップロードURL（PUT）
    pub url: String,
}

// ---------------------------------------------------------------------------
// 署名機関 (IAM serviceAccounts.signBlob)
// ---------------------------------------------------------------------------

/// signBlobリクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignBlobRequest {
    /// Base64エンコードされた署名対象バイト列
    #[serde(rename = "bytesToSign")]
    pub bytes_to_sign: String,
}

/// signBlobレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignBlobResponse {
    /// Base64エンコードされた署名
    pub signature: String,
}

// ---------------------------------------------------------------------------
// ストレージ管理API
// ---------------------------------------------------------------------------

/// バケット作成リクエスト／バケットメタデータ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketResource {
    /// バケット名
    pub name: String,
}
