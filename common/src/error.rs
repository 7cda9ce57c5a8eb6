//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// 呼び出し側の入力不備（画像参照なし・カテゴリ空など）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 同一セッションで検出が実行中
    #[error("Detection already in progress for this session")]
    RunInProgress,

    /// 保存に必要な情報が不足
    #[error("Incomplete draft: {0}")]
    IncompleteDraft(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
