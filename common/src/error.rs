//! エラー型定義
//!
//! ソケットカウンタで使用する共通エラー型を定義します。

use std::io;
use thiserror::Error;

/// 共通エラー
#[derive(Error, Debug)]
pub enum CommonError {
    /// 入出力エラー
    #[error("I/Oエラー: {0}")]
    IoError(#[from] io::Error),

    /// シリアライズエラー
    #[error("シリアライズエラー: {0}")]
    SerializeError(String),

    /// デシリアライズエラー
    #[error("デシリアライズエラー: {0}")]
    DeserializeError(String),

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// 設定エラー
    #[error("設定エラー: {0}")]
    ConfigError(String),

    /// タイムアウトエラー
    #[error("タイムアウト: {0}")]
    TimeoutError(String),

    /// その他のエラー
    #[error("{0}")]
    Other(String),
}

/// 共通の結果型
pub type Result<T> = std::result::Result<T, CommonError>;
