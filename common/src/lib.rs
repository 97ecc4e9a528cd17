//! ソケットカウンタ共通ライブラリ
//!
//! このクレートは、カウンタチャネルのクライアントとサーバーで共有される
//! プロトコル定義、設定、エラー型を提供します。

pub mod config;
pub mod error;
pub mod protocol;
pub mod utils;

// 主要コンポーネントを再エクスポート
pub use config::{ClientConfig, ReconnectConfig, ServerConfig};
pub use error::{CommonError, Result};
pub use protocol::{Command, CountUpdate};

/// ライブラリのバージョン
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
