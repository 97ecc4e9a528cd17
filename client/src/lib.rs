//! カウンタチャネルクライアントライブラリ
//!
//! カウンタエンドポイントへの WebSocket 接続を 1 本だけ維持し、
//! 受信したカウント値を表示するクライアントを実装します。接続が
//! 切れた場合は再接続戦略に従って自動的に接続し直します。

pub mod app;
pub mod display;
pub mod network;

// 主要コンポーネントを再エクスポート
pub use app::{CounterApp, UserAction};
pub use display::{CounterDisplay, TerminalDisplay};
pub use network::{ConnectionState, CounterChannel, NetworkError, ReconnectStrategy, WebSocketChannel};
