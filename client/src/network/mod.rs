//! ネットワークモジュール
//!
//! カウンタエンドポイントとの通信を担当する機能を提供します。

mod reconnect;
mod websocket_channel;

pub use reconnect::ReconnectStrategy;
pub use websocket_channel::WebSocketChannel;

use socket_counter_common::protocol::{Command, CountUpdate};
use thiserror::Error;
use std::io;

/// ネットワークエラー
#[derive(Error, Debug)]
pub enum NetworkError {
    /// 接続エラー
    #[error("接続エラー: {0}")]
    ConnectionError(String),

    /// IO エラー
    #[error("IO エラー: {0}")]
    IoError(#[from] io::Error),

    /// プロトコルエラー
    #[error("プロトコルエラー: {0}")]
    ProtocolError(String),

    /// 未接続
    #[error("接続が存在しません")]
    NotConnected,

    /// その他のエラー
    #[error("ネットワークエラー: {0}")]
    Other(String),
}

/// 接続状態
///
/// チャネルの状態は「切断」と「接続」の 2 つだけです。どのような
/// 切断イベントでも接続ハンドルが破棄され、切断状態に戻ります。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 切断
    Disconnected,
    /// 接続
    Connected,
}

/// カウンタチャネルインターフェース
///
/// カウンタエンドポイントと通信するチャネルが実装するトレイト
pub trait CounterChannel {
    /// 接続が存在しない場合のみ新しい接続を開く
    ///
    /// 新しく接続を開いた場合は `true` を返します。すでに接続が
    /// 存在する場合は何もせず `false` を返します。生きている接続は
    /// 常に最大 1 本です。
    fn ensure_connected(&mut self) -> Result<bool, NetworkError>;

    /// 受信済みのカウント更新を 1 件取り出す
    ///
    /// ブロックしません。保留中の更新がない場合は `Ok(None)` を
    /// 返します。相手側から切断された場合は接続ハンドルを破棄して
    /// `Ok(None)` を返します。
    fn poll_update(&mut self) -> Result<Option<CountUpdate>, NetworkError>;

    /// コマンドを送信
    ///
    /// 接続が存在しない場合は `NetworkError::NotConnected` を返します。
    fn send(&mut self, command: &Command) -> Result<(), NetworkError>;

    /// 接続を閉じる
    ///
    /// すでに切断されている場合は何もしません。
    fn close(&mut self) -> Result<(), NetworkError>;

    /// 接続されているかどうかを確認
    fn is_connected(&self) -> bool;

    /// 接続状態を取得
    fn state(&self) -> ConnectionState;
}
