//! クライアントセッション
//!
//! 1 本の WebSocket 接続とその生存状態を保持します。

use crate::service::ServerError;
use socket_counter_common::protocol::{Command, CountUpdate};
use std::io;
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use log::{debug, info, warn};
use tungstenite::{Message, WebSocket};

/// クライアントセッション
pub struct CounterSession {
    /// セッション ID
    id: String,
    /// 接続元アドレス
    peer: String,
    /// WebSocket 接続
    socket: WebSocket<TcpStream>,
    /// セッションが生きているかどうか
    active: bool,
}

impl CounterSession {
    /// 新しいセッションを作成
    pub fn new(id: String, peer: String, socket: WebSocket<TcpStream>) -> Self {
        Self {
            id,
            peer,
            socket,
            active: true,
        }
    }

    /// セッション ID を取得
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 接続元アドレスを取得
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// セッションが生きているかどうかを確認
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// カウント更新を送信
    ///
    /// 送信に失敗したセッションは閉じた扱いにし、次の整理で取り除かれます。
    pub fn send_count(&mut self, count: u64) {
        let payload = match (CountUpdate { count }).encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("カウント更新のエンコードに失敗しました: {}", e);
                return;
            }
        };

        if let Err(e) = self.socket.write_message(Message::Text(payload)) {
            match e {
                // 送信バッファが一時的に詰まっているだけならセッションは維持する
                tungstenite::Error::Io(ref io_err) if io_err.kind() == io::ErrorKind::WouldBlock => {}
                _ => {
                    debug!("送信に失敗したためセッションを終了します: {} ({})", self.peer, e);
                    self.active = false;
                }
            }
        }
    }

    /// 受信メッセージを 1 件処理
    ///
    /// 保留中のメッセージが無い場合は WouldBlock の IO エラーを返します。
    /// `{"set": N}` は共有カウンタを書き換え、`{"get": N}` は次の配信を
    /// 待たずに現在値をこのセッションへ返します。
    pub fn receive_and_process(&mut self, count: &Arc<Mutex<u64>>) -> Result<(), ServerError> {
        match self.socket.read_message() {
            Ok(Message::Text(text)) => {
                match Command::decode(&text) {
                    Ok(Command::Set { set }) => {
                        *count.lock().unwrap() = set;
                        info!("カウント値を設定しました: {} (from {})", set, self.peer);
                    }
                    Ok(Command::Get { .. }) => {
                        let value = *count.lock().unwrap();
                        self.send_count(value);
                    }
                    Err(_) => debug!("解釈できないメッセージを無視します: {}", text),
                }
                Ok(())
            }
            Ok(Message::Close(_)) => {
                info!("クライアントから切断されました: {}", self.peer);
                self.active = false;
                Ok(())
            }
            // Ping/Pong は tungstenite が処理する
            Ok(_) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                self.active = false;
                Ok(())
            }
            Err(tungstenite::Error::Io(e)) => Err(ServerError::IoError(e)),
            Err(e) => Err(ServerError::Protocol(e.to_string())),
        }
    }

    /// セッションを閉じる
    pub fn close(&mut self) {
        let _ = self.socket.close(None);
        self.active = false;
    }
}
