//! WebSocket チャネル実装
//!
//! tungstenite を使用してカウンタエンドポイントと通信するチャネルを
//! 実装します。

use super::{ConnectionState, CounterChannel, NetworkError};
use socket_counter_common::protocol::{Command, CountUpdate};
use std::io;
use std::net::TcpStream;
use log::{debug, info, warn};
use tungstenite::{connect, Message, WebSocket};
use tungstenite::stream::MaybeTlsStream;
use url::Url;

/// WebSocket チャネル
///
/// 接続ハンドルはこの構造体が排他的に所有します。ハンドルが存在する
/// 間は新しい接続を開きません。
pub struct WebSocketChannel {
    /// カウンタエンドポイントの URL
    endpoint: Url,
    /// WebSocket 接続（切断中は None）
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
}

impl WebSocketChannel {
    /// 新しい WebSocket チャネルを作成（未接続）
    pub fn new(endpoint: &str) -> Result<Self, NetworkError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| NetworkError::ConnectionError(format!("Invalid URL: {}", e)))?;

        Ok(Self {
            endpoint,
            socket: None,
        })
    }

    /// エンドポイントの URL を取得
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// 接続ハンドルを破棄して切断状態に戻す
    fn drop_socket(&mut self) {
        self.socket = None;
    }

    /// TCP ストリームをノンブロッキングに切り替え
    ///
    /// ハンドシェイク後に呼び出します。以降の読み取りはメッセージが
    /// 無ければ WouldBlock になります。
    fn set_nonblocking(socket: &WebSocket<MaybeTlsStream<TcpStream>>) -> io::Result<()> {
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => stream.set_nonblocking(true),
            _ => Ok(()),
        }
    }
}

impl CounterChannel for WebSocketChannel {
    fn ensure_connected(&mut self) -> Result<bool, NetworkError> {
        if self.socket.is_some() {
            return Ok(false);
        }

        let (socket, response) = connect(self.endpoint.clone())
            .map_err(|e| NetworkError::ConnectionError(format!("WebSocket connection failed: {}", e)))?;

        Self::set_nonblocking(&socket)?;

        info!("カウンタエンドポイントに接続しました: {} (HTTP {})", self.endpoint, response.status());
        self.socket = Some(socket);
        Ok(true)
    }

    fn poll_update(&mut self) -> Result<Option<CountUpdate>, NetworkError> {
        loop {
            let socket = match &mut self.socket {
                Some(socket) => socket,
                None => return Ok(None),
            };

            match socket.read_message() {
                Ok(Message::Text(text)) => {
                    match CountUpdate::decode(&text) {
                        Some(update) => return Ok(Some(update)),
                        // count フィールドの無いペイロードは黙って捨てる
                        None => debug!("解釈できないペイロードを無視します: {}", text),
                    }
                }
                Ok(Message::Binary(data)) => {
                    match std::str::from_utf8(&data).ok().and_then(CountUpdate::decode) {
                        Some(update) => return Ok(Some(update)),
                        None => debug!("解釈できないバイナリペイロードを無視します ({} バイト)", data.len()),
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("サーバーから切断されました");
                    self.drop_socket();
                    return Ok(None);
                }
                // Ping/Pong は tungstenite が処理する
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e)) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(None);
                }
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                    self.drop_socket();
                    return Ok(None);
                }
                Err(e) => {
                    // 読み取りエラーも切断として扱い、次の接続確認で開き直す
                    warn!("読み取りエラーにより切断します: {}", e);
                    self.drop_socket();
                    return Ok(None);
                }
            }
        }
    }

    fn send(&mut self, command: &Command) -> Result<(), NetworkError> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;

        let data = command.encode()
            .map_err(|e| NetworkError::ProtocolError(e.to_string()))?;

        socket.write_message(Message::Text(data))
            .map_err(|e| NetworkError::IoError(io::Error::new(io::ErrorKind::Other, e.to_string())))?;

        Ok(())
    }

    fn close(&mut self) -> Result<(), NetworkError> {
        match &mut self.socket {
            Some(socket) => {
                let _ = socket.close(None);
                self.drop_socket();
                info!("接続を閉じました");
            }
            None => {
                debug!("接続はすでに閉じられています");
            }
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn state(&self) -> ConnectionState {
        if self.socket.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}
