//! WebSocket チャネルの結合テスト
//!
//! テスト内でカウンタエンドポイントを立ち上げ、実際の WebSocket 接続に
//! 対してチャネルの動作を検証します。

use socket_counter_client::network::{ConnectionState, CounterChannel, WebSocketChannel};
use socket_counter_common::protocol::Command;
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::{accept, Message};

/// テスト用サーバーからのイベント
#[derive(Debug)]
enum ServerEvent {
    Connected,
    Received(String),
    Closed,
}

/// 1 接続だけ受け付けるテスト用サーバーを起動
///
/// 接続直後に `payloads` を順に送信し、その後はクライアントからの
/// メッセージをイベントチャネルへ転送します。
fn spawn_server(payloads: Vec<&str>) -> (String, mpsc::Receiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let payloads: Vec<String> = payloads.into_iter().map(String::from).collect();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = accept(stream).unwrap();
        let _ = tx.send(ServerEvent::Connected);

        for payload in payloads {
            socket.write_message(Message::Text(payload)).unwrap();
        }

        loop {
            match socket.read_message() {
                Ok(Message::Text(text)) => {
                    let _ = tx.send(ServerEvent::Received(text));
                }
                Ok(Message::Close(_)) | Err(_) => {
                    let _ = tx.send(ServerEvent::Closed);
                    break;
                }
                Ok(_) => {}
            }
        }
    });

    (format!("ws://{}/count", addr), rx)
}

/// 2 回まで接続を受け付けるテスト用サーバーを起動
///
/// 接続ごとに Connected を通知し、切断されたら次の接続を待ちます。
fn spawn_two_shot_server() -> (String, mpsc::Receiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for _ in 0..2 {
            let (stream, _) = listener.accept().unwrap();
            let mut socket = accept(stream).unwrap();
            let _ = tx.send(ServerEvent::Connected);

            loop {
                match socket.read_message() {
                    Ok(Message::Text(text)) => {
                        let _ = tx.send(ServerEvent::Received(text));
                    }
                    Ok(Message::Close(_)) | Err(_) => {
                        let _ = tx.send(ServerEvent::Closed);
                        break;
                    }
                    Ok(_) => {}
                }
            }
        }
    });

    (format!("ws://{}/count", addr), rx)
}

/// 接続直後に自分から切断するテスト用サーバーを起動
fn spawn_closing_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = accept(stream).unwrap();
        let _ = socket.close(None);

        // クローズハンドシェイクが終わるまで読み続ける
        loop {
            if socket.read_message().is_err() {
                break;
            }
        }
    });

    format!("ws://{}/count", addr)
}

/// カウント更新が届くまでポーリングを繰り返す
fn poll_until_update(channel: &mut WebSocketChannel, timeout: Duration) -> Option<u64> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(Some(update)) = channel.poll_update() {
            return Some(update.count);
        }
        thread::sleep(Duration::from_millis(10));
    }
    None
}

/// 切断が観測されるまでポーリングを繰り返す
fn poll_until_disconnected(channel: &mut WebSocketChannel, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let _ = channel.poll_update();
        if !channel.is_connected() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_ensure_connected_is_idempotent_against_live_server() {
    let (endpoint, _events) = spawn_server(vec![]);
    let mut channel = WebSocketChannel::new(&endpoint).unwrap();

    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert!(channel.ensure_connected().unwrap());
    assert_eq!(channel.state(), ConnectionState::Connected);

    // 2 回目以降は新しい接続を開かない
    assert!(!channel.ensure_connected().unwrap());
    assert!(!channel.ensure_connected().unwrap());
    assert!(channel.is_connected());
}

#[test]
fn test_receives_count_update() {
    let (endpoint, _events) = spawn_server(vec![r#"{"count":5}"#]);
    let mut channel = WebSocketChannel::new(&endpoint).unwrap();

    channel.ensure_connected().unwrap();
    let count = poll_until_update(&mut channel, Duration::from_secs(5));
    assert_eq!(count, Some(5));
}

#[test]
fn test_skips_payload_without_count() {
    // count フィールドの無いペイロードは捨てられ、次の更新が届く
    let (endpoint, _events) = spawn_server(vec!["{}", "not json", r#"{"count":7}"#]);
    let mut channel = WebSocketChannel::new(&endpoint).unwrap();

    channel.ensure_connected().unwrap();
    let count = poll_until_update(&mut channel, Duration::from_secs(5));
    assert_eq!(count, Some(7));
}

#[test]
fn test_reset_sends_set_zero_on_the_wire() {
    let (endpoint, events) = spawn_server(vec![]);
    let mut channel = WebSocketChannel::new(&endpoint).unwrap();

    channel.ensure_connected().unwrap();
    assert!(matches!(events.recv_timeout(Duration::from_secs(5)).unwrap(), ServerEvent::Connected));

    channel.send(&Command::reset()).unwrap();

    match events.recv_timeout(Duration::from_secs(5)).unwrap() {
        ServerEvent::Received(text) => assert_eq!(text, r#"{"set":0}"#),
        other => panic!("予期しないイベント: {:?}", other),
    }
}

#[test]
fn test_send_without_connection_fails() {
    let mut channel = WebSocketChannel::new("ws://127.0.0.1:9/count").unwrap();
    assert!(channel.send(&Command::reset()).is_err());
}

#[test]
fn test_close_when_disconnected_is_noop() {
    let mut channel = WebSocketChannel::new("ws://127.0.0.1:9/count").unwrap();

    channel.close().unwrap();
    channel.close().unwrap();
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[test]
fn test_remote_close_clears_the_handle() {
    let endpoint = spawn_closing_server();
    let mut channel = WebSocketChannel::new(&endpoint).unwrap();

    channel.ensure_connected().unwrap();
    assert!(poll_until_disconnected(&mut channel, Duration::from_secs(5)));
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[test]
fn test_reconnects_after_close() {
    let (endpoint, events) = spawn_two_shot_server();
    let mut channel = WebSocketChannel::new(&endpoint).unwrap();

    assert!(channel.ensure_connected().unwrap());
    assert!(matches!(events.recv_timeout(Duration::from_secs(5)).unwrap(), ServerEvent::Connected));

    channel.close().unwrap();
    assert!(!channel.is_connected());
    assert!(matches!(events.recv_timeout(Duration::from_secs(5)).unwrap(), ServerEvent::Closed));

    // 閉じたチャネル自身の ensure_connected が接続を開き直す
    assert!(channel.ensure_connected().unwrap());
    assert!(matches!(events.recv_timeout(Duration::from_secs(5)).unwrap(), ServerEvent::Connected));
    assert!(channel.is_connected());
}
