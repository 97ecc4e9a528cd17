//! カウンタサービス
//!
//! 共有カウンタを一定間隔で増やし、接続中のすべてのクライアントに
//! `{"count": N}` を配信する WebSocket サーバーを実装します。
//! クライアントからの `{"set": N}` 要求はカウント値を書き換えます。

use crate::session::CounterSession;
use socket_counter_common::config::ServerConfig;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use log::{error, info, warn};
use thiserror::Error;
use tungstenite::accept;

/// サーバーエラー
#[derive(Error, Debug)]
pub enum ServerError {
    /// IO エラー
    #[error("IO エラー: {0}")]
    IoError(#[from] io::Error),

    /// プロトコルエラー
    #[error("プロトコルエラー: {0}")]
    Protocol(String),

    /// その他のエラー
    #[error("サーバーエラー: {0}")]
    Other(String),
}

/// セッションリストの共有ハンドル
type SharedSessions = Arc<Mutex<Vec<Arc<Mutex<CounterSession>>>>>;

/// カウンタサーバー
pub struct CounterServer {
    /// サーバー設定
    config: ServerConfig,
    /// 共有カウンタ
    count: Arc<Mutex<u64>>,
    /// クライアントセッションリスト
    sessions: SharedSessions,
    /// 起動中フラグ
    running: Arc<Mutex<bool>>,
    /// リスナースレッドの停止用チャネル
    thread_control: Option<mpsc::Sender<()>>,
    /// リスナースレッド
    listener_thread: Option<thread::JoinHandle<()>>,
    /// 配信スレッド
    ticker_thread: Option<thread::JoinHandle<()>>,
    /// サーバーアドレス
    server_addr: Option<SocketAddr>,
}

impl CounterServer {
    /// 新しいカウンタサーバーを作成
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            count: Arc::new(Mutex::new(0)),
            sessions: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(Mutex::new(false)),
            thread_control: None,
            listener_thread: None,
            ticker_thread: None,
            server_addr: None,
        }
    }

    /// サーバーを起動
    ///
    /// すでに起動している場合は何もしません。
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.is_running() {
            return Ok(());
        }

        let bind_addr = format!("{}:{}", self.config.bind_addr, self.config.port);

        let listener = TcpListener::bind(&bind_addr)?;
        listener.set_nonblocking(true)?;
        self.server_addr = Some(listener.local_addr()?);

        *self.running.lock().unwrap() = true;

        let (tx, rx) = mpsc::channel();
        self.thread_control = Some(tx);

        // リスナースレッドを起動
        let count = self.count.clone();
        let sessions = self.sessions.clone();
        let listener_thread = thread::spawn(move || {
            info!("カウンタサービス起動: {}", bind_addr);

            loop {
                // サーバー終了要求をチェック
                if rx.try_recv().is_ok() {
                    break;
                }

                match listener.accept() {
                    Ok((stream, addr)) => {
                        Self::handle_client(stream, addr, count.clone(), sessions.clone());
                    }
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                        // 接続要求がない場合は短いスリープ
                        thread::sleep(Duration::from_millis(50));
                    }
                    Err(e) => {
                        error!("接続受付エラー: {}", e);
                        thread::sleep(Duration::from_millis(1000));
                    }
                }
            }

            // 残っているセッションをすべて閉じる
            let snapshot: Vec<_> = sessions.lock().unwrap().clone();
            for session in snapshot {
                session.lock().unwrap().close();
            }

            info!("カウンタサービス停止");
        });

        // 配信スレッドを起動
        let count = self.count.clone();
        let sessions = self.sessions.clone();
        let running = self.running.clone();
        let tick_interval = self.config.tick_interval();
        // 停止要求にすぐ応じられるよう、配信間隔は小刻みに待つ
        let sleep_step = Duration::from_millis(10).min(tick_interval);
        let ticker_thread = thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                thread::sleep(sleep_step);

                if !*running.lock().unwrap() {
                    break;
                }

                if last_tick.elapsed() < tick_interval {
                    continue;
                }
                last_tick = Instant::now();

                // カウンタを進めて全セッションに配信
                let value = {
                    let mut count = count.lock().unwrap();
                    *count += 1;
                    *count
                };

                let snapshot: Vec<_> = sessions.lock().unwrap().clone();
                for session in snapshot {
                    session.lock().unwrap().send_count(value);
                }
            }
        });

        self.listener_thread = Some(listener_thread);
        self.ticker_thread = Some(ticker_thread);

        Ok(())
    }

    /// サーバーを停止
    ///
    /// リスナーと配信スレッドの終了を待ってから戻ります。
    pub fn stop(&mut self) {
        if self.listener_thread.is_none() && self.ticker_thread.is_none() {
            return;
        }

        info!("カウンタサービスを停止します");
        *self.running.lock().unwrap() = false;

        if let Some(tx) = self.thread_control.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.listener_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.ticker_thread.take() {
            let _ = handle.join();
        }
    }

    /// 起動中かどうかを確認
    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    /// 待ち受け中のアドレスを取得
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    /// 現在のカウント値を取得
    pub fn count(&self) -> u64 {
        *self.count.lock().unwrap()
    }

    /// クライアント接続を処理
    fn handle_client(
        stream: TcpStream,
        peer: SocketAddr,
        count: Arc<Mutex<u64>>,
        sessions: SharedSessions,
    ) {
        thread::spawn(move || {
            info!("WebSocket接続受付: {}", peer);

            let socket = match accept(stream) {
                Ok(socket) => socket,
                Err(e) => {
                    error!("WebSocketハンドシェイクエラー: {}", e);
                    return;
                }
            };

            // ハンドシェイク後はノンブロッキングで読み取る
            if let Err(e) = socket.get_ref().set_nonblocking(true) {
                error!("ノンブロッキング設定に失敗しました: {}", e);
                return;
            }

            let session_id = uuid::Uuid::new_v4().to_string();
            let session = Arc::new(Mutex::new(CounterSession::new(
                session_id.clone(),
                peer.to_string(),
                socket,
            )));

            // セッションリストに追加
            {
                let mut sessions = sessions.lock().unwrap();
                sessions.push(session.clone());
            }

            // 受信処理ループ
            loop {
                let mut session_lock = session.lock().unwrap();

                if !session_lock.is_active() {
                    break;
                }

                if let Err(e) = session_lock.receive_and_process(&count) {
                    match e {
                        ServerError::IoError(ref io_err)
                            if io_err.kind() == io::ErrorKind::WouldBlock => {}
                        _ => {
                            warn!("WebSocket通信エラー: {} ({})", e, peer);
                            session_lock.close();
                            break;
                        }
                    }
                }

                // 短いスリープを入れてCPU使用率を下げる
                drop(session_lock);
                thread::sleep(Duration::from_millis(1));
            }

            info!("WebSocket接続終了: {}", peer);

            // セッションリストから削除
            let mut sessions = sessions.lock().unwrap();
            sessions.retain(|s| s.lock().unwrap().id() != session_id);
        });
    }
}
