//! メインアプリケーション
//!
//! カウンタチャネルクライアントのイベントループを実装します。
//! 接続の確認、カウント更新の描画、ユーザー操作の処理はすべて
//! 同じスレッド上で協調的に行われ、接続ハンドルに触れるのは
//! このループだけです。

use crate::display::CounterDisplay;
use crate::network::{CounterChannel, NetworkError, ReconnectStrategy};
use socket_counter_common::config::ClientConfig;
use socket_counter_common::protocol::Command;
use log::{error, info, warn};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// ユーザー操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// カウンタを 0 に戻す要求を送信
    Reset,
    /// 接続を閉じる
    Close,
    /// アプリケーションを終了
    Quit,
}

/// カウンタアプリケーション
pub struct CounterApp<C: CounterChannel, D: CounterDisplay> {
    /// 通信チャネル
    channel: C,
    /// 表示先
    display: D,
    /// 再接続戦略
    reconnect: ReconnectStrategy,
    /// イベントループのポーリング間隔
    poll_interval: Duration,
    /// 次の接続試行時刻（接続中は None）
    next_attempt: Option<Instant>,
    /// 最大試行回数に達して再接続を断念したかどうか
    gave_up: bool,
    /// 最後に受信したカウント値
    last_count: Option<u64>,
}

impl<C: CounterChannel, D: CounterDisplay> CounterApp<C, D> {
    /// 新しいアプリケーションを作成
    ///
    /// 最初の接続試行はイベントループの最初の回転で行われます。
    pub fn new(channel: C, display: D, config: &ClientConfig) -> Self {
        Self {
            channel,
            display,
            reconnect: ReconnectStrategy::new(&config.reconnect),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            next_attempt: Some(Instant::now()),
            gave_up: false,
            last_count: None,
        }
    }

    /// イベントループを 1 回転させる
    ///
    /// 接続の確認と受信メッセージの処理を行います。
    pub fn tick(&mut self) {
        self.ensure_connected();
        self.drain_updates();
    }

    /// 必要に応じて接続を開く
    ///
    /// 接続が存在する場合は何もしません。切断中は再接続戦略の示す
    /// 時刻に達していれば接続を試みます。
    fn ensure_connected(&mut self) {
        if self.channel.is_connected() {
            if self.next_attempt.take().is_some() {
                self.reconnect.reset();
            }
            return;
        }

        if self.gave_up {
            return;
        }

        match self.next_attempt {
            None => {
                // 切断を検出した直後。次の試行時刻を予約する
                match self.reconnect.next_delay() {
                    Some(delay) => self.next_attempt = Some(Instant::now() + delay),
                    None => self.give_up(),
                }
            }
            Some(at) if Instant::now() >= at => {
                match self.channel.ensure_connected() {
                    Ok(opened) => {
                        if opened {
                            info!("接続しました");
                        }
                        self.next_attempt = None;
                        self.reconnect.reset();
                    }
                    Err(e) => {
                        warn!("接続に失敗しました: {}", e);
                        match self.reconnect.next_delay() {
                            Some(delay) => self.next_attempt = Some(Instant::now() + delay),
                            None => self.give_up(),
                        }
                    }
                }
            }
            Some(_) => {}
        }
    }

    /// 再接続を断念する
    fn give_up(&mut self) {
        error!("再接続の最大試行回数に達しました");
        self.gave_up = true;
        self.next_attempt = None;
    }

    /// 保留中のカウント更新をすべて処理
    fn drain_updates(&mut self) {
        loop {
            match self.channel.poll_update() {
                Ok(Some(update)) => {
                    self.display.show_count(update.count);
                    self.last_count = Some(update.count);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("受信処理でエラーが発生しました: {}", e);
                    break;
                }
            }
        }
    }

    /// ユーザー操作を処理
    ///
    /// 終了要求を受け取った場合は `false` を返します。
    pub fn handle_action(&mut self, action: UserAction) -> bool {
        match action {
            UserAction::Reset => {
                // 切断中のリセットはエラーとして報告するだけで、
                // 接続後の再送は行わない
                match self.channel.send(&Command::reset()) {
                    Ok(()) => info!("リセット要求を送信しました"),
                    Err(NetworkError::NotConnected) => {
                        warn!("未接続のためリセット要求を送信できません")
                    }
                    Err(e) => error!("リセット要求の送信に失敗しました: {}", e),
                }
            }
            UserAction::Close => {
                if let Err(e) = self.channel.close() {
                    error!("切断処理に失敗しました: {}", e);
                }
            }
            UserAction::Quit => return false,
        }

        true
    }

    /// イベントループを実行
    ///
    /// 終了要求を受け取るか操作チャネルが閉じられるまで戻りません。
    pub fn run(&mut self, actions: Receiver<UserAction>) {
        loop {
            self.tick();

            loop {
                match actions.try_recv() {
                    Ok(action) => {
                        if !self.handle_action(action) {
                            let _ = self.channel.close();
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        let _ = self.channel.close();
                        return;
                    }
                }
            }

            thread::sleep(self.poll_interval);
        }
    }

    /// 最後に受信したカウント値を取得
    pub fn last_count(&self) -> Option<u64> {
        self.last_count
    }

    /// 通信チャネルへの参照を取得
    pub fn channel(&self) -> &C {
        &self.channel
    }
}
