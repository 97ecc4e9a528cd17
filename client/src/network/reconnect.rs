//! 再接続戦略
//!
//! 固定間隔、指数バックオフ、最大試行回数を設定できる再接続ポリシーを
//! 提供します。

use socket_counter_common::config::ReconnectConfig;
use std::time::Duration;

/// 再接続戦略
#[derive(Debug, Clone)]
pub struct ReconnectStrategy {
    /// 基本間隔
    interval: Duration,
    /// バックオフ倍率（None の場合は固定間隔）
    backoff_multiplier: Option<f64>,
    /// 間隔の上限
    max_interval: Duration,
    /// 最大試行回数（None の場合は無制限）
    max_attempts: Option<u32>,
    /// 次に返す間隔
    current: Duration,
    /// これまでに消費した試行回数
    attempts: u32,
}

impl ReconnectStrategy {
    /// 設定から再接続戦略を作成
    ///
    /// 非有限または 1.0 以下のバックオフ倍率は固定間隔として扱います。
    pub fn new(config: &ReconnectConfig) -> Self {
        let backoff_multiplier = config
            .backoff_multiplier
            .filter(|factor| factor.is_finite() && *factor > 1.0);

        Self {
            interval: config.interval(),
            backoff_multiplier,
            max_interval: config.max_interval(),
            max_attempts: config.max_attempts,
            current: config.interval(),
            attempts: 0,
        }
    }

    /// 次の接続試行までの待ち時間を取得
    ///
    /// 最大試行回数に達している場合は `None` を返します。
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if self.attempts >= max {
                return None;
            }
        }

        let delay = self.current;
        self.attempts += 1;

        if let Some(factor) = self.backoff_multiplier {
            let next = self.current.as_secs_f64() * factor;
            self.current = Duration::from_secs_f64(next.min(self.max_interval.as_secs_f64()));
        }

        Some(delay)
    }

    /// 接続成功時に呼び出して状態を初期値に戻す
    pub fn reset(&mut self) {
        self.current = self.interval;
        self.attempts = 0;
    }

    /// これまでに消費した試行回数を取得
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
