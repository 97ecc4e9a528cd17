//! 表示モジュール
//!
//! 受信したカウント値の表示先を抽象化します。

mod terminal;

pub use terminal::TerminalDisplay;

/// カウンタ表示インターフェース
///
/// 最新のカウント値を描画する表示先が実装するトレイト。表示内容は
/// 常に最後に受信した値で上書きされます。
pub trait CounterDisplay {
    /// 最新のカウント値を表示
    fn show_count(&mut self, count: u64);
}
