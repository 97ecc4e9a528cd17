//! ターミナル表示実装

use super::CounterDisplay;
use log::info;
use std::io::{self, Write};

/// ターミナル表示
///
/// 最新のカウント値を標準出力の同じ行に上書き表示します。
#[derive(Debug, Default)]
pub struct TerminalDisplay;

impl TerminalDisplay {
    /// 新しいターミナル表示を作成
    pub fn new() -> Self {
        Self
    }
}

impl CounterDisplay for TerminalDisplay {
    fn show_count(&mut self, count: u64) {
        print!("\rcount: {}    ", count);
        let _ = io::stdout().flush();
        info!("count: {}", count);
    }
}
