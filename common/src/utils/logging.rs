//! ロギング機能
//!
//! env_logger を使ったグローバルロガーの初期化とパニックフックを
//! 提供します。

use chrono::Local;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// グローバルロガーを初期化
///
/// RUST_LOG が設定されていない場合は info レベルで動作します。
/// 二重に呼び出された場合、2 回目以降は何もしません。
pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format(|buf, record| {
                let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                writeln!(buf, "{} [{}] {}", timestamp, record.level(), record.args())
            })
            .init();
    });
}

/// パニックハンドラを設定（未処理のパニックをログに記録）
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("パニックが発生しました: {:?}", panic_info);
        log::error!("パニックが発生しました: {:?}", panic_info);
    }));
}
