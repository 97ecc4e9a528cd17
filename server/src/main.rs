//! サーバーエントリポイント
//!
//! カウンタサービスのメインエントリポイント。Ctrl+C を受け取るまで
//! カウント更新を配信し続けます。

mod service;
mod session;

use anyhow::Context;
use service::CounterServer;
use socket_counter_common::config::ServerConfig;
use socket_counter_common::utils::logging;
use std::sync::mpsc;

fn main() -> anyhow::Result<()> {
    // ロガーを初期化
    logging::init_logger();

    // パニックハンドラを設定（未処理のパニックをログに記録）
    logging::set_panic_hook();

    // コマンドライン引数を解析
    let mut config_path: Option<String> = None;
    let mut port: Option<u16> = None;
    let mut bind_addr: Option<String> = None;

    for arg in std::env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print_help();
            return Ok(());
        } else if arg == "-v" || arg == "--version" {
            println!("socket-counter-server v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_path = Some(path.to_string());
        } else if let Some(value) = arg.strip_prefix("--port=") {
            let value = value
                .parse()
                .with_context(|| format!("ポート番号が不正です: {}", value))?;
            port = Some(value);
        } else if let Some(addr) = arg.strip_prefix("--bind=") {
            bind_addr = Some(addr.to_string());
        } else {
            anyhow::bail!("不明な引数です: {}", arg);
        }
    }

    // 設定を読み込み
    let mut config = match &config_path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("設定ファイルの読み込みに失敗しました: {}", path))?,
        None => {
            let default_path = ServerConfig::default_path();
            if default_path.exists() {
                ServerConfig::load(&default_path).with_context(|| {
                    format!("設定ファイルの読み込みに失敗しました: {}", default_path.display())
                })?
            } else {
                ServerConfig::default()
            }
        }
    };

    if let Some(port) = port {
        config.port = port;
    }
    if let Some(addr) = bind_addr {
        config.bind_addr = addr;
    }

    // サーバーを起動
    let mut server = CounterServer::new(config);
    server.start().context("サーバーの起動に失敗しました")?;

    // Ctrl+C で停止
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Ctrl+Cハンドラの設定に失敗しました")?;

    log::info!("Ctrl+C で停止します");
    let _ = rx.recv();

    server.stop();
    Ok(())
}

/// ヘルプを表示
fn print_help() {
    println!("socket-counter-server v{}", env!("CARGO_PKG_VERSION"));
    println!("使用方法: socket-counter-server [オプション]");
    println!("オプション:");
    println!("  --bind=ADDR     バインドアドレス");
    println!("  --port=PORT     指定したポートで起動");
    println!("  --config=FILE   指定した設定ファイルを使用");
    println!("  --version, -v   バージョンを表示");
    println!("  --help, -h      このヘルプを表示");
}
