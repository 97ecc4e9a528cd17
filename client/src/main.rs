//! クライアントエントリポイント
//!
//! カウンタチャネルクライアントのメインエントリポイント。標準入力の
//! コマンド（reset / close / quit）をユーザー操作としてイベントループに
//! 渡します。

use anyhow::Context;
use socket_counter_client::app::{CounterApp, UserAction};
use socket_counter_client::display::TerminalDisplay;
use socket_counter_client::network::WebSocketChannel;
use socket_counter_common::config::ClientConfig;
use socket_counter_common::utils::logging;
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

fn main() -> anyhow::Result<()> {
    // ロガーを初期化
    logging::init_logger();

    // パニックハンドラを設定（未処理のパニックをログに記録）
    logging::set_panic_hook();

    // コマンドライン引数を解析
    let mut config_path: Option<String> = None;
    let mut endpoint: Option<String> = None;

    for arg in std::env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print_help();
            return Ok(());
        } else if arg == "-v" || arg == "--version" {
            println!("socket-counter-client v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_path = Some(path.to_string());
        } else if let Some(url) = arg.strip_prefix("--endpoint=") {
            endpoint = Some(url.to_string());
        } else {
            anyhow::bail!("不明な引数です: {}", arg);
        }
    }

    // 設定を読み込み
    let mut config = match &config_path {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("設定ファイルの読み込みに失敗しました: {}", path))?,
        None => {
            let default_path = ClientConfig::default_path();
            if default_path.exists() {
                ClientConfig::load(&default_path).with_context(|| {
                    format!("設定ファイルの読み込みに失敗しました: {}", default_path.display())
                })?
            } else {
                ClientConfig::default()
            }
        }
    };

    if let Some(url) = endpoint {
        config.endpoint = url;
    }

    // 標準入力からユーザー操作を読み取るスレッドを起動
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };

            let action = match line.trim() {
                "reset" => UserAction::Reset,
                "close" => UserAction::Close,
                "quit" | "exit" => UserAction::Quit,
                "" => continue,
                other => {
                    eprintln!("不明なコマンドです: {}", other);
                    continue;
                }
            };

            if tx.send(action).is_err() {
                break;
            }
            if action == UserAction::Quit {
                break;
            }
        }
    });

    let channel = WebSocketChannel::new(&config.endpoint)
        .with_context(|| format!("エンドポイント URL が不正です: {}", config.endpoint))?;
    let mut app = CounterApp::new(channel, TerminalDisplay::new(), &config);

    println!("カウンタエンドポイント: {}", config.endpoint);
    println!("コマンド: reset / close / quit");
    app.run(rx);

    Ok(())
}

/// ヘルプを表示
fn print_help() {
    println!("socket-counter-client v{}", env!("CARGO_PKG_VERSION"));
    println!("使用方法: socket-counter-client [オプション]");
    println!("オプション:");
    println!("  --endpoint=URL  カウンタエンドポイントの URL");
    println!("  --config=FILE   指定した設定ファイルを使用");
    println!("  --version, -v   バージョンを表示");
    println!("  --help, -h      このヘルプを表示");
}
