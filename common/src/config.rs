//! 設定管理
//!
//! クライアントとサーバーの設定の読み込み、保存、および既定値を提供します。
//! 設定ファイルは JSON と TOML の両形式をサポートし、拡張子で判別します。

use serde::{Serialize, Deserialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 設定エラー
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O エラー
    #[error("設定の読み書き中にI/Oエラーが発生しました: {0}")]
    IoError(#[from] io::Error),

    /// JSON エラー
    #[error("JSONの解析に失敗しました: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML デシリアライズエラー
    #[error("TOMLの解析に失敗しました: {0}")]
    TomlDeError(#[from] toml::de::Error),

    /// TOML シリアライズエラー
    #[error("TOMLのシリアライズに失敗しました: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// サポートされていない形式
    #[error("サポートされていない設定形式です: {0}")]
    UnsupportedFormat(String),
}

/// 設定形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON 形式
    Json,
    /// TOML 形式
    Toml,
}

impl ConfigFormat {
    /// ファイル拡張子から設定形式を判定
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// 再接続設定
///
/// 既定では 3 秒間隔で無制限に再接続を試みます。バックオフ倍率を
/// 指定すると試行のたびに間隔が伸び、`max_interval_secs` で頭打ちに
/// なります。`max_attempts` を指定すると、その回数だけ失敗した後は
/// 再接続を断念します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// 基本の再接続間隔（秒）
    #[serde(default = "default_reconnect_interval")]
    pub interval_secs: u64,

    /// バックオフ倍率（未指定の場合は固定間隔）
    #[serde(default)]
    pub backoff_multiplier: Option<f64>,

    /// 再接続間隔の上限（秒）
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,

    /// 最大試行回数（未指定の場合は無制限）
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_reconnect_interval() -> u64 {
    3
}

fn default_max_interval() -> u64 {
    30
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconnect_interval(),
            backoff_multiplier: None,
            max_interval_secs: default_max_interval(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// 基本間隔を Duration として取得
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// 間隔の上限を Duration として取得
    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }
}

/// クライアント設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// カウンタエンドポイントの URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// イベントループのポーリング間隔（ミリ秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// 再接続設定
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_endpoint() -> String {
    "ws://127.0.0.1:9100/count".to_string()
}

fn default_poll_interval() -> u64 {
    50
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_ms: default_poll_interval(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// 設定ファイルを読み込み
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path.as_ref())
    }

    /// 設定ファイルに保存
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        save_config(self, path.as_ref())
    }

    /// 既定の設定ファイルのパスを取得
    pub fn default_path() -> PathBuf {
        config_dir().join("client.json")
    }
}

/// サーバー設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// バインドアドレス
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// 待ち受けポート
    #[serde(default = "default_port")]
    pub port: u16,

    /// カウント更新の配信間隔（ミリ秒）
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9100
}

fn default_tick_interval() -> u64 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl ServerConfig {
    /// 設定ファイルを読み込み
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path.as_ref())
    }

    /// 設定ファイルに保存
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        save_config(self, path.as_ref())
    }

    /// 配信間隔を Duration として取得
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// 既定の設定ファイルのパスを取得
    pub fn default_path() -> PathBuf {
        config_dir().join("server.json")
    }
}

/// アプリケーションの設定ディレクトリを取得
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("socket-counter-rs")
}

/// 拡張子に応じた形式で設定を読み込み
fn load_config<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let format = ConfigFormat::from_extension(path)
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

    let content = fs::read_to_string(path)?;

    match format {
        ConfigFormat::Json => Ok(serde_json::from_str(&content)?),
        ConfigFormat::Toml => Ok(toml::from_str(&content)?),
    }
}

/// 拡張子に応じた形式で設定を保存
fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<(), ConfigError> {
    let format = ConfigFormat::from_extension(path)
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

    // ディレクトリが存在しない場合は作成
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
    };

    fs::write(path, content)?;
    Ok(())
}
