//! 通信プロトコル定義
//!
//! カウンタエンドポイントとの間で交換されるメッセージを定義します。
//! 受信メッセージは `{"count": N}`、送信メッセージは `{"set": N}` という
//! 形の JSON オブジェクトです。

use crate::error::{CommonError, Result};
use serde::{Serialize, Deserialize};

/// サーバーから受信するカウント更新
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpdate {
    /// 現在のカウント値
    pub count: u64,
}

impl CountUpdate {
    /// 受信ペイロードを解析
    ///
    /// 解析に失敗した場合や `count` フィールドが存在しない場合は
    /// `None` を返します。`count` 以外のフィールドは無視されます。
    pub fn decode(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }

    /// JSON 文字列にエンコード
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CommonError::SerializeError(e.to_string()))
    }
}

/// サーバーに送信するコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// カウント値の設定要求
    Set {
        /// 設定するカウント値
        set: u64,
    },

    /// 現在のカウント値の問い合わせ
    ///
    /// サーバーは次の配信を待たず、要求元にだけ即座に
    /// `{"count": N}` を返します。値は使われません。
    Get {
        /// 問い合わせフィールド（値は任意）
        get: u64,
    },
}

impl Command {
    /// カウンタを 0 に戻すリセット要求を作成
    pub fn reset() -> Self {
        Command::Set { set: 0 }
    }

    /// 現在のカウント値の問い合わせを作成
    pub fn query() -> Self {
        Command::Get { get: 1 }
    }

    /// JSON 文字列にエンコード
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CommonError::SerializeError(e.to_string()))
    }

    /// 受信ペイロードを解析
    pub fn decode(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| CommonError::DeserializeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_update_decode() {
        // 正常なペイロード
        let update = CountUpdate::decode(r#"{"count":5}"#);
        assert_eq!(update, Some(CountUpdate { count: 5 }));

        // count フィールドが無い場合は None
        assert_eq!(CountUpdate::decode("{}"), None);

        // 壊れたペイロードも None
        assert_eq!(CountUpdate::decode("{count"), None);
        assert_eq!(CountUpdate::decode(""), None);

        // count 以外のフィールドは無視される
        let update = CountUpdate::decode(r#"{"count":12,"uptime":99}"#);
        assert_eq!(update, Some(CountUpdate { count: 12 }));
    }

    #[test]
    fn test_count_update_encode() {
        let payload = CountUpdate { count: 7 }.encode().unwrap();
        assert_eq!(payload, r#"{"count":7}"#);
    }

    #[test]
    fn test_reset_command_wire_format() {
        let payload = Command::reset().encode().unwrap();
        assert_eq!(payload, r#"{"set":0}"#);
    }

    #[test]
    fn test_query_command_wire_format() {
        let payload = Command::query().encode().unwrap();
        assert_eq!(payload, r#"{"get":1}"#);
    }

    #[test]
    fn test_command_decode() {
        let command = Command::decode(r#"{"set":3}"#).unwrap();
        assert_eq!(command, Command::Set { set: 3 });

        let command = Command::decode(r#"{"get":1}"#).unwrap();
        assert_eq!(command, Command::Get { get: 1 });

        assert!(Command::decode(r#"{"count":3}"#).is_err());
        assert!(Command::decode("no json").is_err());
    }
}
