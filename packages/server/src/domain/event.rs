//! WebSocket イベント定義
//!
//! 文字列ベースのイベント分岐ではなく、入出力それぞれを閉じたタグ付き
//! enum として定義し、網羅的な match で分岐します。タグは `type`
//! フィールド、ペイロードのフィールド名は camelCase です。

use serde::{Deserialize, Serialize};

use super::entity::{CommunityMessage, DirectMessage};
use super::value_object::{ClientTempId, DisplayName, UserId};

/// Inbound events (connection → core).
///
/// Payload fields that the client may omit or get wrong are kept raw here
/// (`Option<i64>`, `Option<String>`); validation happens in the use case
/// layer so that a missing field becomes a `message_error`, not a dropped
/// frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    SendMessage {
        recipient_id: Option<i64>,
        body: Option<String>,
        kind: Option<String>,
        client_temp_id: Option<String>,
    },
    SendGroupMessage {
        body: Option<String>,
        kind: Option<String>,
    },
    TypingStart {
        recipient_id: Option<i64>,
    },
    TypingStop {
        recipient_id: Option<i64>,
    },
    Join {
        room_id: String,
    },
}

/// Outbound events (core → connection)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    NewMessage {
        message: DirectMessage,
    },
    MessageSent {
        message: DirectMessage,
        client_temp_id: Option<ClientTempId>,
    },
    MessageError {
        error: String,
    },
    GroupNewMessage {
        message: CommunityMessage,
    },
    GroupMessageSent {
        message: CommunityMessage,
    },
    GroupMessageError {
        error: String,
    },
    UserOnline {
        user_id: UserId,
        display_name: DisplayName,
    },
    UserOffline {
        user_id: UserId,
        display_name: DisplayName,
    },
    UserTyping {
        user_id: UserId,
        display_name: DisplayName,
        is_typing: bool,
    },
}

impl ServerEvent {
    /// ワイヤ形式（JSON 文字列）に変換
    ///
    /// イベント型は文字列キーのみで構成されるため、シリアライズは失敗しない。
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerEvent serializes to JSON")
    }
}
