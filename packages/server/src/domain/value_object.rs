//! 値オブジェクト定義
//!
//! 不正な値がドメインに入らないよう、コンストラクタでバリデーションを行います。
//! ワイヤ形式に現れる値オブジェクトは transparent にシリアライズされます。

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::error::ValidationError;

/// メッセージ本文の最大文字数
pub const MAX_BODY_CHARS: usize = 2000;

/// 表示名の最大文字数
pub const MAX_DISPLAY_NAME_CHARS: usize = 100;

/// clientTempId の最大文字数
pub const MAX_TEMP_ID_CHARS: usize = 128;

/// Marketplace user identifier (positive integer, owned by the identity collaborator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// 新しい UserId を作成（正の整数のみ許容）
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::InvalidUserId);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name attached to a principal or denormalized onto a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// 新しい DisplayName を作成（空文字・長すぎる名前は拒否）
    pub fn new(value: String) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(ValidationError::InvalidDisplayName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Message body (direct or community)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    /// 新しい MessageBody を作成
    ///
    /// 空白のみの本文は空とみなして拒否します。
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        if value.chars().count() > MAX_BODY_CHARS {
            return Err(ValidationError::BodyTooLong);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Message kind carried on the wire and persisted with the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Mixed,
}

impl MessageKind {
    /// ワイヤ上の `kind` フィールドを解析（省略時は text）
    pub fn parse(value: Option<&str>) -> Result<Self, ValidationError> {
        match value {
            None => Ok(Self::Text),
            Some("text") => Ok(Self::Text),
            Some("image") => Ok(Self::Image),
            Some("mixed") => Ok(Self::Mixed),
            Some(other) => Err(ValidationError::InvalidKind(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Mixed => "mixed",
        }
    }
}

/// Sender-generated correlation token for optimistic UI reconciliation.
///
/// The server never interprets or stores this value; it is echoed verbatim
/// on the sender's acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClientTempId(String);

impl ClientTempId {
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.is_empty() || value.chars().count() > MAX_TEMP_ID_CHARS {
            return Err(ValidationError::InvalidTempId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of one physical connection (unique per transport session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい ConnectionId を採番
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addressing group for fan-out: a user's private room or the shared community room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomId {
    User(UserId),
    Community,
}

impl RoomId {
    /// ワイヤ上のルーム ID（`user:{id}` / `community`）を解析
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value == "community" {
            return Ok(Self::Community);
        }
        if let Some(raw) = value.strip_prefix("user:") {
            let id = raw
                .parse::<i64>()
                .map_err(|_| ValidationError::UnknownRoom(value.to_string()))?;
            let user_id =
                UserId::new(id).map_err(|_| ValidationError::UnknownRoom(value.to_string()))?;
            return Ok(Self::User(user_id));
        }
        Err(ValidationError::UnknownRoom(value.to_string()))
    }

    /// 接続確立時に参加するルームの組（自分のプライベートルーム + community）
    pub fn default_rooms(user_id: UserId) -> HashSet<RoomId> {
        HashSet::from([Self::User(user_id), Self::Community])
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(user_id) => write!(f, "user:{}", user_id),
            Self::Community => write!(f, "community"),
        }
    }
}

/// Unix timestamp in UTC (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
