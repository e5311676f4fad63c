//! ドメイン層のエラー定義

use thiserror::Error;

use super::entity::ConnectionState;
use super::value_object::UserId;

/// 送信リクエストの検証エラー
///
/// Display 実装がそのまま `message_error` / `group_message_error` の
/// ペイロードになるため、クライアントに見せられる文言にしてあります。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("recipientId is required")]
    MissingRecipient,

    #[error("userId must be a positive integer")]
    InvalidUserId,

    #[error("displayName must not be empty")]
    InvalidDisplayName,

    #[error("body must not be empty")]
    EmptyBody,

    #[error("body is too long")]
    BodyTooLong,

    #[error("kind '{0}' is not one of text, image, mixed")]
    InvalidKind(String),

    #[error("clientTempId is invalid")]
    InvalidTempId,

    #[error("cannot send a message to yourself")]
    SelfMessage,

    #[error("unknown room '{0}'")]
    UnknownRoom(String),
}

/// 認証エラー（接続は確立されず、レジストリは変更されない）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("credential is missing")]
    MissingCredential,

    #[error("credential is invalid: {0}")]
    InvalidCredential(String),
}

/// 永続化コラボレータのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// 接続へのプッシュ送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("user {0} has no live connection")]
    RecipientOffline(UserId),

    #[error("push channel for user {0} is closed")]
    ChannelClosed(UserId),
}

/// 接続ライフサイクルの不正な状態遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid connection transition from {from:?} to {to:?}")]
pub struct LifecycleError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}
