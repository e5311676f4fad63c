//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AuthError, LifecycleError, StoreError, ValidationError};

/// 接続確立の失敗
///
/// いずれの場合も接続は確立されず、レジストリもルームも変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// メッセージ送信の失敗
///
/// Display 実装がそのまま `message_error` / `group_message_error` の
/// `error` フィールドになる。永続化の内部詳細はログにのみ残し、
/// クライアントには漏らさない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("message could not be saved")]
    Persistence(#[from] StoreError),
}
