//! エンティティ定義
//!
//! 接続ライフサイクルは暗黙のコールバック連鎖ではなく、明示的な状態型
//! `ConnectionState` として表現します。不正な遷移は `LifecycleError` に
//! なるため、「Closed な接続への配信」のような状態違反を検査できます。

use serde::Serialize;

use super::error::LifecycleError;
use super::value_object::{
    ConnectionId, DisplayName, MessageBody, MessageKind, Timestamp, UserId,
};

/// Authenticated identity attached to a connection.
///
/// Derived once from the verified credential and immutable for the
/// connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: DisplayName,
}

impl Principal {
    pub fn new(user_id: UserId, display_name: DisplayName) -> Self {
        Self {
            user_id,
            display_name,
        }
    }
}

/// Lifecycle state of one transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Authenticating,
    Active,
    Closed,
}

/// One live transport session.
///
/// Created when the transport opens, destroyed on close or eviction.
/// `Closed` is terminal; reconnecting users get a brand-new `Connection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
}

impl Connection {
    /// トランスポートが開いた直後の接続を作成（Unauthenticated）
    pub fn open() -> Self {
        Self {
            id: ConnectionId::generate(),
            state: ConnectionState::Unauthenticated,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    /// Unauthenticated → Authenticating
    pub fn begin_authentication(&mut self) -> Result<(), LifecycleError> {
        self.transition(ConnectionState::Unauthenticated, ConnectionState::Authenticating)
    }

    /// Authenticating → Active
    pub fn activate(&mut self) -> Result<(), LifecycleError> {
        self.transition(ConnectionState::Authenticating, ConnectionState::Active)
    }

    /// 任意の非終端状態 → Closed
    ///
    /// 認証途中の失敗・トランスポート切断・新セッションによる強制退去の
    /// いずれもここに合流します。Closed からの再クローズは不正です。
    pub fn close(&mut self) -> Result<(), LifecycleError> {
        if self.state == ConnectionState::Closed {
            return Err(LifecycleError {
                from: ConnectionState::Closed,
                to: ConnectionState::Closed,
            });
        }
        self.state = ConnectionState::Closed;
        Ok(())
    }

    fn transition(
        &mut self,
        expected: ConnectionState,
        next: ConnectionState,
    ) -> Result<(), LifecycleError> {
        if self.state != expected {
            return Err(LifecycleError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Persisted direct message, as returned by the persistence gateway.
///
/// Display names are denormalized by the store. The delivery router never
/// mutates a message; delivery is a read-only projection of a persisted fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: i64,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub sender_name: DisplayName,
    pub recipient_name: DisplayName,
    pub body: MessageBody,
    pub kind: MessageKind,
    pub sent_at: Timestamp,
    pub read: bool,
}

/// Persisted community message (no single recipient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMessage {
    pub id: i64,
    pub author_id: UserId,
    pub author_name: DisplayName,
    pub body: MessageBody,
    pub kind: MessageKind,
    pub sent_at: Timestamp,
}
