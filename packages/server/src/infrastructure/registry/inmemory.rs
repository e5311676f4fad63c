//! InMemory SessionRegistry 実装
//!
//! ドメイン層が定義する SessionRegistry trait の具体的な実装。
//! 単一の `Mutex<HashMap>` を使うことで、`register` の check-and-set と
//! `deregister_if_current` の compare-and-delete がロック 1 回の
//! 原子的ステップになります。
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は接続ごとの `PusherChannel` を預かり、配信はチャンネルへの
//! キュー投入のみで完了します。受信側のソケットが遅くても、送信側の
//! タスクはここでブロックしません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, Principal, PushError, RegisteredConnection, RoomId, SessionRegistry, UserId,
};

/// インメモリ SessionRegistry 実装
///
/// プロセス起動時に一度だけ構築し、`Arc` で各接続ハンドラに渡します。
/// グローバル変数としては決して公開しません。
pub struct InMemorySessionRegistry {
    /// 現在の接続のマップ
    ///
    /// Key: UserId
    /// Value: RegisteredConnection（ユーザーごとに高々 1 つ）
    connections: Mutex<HashMap<UserId, RegisteredConnection>>,
}

impl InMemorySessionRegistry {
    /// 新しい InMemorySessionRegistry を作成
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(&self, connection: RegisteredConnection) -> Option<RegisteredConnection> {
        let user_id = connection.principal.user_id;
        let mut connections = self.connections.lock().await;
        let evicted = connections.insert(user_id, connection);
        if evicted.is_some() {
            tracing::debug!("Replaced existing session for user {}", user_id);
        } else {
            tracing::debug!("Registered session for user {}", user_id);
        }
        evicted
    }

    async fn lookup(&self, user_id: UserId) -> Option<ConnectionId> {
        let connections = self.connections.lock().await;
        connections.get(&user_id).map(|entry| entry.connection.id())
    }

    async fn deregister_if_current(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        let is_current = connections
            .get(&user_id)
            .is_some_and(|entry| entry.connection.id() == connection_id);
        if !is_current {
            tracing::debug!(
                "Stale deregister for user {} (connection {}), entry untouched",
                user_id,
                connection_id
            );
            return false;
        }

        if let Some(mut removed) = connections.remove(&user_id) {
            // エントリを失った時点でこの接続は終端状態
            let _ = removed.connection.close();
            tracing::debug!("Deregistered session for user {}", user_id);
        }
        true
    }

    async fn list_user_ids(&self) -> Vec<UserId> {
        let connections = self.connections.lock().await;
        connections.keys().copied().collect()
    }

    async fn snapshot_principals(&self) -> Vec<Principal> {
        let connections = self.connections.lock().await;
        connections
            .values()
            .map(|entry| entry.principal.clone())
            .collect()
    }

    async fn join_room(&self, user_id: UserId, connection_id: ConnectionId, room: RoomId) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get_mut(&user_id) {
            Some(entry) if entry.connection.id() == connection_id => {
                entry.joined_rooms.insert(room);
                true
            }
            _ => false,
        }
    }

    async fn push_to_user(&self, user_id: UserId, payload: &str) -> Result<(), PushError> {
        let connections = self.connections.lock().await;

        let entry = connections
            .get(&user_id)
            .ok_or(PushError::RecipientOffline(user_id))?;
        entry
            .sender
            .send(payload.to_string())
            .map_err(|_| PushError::ChannelClosed(user_id))?;
        tracing::debug!("Pushed payload to user {}", user_id);
        Ok(())
    }

    async fn broadcast_room(&self, room: &RoomId, payload: &str) {
        let connections = self.connections.lock().await;

        for entry in connections.values() {
            if !entry.joined_rooms.contains(room) {
                continue;
            }
            // ブロードキャストでは一部の送信失敗を許容
            if entry.sender.send(payload.to_string()).is_err() {
                tracing::warn!(
                    "Failed to push payload to user {} in room {}, skipping",
                    entry.principal.user_id,
                    room
                );
            }
        }
    }

    async fn broadcast_except(&self, exclude: UserId, payload: &str) {
        let connections = self.connections.lock().await;

        for entry in connections.values() {
            if entry.principal.user_id == exclude {
                continue;
            }
            if entry.sender.send(payload.to_string()).is_err() {
                tracing::warn!(
                    "Failed to push payload to user {}, skipping",
                    entry.principal.user_id
                );
            }
        }
    }
}
