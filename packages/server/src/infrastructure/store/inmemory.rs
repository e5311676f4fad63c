//! InMemory MessageStore 実装
//!
//! ドメイン層が定義する MessageStore trait の具体的な実装。
//! Vec と HashMap をインメモリ DB として使用します。
//!
//! ## 技術的負債
//!
//! 現在、エンティティを直接ストレージとして使用しています。これは
//! InMemory 実装では許容される妥協ですが、将来 PostgreSQL などの DBMS を
//! 実装する際は、行 → エンティティの変換層と users テーブルとの JOIN が
//! 必要になります。表示名はその JOIN の代わりにディレクトリから引いており、
//! 未登録ユーザーは `user-{id}` にフォールバックします。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tsunagi_shared::time::{Clock, SystemClock};

use crate::domain::{
    CommunityMessage, DirectMessage, DisplayName, MessageBody, MessageKind, MessageStore,
    StoreError, Timestamp, UserId,
};

struct StoreInner {
    next_direct_id: i64,
    next_community_id: i64,
    direct: Vec<DirectMessage>,
    community: Vec<CommunityMessage>,
    display_names: HashMap<UserId, DisplayName>,
}

/// インメモリ MessageStore 実装
pub struct InMemoryMessageStore {
    inner: Mutex<StoreInner>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageStore {
    /// 新しい InMemoryMessageStore を作成（システム時計を使用）
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 時計を注入して作成（テスト用）
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                next_direct_id: 1,
                next_community_id: 1,
                direct: Vec::new(),
                community: Vec::new(),
                display_names: HashMap::new(),
            }),
            clock,
        }
    }

    /// 表示名ディレクトリにユーザーを登録
    ///
    /// 本来は users テーブルが持つ情報。シードやテストから使います。
    pub async fn register_user(&self, user_id: UserId, display_name: DisplayName) {
        let mut inner = self.inner.lock().await;
        inner.display_names.insert(user_id, display_name);
    }

    /// 保存済みダイレクトメッセージのスナップショット（テスト用）
    pub async fn direct_messages(&self) -> Vec<DirectMessage> {
        let inner = self.inner.lock().await;
        inner.direct.clone()
    }

    /// 保存済みコミュニティメッセージのスナップショット（テスト用）
    pub async fn community_messages(&self) -> Vec<CommunityMessage> {
        let inner = self.inner.lock().await;
        inner.community.clone()
    }

    fn display_name_for(inner: &StoreInner, user_id: UserId) -> DisplayName {
        inner.display_names.get(&user_id).cloned().unwrap_or_else(|| {
            DisplayName::new(format!("user-{}", user_id)).expect("fallback name is valid")
        })
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_direct_message(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        body: MessageBody,
        kind: MessageKind,
    ) -> Result<DirectMessage, StoreError> {
        let mut inner = self.inner.lock().await;

        let id = inner.next_direct_id;
        inner.next_direct_id += 1;

        let message = DirectMessage {
            id,
            sender_id,
            recipient_id,
            sender_name: Self::display_name_for(&inner, sender_id),
            recipient_name: Self::display_name_for(&inner, recipient_id),
            body,
            kind,
            sent_at: Timestamp::new(self.clock.now_utc_millis()),
            read: false,
        };
        inner.direct.push(message.clone());

        Ok(message)
    }

    async fn create_community_message(
        &self,
        author_id: UserId,
        body: MessageBody,
        kind: MessageKind,
    ) -> Result<CommunityMessage, StoreError> {
        let mut inner = self.inner.lock().await;

        let id = inner.next_community_id;
        inner.next_community_id += 1;

        let message = CommunityMessage {
            id,
            author_id,
            author_name: Self::display_name_for(&inner, author_id),
            body,
            kind,
            sent_at: Timestamp::new(self.clock.now_utc_millis()),
        };
        inner.community.push(message.clone());

        Ok(message)
    }

    async fn mark_conversation_read(
        &self,
        recipient_id: UserId,
        sender_id: UserId,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;

        let mut updated = 0;
        for message in inner.direct.iter_mut() {
            if message.recipient_id == recipient_id
                && message.sender_id == sender_id
                && !message.read
            {
                message.read = true;
                updated += 1;
            }
        }

        Ok(updated)
    }
}
