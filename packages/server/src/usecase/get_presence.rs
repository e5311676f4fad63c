//! UseCase: プレゼンス一覧取得
//!
//! デバッグ用エンドポイントが使う、現在オンラインの principal 一覧。
//! プレゼンスはレジストリの内容から導出されるだけで、永続化されない。

use std::sync::Arc;

use crate::domain::{Principal, SessionRegistry};

/// プレゼンス一覧取得のユースケース
pub struct GetPresenceUseCase {
    /// SessionRegistry（接続レジストリの抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl GetPresenceUseCase {
    /// 新しい GetPresenceUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 現在オンラインの principal 一覧を取得
    ///
    /// # Returns
    ///
    /// ユーザー ID でソート済みの一覧
    pub async fn execute(&self) -> Vec<Principal> {
        let mut principals = self.registry.snapshot_principals().await;

        // Sort by user_id for consistent ordering
        principals.sort_by_key(|p| p.user_id);

        principals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connection, DisplayName, RegisteredConnection, UserId};
    use crate::infrastructure::registry::InMemorySessionRegistry;
    use tokio::sync::mpsc;

    async fn register(registry: &InMemorySessionRegistry, user_id: i64, name: &str) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connection = Connection::open();
        connection.begin_authentication().unwrap();
        connection.activate().unwrap();
        let principal = Principal::new(
            UserId::new(user_id).unwrap(),
            DisplayName::new(name.to_string()).unwrap(),
        );
        registry
            .register(RegisteredConnection::new(connection, principal, tx))
            .await;
    }

    #[tokio::test]
    async fn test_presence_is_sorted_by_user_id() {
        // テスト項目: プレゼンス一覧がユーザー ID 順で返される
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = GetPresenceUseCase::new(registry.clone());
        register(&registry, 3, "Carla").await;
        register(&registry, 1, "Alicia").await;
        register(&registry, 2, "Bruno").await;

        // when (操作):
        let result = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].display_name.as_str(), "Alicia");
        assert_eq!(result[1].display_name.as_str(), "Bruno");
        assert_eq!(result[2].display_name.as_str(), "Carla");
    }

    #[tokio::test]
    async fn test_presence_is_empty_without_connections() {
        // テスト項目: 接続がなければ空の一覧が返される
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = GetPresenceUseCase::new(registry);

        // when (操作):
        let result = usecase.execute().await;

        // then (期待する結果):
        assert!(result.is_empty());
    }
}
