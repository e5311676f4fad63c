//! UseCase: セッション確立処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EstablishSessionUseCase::execute() メソッド
//! - 認証 → 登録（旧セッションの強制退去）→ オンライン通知の流れ
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：認証失敗時にレジストリが変更されない
//! - 単一セッション不変条件：再認証で旧接続が退去され、新接続だけが残る
//! - 退去した接続のチャンネルが閉じられることを保証（強制クローズの仕組み）
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ユーザーのセッション確立
//! - 異常系：資格情報なし・無効な資格情報
//! - エッジケース：同一ユーザーの再接続（退去）

use std::sync::Arc;

use crate::domain::{
    Connection, ConnectionId, Principal, PrincipalResolver, PusherChannel, RegisteredConnection,
    RoomId, ServerEvent, SessionRegistry,
};

use super::error::ConnectError;

/// 確立されたセッションの情報
///
/// ソケットタスクが切断時の `deregister_if_current` に使う。
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub connection_id: ConnectionId,
    pub principal: Principal,
}

/// セッション確立のユースケース
pub struct EstablishSessionUseCase {
    /// PrincipalResolver（認証コラボレータの抽象化）
    resolver: Arc<dyn PrincipalResolver>,
    /// SessionRegistry（接続レジストリの抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl EstablishSessionUseCase {
    /// 新しい EstablishSessionUseCase を作成
    pub fn new(resolver: Arc<dyn PrincipalResolver>, registry: Arc<dyn SessionRegistry>) -> Self {
        Self { resolver, registry }
    }

    /// セッション確立を実行
    ///
    /// # Arguments
    ///
    /// * `credential` - 接続リクエストに載っていた bearer credential
    /// * `sender` - この接続へのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(EstablishedSession)` - 確立成功
    /// * `Err(ConnectError)` - 認証失敗（レジストリは変更されない）
    pub async fn execute(
        &self,
        credential: Option<&str>,
        sender: PusherChannel,
    ) -> Result<EstablishedSession, ConnectError> {
        let credential = credential.ok_or(ConnectError::AuthenticationFailed(
            crate::domain::AuthError::MissingCredential,
        ))?;

        // 1. ライフサイクル開始（Unauthenticated → Authenticating）
        let mut connection = Connection::open();
        connection.begin_authentication()?;

        // 2. 認証。失敗したらここで終わり、副作用なし
        let principal = self.resolver.resolve(credential).await?;

        // 3. Active へ遷移し、原子的に登録（旧セッションがあれば退去）
        connection.activate()?;
        let registered = RegisteredConnection::new(connection, principal.clone(), sender);
        let connection_id = registered.connection.id();

        if let Some(mut evicted) = self.registry.register(registered).await {
            let _ = evicted.connection.close();
            tracing::info!(
                "Evicted session {} of user {} in favor of {}",
                evicted.connection.id(),
                principal.user_id,
                connection_id
            );
            // evicted が drop されると旧接続の PusherChannel が閉じ、
            // 旧ソケットタスクは自律的に終了する
        }

        Ok(EstablishedSession {
            connection_id,
            principal,
        })
    }

    /// オンラインになったことを他の全接続にブロードキャスト
    pub async fn announce_online(&self, principal: &Principal) {
        let payload = ServerEvent::UserOnline {
            user_id: principal.user_id,
            display_name: principal.display_name.clone(),
        }
        .to_json();
        self.registry
            .broadcast_except(principal.user_id, &payload)
            .await;
    }

    /// ルーム参加の再表明
    ///
    /// 接続が参加できるのは自分のプライベートルームと community のみ。
    /// それ以外は無視される。
    pub async fn rejoin_room(&self, session: &EstablishedSession, room: RoomId) -> bool {
        let allowed = matches!(room, RoomId::Community)
            || room == RoomId::User(session.principal.user_id);
        if !allowed {
            tracing::warn!(
                "User {} attempted to join foreign room {}",
                session.principal.user_id,
                room
            );
            return false;
        }
        self.registry
            .join_room(session.principal.user_id, session.connection_id, room)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthError, DisplayName, MockPrincipalResolver, UserId};
    use crate::infrastructure::registry::InMemorySessionRegistry;
    use tokio::sync::mpsc;

    fn principal(user_id: i64, name: &str) -> Principal {
        Principal::new(
            UserId::new(user_id).unwrap(),
            DisplayName::new(name.to_string()).unwrap(),
        )
    }

    fn accepting_resolver(p: Principal) -> Arc<MockPrincipalResolver> {
        let mut resolver = MockPrincipalResolver::new();
        resolver
            .expect_resolve()
            .returning(move |_| Ok(p.clone()));
        Arc::new(resolver)
    }

    fn rejecting_resolver() -> Arc<MockPrincipalResolver> {
        let mut resolver = MockPrincipalResolver::new();
        resolver.expect_resolve().returning(|_| {
            Err(AuthError::InvalidCredential("bad signature".to_string()))
        });
        Arc::new(resolver)
    }

    #[tokio::test]
    async fn test_establish_session_success() {
        // テスト項目: 認証に成功したユーザーのセッションが登録される
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase =
            EstablishSessionUseCase::new(accepting_resolver(principal(1, "Alicia")), registry.clone());

        // when (操作):
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = usecase.execute(Some("token"), tx).await;

        // then (期待する結果):
        let session = result.unwrap();
        assert_eq!(session.principal.user_id, UserId::new(1).unwrap());
        assert_eq!(
            registry.lookup(UserId::new(1).unwrap()).await,
            Some(session.connection_id)
        );
    }

    #[tokio::test]
    async fn test_missing_credential_is_rejected() {
        // テスト項目: 資格情報なしの接続は拒否され、レジストリは空のまま
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let resolver = Arc::new(MockPrincipalResolver::new());
        let usecase = EstablishSessionUseCase::new(resolver, registry.clone());

        // when (操作):
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = usecase.execute(None, tx).await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ConnectError::AuthenticationFailed(AuthError::MissingCredential)
        );
        assert!(registry.list_user_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_credential_leaves_no_partial_state() {
        // テスト項目: 認証失敗時にレジストリ・ルームが一切変更されない
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = EstablishSessionUseCase::new(rejecting_resolver(), registry.clone());

        // when (操作):
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = usecase.execute(Some("forged"), tx).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ConnectError::AuthenticationFailed(
                AuthError::InvalidCredential(_)
            ))
        ));
        assert!(registry.list_user_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_evicts_prior_session() {
        // テスト項目: 再接続で旧セッションが退去され、チャンネルが閉じられる
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase =
            EstablishSessionUseCase::new(accepting_resolver(principal(1, "Alicia")), registry.clone());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let first = usecase.execute(Some("token"), tx1).await.unwrap();

        // when (操作): 同じユーザーがもう一度接続する
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let second = usecase.execute(Some("token"), tx2).await.unwrap();

        // then (期待する結果): レジストリは新しい接続を指す
        assert_ne!(first.connection_id, second.connection_id);
        assert_eq!(
            registry.lookup(UserId::new(1).unwrap()).await,
            Some(second.connection_id)
        );

        // 旧接続のチャンネルは閉じられている（強制クローズ）
        assert_eq!(rx1.recv().await, None);
    }

    #[tokio::test]
    async fn test_announce_online_excludes_self() {
        // テスト項目: user_online は本人以外の全接続に届く
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let alicia_usecase =
            EstablishSessionUseCase::new(accepting_resolver(principal(1, "Alicia")), registry.clone());
        let bruno_usecase =
            EstablishSessionUseCase::new(accepting_resolver(principal(2, "Bruno")), registry.clone());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let alicia = alicia_usecase.execute(Some("token"), tx1).await.unwrap();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        bruno_usecase.execute(Some("token"), tx2).await.unwrap();

        // when (操作):
        alicia_usecase.announce_online(&alicia.principal).await;

        // then (期待する結果):
        let payload = rx2.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "user_online");
        assert_eq!(value["userId"], 1);
        assert_eq!(value["displayName"], "Alicia");
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejoin_room_rejects_foreign_private_room() {
        // テスト項目: 他人のプライベートルームへの join は無視される
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase =
            EstablishSessionUseCase::new(accepting_resolver(principal(1, "Alicia")), registry.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = usecase.execute(Some("token"), tx).await.unwrap();

        // when (操作) / then (期待する結果):
        let own_room = RoomId::User(UserId::new(1).unwrap());
        let foreign_room = RoomId::User(UserId::new(2).unwrap());
        assert!(usecase.rejoin_room(&session, own_room).await);
        assert!(usecase.rejoin_room(&session, RoomId::Community).await);
        assert!(!usecase.rejoin_room(&session, foreign_room).await);
    }
}
