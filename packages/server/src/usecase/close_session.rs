//! UseCase: セッション終了処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CloseSessionUseCase::execute() メソッド
//! - compare-and-delete によるエントリ削除とオフライン通知
//!
//! ### なぜこのテストが必要か
//! - 退去済み接続の遅延 close が新しいセッションのエントリを消さないこと
//!   （stale-close 安全性）はこのユースケースの存在理由そのもの
//! - user_offline が「現在の接続が閉じたとき」に限って流れることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：現在の接続の切断
//! - エッジケース：退去済み接続の切断イベントが後から届く

use std::sync::Arc;

use crate::domain::{ConnectionId, Principal, ServerEvent, SessionRegistry, UserId};

/// セッション終了のユースケース
pub struct CloseSessionUseCase {
    /// SessionRegistry（接続レジストリの抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl CloseSessionUseCase {
    /// 新しい CloseSessionUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// セッション終了を実行
    ///
    /// 呼び出し元の接続がまだ「現在の接続」である場合のみエントリを削除する。
    ///
    /// # Returns
    ///
    /// * `true` - エントリを削除した（オフライン通知を行うべき）
    /// * `false` - すでに新しいセッションに置き換えられていた
    pub async fn execute(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.registry
            .deregister_if_current(user_id, connection_id)
            .await
    }

    /// オフラインになったことを残りの全接続にブロードキャスト
    ///
    /// `execute` が true を返したときだけ呼ぶこと。
    pub async fn announce_offline(&self, principal: &Principal) {
        let payload = ServerEvent::UserOffline {
            user_id: principal.user_id,
            display_name: principal.display_name.clone(),
        }
        .to_json();
        // エントリは削除済みなので、除外指定は実質すべての接続に届く
        self.registry
            .broadcast_except(principal.user_id, &payload)
            .await;
    }
}
