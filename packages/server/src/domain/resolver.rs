//! PrincipalResolver trait 定義
//!
//! 外部の認証コラボレータ（トークン発行側）を抽象化します。
//! 検証に失敗した接続は、ルーム参加やレジストリ変更が起こる前に拒否されます。

use async_trait::async_trait;

use super::entity::Principal;
use super::error::AuthError;

/// Bearer credential → Principal の解決
///
/// Principal は接続の生存期間中は不変で、再検証されない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Principal, AuthError>;
}
