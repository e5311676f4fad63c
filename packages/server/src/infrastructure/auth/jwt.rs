//! JWT (HS256) による PrincipalResolver 実装

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, DisplayName, Principal, PrincipalResolver, UserId};

/// JWT クレーム
///
/// `sub` はマーケットプレイスのユーザー ID（10 進文字列）、`name` は表示名。
/// テストや外部の発行側がトークンを作るために public にしてあります。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: i64,
}

/// HS256 共有鍵で署名されたトークンを検証する PrincipalResolver
pub struct JwtPrincipalResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtPrincipalResolver {
    /// 共有鍵から新しい JwtPrincipalResolver を作成
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl PrincipalResolver for JwtPrincipalResolver {
    async fn resolve(&self, credential: &str) -> Result<Principal, AuthError> {
        let token_data = decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;

        let user_id = token_data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidCredential("sub is not a user id".to_string()))?;
        let user_id = UserId::new(user_id)
            .map_err(|_| AuthError::InvalidCredential("sub is not a user id".to_string()))?;
        let display_name = DisplayName::new(token_data.claims.name)
            .map_err(|_| AuthError::InvalidCredential("name is empty".to_string()))?;

        Ok(Principal::new(user_id, display_name))
    }
}
