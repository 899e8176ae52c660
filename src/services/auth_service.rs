//! Servicio de autenticación
//!
//! Token issuing and rotation plus password-reset codes. Refresh token ids and
//! OTP codes live in the cache so they can be revoked server-side.

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{CacheConfig, CacheOperations};
use crate::config::environment::JwtConfig;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::jwt::{
    generate_access_token, generate_refresh_token, verify_token, JwtClaims, TokenType,
};

pub const OTP_PURPOSE_RESET: &str = "reset";
pub const OTP_TTL_SECS: u64 = 5 * 60;
pub const OTP_MAX_ATTEMPTS: i64 = 5;

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

pub struct AuthService {
    cache: Arc<dyn CacheOperations>,
    keys: CacheConfig,
    jwt: JwtConfig,
}

impl AuthService {
    pub fn new(cache: Arc<dyn CacheOperations>, keys: CacheConfig, jwt: JwtConfig) -> Self {
        Self { cache, keys, jwt }
    }

    /// Access + refresh pair; the refresh id is remembered until it expires.
    pub async fn issue_tokens(&self, user_id: Uuid, email: &str, roles: &[String]) -> AppResult<TokenPair> {
        let access = generate_access_token(user_id, email, roles, &self.jwt)?;
        let refresh = generate_refresh_token(user_id, email, roles, &self.jwt)?;

        self.cache
            .set(&self.keys.refresh_key(&refresh.jti), &user_id.to_string(), self.jwt.refresh_ttl)
            .await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: access.expires_in,
        })
    }

    /// Consumes a refresh token. A token can be used once.
    pub async fn consume_refresh(&self, refresh_token: &str) -> AppResult<JwtClaims> {
        let claims = verify_token(refresh_token, TokenType::Refresh, &self.jwt)?;
        let key = self.keys.refresh_key(&claims.jti);

        let owned = matches!(self.cache.get(&key).await?, Some(owner) if owner == claims.sub);
        // Solo quien borra la clave gana la rotación
        if !owned || !self.cache.delete(&key).await? {
            warn!(jti = %claims.jti, "Refresh token unknown or already used");
            return Err(AppError::Unauthorized("Refresh token has been revoked".to_string()));
        }
        Ok(claims)
    }

    /// Logout. Unknown or expired tokens are ignored.
    pub async fn revoke(&self, refresh_token: &str) -> AppResult<()> {
        if let Ok(claims) = verify_token(refresh_token, TokenType::Refresh, &self.jwt) {
            let removed = self.cache.delete(&self.keys.refresh_key(&claims.jti)).await?;
            debug!(jti = %claims.jti, removed, "Refresh token revoked");
        }
        Ok(())
    }

    /// Stores a fresh code, replacing any previous one and its attempt counter.
    pub async fn issue_otp(&self, email: &str) -> AppResult<String> {
        let otp = generate_otp();
        self.cache
            .set(&self.keys.otp_key(OTP_PURPOSE_RESET, email), &otp, OTP_TTL_SECS)
            .await?;
        self.cache
            .delete(&self.keys.otp_attempts_key(OTP_PURPOSE_RESET, email))
            .await?;
        Ok(otp)
    }

    /// Checks a reset code. On success, or after more than `OTP_MAX_ATTEMPTS` failures, the code is gone.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> AppResult<()> {
        let otp_key = self.keys.otp_key(OTP_PURPOSE_RESET, email);
        let attempts_key = self.keys.otp_attempts_key(OTP_PURPOSE_RESET, email);

        let Some(expected) = self.cache.get(&otp_key).await? else {
            return Err(AppError::BadRequest("Reset code is invalid or has expired".to_string()));
        };

        if expected == otp {
            self.cache.delete(&otp_key).await?;
            self.cache.delete(&attempts_key).await?;
            return Ok(());
        }

        let attempts = self.cache.incr(&attempts_key, OTP_TTL_SECS).await?;
        if attempts > OTP_MAX_ATTEMPTS {
            warn!(email, attempts, "Too many reset attempts, code invalidated");
            self.cache.delete(&otp_key).await?;
            self.cache.delete(&attempts_key).await?;
        }
        Err(AppError::BadRequest("Reset code is invalid or has expired".to_string()))
    }
}

pub fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// bcrypt is CPU bound, keep it off the async workers.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryCache::new()),
            CacheConfig::default(),
            JwtConfig {
                secret: "test-secret".into(),
                access_ttl: 60,
                refresh_ttl: 120,
            },
        )
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let pair = auth
            .issue_tokens(user_id, "a@b.vn", &["CUSTOMER".to_string()])
            .await
            .unwrap();

        let claims = auth.consume_refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);

        let again = auth.consume_refresh(&pair.refresh_token).await;
        assert!(matches!(again, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let auth = service();
        let pair = auth.issue_tokens(Uuid::new_v4(), "a@b.vn", &[]).await.unwrap();
        assert!(matches!(
            auth.consume_refresh(&pair.access_token).await,
            Err(AppError::Jwt(_))
        ));
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_refresh() {
        let auth = service();
        let pair = auth.issue_tokens(Uuid::new_v4(), "a@b.vn", &[]).await.unwrap();
        auth.revoke(&pair.refresh_token).await.unwrap();
        assert!(auth.consume_refresh(&pair.refresh_token).await.is_err());
        // Garbage is ignored on logout
        auth.revoke("not-a-token").await.unwrap();
    }

    #[tokio::test]
    async fn test_otp_success_consumes_code() {
        let auth = service();
        let otp = auth.issue_otp("A@b.vn").await.unwrap();
        assert_eq!(otp.len(), 6);

        auth.verify_otp("a@b.vn", &otp).await.unwrap();
        assert!(auth.verify_otp("a@b.vn", &otp).await.is_err());
    }

    #[tokio::test]
    async fn test_otp_invalidated_after_max_attempts() {
        let auth = service();
        let otp = auth.issue_otp("a@b.vn").await.unwrap();
        let wrong = if otp == "000000" { "111111" } else { "000000" };

        for _ in 0..=OTP_MAX_ATTEMPTS {
            assert!(auth.verify_otp("a@b.vn", wrong).await.is_err());
        }
        assert!(auth.verify_otp("a@b.vn", &otp).await.is_err());
    }

    #[tokio::test]
    async fn test_otp_survives_max_attempts_failures() {
        let auth = service();
        let otp = auth.issue_otp("a@b.vn").await.unwrap();
        let wrong = if otp == "000000" { "111111" } else { "000000" };

        for _ in 0..OTP_MAX_ATTEMPTS {
            assert!(auth.verify_otp("a@b.vn", wrong).await.is_err());
        }
        auth.verify_otp("a@b.vn", &otp).await.unwrap();
    }

    /// `get` sees the token but another request deletes it first.
    struct RacedCache {
        owner: String,
    }

    #[async_trait::async_trait]
    impl CacheOperations for RacedCache {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Ok(Some(self.owner.clone()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: u64) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> AppResult<bool> {
            Ok(false)
        }

        async fn incr(&self, _key: &str, _ttl: u64) -> AppResult<i64> {
            Ok(1)
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_refresh_loses_when_delete_finds_nothing() {
        let jwt = JwtConfig {
            secret: "test-secret".into(),
            access_ttl: 60,
            refresh_ttl: 120,
        };
        let user_id = Uuid::new_v4();
        let auth = AuthService::new(
            Arc::new(RacedCache { owner: user_id.to_string() }),
            CacheConfig::default(),
            jwt,
        );
        let pair = auth.issue_tokens(user_id, "a@b.vn", &[]).await.unwrap();

        assert!(matches!(
            auth.consume_refresh(&pair.refresh_token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_only_one_wins() {
        let auth = service();
        let pair = auth.issue_tokens(Uuid::new_v4(), "a@b.vn", &[]).await.unwrap();

        let (a, b) = tokio::join!(
            auth.consume_refresh(&pair.refresh_token),
            auth.consume_refresh(&pair.refresh_token)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn test_password_hashing() {
        let hashed = hash_password("Secret123").await.unwrap();
        assert!(verify_password("Secret123", &hashed).await.unwrap());
        assert!(!verify_password("Secret124", &hashed).await.unwrap());
    }
}
