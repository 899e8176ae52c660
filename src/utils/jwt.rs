//! Utilidades JWT
//!
//! Access and refresh tokens share one claim set; `token_type` keeps one from
//! being accepted in place of the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::environment::JwtConfig, utils::errors::AppError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims del JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
    pub token_type: TokenType,
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Jwt("Invalid subject".to_string()))
    }
}

/// Token plus the identifier stored server-side for refresh rotation
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_in: u64,
}

fn issue(
    user_id: Uuid,
    email: &str,
    roles: &[String],
    token_type: TokenType,
    ttl: u64,
    config: &JwtConfig,
) -> Result<IssuedToken, AppError> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(ttl as i64);
    let jti = Uuid::new_v4().to_string();

    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        roles: roles.to_vec(),
        token_type,
        jti: jti.clone(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_ref()),
    )
    .map_err(|e| AppError::Jwt(format!("Error generating token: {}", e)))?;

    Ok(IssuedToken { token, jti, expires_in: ttl })
}

/// Generar access token para un usuario
pub fn generate_access_token(
    user_id: Uuid,
    email: &str,
    roles: &[String],
    config: &JwtConfig,
) -> Result<IssuedToken, AppError> {
    issue(user_id, email, roles, TokenType::Access, config.access_ttl, config)
}

pub fn generate_refresh_token(
    user_id: Uuid,
    email: &str,
    roles: &[String],
    config: &JwtConfig,
) -> Result<IssuedToken, AppError> {
    issue(user_id, email, roles, TokenType::Refresh, config.refresh_ttl, config)
}

/// Verificar y decodificar JWT token
pub fn verify_token(
    token: &str,
    expected: TokenType,
    config: &JwtConfig,
) -> Result<JwtClaims, AppError> {
    let claims = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Jwt(format!("Invalid token: {}", e)))?;

    if claims.token_type != expected {
        return Err(AppError::Jwt("Unexpected token type".to_string()));
    }
    Ok(claims)
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AppError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must start with 'Bearer '".to_string()))?
        .trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Token must not be empty".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_ttl: 600,
            refresh_ttl: 3600,
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let roles = vec!["CUSTOMER".to_string()];
        let issued = generate_access_token(user_id, "a@b.vn", &roles, &config()).unwrap();

        let claims = verify_token(&issued.token, TokenType::Access, &config()).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let issued = generate_refresh_token(Uuid::new_v4(), "a@b.vn", &[], &config()).unwrap();
        let err = verify_token(&issued.token, TokenType::Access, &config()).unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = generate_access_token(Uuid::new_v4(), "a@b.vn", &[], &config()).unwrap();
        let other = JwtConfig { secret: "other".to_string(), ..config() };
        assert!(verify_token(&issued.token, TokenType::Access, &other).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer   ").is_err());
    }
}
