//! Middleware de autenticación JWT
//!
//! Este módulo maneja la autenticación JWT, extracción de tokens
//! y verificación de roles. Roles come from the access token claims.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    config::environment::JwtConfig,
    models::role::RoleName,
    state::AppState,
    utils::{
        errors::{forbidden_error, AppError, AppResult},
        jwt::{extract_token_from_header, verify_token, TokenType},
    },
};

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.iter().any(|r| r == role.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(RoleName::Admin)
    }

    /// ADMIN or STAFF
    pub fn is_staff(&self) -> bool {
        self.is_admin() || self.has_role(RoleName::Staff)
    }

    pub fn is_technician(&self) -> bool {
        self.has_role(RoleName::Technician)
    }

    pub fn require_staff(&self, operation: &str) -> AppResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(forbidden_error(operation, "staff role required"))
        }
    }

    pub fn require_admin(&self, operation: &str) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(forbidden_error(operation, "admin role required"))
        }
    }
}

/// Validates an access token and builds the caller identity.
pub fn authenticate(token: &str, config: &JwtConfig) -> AppResult<AuthenticatedUser> {
    let claims = verify_token(token, TokenType::Access, config)?;
    Ok(AuthenticatedUser {
        user_id: claims.user_id()?,
        email: claims.email,
        roles: claims.roles,
    })
}

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let user = authenticate(token, &state.config.jwt)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwt::{generate_access_token, generate_refresh_token};

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "middleware-secret".into(),
            access_ttl: 60,
            refresh_ttl: 120,
        }
    }

    #[test]
    fn test_authenticate_access_token() {
        let user_id = Uuid::new_v4();
        let roles = vec!["STAFF".to_string()];
        let issued = generate_access_token(user_id, "s@evsc.vn", &roles, &config()).unwrap();

        let user = authenticate(&issued.token, &config()).unwrap();
        assert_eq!(user.user_id, user_id);
        assert!(user.is_staff());
        assert!(!user.is_admin());
        assert!(user.require_admin("delete roles").is_err());
    }

    #[test]
    fn test_refresh_token_rejected() {
        let issued = generate_refresh_token(Uuid::new_v4(), "a@b.vn", &[], &config()).unwrap();
        assert!(authenticate(&issued.token, &config()).is_err());
    }

    #[test]
    fn test_customer_is_not_staff() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "c@b.vn".into(),
            roles: vec!["CUSTOMER".into()],
        };
        assert!(!user.is_staff());
        assert!(matches!(user.require_staff("confirm"), Err(AppError::Forbidden(_))));
    }
}
