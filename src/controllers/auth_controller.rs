use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::auth_dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest, TokenResponse,
};
use crate::dto::common_dto::ApiResponse;
use crate::dto::user_dto::UserResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::role::RoleName;
use crate::models::user::User;
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::auth_service::{hash_password, verify_password, AuthService, OTP_TTL_SECS};
use crate::services::email_service::{Email, EmailService};
use crate::state::AppState;
use crate::utils::errors::{conflict_error, not_found_error, AppError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthController {
    users: UserRepository,
    roles: RoleRepository,
    auth: AuthService,
    email: Arc<EmailService>,
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: UserRepository::new(state.pool.clone()),
            roles: RoleRepository::new(state.pool.clone()),
            auth: state.auth_service(),
            email: Arc::clone(&state.email),
        }
    }

    async fn token_response(&self, user: User) -> Result<TokenResponse, AppError> {
        let roles = self.users.role_names(user.id).await?;
        let pair = self.auth.issue_tokens(user.id, &user.email, &roles).await?;
        Ok(TokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
            user: UserResponse::from_user(user, roles),
        })
    }

    /// Self-service sign-up; the account always gets the CUSTOMER role.
    pub async fn register(&self, request: RegisterRequest) -> Result<ApiResponse<UserResponse>, AppError> {
        request.validate()?;

        if self.users.email_exists(&request.email).await? {
            return Err(conflict_error("User", "email", &request.email));
        }
        let customer_role = self
            .roles
            .find_by_name(RoleName::Customer.as_str())
            .await?
            .ok_or_else(|| AppError::Internal("CUSTOMER role is missing".to_string()))?;

        let user = User {
            id: Uuid::new_v4(),
            email: request.email,
            password_hash: hash_password(&request.password).await?,
            full_name: request.full_name,
            phone: request.phone,
            address: None,
            is_active: true,
            audit: Audit::new(None),
        };
        let created = self.users.create_with_roles(&user, &[customer_role.id]).await?;
        info!(user_id = %created.id, "Customer registered");

        self.email.dispatch(Email::welcome(&created.email, &created.full_name));
        let response = UserResponse::from_user(created, vec![customer_role.name]);
        Ok(ApiResponse::success_with_message(response, "Registration successful"))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<ApiResponse<TokenResponse>, AppError> {
        request.validate()?;

        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&request.password, &user.password_hash).await? {
            warn!(email = %request.email, "Failed login attempt");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        if !user.can_login() {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        info!(user_id = %user.id, "User logged in");
        Ok(ApiResponse::success(self.token_response(user).await?))
    }

    /// Rotates the refresh token; the presented one stops working.
    pub async fn refresh(&self, request: RefreshTokenRequest) -> Result<ApiResponse<TokenResponse>, AppError> {
        request.validate()?;

        let claims = self.auth.consume_refresh(&request.refresh_token).await?;
        let user_id = claims.user_id()?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(User::can_login)
            .ok_or_else(|| AppError::Unauthorized("Account is disabled".to_string()))?;

        Ok(ApiResponse::success(self.token_response(user).await?))
    }

    pub async fn logout(&self, request: RefreshTokenRequest) -> Result<ApiResponse<()>, AppError> {
        self.auth.revoke(&request.refresh_token).await?;
        Ok(ApiResponse::message("Logged out"))
    }

    /// Always answers the same way so account existence is not revealed.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<ApiResponse<()>, AppError> {
        request.validate()?;

        match self.users.find_by_email(&request.email).await? {
            Some(user) if user.can_login() => {
                let otp = self.auth.issue_otp(&user.email).await?;
                self.email
                    .dispatch(Email::password_reset_otp(&user.email, &otp, OTP_TTL_SECS / 60));
                info!(user_id = %user.id, "Password reset code issued");
            }
            _ => info!("Password reset requested for unknown account"),
        }
        Ok(ApiResponse::message(
            "If the account exists, a reset code has been sent to its email",
        ))
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<ApiResponse<()>, AppError> {
        request.validate()?;

        self.auth.verify_otp(&request.email, &request.otp).await?;
        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::BadRequest("Reset code is invalid or has expired".to_string()))?;

        let password_hash = hash_password(&request.new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;
        info!(user_id = %user.id, "Password reset");
        Ok(ApiResponse::message("Password has been reset"))
    }

    pub async fn change_password(&self, actor: &AuthenticatedUser, request: ChangePasswordRequest) -> Result<ApiResponse<()>, AppError> {
        request.validate()?;

        let user = self
            .users
            .find_by_id(actor.user_id)
            .await?
            .ok_or_else(|| not_found_error("User", actor.user_id))?;
        if !verify_password(&request.current_password, &user.password_hash).await? {
            return Err(AppError::BadRequest("Current password is incorrect".to_string()));
        }

        let password_hash = hash_password(&request.new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;
        Ok(ApiResponse::message("Password changed"))
    }

    pub async fn me(&self, actor: &AuthenticatedUser) -> Result<ApiResponse<UserResponse>, AppError> {
        let user = self
            .users
            .find_by_id(actor.user_id)
            .await?
            .filter(|u| !u.audit.is_deleted)
            .ok_or_else(|| not_found_error("User", actor.user_id))?;
        let roles = self.users.role_names(user.id).await?;
        Ok(ApiResponse::success(UserResponse::from_user(user, roles)))
    }
}
