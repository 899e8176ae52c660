use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::user_dto::{AssignRolesRequest, CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::role::RoleName;
use crate::models::user::User;
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::auth_service::hash_password;
use crate::utils::errors::{conflict_error, forbidden_error, not_found_error, AppError};
use crate::utils::validation::like_pattern;

pub struct UserController {
    repository: UserRepository,
    roles: RoleRepository,
    pool: PgPool,
}

impl UserController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UserRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            pool,
        }
    }

    async fn to_response(&self, user: User) -> Result<UserResponse, AppError> {
        let roles = self.repository.role_names(user.id).await?;
        Ok(UserResponse::from_user(user, roles))
    }

    /// Every id must name a live role.
    async fn resolve_roles(&self, role_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        let mut ids = role_ids.to_vec();
        ids.sort();
        ids.dedup();

        let found = self.roles.find_live_by_ids(&ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|r| r.id == **id)) {
            return Err(not_found_error("Role", missing));
        }
        Ok(ids)
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateUserRequest) -> Result<ApiResponse<UserResponse>, AppError> {
        actor.require_admin("create users")?;
        request.validate()?;

        if self.repository.email_exists(&request.email).await? {
            return Err(conflict_error("User", "email", &request.email));
        }
        let role_ids = self.resolve_roles(&request.role_ids).await?;

        let user = User {
            id: Uuid::new_v4(),
            email: request.email,
            password_hash: hash_password(&request.password).await?,
            full_name: request.full_name,
            phone: request.phone,
            address: request.address,
            is_active: true,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create_with_roles(&user, &role_ids).await?;
        Ok(ApiResponse::success_with_message(self.to_response(created).await?, "User created"))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<UserResponse>, AppError> {
        if actor.user_id != id && !actor.is_staff() {
            return Err(forbidden_error("view user", "users can only view their own profile"));
        }
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("User", id))?;
        Ok(ApiResponse::success(self.to_response(user).await?))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateUserRequest) -> Result<ApiResponse<UserResponse>, AppError> {
        if actor.user_id != id && !actor.is_admin() {
            return Err(forbidden_error("update user", "users can only update their own profile"));
        }
        if request.is_active.is_some() && !actor.is_admin() {
            return Err(forbidden_error("change account status", "admin role required"));
        }
        request.validate()?;

        let mut user = live(self.repository.find_by_id(id).await?, |u| u.audit.is_deleted, "User", id)?;
        if let Some(full_name) = request.full_name {
            user.full_name = full_name;
        }
        if request.phone.is_some() {
            user.phone = request.phone;
        }
        if request.address.is_some() {
            user.address = request.address;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        user.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&user).await?;
        Ok(ApiResponse::success_with_message(self.to_response(updated).await?, "User updated"))
    }

    pub async fn assign_roles(&self, actor: &AuthenticatedUser, id: Uuid, request: AssignRolesRequest) -> Result<ApiResponse<UserResponse>, AppError> {
        actor.require_admin("assign roles")?;
        request.validate()?;

        let user = live(self.repository.find_by_id(id).await?, |u| u.audit.is_deleted, "User", id)?;
        let role_ids = self.resolve_roles(&request.role_ids).await?;
        self.repository.set_roles(id, &role_ids, Some(actor.user_id)).await?;
        Ok(ApiResponse::success_with_message(self.to_response(user).await?, "Roles updated"))
    }

    pub async fn list_technicians(&self, actor: &AuthenticatedUser) -> Result<ApiResponse<Vec<UserResponse>>, AppError> {
        actor.require_staff("list technicians")?;
        let technicians = self.repository.list_by_role(RoleName::Technician.as_str()).await?;
        let responses = technicians
            .into_iter()
            .map(|u| UserResponse::from_user(u, vec![RoleName::Technician.as_str().to_string()]))
            .collect();
        Ok(ApiResponse::success(responses))
    }

    pub async fn search(&self, actor: &AuthenticatedUser, query: &PageQuery) -> Result<ApiResponse<PageResponse<UserResponse>>, AppError> {
        actor.require_staff("search users")?;
        let pattern = like_pattern(query.keyword.as_deref());
        let (users, total) = self
            .repository
            .search(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;

        let mut content = Vec::with_capacity(users.len());
        for user in users {
            content.push(self.to_response(user).await?);
        }
        Ok(ApiResponse::success(PageResponse::new(content, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_admin("delete users")?;
        if actor.user_id == id {
            return Err(forbidden_error("delete user", "you cannot delete your own account"));
        }
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "User", id)?;
        Ok(ApiResponse::message("User deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_admin("restore users")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, UserRepository::TABLE, "User", id).await?;
        Ok(ApiResponse::message("User restored"))
    }
}
