use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::role_dto::{CreateRoleRequest, UpdateRoleRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::role::{Role, RoleName};
use crate::repositories::role_repository::RoleRepository;
use crate::utils::errors::{conflict_error, forbidden_error, not_found_error, AppError};
use crate::utils::validation::like_pattern;

pub struct RoleController {
    repository: RoleRepository,
    pool: PgPool,
}

impl RoleController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: RoleRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateRoleRequest) -> Result<ApiResponse<Role>, AppError> {
        actor.require_admin("create roles")?;
        request.validate()?;

        if self.repository.find_by_name(&request.name).await?.is_some() {
            return Err(conflict_error("Role", "name", &request.name));
        }

        let role = Role {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&role).await?;
        Ok(ApiResponse::success_with_message(created, "Role created"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<Role>, AppError> {
        let role = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Role", id))?;
        Ok(ApiResponse::success(role))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateRoleRequest) -> Result<ApiResponse<Role>, AppError> {
        actor.require_admin("update roles")?;
        request.validate()?;

        let mut role = live(self.repository.find_by_id(id).await?, |r| r.audit.is_deleted, "Role", id)?;

        if let Some(name) = request.name {
            if name != role.name {
                if RoleName::parse(&role.name).is_some() {
                    return Err(forbidden_error("rename role", "built-in roles keep their name"));
                }
                if self.repository.find_by_name(&name).await?.is_some() {
                    return Err(conflict_error("Role", "name", &name));
                }
                role.name = name;
            }
        }
        if request.description.is_some() {
            role.description = request.description;
        }
        role.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&role).await?;
        Ok(ApiResponse::success_with_message(updated, "Role updated"))
    }

    pub async fn search(&self, query: &PageQuery) -> Result<ApiResponse<PageResponse<Role>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (roles, total) = self
            .repository
            .search(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(roles, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_admin("delete roles")?;
        if let Some(role) = self.repository.find_by_id(id).await? {
            if RoleName::parse(&role.name).is_some() {
                return Err(forbidden_error("delete role", "built-in roles cannot be deleted"));
            }
        }
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Role", id)?;
        Ok(ApiResponse::message("Role deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_admin("restore roles")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, RoleRepository::TABLE, "Role", id).await?;
        Ok(ApiResponse::message("Role restored"))
    }
}
