use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::vehicle_part_dto::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::vehicle_part_category::VehiclePartCategory;
use crate::repositories::vehicle_part_category_repository::VehiclePartCategoryRepository;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::like_pattern;

pub struct VehiclePartCategoryController {
    repository: VehiclePartCategoryRepository,
    pool: PgPool,
}

impl VehiclePartCategoryController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: VehiclePartCategoryRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateCategoryRequest) -> Result<ApiResponse<VehiclePartCategory>, AppError> {
        actor.require_staff("create part categories")?;
        request.validate()?;

        let category = VehiclePartCategory {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&category).await?;
        Ok(ApiResponse::success_with_message(created, "Category created"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<VehiclePartCategory>, AppError> {
        let found = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Part category", id))?;
        Ok(ApiResponse::success(found))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateCategoryRequest) -> Result<ApiResponse<VehiclePartCategory>, AppError> {
        actor.require_staff("update part categories")?;
        request.validate()?;

        let mut category = live(self.repository.find_by_id(id).await?, |c| c.audit.is_deleted, "Part category", id)?;
        if let Some(name) = request.name {
            category.name = name.trim().to_string();
        }
        if request.description.is_some() {
            category.description = request.description;
        }
        category.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&category).await?;
        Ok(ApiResponse::success_with_message(updated, "Category updated"))
    }

    pub async fn search(&self, query: &PageQuery) -> Result<ApiResponse<PageResponse<VehiclePartCategory>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (items, total) = self
            .repository
            .search(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete part categories")?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Part category", id)?;
        Ok(ApiResponse::message("Category deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore part categories")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, VehiclePartCategoryRepository::TABLE, "Part category", id).await?;
        Ok(ApiResponse::message("Category restored"))
    }
}
