use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::service_type_dto::{CreateServiceTypeRequest, UpdateServiceTypeRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::service_type::ServiceType;
use crate::repositories::service_type_repository::ServiceTypeRepository;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::{ensure_non_negative, like_pattern};

pub struct ServiceTypeController {
    repository: ServiceTypeRepository,
    pool: PgPool,
}

impl ServiceTypeController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ServiceTypeRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateServiceTypeRequest) -> Result<ApiResponse<ServiceType>, AppError> {
        actor.require_staff("create service types")?;
        request.validate()?;
        ensure_non_negative("price", request.price)?;

        let service_type = ServiceType {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            estimated_duration_minutes: request.estimated_duration_minutes,
            price: request.price.round_dp(2),
            is_active: true,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&service_type).await?;
        Ok(ApiResponse::success_with_message(created, "Service type created"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<ServiceType>, AppError> {
        let found = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Service type", id))?;
        Ok(ApiResponse::success(found))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateServiceTypeRequest) -> Result<ApiResponse<ServiceType>, AppError> {
        actor.require_staff("update service types")?;
        request.validate()?;

        let mut service_type = live(self.repository.find_by_id(id).await?, |s| s.audit.is_deleted, "Service type", id)?;
        if let Some(name) = request.name {
            service_type.name = name.trim().to_string();
        }
        if request.description.is_some() {
            service_type.description = request.description;
        }
        if let Some(minutes) = request.estimated_duration_minutes {
            service_type.estimated_duration_minutes = minutes;
        }
        if let Some(price) = request.price {
            ensure_non_negative("price", price)?;
            service_type.price = price.round_dp(2);
        }
        if let Some(is_active) = request.is_active {
            service_type.is_active = is_active;
        }
        service_type.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&service_type).await?;
        Ok(ApiResponse::success_with_message(updated, "Service type updated"))
    }

    pub async fn search(&self, query: &PageQuery) -> Result<ApiResponse<PageResponse<ServiceType>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (items, total) = self
            .repository
            .search(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete service types")?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Service type", id)?;
        Ok(ApiResponse::message("Service type deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore service types")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, ServiceTypeRepository::TABLE, "Service type", id).await?;
        Ok(ApiResponse::message("Service type restored"))
    }
}
