use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::payment_method_dto::{CreatePaymentMethodRequest, UpdatePaymentMethodRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::payment::PaymentMethod;
use crate::repositories::payment_method_repository::PaymentMethodRepository;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::like_pattern;

pub struct PaymentMethodController {
    repository: PaymentMethodRepository,
    pool: PgPool,
}

impl PaymentMethodController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: PaymentMethodRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreatePaymentMethodRequest) -> Result<ApiResponse<PaymentMethod>, AppError> {
        actor.require_admin("create payment methods")?;
        request.validate()?;

        let method = PaymentMethod {
            id: Uuid::new_v4(),
            method_type: request.method_type,
            provider: request.provider,
            description: request.description,
            is_active: true,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&method).await?;
        Ok(ApiResponse::success_with_message(created, "Payment method created"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<PaymentMethod>, AppError> {
        let found = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Payment method", id))?;
        Ok(ApiResponse::success(found))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdatePaymentMethodRequest) -> Result<ApiResponse<PaymentMethod>, AppError> {
        actor.require_admin("update payment methods")?;
        request.validate()?;

        let mut method = live(self.repository.find_by_id(id).await?, |m| m.audit.is_deleted, "Payment method", id)?;
        if let Some(method_type) = request.method_type {
            method.method_type = method_type;
        }
        if let Some(provider) = request.provider {
            method.provider = provider;
        }
        if request.description.is_some() {
            method.description = request.description;
        }
        if let Some(is_active) = request.is_active {
            method.is_active = is_active;
        }
        method.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&method).await?;
        Ok(ApiResponse::success_with_message(updated, "Payment method updated"))
    }

    pub async fn search(&self, query: &PageQuery) -> Result<ApiResponse<PageResponse<PaymentMethod>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (items, total) = self
            .repository
            .search(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_admin("delete payment methods")?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Payment method", id)?;
        Ok(ApiResponse::message("Payment method deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_admin("restore payment methods")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, PaymentMethodRepository::TABLE, "Payment method", id).await?;
        Ok(ApiResponse::message("Payment method restored"))
    }
}
