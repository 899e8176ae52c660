use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::vehicle_part_dto::{CreateVehiclePartRequest, PartFilter, RestockRequest, UpdateVehiclePartRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::vehicle_part::VehiclePart;
use crate::repositories::vehicle_part_category_repository::VehiclePartCategoryRepository;
use crate::repositories::vehicle_part_repository::VehiclePartRepository;
use crate::repositories::vehicle_type_repository::VehicleTypeRepository;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::{ensure_non_negative, like_pattern};

pub struct VehiclePartController {
    repository: VehiclePartRepository,
    categories: VehiclePartCategoryRepository,
    vehicle_types: VehicleTypeRepository,
    pool: PgPool,
}

impl VehiclePartController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: VehiclePartRepository::new(pool.clone()),
            categories: VehiclePartCategoryRepository::new(pool.clone()),
            vehicle_types: VehicleTypeRepository::new(pool.clone()),
            pool,
        }
    }

    async fn check_references(&self, category_id: Uuid, vehicle_type_id: Option<Uuid>) -> Result<(), AppError> {
        live(self.categories.find_by_id(category_id).await?, |c| c.audit.is_deleted, "Part category", category_id)?;
        if let Some(type_id) = vehicle_type_id {
            live(self.vehicle_types.find_by_id(type_id).await?, |t| t.audit.is_deleted, "Vehicle type", type_id)?;
        }
        Ok(())
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateVehiclePartRequest) -> Result<ApiResponse<VehiclePart>, AppError> {
        actor.require_staff("create vehicle parts")?;
        request.validate()?;
        ensure_non_negative("unit_price", request.unit_price)?;
        self.check_references(request.category_id, request.vehicle_type_id).await?;

        let part = VehiclePart {
            id: Uuid::new_v4(),
            name: request.name,
            part_number: request.part_number.trim().to_uppercase(),
            category_id: request.category_id,
            vehicle_type_id: request.vehicle_type_id,
            current_quantity: request.current_quantity,
            minimum_stock_level: request.minimum_stock_level,
            unit_price: request.unit_price,
            last_restock_date: None,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&part).await?;
        Ok(ApiResponse::success_with_message(created, "Vehicle part created"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<VehiclePart>, AppError> {
        let found = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle part", id))?;
        Ok(ApiResponse::success(found))
    }

    /// Stock is changed only through restock and maintenance completion.
    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateVehiclePartRequest) -> Result<ApiResponse<VehiclePart>, AppError> {
        actor.require_staff("update vehicle parts")?;
        request.validate()?;

        let mut part = live(self.repository.find_by_id(id).await?, |p| p.audit.is_deleted, "Vehicle part", id)?;
        if let Some(name) = request.name {
            part.name = name;
        }
        if let Some(part_number) = request.part_number {
            part.part_number = part_number.trim().to_uppercase();
        }
        if let Some(category_id) = request.category_id {
            part.category_id = category_id;
        }
        if request.vehicle_type_id.is_some() {
            part.vehicle_type_id = request.vehicle_type_id;
        }
        if let Some(minimum) = request.minimum_stock_level {
            part.minimum_stock_level = minimum;
        }
        if let Some(price) = request.unit_price {
            ensure_non_negative("unit_price", price)?;
            part.unit_price = price;
        }
        self.check_references(part.category_id, part.vehicle_type_id).await?;
        part.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&part).await?;
        Ok(ApiResponse::success_with_message(updated, "Vehicle part updated"))
    }

    pub async fn restock(&self, actor: &AuthenticatedUser, id: Uuid, request: RestockRequest) -> Result<ApiResponse<VehiclePart>, AppError> {
        actor.require_staff("restock vehicle parts")?;
        request.validate()?;

        let part = self
            .repository
            .restock(id, request.quantity, Some(actor.user_id))
            .await?
            .ok_or_else(|| not_found_error("Vehicle part", id))?;
        Ok(ApiResponse::success_with_message(part, "Stock updated"))
    }

    pub async fn low_stock(&self, actor: &AuthenticatedUser) -> Result<ApiResponse<Vec<VehiclePart>>, AppError> {
        actor.require_staff("view low stock")?;
        Ok(ApiResponse::success(self.repository.low_stock().await?))
    }

    pub async fn search(&self, query: &PageQuery, filter: &PartFilter) -> Result<ApiResponse<PageResponse<VehiclePart>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (items, total) = self
            .repository
            .search(pattern.as_deref(), filter.category_id, query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete vehicle parts")?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Vehicle part", id)?;
        Ok(ApiResponse::message("Vehicle part deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore vehicle parts")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, VehiclePartRepository::TABLE, "Vehicle part", id).await?;
        Ok(ApiResponse::message("Vehicle part restored"))
    }
}
