use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::vehicle_type_dto::{CreateVehicleTypeRequest, UpdateVehicleTypeRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::vehicle_type::VehicleType;
use crate::repositories::vehicle_type_repository::VehicleTypeRepository;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::{ensure_non_negative, like_pattern};

pub struct VehicleTypeController {
    repository: VehicleTypeRepository,
    pool: PgPool,
}

impl VehicleTypeController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: VehicleTypeRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateVehicleTypeRequest) -> Result<ApiResponse<VehicleType>, AppError> {
        actor.require_staff("create vehicle types")?;
        request.validate()?;
        if let Some(capacity) = request.battery_capacity_kwh {
            ensure_non_negative("battery_capacity_kwh", capacity)?;
        }

        let vehicle_type = VehicleType {
            id: Uuid::new_v4(),
            model_name: request.model_name,
            manufacturer: request.manufacturer,
            model_year: request.model_year,
            battery_capacity_kwh: request.battery_capacity_kwh,
            maintenance_interval_km: request.maintenance_interval_km,
            maintenance_interval_months: request.maintenance_interval_months,
            description: request.description,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&vehicle_type).await?;
        Ok(ApiResponse::success_with_message(created, "Vehicle type created"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiResponse<VehicleType>, AppError> {
        let found = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle type", id))?;
        Ok(ApiResponse::success(found))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateVehicleTypeRequest) -> Result<ApiResponse<VehicleType>, AppError> {
        actor.require_staff("update vehicle types")?;
        request.validate()?;

        let mut vehicle_type = live(self.repository.find_by_id(id).await?, |v| v.audit.is_deleted, "Vehicle type", id)?;
        if let Some(model_name) = request.model_name {
            vehicle_type.model_name = model_name;
        }
        if let Some(manufacturer) = request.manufacturer {
            vehicle_type.manufacturer = manufacturer;
        }
        if request.model_year.is_some() {
            vehicle_type.model_year = request.model_year;
        }
        if let Some(capacity) = request.battery_capacity_kwh {
            ensure_non_negative("battery_capacity_kwh", capacity)?;
            vehicle_type.battery_capacity_kwh = Some(capacity);
        }
        if request.maintenance_interval_km.is_some() {
            vehicle_type.maintenance_interval_km = request.maintenance_interval_km;
        }
        if request.maintenance_interval_months.is_some() {
            vehicle_type.maintenance_interval_months = request.maintenance_interval_months;
        }
        if request.description.is_some() {
            vehicle_type.description = request.description;
        }
        vehicle_type.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&vehicle_type).await?;
        Ok(ApiResponse::success_with_message(updated, "Vehicle type updated"))
    }

    pub async fn search(&self, query: &PageQuery) -> Result<ApiResponse<PageResponse<VehicleType>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (items, total) = self
            .repository
            .search(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete vehicle types")?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Vehicle type", id)?;
        Ok(ApiResponse::message("Vehicle type deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore vehicle types")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, VehicleTypeRepository::TABLE, "Vehicle type", id).await?;
        Ok(ApiResponse::message("Vehicle type restored"))
    }
}
