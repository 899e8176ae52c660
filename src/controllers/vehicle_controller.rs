use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::role::RoleName;
use crate::models::vehicle::Vehicle;
use crate::repositories::user_repository::UserRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::repositories::vehicle_type_repository::VehicleTypeRepository;
use crate::utils::errors::{bad_request_error, forbidden_error, not_found_error, AppError};
use crate::utils::validation::like_pattern;

pub struct VehicleController {
    repository: VehicleRepository,
    vehicle_types: VehicleTypeRepository,
    users: UserRepository,
    pool: PgPool,
}

impl VehicleController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: VehicleRepository::new(pool.clone()),
            vehicle_types: VehicleTypeRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Staff see every vehicle, customers only their own.
    async fn visible(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<Vehicle, AppError> {
        let vehicle = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", id))?;
        if !actor.is_staff() && vehicle.customer_id != actor.user_id {
            return Err(not_found_error("Vehicle", id));
        }
        Ok(vehicle)
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateVehicleRequest) -> Result<ApiResponse<Vehicle>, AppError> {
        request.validate()?;

        let customer_id = if actor.is_staff() {
            request
                .customer_id
                .ok_or_else(|| bad_request_error("customer_id is required when registering on behalf of a customer"))?
        } else {
            match request.customer_id {
                Some(id) if id != actor.user_id => {
                    return Err(forbidden_error("register vehicle", "customers can only register their own vehicles"))
                }
                _ => actor.user_id,
            }
        };
        if !self.users.has_role(customer_id, RoleName::Customer.as_str()).await? {
            return Err(not_found_error("Customer", customer_id));
        }
        live(
            self.vehicle_types.find_by_id(request.vehicle_type_id).await?,
            |t| t.audit.is_deleted,
            "Vehicle type",
            request.vehicle_type_id,
        )?;

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            vin: request.vin.trim().to_uppercase(),
            license_plate: request.license_plate.trim().to_uppercase(),
            vehicle_type_id: request.vehicle_type_id,
            customer_id,
            mileage_km: request.mileage_km.unwrap_or(0),
            purchase_date: request.purchase_date,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create(&vehicle).await?;
        Ok(ApiResponse::success_with_message(created, "Vehicle registered"))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<Vehicle>, AppError> {
        Ok(ApiResponse::success(self.visible(actor, id).await?))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateVehicleRequest) -> Result<ApiResponse<Vehicle>, AppError> {
        request.validate()?;

        let vehicle = self.visible(actor, id).await?;
        let mut vehicle = live(Some(vehicle), |v| v.audit.is_deleted, "Vehicle", id)?;
        if let Some(plate) = request.license_plate {
            vehicle.license_plate = plate.trim().to_uppercase();
        }
        if let Some(type_id) = request.vehicle_type_id {
            live(self.vehicle_types.find_by_id(type_id).await?, |t| t.audit.is_deleted, "Vehicle type", type_id)?;
            vehicle.vehicle_type_id = type_id;
        }
        if let Some(mileage) = request.mileage_km {
            if mileage < vehicle.mileage_km && !actor.is_staff() {
                return Err(bad_request_error("Mileage cannot decrease"));
            }
            vehicle.mileage_km = mileage;
        }
        if request.purchase_date.is_some() {
            vehicle.purchase_date = request.purchase_date;
        }
        vehicle.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update(&vehicle).await?;
        Ok(ApiResponse::success_with_message(updated, "Vehicle updated"))
    }

    pub async fn search(&self, actor: &AuthenticatedUser, query: &PageQuery) -> Result<ApiResponse<PageResponse<Vehicle>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let owner = if actor.is_staff() { None } else { Some(actor.user_id) };
        let include_deleted = actor.is_staff() && query.include_deleted();
        let (items, total) = self
            .repository
            .search(pattern.as_deref(), owner, include_deleted, query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        self.visible(actor, id).await?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Vehicle", id)?;
        Ok(ApiResponse::message("Vehicle deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore vehicles")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, VehicleRepository::TABLE, "Vehicle", id).await?;
        Ok(ApiResponse::message("Vehicle restored"))
    }
}
