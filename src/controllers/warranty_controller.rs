use chrono::{NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::warranty_dto::{
    CoverageQuery, CoverageResponse, CreateWarrantyPackageRequest, CreateWarrantyPartRequest,
    UpdateWarrantyPackageRequest, UpdateWarrantyPartRequest,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::warranty::{compute_expiry, CustomerWarrantyPart, WarrantyPackage, WarrantyPart, WarrantyStatus};
use crate::repositories::vehicle_part_repository::VehiclePartRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::repositories::warranty_repository::WarrantyRepository;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::{ensure_non_negative, like_pattern};

pub struct WarrantyController {
    repository: WarrantyRepository,
    parts: VehiclePartRepository,
    vehicles: VehicleRepository,
    pool: PgPool,
}

impl WarrantyController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: WarrantyRepository::new(pool.clone()),
            parts: VehiclePartRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            pool,
        }
    }

    // ---- Paquetes ----

    pub async fn create_package(&self, actor: &AuthenticatedUser, request: CreateWarrantyPackageRequest) -> Result<ApiResponse<WarrantyPackage>, AppError> {
        actor.require_staff("create warranty packages")?;
        request.validate()?;
        ensure_non_negative("price", request.price)?;

        let package = WarrantyPackage {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            validity_months: request.validity_months,
            price: request.price.round_dp(2),
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create_package(&package).await?;
        Ok(ApiResponse::success_with_message(created, "Warranty package created"))
    }

    pub async fn get_package(&self, id: Uuid) -> Result<ApiResponse<WarrantyPackage>, AppError> {
        let found = self
            .repository
            .find_package(id)
            .await?
            .ok_or_else(|| not_found_error("Warranty package", id))?;
        Ok(ApiResponse::success(found))
    }

    pub async fn update_package(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateWarrantyPackageRequest) -> Result<ApiResponse<WarrantyPackage>, AppError> {
        actor.require_staff("update warranty packages")?;
        request.validate()?;

        let mut package = live(self.repository.find_package(id).await?, |p| p.audit.is_deleted, "Warranty package", id)?;
        if let Some(name) = request.name {
            package.name = name.trim().to_string();
        }
        if request.description.is_some() {
            package.description = request.description;
        }
        if let Some(months) = request.validity_months {
            package.validity_months = months;
        }
        if let Some(price) = request.price {
            ensure_non_negative("price", price)?;
            package.price = price.round_dp(2);
        }
        package.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update_package(&package).await?;
        Ok(ApiResponse::success_with_message(updated, "Warranty package updated"))
    }

    pub async fn search_packages(&self, query: &PageQuery) -> Result<ApiResponse<PageResponse<WarrantyPackage>>, AppError> {
        let pattern = like_pattern(query.keyword.as_deref());
        let (items, total) = self
            .repository
            .search_packages(pattern.as_deref(), query.include_deleted(), query.size(), query.offset())
            .await?;
        Ok(ApiResponse::success(PageResponse::new(items, query, total)))
    }

    pub async fn delete_package(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete warranty packages")?;
        let deleted = self.repository.soft_delete_package(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Warranty package", id)?;
        Ok(ApiResponse::message("Warranty package deleted"))
    }

    pub async fn restore_package(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore warranty packages")?;
        let restored = self.repository.restore_package(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, WarrantyRepository::PACKAGES, "Warranty package", id).await?;
        Ok(ApiResponse::message("Warranty package restored"))
    }

    // ---- Partes cubiertas por un paquete ----

    pub async fn add_part(&self, actor: &AuthenticatedUser, package_id: Uuid, request: CreateWarrantyPartRequest) -> Result<ApiResponse<WarrantyPart>, AppError> {
        actor.require_staff("edit warranty coverage")?;
        request.validate()?;

        live(self.repository.find_package(package_id).await?, |p| p.audit.is_deleted, "Warranty package", package_id)?;
        live(
            self.parts.find_by_id(request.vehicle_part_id).await?,
            |p| p.audit.is_deleted,
            "Vehicle part",
            request.vehicle_part_id,
        )?;

        let part = WarrantyPart {
            id: Uuid::new_v4(),
            warranty_package_id: package_id,
            vehicle_part_id: request.vehicle_part_id,
            coverage_percentage: request.coverage_percentage,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create_part(&part).await?;
        Ok(ApiResponse::success_with_message(created, "Part added to package"))
    }

    pub async fn list_parts(&self, package_id: Uuid, include_deleted: bool) -> Result<ApiResponse<Vec<WarrantyPart>>, AppError> {
        self.repository
            .find_package(package_id)
            .await?
            .ok_or_else(|| not_found_error("Warranty package", package_id))?;
        Ok(ApiResponse::success(self.repository.list_parts(package_id, include_deleted).await?))
    }

    pub async fn update_part(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateWarrantyPartRequest) -> Result<ApiResponse<WarrantyPart>, AppError> {
        actor.require_staff("edit warranty coverage")?;
        request.validate()?;

        let updated = self
            .repository
            .update_part_coverage(id, request.coverage_percentage, Some(actor.user_id))
            .await?
            .ok_or_else(|| not_found_error("Warranty part", id))?;
        Ok(ApiResponse::success_with_message(updated, "Coverage updated"))
    }

    pub async fn delete_part(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("edit warranty coverage")?;
        let deleted = self.repository.soft_delete_part(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Warranty part", id)?;
        Ok(ApiResponse::message("Part removed from package"))
    }

    pub async fn restore_part(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("edit warranty coverage")?;
        let restored = self.repository.restore_part(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, WarrantyRepository::PARTS, "Warranty part", id).await?;
        Ok(ApiResponse::message("Part restored to package"))
    }

    // ---- Cobertura del cliente ----

    async fn owned_vehicle(&self, actor: &AuthenticatedUser, vehicle_id: Uuid) -> Result<(), AppError> {
        let vehicle = self
            .vehicles
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;
        if !actor.is_staff() && vehicle.customer_id != actor.user_id {
            return Err(not_found_error("Vehicle", vehicle_id));
        }
        Ok(())
    }

    pub async fn list_for_vehicle(&self, actor: &AuthenticatedUser, vehicle_id: Uuid) -> Result<ApiResponse<Vec<CustomerWarrantyPart>>, AppError> {
        self.owned_vehicle(actor, vehicle_id).await?;
        Ok(ApiResponse::success(self.repository.list_for_vehicle(vehicle_id).await?))
    }

    pub async fn list_for_customer(&self, actor: &AuthenticatedUser, customer_id: Option<Uuid>) -> Result<ApiResponse<Vec<CustomerWarrantyPart>>, AppError> {
        let customer_id = match customer_id {
            Some(id) if id != actor.user_id => {
                actor.require_staff("view other customers' warranties")?;
                id
            }
            _ => actor.user_id,
        };
        Ok(ApiResponse::success(self.repository.list_for_customer(customer_id).await?))
    }

    pub async fn coverage(&self, actor: &AuthenticatedUser, query: CoverageQuery) -> Result<ApiResponse<CoverageResponse>, AppError> {
        self.owned_vehicle(actor, query.vehicle_id).await?;
        let on = query.on.unwrap_or_else(|| Utc::now().date_naive());
        let coverage = self
            .repository
            .best_coverage(query.vehicle_id, query.vehicle_part_id, on)
            .await?
            .unwrap_or(0);
        Ok(ApiResponse::success(CoverageResponse {
            vehicle_id: query.vehicle_id,
            vehicle_part_id: query.vehicle_part_id,
            on,
            coverage_percentage: coverage,
        }))
    }

    /// One ACTIVE coverage row per part of the package, inside the caller's transaction.
    pub async fn activate_package(
        conn: &mut PgConnection,
        customer_id: Uuid,
        vehicle_id: Uuid,
        package_id: Uuid,
        install_date: NaiveDate,
    ) -> Result<Vec<CustomerWarrantyPart>, AppError> {
        let package = WarrantyRepository::find_package_conn(&mut *conn, package_id)
            .await?
            .ok_or_else(|| not_found_error("Warranty package", package_id))?;
        let expiry_date = compute_expiry(install_date, package.validity_months)
            .ok_or_else(|| AppError::Internal(format!("Invalid validity for package {}", package_id)))?;

        let parts = WarrantyRepository::list_parts_conn(&mut *conn, package_id).await?;
        let mut activated = Vec::with_capacity(parts.len());
        for part in parts {
            let row = CustomerWarrantyPart {
                id: Uuid::new_v4(),
                customer_id,
                vehicle_id,
                warranty_part_id: part.id,
                vehicle_part_id: part.vehicle_part_id,
                install_date,
                expiry_date,
                status: WarrantyStatus::Active,
                audit: Audit::new(None),
            };
            activated.push(WarrantyRepository::insert_customer_part(&mut *conn, &row).await?);
        }

        info!(%customer_id, %vehicle_id, %package_id, parts = activated.len(), "Warranty activated");
        Ok(activated)
    }
}
