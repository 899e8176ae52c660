use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::appointment_controller::AppointmentController;
use crate::controllers::invoice_controller::InvoiceTerms;
use crate::controllers::{deleted_or_not_found, live};
use crate::dto::common_dto::ApiResponse;
use crate::dto::maintenance_dto::{
    ApproveRecordRequest, CreateMaintenanceRecordRequest, MaintenanceResponse,
    UpdateMaintenanceRecordRequest, UpdateMaintenanceRequest,
};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::audit::Audit;
use crate::models::maintenance::{
    all_completed, compute_costs, MaintenanceManagement, MaintenanceRecord, MaintenanceStatus,
};
use crate::repositories::appointment_repository::AppointmentRepository;
use crate::repositories::maintenance_repository::MaintenanceRepository;
use crate::repositories::vehicle_part_repository::VehiclePartRepository;
use crate::repositories::warranty_repository::WarrantyRepository;
use crate::services::metrics::Metrics;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, not_found_error, AppError};
use crate::utils::validation::ensure_non_negative;

fn locked_error(management: &MaintenanceManagement) -> AppError {
    AppError::InvalidState(format!(
        "Work order {} is {:?} and can no longer be edited",
        management.id, management.status
    ))
}

pub struct MaintenanceController {
    repository: MaintenanceRepository,
    appointments: AppointmentRepository,
    parts: VehiclePartRepository,
    warranties: WarrantyRepository,
    terms: InvoiceTerms,
    metrics: Arc<Metrics>,
    pool: PgPool,
}

impl MaintenanceController {
    pub fn new(state: &AppState) -> Self {
        let pool = state.pool.clone();
        Self {
            repository: MaintenanceRepository::new(pool.clone()),
            appointments: AppointmentRepository::new(pool.clone()),
            parts: VehiclePartRepository::new(pool.clone()),
            warranties: WarrantyRepository::new(pool.clone()),
            terms: InvoiceTerms::from_state(state),
            metrics: Arc::clone(&state.metrics),
            pool,
        }
    }

    async fn appointment_of(&self, actor: &AuthenticatedUser, appointment_id: Uuid) -> Result<Appointment, AppError> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", appointment_id))?;
        if !AppointmentController::can_view(actor, &appointment) {
            return Err(not_found_error("Appointment", appointment_id));
        }
        Ok(appointment)
    }

    async fn management(&self, id: Uuid) -> Result<MaintenanceManagement, AppError> {
        self.repository
            .find_management(id)
            .await?
            .ok_or_else(|| not_found_error("Work order", id))
    }

    /// Staff, or the technician the work order is assigned to.
    fn require_worker(actor: &AuthenticatedUser, management: &MaintenanceManagement, operation: &str) -> Result<(), AppError> {
        if actor.is_staff() || (actor.is_technician() && management.technician_id == Some(actor.user_id)) {
            Ok(())
        } else {
            Err(forbidden_error(operation, "only staff or the assigned technician"))
        }
    }

    async fn with_records(&self, management: MaintenanceManagement) -> Result<MaintenanceResponse, AppError> {
        let records = self.repository.list_records(management.id).await?;
        Ok(MaintenanceResponse { management, records })
    }

    pub async fn list_by_appointment(&self, actor: &AuthenticatedUser, appointment_id: Uuid) -> Result<ApiResponse<Vec<MaintenanceResponse>>, AppError> {
        self.appointment_of(actor, appointment_id).await?;
        let managements = self.repository.list_by_appointment(appointment_id).await?;

        let mut responses = Vec::with_capacity(managements.len());
        for management in managements {
            responses.push(self.with_records(management).await?);
        }
        Ok(ApiResponse::success(responses))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        let management = self.management(id).await?;
        self.appointment_of(actor, management.appointment_id).await?;
        Ok(ApiResponse::success(self.with_records(management).await?))
    }

    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateMaintenanceRequest) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        request.validate()?;
        if let Some(labor_cost) = request.labor_cost {
            ensure_non_negative("labor_cost", labor_cost)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut management = Self::lock(&mut *tx, id).await?;
        Self::require_worker(actor, &management, "update work order")?;
        if !management.status.is_editable() {
            return Err(locked_error(&management));
        }

        if let Some(labor_cost) = request.labor_cost {
            management.labor_cost = labor_cost.round_dp(2);
        }
        if request.notes.is_some() {
            management.notes = request.notes;
        }
        let records = MaintenanceRepository::list_records_conn(&mut *tx, id).await?;
        let (parts_cost, total_cost) = compute_costs(management.labor_cost, &records);
        management.parts_cost = parts_cost;
        management.total_cost = total_cost;
        management.audit.updated_by = Some(actor.user_id);

        let updated = MaintenanceRepository::update_management(&mut *tx, &management).await?;
        tx.commit().await?;
        Ok(ApiResponse::success_with_message(self.with_records(updated).await?, "Work order updated"))
    }

    /// PENDING -> IN_PROGRESS. The first work order started moves a confirmed
    /// appointment to IN_PROGRESS.
    pub async fn start(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut management = Self::lock(&mut *tx, id).await?;
        Self::require_worker(actor, &management, "start work order")?;
        if !management.status.can_transition_to(MaintenanceStatus::InProgress) {
            return Err(AppError::InvalidState(format!(
                "Work order {} is {:?} and cannot be started",
                id, management.status
            )));
        }
        if management.technician_id.is_none() {
            return Err(AppError::InvalidState(format!("Work order {} has no technician assigned", id)));
        }

        let appointment = AppointmentRepository::lock_by_id(&mut *tx, management.appointment_id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", management.appointment_id))?;
        match appointment.status {
            AppointmentStatus::Confirmed => {
                AppointmentRepository::update_status(&mut *tx, appointment.id, AppointmentStatus::InProgress, Some(actor.user_id)).await?;
            }
            AppointmentStatus::InProgress => {}
            status => {
                return Err(AppError::InvalidState(format!(
                    "Appointment {} is {:?}, work can only start once it is confirmed",
                    appointment.id, status
                )));
            }
        }

        management.status = MaintenanceStatus::InProgress;
        management.started_at = Some(Utc::now());
        management.audit.updated_by = Some(actor.user_id);
        let updated = MaintenanceRepository::update_management(&mut *tx, &management).await?;
        tx.commit().await?;

        info!(work_order_id = %id, appointment_id = %updated.appointment_id, "Work order started");
        Ok(ApiResponse::success_with_message(self.with_records(updated).await?, "Work order started"))
    }

    /// IN_PROGRESS -> COMPLETED. Approved parts leave the stock here; when this
    /// was the last open work order the appointment is closed and invoiced.
    pub async fn complete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<MaintenanceResponse>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut management = Self::lock(&mut *tx, id).await?;
        Self::require_worker(actor, &management, "complete work order")?;
        if !management.status.can_transition_to(MaintenanceStatus::Completed) {
            return Err(AppError::InvalidState(format!(
                "Work order {} is {:?} and cannot be completed",
                id, management.status
            )));
        }

        let records = MaintenanceRepository::list_records_conn(&mut *tx, id).await?;
        for record in records.iter().filter(|r| r.approved_by_customer) {
            let taken = VehiclePartRepository::decrement_stock(&mut *tx, record.vehicle_part_id, record.quantity_used, Some(actor.user_id)).await?;
            if !taken {
                return Err(AppError::Conflict(format!(
                    "Insufficient stock for part {} (need {})",
                    record.vehicle_part_id, record.quantity_used
                )));
            }
        }

        let (parts_cost, total_cost) = compute_costs(management.labor_cost, &records);
        management.parts_cost = parts_cost;
        management.total_cost = total_cost;
        management.status = MaintenanceStatus::Completed;
        management.completed_at = Some(Utc::now());
        management.audit.updated_by = Some(actor.user_id);
        let updated = MaintenanceRepository::update_management(&mut *tx, &management).await?;

        let invoice = Self::close_appointment_if_done(&mut *tx, updated.appointment_id, &self.terms, Some(actor.user_id)).await?;
        tx.commit().await?;

        self.metrics.maintenance_completed.inc();
        if let Some(invoice_id) = invoice {
            self.metrics.invoices_generated.inc();
            info!(work_order_id = %id, %invoice_id, "Last work order completed, appointment invoiced");
        } else {
            info!(work_order_id = %id, "Work order completed");
        }
        Ok(ApiResponse::success_with_message(self.with_records(updated).await?, "Work order completed"))
    }

    async fn close_appointment_if_done(
        conn: &mut PgConnection,
        appointment_id: Uuid,
        terms: &InvoiceTerms,
        actor: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        let managements = MaintenanceRepository::list_by_appointment_conn(&mut *conn, appointment_id).await?;
        if !all_completed(&managements) {
            return Ok(None);
        }
        let appointment = AppointmentRepository::lock_by_id(&mut *conn, appointment_id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", appointment_id))?;
        if !appointment.status.can_transition_to(AppointmentStatus::Completed) {
            return Ok(None);
        }
        let (_, invoice) = AppointmentController::finish(&mut *conn, &appointment, terms, actor).await?;
        Ok(invoice.map(|i| i.id))
    }

    // ---- Líneas de repuestos ----

    /// Adds a part line. Price and warranty coverage are frozen at this point;
    /// the line is not charged until the customer approves it.
    pub async fn add_record(&self, actor: &AuthenticatedUser, management_id: Uuid, request: CreateMaintenanceRecordRequest) -> Result<ApiResponse<MaintenanceRecord>, AppError> {
        request.validate()?;

        let management = self.management(management_id).await?;
        Self::require_worker(actor, &management, "add parts")?;
        if !management.status.is_editable() {
            return Err(locked_error(&management));
        }
        let appointment = self
            .appointments
            .find_by_id(management.appointment_id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", management.appointment_id))?;
        let part = live(self.parts.find_by_id(request.vehicle_part_id).await?, |p| p.audit.is_deleted, "Vehicle part", request.vehicle_part_id)?;

        let coverage = self
            .warranties
            .best_coverage(appointment.vehicle_id, part.id, Utc::now().date_naive())
            .await?
            .unwrap_or(0);

        let record = MaintenanceRecord {
            id: Uuid::new_v4(),
            maintenance_management_id: management_id,
            vehicle_part_id: part.id,
            quantity_used: request.quantity_used,
            unit_price: part.unit_price,
            warranty_covered: coverage > 0,
            coverage_percentage: coverage,
            approved_by_customer: false,
            notes: request.notes,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.insert_record(&record).await?;
        self.recompute(management_id, actor).await?;
        info!(work_order_id = %management_id, part_id = %part.id, coverage, "Part line added");
        Ok(ApiResponse::success_with_message(created, "Part added"))
    }

    pub async fn list_records(&self, actor: &AuthenticatedUser, management_id: Uuid) -> Result<ApiResponse<Vec<MaintenanceRecord>>, AppError> {
        let management = self.management(management_id).await?;
        self.appointment_of(actor, management.appointment_id).await?;
        Ok(ApiResponse::success(self.repository.list_records(management_id).await?))
    }

    async fn editable_record(&self, id: Uuid) -> Result<(MaintenanceRecord, MaintenanceManagement), AppError> {
        let record = self
            .repository
            .find_record(id)
            .await?
            .ok_or_else(|| not_found_error("Maintenance record", id))?;
        let management = self.management(record.maintenance_management_id).await?;
        if !management.status.is_editable() {
            return Err(locked_error(&management));
        }
        Ok((record, management))
    }

    pub async fn update_record(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateMaintenanceRecordRequest) -> Result<ApiResponse<MaintenanceRecord>, AppError> {
        request.validate()?;
        let (mut record, management) = self.editable_record(id).await?;
        Self::require_worker(actor, &management, "update parts")?;

        if let Some(quantity) = request.quantity_used {
            if quantity != record.quantity_used {
                // la cantidad aprobada cambió, el cliente debe volver a aprobar
                record.approved_by_customer = false;
            }
            record.quantity_used = quantity;
        }
        if request.notes.is_some() {
            record.notes = request.notes;
        }
        record.audit.updated_by = Some(actor.user_id);

        let updated = self.repository.update_record(&record).await?;
        self.recompute(management.id, actor).await?;
        Ok(ApiResponse::success_with_message(updated, "Part line updated"))
    }

    pub async fn remove_record(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        let (_, management) = self.editable_record(id).await?;
        Self::require_worker(actor, &management, "remove parts")?;

        let deleted = self.repository.soft_delete_record(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Maintenance record", id)?;
        self.recompute(management.id, actor).await?;
        Ok(ApiResponse::message("Part line removed"))
    }

    /// Only the customer who owns the appointment approves part lines.
    pub async fn approve_record(&self, actor: &AuthenticatedUser, id: Uuid, request: ApproveRecordRequest) -> Result<ApiResponse<MaintenanceRecord>, AppError> {
        let (mut record, management) = self.editable_record(id).await?;
        let appointment = self
            .appointments
            .find_by_id(management.appointment_id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", management.appointment_id))?;
        if appointment.customer_id != actor.user_id {
            return Err(forbidden_error("approve parts", "only the customer who owns the appointment"));
        }

        record.approved_by_customer = request.approved;
        record.audit.updated_by = Some(actor.user_id);
        let updated = self.repository.update_record(&record).await?;
        self.recompute(management.id, actor).await?;

        info!(record_id = %id, approved = request.approved, "Part line approval changed");
        Ok(ApiResponse::success_with_message(updated, "Approval recorded"))
    }

    /// Rewrites parts and total cost of a work order from its live lines.
    async fn recompute(&self, management_id: Uuid, actor: &AuthenticatedUser) -> Result<MaintenanceManagement, AppError> {
        let mut tx = self.pool.begin().await?;
        let management = Self::lock(&mut *tx, management_id).await?;
        let records = MaintenanceRepository::list_records_conn(&mut *tx, management_id).await?;
        let (parts_cost, total_cost) = compute_costs(management.labor_cost, &records);
        let updated = MaintenanceRepository::store_costs(&mut *tx, management_id, parts_cost, total_cost, Some(actor.user_id)).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<MaintenanceManagement, AppError> {
        MaintenanceRepository::lock_management(conn, id)
            .await?
            .ok_or_else(|| not_found_error("Work order", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn actor(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "worker@example.com".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn work_order(technician_id: Option<Uuid>, status: MaintenanceStatus) -> MaintenanceManagement {
        MaintenanceManagement {
            id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            service_type_id: Uuid::new_v4(),
            technician_id,
            status,
            started_at: None,
            completed_at: None,
            labor_cost: Decimal::from(200_000),
            parts_cost: Decimal::ZERO,
            total_cost: Decimal::from(200_000),
            notes: None,
            audit: Audit::new(None),
        }
    }

    #[test]
    fn test_require_worker() {
        let technician = actor(&["TECHNICIAN"]);
        let other_technician = actor(&["TECHNICIAN"]);
        let staff = actor(&["STAFF"]);
        let customer = actor(&["CUSTOMER"]);
        let order = work_order(Some(technician.user_id), MaintenanceStatus::Pending);

        assert!(MaintenanceController::require_worker(&technician, &order, "start").is_ok());
        assert!(MaintenanceController::require_worker(&staff, &order, "start").is_ok());
        assert!(matches!(
            MaintenanceController::require_worker(&other_technician, &order, "start"),
            Err(AppError::Forbidden(_))
        ));
        assert!(MaintenanceController::require_worker(&customer, &order, "start").is_err());
    }

    #[test]
    fn test_locked_error_is_invalid_state() {
        let order = work_order(None, MaintenanceStatus::Completed);
        assert!(matches!(locked_error(&order), AppError::InvalidState(_)));
    }
}
