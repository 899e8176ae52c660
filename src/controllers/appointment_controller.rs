use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::invoice_controller::{InvoiceController, InvoiceTerms};
use crate::controllers::{deleted_or_not_found, live, restored_or_error};
use crate::dto::appointment_dto::{
    AppointmentFilter, AppointmentResponse, AssignTechnicianRequest, CreateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::audit::Audit;
use crate::models::invoice::Invoice;
use crate::models::maintenance::{all_completed, MaintenanceManagement, MaintenanceStatus};
use crate::models::role::RoleName;
use crate::models::service_type::ServiceType;
use crate::models::shift::{Shift, ShiftStatus};
use crate::repositories::appointment_repository::{AppointmentRepository, AppointmentSearch};
use crate::repositories::maintenance_repository::MaintenanceRepository;
use crate::repositories::service_type_repository::ServiceTypeRepository;
use crate::repositories::shift_repository::ShiftRepository;
use crate::repositories::user_repository::UserRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::services::email_service::{Email, EmailService};
use crate::services::metrics::Metrics;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, not_found_error, AppError};

/// Time a technician is blocked for: the sum of the booked services.
pub fn service_window(scheduled_at: DateTime<Utc>, services: &[ServiceType]) -> (DateTime<Utc>, DateTime<Utc>) {
    let minutes: i64 = services
        .iter()
        .map(|s| i64::from(s.estimated_duration_minutes.max(0)))
        .sum();
    (scheduled_at, scheduled_at + Duration::minutes(minutes.max(1)))
}

fn transition_error(appointment: &Appointment, next: AppointmentStatus) -> AppError {
    AppError::InvalidState(format!(
        "Appointment {} cannot move from {:?} to {:?}",
        appointment.id, appointment.status, next
    ))
}

pub struct AppointmentController {
    repository: AppointmentRepository,
    vehicles: VehicleRepository,
    service_types: ServiceTypeRepository,
    users: UserRepository,
    terms: InvoiceTerms,
    email: Arc<EmailService>,
    metrics: Arc<Metrics>,
    pool: PgPool,
}

impl AppointmentController {
    pub fn new(state: &AppState) -> Self {
        let pool = state.pool.clone();
        Self {
            repository: AppointmentRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            service_types: ServiceTypeRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            terms: InvoiceTerms::from_state(state),
            email: Arc::clone(&state.email),
            metrics: Arc::clone(&state.metrics),
            pool,
        }
    }

    async fn to_response(&self, appointment: Appointment) -> Result<AppointmentResponse, AppError> {
        let ids = self.repository.service_type_ids(appointment.id).await?;
        Ok(AppointmentResponse::from_appointment(appointment, ids))
    }

    /// Staff see every appointment, technicians the ones assigned to them,
    /// customers their own. Anything else looks missing.
    pub(crate) fn can_view(actor: &AuthenticatedUser, appointment: &Appointment) -> bool {
        actor.is_staff()
            || appointment.customer_id == actor.user_id
            || (actor.is_technician() && appointment.technician_id == Some(actor.user_id))
    }

    async fn visible(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<Appointment, AppError> {
        let appointment = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", id))?;
        if !Self::can_view(actor, &appointment) {
            return Err(not_found_error("Appointment", id));
        }
        Ok(appointment)
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateAppointmentRequest) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        request.validate()?;

        let customer_id = if actor.is_staff() {
            request
                .customer_id
                .ok_or_else(|| AppError::BadRequest("customer_id is required when staff book an appointment".to_string()))?
        } else if actor.has_role(RoleName::Customer) {
            actor.user_id
        } else {
            return Err(forbidden_error("book appointment", "only customers and staff can book"));
        };

        if request.scheduled_at <= Utc::now() {
            return Err(AppError::BadRequest("scheduled_at must be in the future".to_string()));
        }

        let vehicle = live(self.vehicles.find_by_id(request.vehicle_id).await?, |v| v.audit.is_deleted, "Vehicle", request.vehicle_id)?;
        if vehicle.customer_id != customer_id {
            return Err(AppError::BadRequest(format!(
                "Vehicle {} does not belong to customer {}",
                vehicle.id, customer_id
            )));
        }

        let mut ids = request.service_type_ids.clone();
        ids.sort();
        ids.dedup();
        let services = self.service_types.find_bookable(&ids).await?;
        let found: HashSet<Uuid> = services.iter().map(|s| s.id).collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(AppError::BadRequest(format!("Service type {} is not available for booking", missing)));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            customer_id,
            vehicle_id: vehicle.id,
            technician_id: None,
            assignee_id: None,
            scheduled_at: request.scheduled_at,
            status: AppointmentStatus::Pending,
            notes: request.notes,
            audit: Audit::new(Some(actor.user_id)),
        };
        let created = self.repository.create_with_services(&appointment, &ids).await?;
        self.metrics.appointments_created.inc();
        info!(appointment_id = %created.id, %customer_id, services = ids.len(), "Appointment booked");

        if let Some(customer) = self.users.find_by_id(customer_id).await? {
            let names: Vec<String> = services.iter().map(|s| s.name.clone()).collect();
            self.email
                .dispatch(Email::appointment_booked(&customer.email, created.scheduled_at, &names));
        }

        let response = AppointmentResponse::from_appointment(created, ids);
        Ok(ApiResponse::success_with_message(response, "Appointment booked"))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let appointment = self.visible(actor, id).await?;
        Ok(ApiResponse::success(self.to_response(appointment).await?))
    }

    pub async fn search(&self, actor: &AuthenticatedUser, filter: AppointmentFilter) -> Result<ApiResponse<PageResponse<AppointmentResponse>>, AppError> {
        let mut search = AppointmentSearch {
            status: filter.status,
            customer_id: filter.customer_id,
            technician_id: filter.technician_id,
            from: filter.from,
            to: filter.to,
            include_deleted: false,
        };
        if !actor.is_staff() {
            if actor.is_technician() {
                search.technician_id = Some(actor.user_id);
            } else {
                search.customer_id = Some(actor.user_id);
            }
        }

        let page = PageQuery { page: filter.page, size: filter.size, ..Default::default() };
        let (appointments, total) = self.repository.search(&search, page.size(), page.offset()).await?;

        let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();
        let mut services = self.repository.service_type_ids_for(&ids).await?;
        let content = appointments
            .into_iter()
            .map(|a| {
                let service_ids = services.remove(&a.id).unwrap_or_default();
                AppointmentResponse::from_appointment(a, service_ids)
            })
            .collect();
        Ok(ApiResponse::success(PageResponse::new(content, &page, total)))
    }

    /// PENDING -> CONFIRMED. The confirming staff member becomes the assignee
    /// and every booked service gets a pending work order priced at its list price.
    pub async fn confirm(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        actor.require_staff("confirm appointments")?;
        let services = self.repository.service_types(id).await?;

        let mut tx = self.pool.begin().await?;
        let appointment = Self::lock_live(&mut *tx, id).await?;
        if !appointment.status.can_transition_to(AppointmentStatus::Confirmed) {
            return Err(transition_error(&appointment, AppointmentStatus::Confirmed));
        }

        AppointmentRepository::update_status(&mut *tx, id, AppointmentStatus::Confirmed, Some(actor.user_id)).await?;
        let confirmed = AppointmentRepository::set_assignee(&mut *tx, id, actor.user_id, Some(actor.user_id)).await?;

        for service in &services {
            let management = MaintenanceManagement {
                id: Uuid::new_v4(),
                appointment_id: id,
                service_type_id: service.id,
                technician_id: confirmed.technician_id,
                status: MaintenanceStatus::Pending,
                started_at: None,
                completed_at: None,
                labor_cost: service.price,
                parts_cost: Decimal::ZERO,
                total_cost: service.price,
                notes: None,
                audit: Audit::new(Some(actor.user_id)),
            };
            MaintenanceRepository::insert_management(&mut *tx, &management).await?;
        }
        tx.commit().await?;

        info!(appointment_id = %id, work_orders = services.len(), "Appointment confirmed");
        Ok(ApiResponse::success_with_message(self.to_response(confirmed).await?, "Appointment confirmed"))
    }

    /// Books the technician for the whole service window. A previous open
    /// shift for this appointment is cancelled in the same transaction.
    pub async fn assign_technician(&self, actor: &AuthenticatedUser, id: Uuid, request: AssignTechnicianRequest) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        actor.require_staff("assign technicians")?;
        let technician_id = request.technician_id;

        let technician = live(self.users.find_by_id(technician_id).await?, |u| u.audit.is_deleted, "User", technician_id)?;
        if !technician.is_active || !self.users.has_role(technician_id, RoleName::Technician.as_str()).await? {
            return Err(AppError::BadRequest(format!("User {} is not an active technician", technician_id)));
        }
        let services = self.repository.service_types(id).await?;

        let mut tx = self.pool.begin().await?;
        let appointment = Self::lock_live(&mut *tx, id).await?;
        if !appointment.status.accepts_assignment() {
            return Err(AppError::InvalidState(format!(
                "Appointment {} is {:?}, technicians can only be assigned before work starts",
                id, appointment.status
            )));
        }

        let (start, end) = service_window(appointment.scheduled_at, &services);
        ShiftRepository::lock_technician(&mut *tx, technician_id).await?;
        let blocking = ShiftRepository::blocking_in_window(&mut *tx, technician_id, start, end).await?;
        if let Some(conflict) = blocking.iter().find(|s| s.appointment_id != Some(id)) {
            return Err(AppError::Conflict(format!(
                "Technician {} already has shift {} from {} to {}",
                technician_id, conflict.id, conflict.start_time, conflict.end_time
            )));
        }

        ShiftRepository::transition_for_appointment(
            &mut *tx,
            id,
            &[ShiftStatus::Scheduled],
            ShiftStatus::Cancelled,
            Some(actor.user_id),
        )
        .await?;
        let shift = Shift {
            id: Uuid::new_v4(),
            technician_id,
            appointment_id: Some(id),
            start_time: start,
            end_time: end,
            status: ShiftStatus::Scheduled,
            notes: None,
            audit: Audit::new(Some(actor.user_id)),
        };
        ShiftRepository::insert(&mut *tx, &shift).await?;

        let updated = AppointmentRepository::set_technician(&mut *tx, id, technician_id, Some(actor.user_id)).await?;
        MaintenanceRepository::assign_technician(&mut *tx, id, technician_id, Some(actor.user_id)).await?;
        tx.commit().await?;

        info!(appointment_id = %id, %technician_id, %start, %end, "Technician assigned");
        Ok(ApiResponse::success_with_message(self.to_response(updated).await?, "Technician assigned"))
    }

    pub async fn update_status(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateAppointmentStatusRequest) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        actor.require_staff("change appointment status")?;
        match request.status {
            AppointmentStatus::Confirmed => self.confirm(actor, id).await,
            AppointmentStatus::Cancelled => self.cancel(actor, id).await,
            AppointmentStatus::InProgress => self.start(actor, id).await,
            AppointmentStatus::Completed => self.complete(actor, id).await,
            AppointmentStatus::Pending => {
                let appointment = self.visible(actor, id).await?;
                Err(transition_error(&appointment, AppointmentStatus::Pending))
            }
        }
    }

    async fn start(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let mut tx = self.pool.begin().await?;
        let appointment = Self::lock_live(&mut *tx, id).await?;
        if !appointment.status.can_transition_to(AppointmentStatus::InProgress) {
            return Err(transition_error(&appointment, AppointmentStatus::InProgress));
        }
        let updated = AppointmentRepository::update_status(&mut *tx, id, AppointmentStatus::InProgress, Some(actor.user_id)).await?;
        tx.commit().await?;
        Ok(ApiResponse::success_with_message(self.to_response(updated).await?, "Appointment started"))
    }

    /// Manual completion is only allowed once every work order is done.
    async fn complete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let mut tx = self.pool.begin().await?;
        let appointment = Self::lock_live(&mut *tx, id).await?;
        if !appointment.status.can_transition_to(AppointmentStatus::Completed) {
            return Err(transition_error(&appointment, AppointmentStatus::Completed));
        }
        let managements = MaintenanceRepository::list_by_appointment_conn(&mut *tx, id).await?;
        if !all_completed(&managements) {
            return Err(AppError::InvalidState(format!(
                "Appointment {} still has unfinished work orders",
                id
            )));
        }

        let (updated, invoice) = Self::finish(&mut *tx, &appointment, &self.terms, Some(actor.user_id)).await?;
        tx.commit().await?;

        if let Some(invoice) = invoice {
            self.metrics.invoices_generated.inc();
            info!(appointment_id = %id, invoice_id = %invoice.id, "Appointment completed and invoiced");
        }
        Ok(ApiResponse::success_with_message(self.to_response(updated).await?, "Appointment completed"))
    }

    /// Marks the appointment COMPLETED, closes its open shifts and issues the
    /// service invoice. Returns the invoice only when it was created here.
    pub(crate) async fn finish(
        conn: &mut PgConnection,
        appointment: &Appointment,
        terms: &InvoiceTerms,
        actor: Option<Uuid>,
    ) -> Result<(Appointment, Option<Invoice>), AppError> {
        let updated = AppointmentRepository::update_status(&mut *conn, appointment.id, AppointmentStatus::Completed, actor).await?;
        ShiftRepository::transition_for_appointment(
            &mut *conn,
            appointment.id,
            &[ShiftStatus::Scheduled, ShiftStatus::InProgress],
            ShiftStatus::Completed,
            actor,
        )
        .await?;
        let (invoice, created) = InvoiceController::service_invoice(&mut *conn, &updated, terms).await?;
        Ok((updated, created.then_some(invoice)))
    }

    /// Customers may cancel their own bookings; staff any that has not started.
    pub async fn cancel(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let mut tx = self.pool.begin().await?;
        let appointment = Self::lock_live(&mut *tx, id).await?;
        if !actor.is_staff() && appointment.customer_id != actor.user_id {
            return Err(not_found_error("Appointment", id));
        }
        if !appointment.status.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(transition_error(&appointment, AppointmentStatus::Cancelled));
        }

        let updated = AppointmentRepository::update_status(&mut *tx, id, AppointmentStatus::Cancelled, Some(actor.user_id)).await?;
        let released = ShiftRepository::transition_for_appointment(
            &mut *tx,
            id,
            &[ShiftStatus::Scheduled],
            ShiftStatus::Cancelled,
            Some(actor.user_id),
        )
        .await?;
        tx.commit().await?;

        info!(appointment_id = %id, shifts_released = released, "Appointment cancelled");
        Ok(ApiResponse::success_with_message(self.to_response(updated).await?, "Appointment cancelled"))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete appointments")?;
        if let Some(appointment) = self.repository.find_by_id(id).await? {
            if appointment.status == AppointmentStatus::InProgress {
                return Err(AppError::InvalidState(format!("Appointment {} is in progress", id)));
            }
        }
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Appointment", id)?;
        Ok(ApiResponse::message("Appointment deleted"))
    }

    pub async fn restore(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("restore appointments")?;
        let restored = self.repository.restore(id, Some(actor.user_id)).await?;
        restored_or_error(restored, &self.pool, AppointmentRepository::TABLE, "Appointment", id).await?;
        Ok(ApiResponse::message("Appointment restored"))
    }

    async fn lock_live(conn: &mut PgConnection, id: Uuid) -> Result<Appointment, AppError> {
        AppointmentRepository::lock_by_id(conn, id)
            .await?
            .filter(|a| !a.audit.is_deleted)
            .ok_or_else(|| not_found_error("Appointment", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service(minutes: i32) -> ServiceType {
        ServiceType {
            id: Uuid::new_v4(),
            name: format!("{} min service", minutes),
            description: None,
            estimated_duration_minutes: minutes,
            price: Decimal::from(100_000),
            is_active: true,
            audit: Audit::new(None),
        }
    }

    fn actor(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn appointment(customer_id: Uuid, technician_id: Option<Uuid>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            customer_id,
            vehicle_id: Uuid::new_v4(),
            technician_id,
            assignee_id: None,
            scheduled_at: Utc::now(),
            status: AppointmentStatus::Pending,
            notes: None,
            audit: Audit::new(None),
        }
    }

    #[test]
    fn test_service_window_sums_durations() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let (start, end) = service_window(at, &[service(60), service(45)]);
        assert_eq!(start, at);
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 1, 9, 45, 0).unwrap());
    }

    #[test]
    fn test_service_window_never_empty() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let (start, end) = service_window(at, &[]);
        assert!(start < end);
    }

    #[test]
    fn test_visibility_rules() {
        let customer = actor(&["CUSTOMER"]);
        let technician = actor(&["TECHNICIAN"]);
        let staff = actor(&["STAFF"]);
        let stranger = actor(&["CUSTOMER"]);

        let own = appointment(customer.user_id, Some(technician.user_id));
        assert!(AppointmentController::can_view(&customer, &own));
        assert!(AppointmentController::can_view(&technician, &own));
        assert!(AppointmentController::can_view(&staff, &own));
        assert!(!AppointmentController::can_view(&stranger, &own));

        let unassigned = appointment(customer.user_id, None);
        assert!(!AppointmentController::can_view(&technician, &unassigned));
    }
}
