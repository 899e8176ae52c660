use std::collections::HashSet;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{deleted_or_not_found, live};
use crate::dto::common_dto::ApiResponse;
use crate::dto::shift_dto::{AvailabilityQuery, CreateShiftRequest, ShiftFilter, UpdateShiftRequest};
use crate::dto::user_dto::UserResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::audit::Audit;
use crate::models::role::RoleName;
use crate::models::shift::{find_conflict, Shift, ShiftStatus};
use crate::repositories::appointment_repository::AppointmentRepository;
use crate::repositories::shift_repository::ShiftRepository;
use crate::repositories::user_repository::UserRepository;
use crate::utils::errors::{forbidden_error, not_found_error, AppError};

fn conflict_with(technician_id: Uuid, shift: &Shift) -> AppError {
    AppError::Conflict(format!(
        "Technician {} already has shift {} from {} to {}",
        technician_id, shift.id, shift.start_time, shift.end_time
    ))
}

pub struct ShiftController {
    repository: ShiftRepository,
    users: UserRepository,
    appointments: AppointmentRepository,
    pool: PgPool,
}

impl ShiftController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ShiftRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            appointments: AppointmentRepository::new(pool.clone()),
            pool,
        }
    }

    async fn require_technician(&self, technician_id: Uuid) -> Result<(), AppError> {
        let user = live(self.users.find_by_id(technician_id).await?, |u| u.audit.is_deleted, "User", technician_id)?;
        if !user.is_active || !self.users.has_role(technician_id, RoleName::Technician.as_str()).await? {
            return Err(AppError::BadRequest(format!("User {} is not an active technician", technician_id)));
        }
        Ok(())
    }

    pub async fn create(&self, actor: &AuthenticatedUser, request: CreateShiftRequest) -> Result<ApiResponse<Shift>, AppError> {
        actor.require_staff("schedule shifts")?;
        request.validate()?;
        self.require_technician(request.technician_id).await?;
        if let Some(appointment_id) = request.appointment_id {
            live(self.appointments.find_by_id(appointment_id).await?, |a| a.audit.is_deleted, "Appointment", appointment_id)?;
        }

        let shift = Shift {
            id: Uuid::new_v4(),
            technician_id: request.technician_id,
            appointment_id: request.appointment_id,
            start_time: request.start_time,
            end_time: request.end_time,
            status: ShiftStatus::Scheduled,
            notes: request.notes,
            audit: Audit::new(Some(actor.user_id)),
        };

        let mut tx = self.pool.begin().await?;
        ShiftRepository::lock_technician(&mut *tx, shift.technician_id).await?;
        let existing = ShiftRepository::blocking_in_window(&mut *tx, shift.technician_id, shift.start_time, shift.end_time).await?;
        if let Some(conflict) = find_conflict(&existing, shift.start_time, shift.end_time, None) {
            return Err(conflict_with(shift.technician_id, conflict));
        }
        let created = ShiftRepository::insert(&mut *tx, &shift).await?;
        tx.commit().await?;

        info!(shift_id = %created.id, technician_id = %created.technician_id, "Shift scheduled");
        Ok(ApiResponse::success_with_message(created, "Shift scheduled"))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<Shift>, AppError> {
        let shift = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Shift", id))?;
        if !actor.is_staff() && shift.technician_id != actor.user_id {
            return Err(not_found_error("Shift", id));
        }
        Ok(ApiResponse::success(shift))
    }

    /// Only SCHEDULED shifts can be moved; the new window is re-checked.
    pub async fn update(&self, actor: &AuthenticatedUser, id: Uuid, request: UpdateShiftRequest) -> Result<ApiResponse<Shift>, AppError> {
        actor.require_staff("update shifts")?;
        request.validate()?;

        let mut shift = live(self.repository.find_by_id(id).await?, |s| s.audit.is_deleted, "Shift", id)?;
        if shift.status != ShiftStatus::Scheduled {
            return Err(AppError::InvalidState(format!(
                "Shift {} is {:?}, only scheduled shifts can be changed",
                id, shift.status
            )));
        }
        if let Some(start) = request.start_time {
            shift.start_time = start;
        }
        if let Some(end) = request.end_time {
            shift.end_time = end;
        }
        if request.notes.is_some() {
            shift.notes = request.notes;
        }
        if shift.start_time >= shift.end_time {
            return Err(AppError::BadRequest("start_time must be before end_time".to_string()));
        }
        shift.audit.updated_by = Some(actor.user_id);

        let mut tx = self.pool.begin().await?;
        ShiftRepository::lock_technician(&mut *tx, shift.technician_id).await?;
        let existing = ShiftRepository::blocking_in_window(&mut *tx, shift.technician_id, shift.start_time, shift.end_time).await?;
        if let Some(conflict) = find_conflict(&existing, shift.start_time, shift.end_time, Some(id)) {
            return Err(conflict_with(shift.technician_id, conflict));
        }
        let updated = ShiftRepository::update(&mut *tx, &shift).await?;
        tx.commit().await?;

        Ok(ApiResponse::success_with_message(updated, "Shift updated"))
    }

    pub async fn cancel(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<Shift>, AppError> {
        actor.require_staff("cancel shifts")?;
        let shift = live(self.repository.find_by_id(id).await?, |s| s.audit.is_deleted, "Shift", id)?;
        if !matches!(shift.status, ShiftStatus::Scheduled | ShiftStatus::InProgress) {
            return Err(AppError::InvalidState(format!("Shift {} is already {:?}", id, shift.status)));
        }
        let cancelled = self.repository.set_status(id, ShiftStatus::Cancelled, Some(actor.user_id)).await?;
        info!(shift_id = %id, "Shift cancelled");
        Ok(ApiResponse::success_with_message(cancelled, "Shift cancelled"))
    }

    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<()>, AppError> {
        actor.require_staff("delete shifts")?;
        let deleted = self.repository.soft_delete(id, Some(actor.user_id)).await?;
        deleted_or_not_found(deleted, "Shift", id)?;
        Ok(ApiResponse::message("Shift deleted"))
    }

    /// Technicians only see their own schedule.
    pub async fn list(&self, actor: &AuthenticatedUser, filter: ShiftFilter) -> Result<ApiResponse<Vec<Shift>>, AppError> {
        let technician_id = if actor.is_staff() {
            filter.technician_id
        } else if actor.is_technician() {
            Some(actor.user_id)
        } else {
            return Err(forbidden_error("list shifts", "only staff and technicians"));
        };
        let shifts = self.repository.list(technician_id, filter.from, filter.to).await?;
        Ok(ApiResponse::success(shifts))
    }

    pub async fn list_by_appointment(&self, actor: &AuthenticatedUser, appointment_id: Uuid) -> Result<ApiResponse<Vec<Shift>>, AppError> {
        actor.require_staff("list appointment shifts")?;
        Ok(ApiResponse::success(self.repository.list_by_appointment(appointment_id).await?))
    }

    /// Active technicians with no blocking shift in `[start, end)`.
    pub async fn available_technicians(&self, actor: &AuthenticatedUser, query: AvailabilityQuery) -> Result<ApiResponse<Vec<UserResponse>>, AppError> {
        actor.require_staff("check technician availability")?;
        if query.start >= query.end {
            return Err(AppError::BadRequest("start must be before end".to_string()));
        }

        let busy: HashSet<Uuid> = self
            .repository
            .busy_technicians(query.start, query.end)
            .await?
            .into_iter()
            .collect();
        let available = self
            .users
            .list_by_role(RoleName::Technician.as_str())
            .await?
            .into_iter()
            .filter(|u| u.is_active && !busy.contains(&u.id))
            .map(|u| UserResponse::from_user(u, vec![RoleName::Technician.as_str().to_string()]))
            .collect();
        Ok(ApiResponse::success(available))
    }
}
