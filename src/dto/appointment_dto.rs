use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::appointment::{Appointment, AppointmentStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub vehicle_id: Uuid,
    /// Staff booking for a customer; ignored for customers.
    pub customer_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub service_type_ids: Vec<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignTechnicianRequest {
    pub technician_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub customer_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub service_type_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentResponse {
    pub fn from_appointment(appointment: Appointment, service_type_ids: Vec<Uuid>) -> Self {
        Self {
            id: appointment.id,
            customer_id: appointment.customer_id,
            vehicle_id: appointment.vehicle_id,
            technician_id: appointment.technician_id,
            assignee_id: appointment.assignee_id,
            scheduled_at: appointment.scheduled_at,
            status: appointment.status,
            notes: appointment.notes,
            service_type_ids,
            created_at: appointment.audit.created_at,
            updated_at: appointment.audit.updated_at,
        }
    }
}
