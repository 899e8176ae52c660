use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::controllers::warranty_controller::WarrantyController;
use crate::controllers::live;
use crate::dto::common_dto::{ApiResponse, PageQuery, PageResponse};
use crate::dto::invoice_dto::{CashPaymentRequest, InvoiceFilter};
use crate::dto::warranty_dto::PurchaseWarrantyRequest;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::audit::Audit;
use crate::models::invoice::{
    apply_payment, compute_totals, generate_invoice_number, Invoice, InvoiceKind, InvoiceStatus,
    PaymentRejection,
};
use crate::models::payment::{PaymentMethodType, PaymentTransaction};
use crate::models::shift::ShiftStatus;
use crate::repositories::appointment_repository::AppointmentRepository;
use crate::repositories::invoice_repository::{InvoiceRepository, InvoiceSearch};
use crate::repositories::maintenance_repository::MaintenanceRepository;
use crate::repositories::payment_method_repository::PaymentMethodRepository;
use crate::repositories::payment_repository::PaymentRepository;
use crate::repositories::shift_repository::ShiftRepository;
use crate::repositories::user_repository::UserRepository;
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::repositories::warranty_repository::WarrantyRepository;
use crate::services::email_service::{Email, EmailService};
use crate::services::metrics::Metrics;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, not_found_error, AppError};
use crate::utils::validation::like_pattern;

/// Tax and due-date settings applied to new invoices.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceTerms {
    pub tax_rate: Decimal,
    pub due_days: i64,
}

impl InvoiceTerms {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            tax_rate: state.config.tax_rate,
            due_days: state.config.invoice_due_days,
        }
    }

    fn build(&self, kind: InvoiceKind, customer_id: Uuid, subtotal: Decimal, now: DateTime<Utc>) -> Invoice {
        let subtotal = subtotal.round_dp(2);
        let (tax_amount, total_amount) = compute_totals(subtotal, self.tax_rate);
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: generate_invoice_number(now),
            kind,
            appointment_id: None,
            customer_id,
            vehicle_id: None,
            warranty_package_id: None,
            payment_method_id: None,
            subtotal,
            tax_amount,
            total_amount,
            paid_amount: Decimal::ZERO,
            status: InvoiceStatus::Unpaid,
            issued_at: now,
            due_date: now.date_naive() + Duration::days(self.due_days),
            paid_at: None,
            audit: Audit::new(None),
        }
    }
}

pub(crate) fn rejection_error(rejection: PaymentRejection) -> AppError {
    match rejection {
        PaymentRejection::NotPayable(_) => AppError::InvalidState(rejection.to_string()),
        _ => AppError::BadRequest(rejection.to_string()),
    }
}

pub struct InvoiceController {
    repository: InvoiceRepository,
    payments: PaymentRepository,
    methods: PaymentMethodRepository,
    appointments: AppointmentRepository,
    vehicles: VehicleRepository,
    warranties: WarrantyRepository,
    users: UserRepository,
    terms: InvoiceTerms,
    email: Arc<EmailService>,
    metrics: Arc<Metrics>,
    pool: PgPool,
}

impl InvoiceController {
    pub fn new(state: &AppState) -> Self {
        let pool = state.pool.clone();
        Self {
            repository: InvoiceRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            methods: PaymentMethodRepository::new(pool.clone()),
            appointments: AppointmentRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            warranties: WarrantyRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            terms: InvoiceTerms::from_state(state),
            email: Arc::clone(&state.email),
            metrics: Arc::clone(&state.metrics),
            pool,
        }
    }

    /// Customers only reach their own invoices; others look missing.
    async fn visible(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<Invoice, AppError> {
        let invoice = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Invoice", id))?;
        if !actor.is_staff() && invoice.customer_id != actor.user_id {
            return Err(not_found_error("Invoice", id));
        }
        Ok(invoice)
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<Invoice>, AppError> {
        Ok(ApiResponse::success(self.visible(actor, id).await?))
    }

    pub async fn search(&self, actor: &AuthenticatedUser, filter: InvoiceFilter) -> Result<ApiResponse<PageResponse<Invoice>>, AppError> {
        let customer_id = if actor.is_staff() { filter.customer_id } else { Some(actor.user_id) };
        let page = PageQuery { page: filter.page, size: filter.size, ..Default::default() };

        let search = InvoiceSearch {
            status: filter.status,
            kind: filter.kind,
            customer_id,
            pattern: like_pattern(filter.keyword.as_deref()),
        };
        let (items, total) = self.repository.search(&search, page.size(), page.offset()).await?;
        Ok(ApiResponse::success(PageResponse::new(items, &page, total)))
    }

    pub async fn list_payments(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<Vec<PaymentTransaction>>, AppError> {
        self.visible(actor, id).await?;
        Ok(ApiResponse::success(self.payments.list_by_invoice(id).await?))
    }

    /// Idempotent: an appointment keeps a single service invoice.
    pub async fn generate_for_appointment(&self, actor: &AuthenticatedUser, appointment_id: Uuid) -> Result<ApiResponse<Invoice>, AppError> {
        actor.require_staff("generate invoices")?;

        let mut tx = self.pool.begin().await?;
        let appointment = AppointmentRepository::lock_by_id(&mut *tx, appointment_id)
            .await?
            .filter(|a| !a.audit.is_deleted)
            .ok_or_else(|| not_found_error("Appointment", appointment_id))?;
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "Appointment {} is {:?}, only completed appointments are invoiced",
                appointment_id, appointment.status
            )));
        }
        let (invoice, created) = Self::service_invoice(&mut *tx, &appointment, &self.terms).await?;
        tx.commit().await?;

        if created {
            self.metrics.invoices_generated.inc();
            return Ok(ApiResponse::success_with_message(invoice, "Invoice generated"));
        }
        Ok(ApiResponse::success(invoice))
    }

    /// Service invoice for a completed appointment: subtotal is the sum of its
    /// work order totals. Returns the existing invoice when there is one.
    pub async fn service_invoice(
        conn: &mut PgConnection,
        appointment: &Appointment,
        terms: &InvoiceTerms,
    ) -> Result<(Invoice, bool), AppError> {
        if let Some(existing) = InvoiceRepository::find_by_appointment(&mut *conn, appointment.id).await? {
            return Ok((existing, false));
        }

        let managements = MaintenanceRepository::list_by_appointment_conn(&mut *conn, appointment.id).await?;
        let subtotal: Decimal = managements.iter().map(|m| m.total_cost).sum();

        let mut invoice = terms.build(InvoiceKind::Service, appointment.customer_id, subtotal, Utc::now());
        invoice.appointment_id = Some(appointment.id);
        invoice.vehicle_id = Some(appointment.vehicle_id);

        let created = InvoiceRepository::insert(&mut *conn, &invoice).await?;
        info!(invoice_id = %created.id, appointment_id = %appointment.id, total = %created.total_amount, "Service invoice generated");
        Ok((created, true))
    }

    pub async fn create_warranty_purchase(&self, actor: &AuthenticatedUser, request: PurchaseWarrantyRequest) -> Result<ApiResponse<Invoice>, AppError> {
        request.validate()?;

        let vehicle = live(self.vehicles.find_by_id(request.vehicle_id).await?, |v| v.audit.is_deleted, "Vehicle", request.vehicle_id)?;
        if !actor.is_staff() && vehicle.customer_id != actor.user_id {
            return Err(not_found_error("Vehicle", request.vehicle_id));
        }
        let package = live(
            self.warranties.find_package(request.warranty_package_id).await?,
            |p| p.audit.is_deleted,
            "Warranty package",
            request.warranty_package_id,
        )?;

        let mut invoice = self.terms.build(InvoiceKind::Warranty, vehicle.customer_id, package.price, Utc::now());
        invoice.vehicle_id = Some(vehicle.id);
        invoice.warranty_package_id = Some(package.id);
        invoice.audit = Audit::new(Some(actor.user_id));

        let mut conn = self.pool.acquire().await?;
        let created = InvoiceRepository::insert(&mut conn, &invoice).await?;
        self.metrics.invoices_generated.inc();
        info!(invoice_id = %created.id, package_id = %package.id, "Warranty purchase invoiced");
        Ok(ApiResponse::success_with_message(created, "Warranty invoice created"))
    }

    pub async fn pay_cash(&self, actor: &AuthenticatedUser, id: Uuid, request: CashPaymentRequest) -> Result<ApiResponse<Invoice>, AppError> {
        actor.require_staff("record cash payments")?;

        let method_id = match request.payment_method_id {
            Some(method_id) => {
                live(self.methods.find_by_id(method_id).await?, |m| m.audit.is_deleted, "Payment method", method_id)?;
                Some(method_id)
            }
            None => self
                .methods
                .find_active_by_type(PaymentMethodType::Cash)
                .await?
                .map(|m| m.id),
        };

        let mut tx = self.pool.begin().await?;
        let invoice = Self::settle_payment(&mut *tx, id, request.amount, method_id, Some(actor.user_id)).await?;
        tx.commit().await?;

        info!(invoice_id = %invoice.id, amount = %request.amount, status = ?invoice.status, "Cash payment recorded");
        self.send_receipt(&invoice, request.amount).await;
        Ok(ApiResponse::success_with_message(invoice, "Payment recorded"))
    }

    pub async fn cancel(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<ApiResponse<Invoice>, AppError> {
        actor.require_staff("cancel invoices")?;

        // El guard va en el UPDATE: un IPN puede pagar la factura entre lectura y escritura
        if let Some(cancelled) = self.repository.cancel_unpaid(id, Some(actor.user_id)).await? {
            return Ok(ApiResponse::success_with_message(cancelled, "Invoice cancelled"));
        }

        let invoice = self
            .repository
            .find_by_id(id)
            .await?
            .filter(|invoice| !invoice.audit.is_deleted)
            .ok_or_else(|| not_found_error("Invoice", id))?;
        Err(AppError::InvalidState(format!(
            "Invoice {} is {:?}, only unpaid invoices can be cancelled",
            id, invoice.status
        )))
    }

    /// Applies `amount` to the invoice inside the caller's transaction.
    ///
    /// Reaching PAID closes the appointment's shifts for service invoices and
    /// activates coverage for warranty purchases.
    pub async fn settle_payment(
        conn: &mut PgConnection,
        invoice_id: Uuid,
        amount: Decimal,
        payment_method_id: Option<Uuid>,
        actor: Option<Uuid>,
    ) -> Result<Invoice, AppError> {
        let invoice = InvoiceRepository::lock_by_id(&mut *conn, invoice_id)
            .await?
            .ok_or_else(|| not_found_error("Invoice", invoice_id))?;

        let (paid_amount, status) = apply_payment(invoice.status, invoice.total_amount, invoice.paid_amount, amount)
            .map_err(rejection_error)?;
        let paid_at = (status == InvoiceStatus::Paid).then(Utc::now);
        let updated = InvoiceRepository::record_payment(&mut *conn, invoice_id, paid_amount, status, paid_at, payment_method_id, actor).await?;

        if status == InvoiceStatus::Paid {
            match updated.kind {
                InvoiceKind::Service => {
                    if let Some(appointment_id) = updated.appointment_id {
                        ShiftRepository::transition_for_appointment(
                            &mut *conn,
                            appointment_id,
                            &[ShiftStatus::Scheduled, ShiftStatus::InProgress],
                            ShiftStatus::Completed,
                            actor,
                        )
                        .await?;
                    }
                }
                InvoiceKind::Warranty => match (updated.vehicle_id, updated.warranty_package_id) {
                    (Some(vehicle_id), Some(package_id)) => {
                        let install_date = Utc::now().date_naive();
                        WarrantyController::activate_package(&mut *conn, updated.customer_id, vehicle_id, package_id, install_date).await?;
                    }
                    _ => warn!(invoice_id = %updated.id, "Warranty invoice without vehicle or package"),
                },
            }
        }
        Ok(updated)
    }

    pub(crate) async fn send_receipt(&self, invoice: &Invoice, amount: Decimal) {
        send_receipt(&self.users, &self.email, invoice, amount).await;
    }

    pub async fn appointment_invoice(&self, actor: &AuthenticatedUser, appointment_id: Uuid) -> Result<ApiResponse<Invoice>, AppError> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| not_found_error("Appointment", appointment_id))?;
        if !actor.is_staff() && appointment.customer_id != actor.user_id {
            return Err(forbidden_error("view invoice", "appointment belongs to another customer"));
        }
        let mut conn = self.pool.acquire().await?;
        let invoice = InvoiceRepository::find_by_appointment(&mut conn, appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No invoice for appointment {}", appointment_id)))?;
        Ok(ApiResponse::success(invoice))
    }
}

/// Mails the customer a receipt; failures are only logged.
pub(crate) async fn send_receipt(users: &UserRepository, email: &Arc<EmailService>, invoice: &Invoice, amount: Decimal) {
    match users.find_by_id(invoice.customer_id).await {
        Ok(Some(customer)) => email.dispatch(Email::payment_receipt(
            &customer.email,
            &invoice.invoice_number,
            amount,
            invoice.outstanding(),
        )),
        Ok(None) => warn!(invoice_id = %invoice.id, "Receipt skipped, customer missing"),
        Err(e) => warn!(invoice_id = %invoice.id, "Receipt skipped: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_build_unpaid_invoice() {
        let terms = InvoiceTerms { tax_rate: Decimal::new(10, 2), due_days: 7 };
        let now = Utc::now();
        let invoice = terms.build(InvoiceKind::Service, Uuid::new_v4(), Decimal::new(1_234_567, 3), now);

        assert_eq!(invoice.subtotal, Decimal::new(123_457, 2));
        assert_eq!(invoice.tax_amount, Decimal::new(12_346, 2));
        assert_eq!(invoice.total_amount, Decimal::new(135_803, 2));
        assert_eq!(invoice.paid_amount, Decimal::ZERO);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.due_date, now.date_naive() + Duration::days(7));
        assert!(invoice.invoice_number.starts_with("INV-"));
    }

    #[test]
    fn test_rejection_error_mapping() {
        let err = rejection_error(PaymentRejection::NotPayable(InvoiceStatus::Cancelled));
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = rejection_error(PaymentRejection::NonPositive);
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = rejection_error(PaymentRejection::Overpayment { amount: Decimal::from(10), outstanding: Decimal::from(5) });
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
