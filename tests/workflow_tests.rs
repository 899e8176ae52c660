//! Workflow tests against a real Postgres.
//!
//! Cover the multi-statement operations whose guarantees only hold inside a
//! transaction: stock taken on completion, the completion cascade, VNPay IPN
//! settlement, shift conflicts and guarded status changes.

mod common;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::*;
use ev_service_center::controllers::invoice_controller::InvoiceController;
use ev_service_center::controllers::maintenance_controller::MaintenanceController;
use ev_service_center::controllers::payment_controller::PaymentController;
use ev_service_center::controllers::service_type_controller::ServiceTypeController;
use ev_service_center::controllers::shift_controller::ShiftController;
use ev_service_center::controllers::warranty_controller::WarrantyController;
use ev_service_center::utils::errors::AppError;

// ---------------------------------------------------------------------------
// Maintenance completion
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_complete_rolls_back_on_insufficient_stock(pool: PgPool) {
    let order = work_order_in_progress(&pool, 200_000).await;
    let plenty = part(&pool, 5, 150_000).await;
    let scarce = part(&pool, 1, 80_000).await;
    approved_record(&pool, order.management_id, plenty, 2, 150_000).await;
    approved_record(&pool, order.management_id, scarce, 3, 80_000).await;

    let controller = MaintenanceController::new(&test_state(pool.clone()));
    let result = controller.complete(&staff(), order.management_id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Nothing from the failed completion survives
    assert_eq!(stock_of(&pool, plenty).await, 5);
    assert_eq!(stock_of(&pool, scarce).await, 1);
    assert_eq!(status_of(&pool, "maintenance_managements", order.management_id).await, "IN_PROGRESS");
    assert_eq!(status_of(&pool, "appointments", order.appointment_id).await, "IN_PROGRESS");
    let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE appointment_id = $1")
        .bind(order.appointment_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(invoices, 0);
}

#[sqlx::test]
async fn test_last_completion_closes_and_invoices_appointment(pool: PgPool) {
    let order = work_order_in_progress(&pool, 200_000).await;
    let pad = part(&pool, 5, 150_000).await;
    approved_record(&pool, order.management_id, pad, 2, 150_000).await;

    let shift_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO shifts (id, technician_id, appointment_id, start_time, end_time)
         VALUES ($1, $2, $3, NOW(), NOW() + INTERVAL '1 hour')",
    )
    .bind(shift_id)
    .bind(order.technician_id)
    .bind(order.appointment_id)
    .execute(&pool)
    .await
    .unwrap();

    let technician = actor(order.technician_id, "TECHNICIAN");
    let controller = MaintenanceController::new(&test_state(pool.clone()));
    let completed = controller.complete(&technician, order.management_id).await.unwrap();
    let management = completed.data.unwrap().management;
    assert_eq!(management.parts_cost, Decimal::from(300_000));
    assert_eq!(management.total_cost, Decimal::from(500_000));

    assert_eq!(stock_of(&pool, pad).await, 3);
    assert_eq!(status_of(&pool, "appointments", order.appointment_id).await, "COMPLETED");
    assert_eq!(status_of(&pool, "shifts", shift_id).await, "COMPLETED");

    let (subtotal, total, status): (Decimal, Decimal, String) = sqlx::query_as(
        "SELECT subtotal, total_amount, status::text FROM invoices WHERE appointment_id = $1",
    )
    .bind(order.appointment_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(subtotal, Decimal::from(500_000));
    assert_eq!(total, Decimal::from(550_000));
    assert_eq!(status, "UNPAID");
}

// ---------------------------------------------------------------------------
// VNPay IPN
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_ipn_outcomes_against_stored_transactions(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let invoice_id = unpaid_invoice(&pool, customer_id, 500_000).await;
    pending_transaction(&pool, invoice_id, "20250601120000000001", 500_000).await;

    let controller = PaymentController::new(&test_state(pool.clone()));

    let unknown = controller.handle_ipn(signed_callback("20250601120000999999", 500_000, "00")).await;
    assert_eq!(unknown.rsp_code, "01");

    let wrong_amount = controller.handle_ipn(signed_callback("20250601120000000001", 499_000, "00")).await;
    assert_eq!(wrong_amount.rsp_code, "04");

    let paid = controller.handle_ipn(signed_callback("20250601120000000001", 500_000, "00")).await;
    assert_eq!(paid.rsp_code, "00");
    assert_eq!(status_of(&pool, "invoices", invoice_id).await, "PAID");

    let replay = controller.handle_ipn(signed_callback("20250601120000000001", 500_000, "00")).await;
    assert_eq!(replay.rsp_code, "02");

    let paid_amount: Decimal = sqlx::query_scalar("SELECT paid_amount FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(paid_amount, Decimal::from(500_000));
}

#[sqlx::test]
async fn test_declined_ipn_marks_transaction_failed(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let invoice_id = unpaid_invoice(&pool, customer_id, 300_000).await;
    pending_transaction(&pool, invoice_id, "20250601120000000002", 300_000).await;

    let controller = PaymentController::new(&test_state(pool.clone()));
    let declined = controller.handle_ipn(signed_callback("20250601120000000002", 300_000, "24")).await;
    assert_eq!(declined.rsp_code, "00");

    let txn_status: String = sqlx::query_scalar("SELECT status::text FROM payment_transactions WHERE txn_ref = $1")
        .bind("20250601120000000002")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(txn_status, "FAILED");
    assert_eq!(status_of(&pool, "invoices", invoice_id).await, "UNPAID");
}

#[sqlx::test]
async fn test_second_captured_payment_is_acknowledged_not_retried(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let invoice_id = unpaid_invoice(&pool, customer_id, 400_000).await;
    pending_transaction(&pool, invoice_id, "20250601120000000003", 400_000).await;
    pending_transaction(&pool, invoice_id, "20250601120000000004", 400_000).await;

    let controller = PaymentController::new(&test_state(pool.clone()));
    let first = controller.handle_ipn(signed_callback("20250601120000000003", 400_000, "00")).await;
    assert_eq!(first.rsp_code, "00");

    // The invoice is already settled; VNPay must still get a final answer
    let second = controller.handle_ipn(signed_callback("20250601120000000004", 400_000, "00")).await;
    assert_eq!(second.rsp_code, "00");

    let (txn_status, response_code): (String, Option<String>) = sqlx::query_as(
        "SELECT status::text, response_code FROM payment_transactions WHERE txn_ref = $1",
    )
    .bind("20250601120000000004")
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(txn_status, "FAILED");
    assert_eq!(response_code.as_deref(), Some("00"));

    let paid_amount: Decimal = sqlx::query_scalar("SELECT paid_amount FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(paid_amount, Decimal::from(400_000));

    let again = controller.handle_ipn(signed_callback("20250601120000000004", 400_000, "00")).await;
    assert_eq!(again.rsp_code, "02");
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn test_cancel_only_unpaid_invoices(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let unpaid = unpaid_invoice(&pool, customer_id, 100_000).await;
    let paid = unpaid_invoice(&pool, customer_id, 100_000).await;
    pending_transaction(&pool, paid, "20250601120000000005", 100_000).await;

    let state = test_state(pool.clone());
    let ipn = PaymentController::new(&state)
        .handle_ipn(signed_callback("20250601120000000005", 100_000, "00"))
        .await;
    assert_eq!(ipn.rsp_code, "00");

    let controller = InvoiceController::new(&state);
    let cancelled = controller.cancel(&staff(), unpaid).await.unwrap();
    assert_eq!(status_of(&pool, "invoices", cancelled.data.unwrap().id).await, "CANCELLED");

    assert!(matches!(controller.cancel(&staff(), paid).await, Err(AppError::InvalidState(_))));
    assert_eq!(status_of(&pool, "invoices", paid).await, "PAID");

    assert!(matches!(controller.cancel(&staff(), unpaid).await, Err(AppError::InvalidState(_))));
    assert!(matches!(controller.cancel(&staff(), Uuid::new_v4()).await, Err(AppError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------

fn shift_request(technician_id: Uuid, start_hour: u32, end_hour: u32) -> serde_json::Value {
    let day = Utc.with_ymd_and_hms(2030, 3, 4, 0, 0, 0).unwrap();
    json!({
        "technician_id": technician_id,
        "start_time": day + Duration::hours(start_hour.into()),
        "end_time": day + Duration::hours(end_hour.into()),
    })
}

#[sqlx::test]
async fn test_overlapping_shift_is_rejected_on_create(pool: PgPool) {
    let technician_id = technician(&pool).await;
    let controller = ShiftController::new(pool.clone());

    controller
        .create(&staff(), serde_json::from_value(shift_request(technician_id, 9, 11)).unwrap())
        .await
        .unwrap();

    let overlapping = controller
        .create(&staff(), serde_json::from_value(shift_request(technician_id, 10, 12)).unwrap())
        .await;
    assert!(matches!(overlapping, Err(AppError::Conflict(_))));

    // Back-to-back is fine
    controller
        .create(&staff(), serde_json::from_value(shift_request(technician_id, 11, 13)).unwrap())
        .await
        .unwrap();

    // Another technician is not affected
    let other = technician(&pool).await;
    controller
        .create(&staff(), serde_json::from_value(shift_request(other, 10, 12)).unwrap())
        .await
        .unwrap();
}

#[sqlx::test]
async fn test_moving_shift_onto_another_is_rejected(pool: PgPool) {
    let technician_id = technician(&pool).await;
    let controller = ShiftController::new(pool.clone());

    controller
        .create(&staff(), serde_json::from_value(shift_request(technician_id, 9, 11)).unwrap())
        .await
        .unwrap();
    let later = controller
        .create(&staff(), serde_json::from_value(shift_request(technician_id, 13, 15)).unwrap())
        .await
        .unwrap()
        .data
        .unwrap();

    let day = Utc.with_ymd_and_hms(2030, 3, 4, 0, 0, 0).unwrap();
    let clash = json!({ "start_time": day + Duration::hours(10), "end_time": day + Duration::hours(12) });
    let result = controller.update(&staff(), later.id, serde_json::from_value(clash).unwrap()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let start: chrono::DateTime<Utc> = sqlx::query_scalar("SELECT start_time FROM shifts WHERE id = $1")
        .bind(later.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(start, day + Duration::hours(13));

    // Moving within its own window does not conflict with itself
    let shorter = json!({ "end_time": day + Duration::hours(14) });
    let moved = controller
        .update(&staff(), later.id, serde_json::from_value(shorter).unwrap())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(moved.end_time, day + Duration::hours(14));
}

// ---------------------------------------------------------------------------
// Catalog uniqueness
// ---------------------------------------------------------------------------

fn service_type_request(name: &str) -> serde_json::Value {
    json!({ "name": name, "estimated_duration_minutes": 45, "price": "250000" })
}

#[sqlx::test]
async fn test_service_type_names_are_unique_among_live_rows(pool: PgPool) {
    let controller = ServiceTypeController::new(pool.clone());
    let first = controller
        .create(&staff(), serde_json::from_value(service_type_request("Battery check")).unwrap())
        .await
        .unwrap()
        .data
        .unwrap();

    let duplicate = controller
        .create(&staff(), serde_json::from_value(service_type_request("battery CHECK")).unwrap())
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let other = controller
        .create(&staff(), serde_json::from_value(service_type_request("Tyre rotation")).unwrap())
        .await
        .unwrap()
        .data
        .unwrap();
    let rename = controller
        .update(&staff(), other.id, serde_json::from_value(json!({ "name": "Battery check" })).unwrap())
        .await;
    assert!(matches!(rename, Err(AppError::Conflict(_))));

    // Freed once deleted; restoring the old row then collides
    controller.delete(&staff(), first.id).await.unwrap();
    controller
        .create(&staff(), serde_json::from_value(service_type_request("Battery check")).unwrap())
        .await
        .unwrap();
    assert!(matches!(controller.restore(&staff(), first.id).await, Err(AppError::Conflict(_))));
}

#[sqlx::test]
async fn test_warranty_package_names_are_unique(pool: PgPool) {
    let controller = WarrantyController::new(pool.clone());
    let request = || json!({ "name": "Battery care 24", "validity_months": 24, "price": "1500000" });

    controller
        .create_package(&staff(), serde_json::from_value(request()).unwrap())
        .await
        .unwrap();
    let duplicate = controller
        .create_package(&staff(), serde_json::from_value(request()).unwrap())
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}
