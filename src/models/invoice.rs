//! Modelo de Invoice
//!
//! Invariant: `0 ≤ paid_amount ≤ total_amount`.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::audit::Audit;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "invoice_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceKind {
    /// Bill for a completed appointment
    Service,
    /// Purchase of a warranty package for a vehicle
    Warranty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn accepts_payment(self) -> bool {
        matches!(self, InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub kind: InvoiceKind,
    pub appointment_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub warranty_package_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Invoice {
    pub fn outstanding(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }
}

/// Why a payment cannot be applied to an invoice
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentRejection {
    #[error("invoice does not accept payments in status {0:?}")]
    NotPayable(InvoiceStatus),
    #[error("payment amount must be positive")]
    NonPositive,
    #[error("payment of {amount} exceeds outstanding balance {outstanding}")]
    Overpayment { amount: Decimal, outstanding: Decimal },
}

/// New `(paid_amount, status)` after receiving `amount`.
pub fn apply_payment(
    status: InvoiceStatus,
    total: Decimal,
    paid: Decimal,
    amount: Decimal,
) -> Result<(Decimal, InvoiceStatus), PaymentRejection> {
    if !status.accepts_payment() {
        return Err(PaymentRejection::NotPayable(status));
    }
    if amount <= Decimal::ZERO {
        return Err(PaymentRejection::NonPositive);
    }
    let outstanding = total - paid;
    if amount > outstanding {
        return Err(PaymentRejection::Overpayment { amount, outstanding });
    }
    let new_paid = paid + amount;
    let new_status = if new_paid == total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::PartiallyPaid
    };
    Ok((new_paid, new_status))
}

/// `(tax_amount, total_amount)` for a subtotal.
pub fn compute_totals(subtotal: Decimal, tax_rate: Decimal) -> (Decimal, Decimal) {
    let tax = (subtotal * tax_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (tax, subtotal + tax)
}

/// `INV-YYYYMMDD-XXXXXX`
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_partial_then_full_payment() {
        let total = Decimal::from(1_100_000);
        let (paid, status) =
            apply_payment(InvoiceStatus::Unpaid, total, Decimal::ZERO, Decimal::from(600_000)).unwrap();
        assert_eq!(status, InvoiceStatus::PartiallyPaid);

        let (paid, status) = apply_payment(status, total, paid, Decimal::from(500_000)).unwrap();
        assert_eq!(paid, total);
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_overpayment_rejected() {
        let err = apply_payment(
            InvoiceStatus::PartiallyPaid,
            Decimal::from(100),
            Decimal::from(60),
            Decimal::from(41),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PaymentRejection::Overpayment { amount: Decimal::from(41), outstanding: Decimal::from(40) }
        );
    }

    #[test]
    fn test_paid_and_cancelled_reject_payment() {
        for status in [InvoiceStatus::Paid, InvoiceStatus::Cancelled] {
            let err = apply_payment(status, Decimal::from(10), Decimal::ZERO, Decimal::ONE).unwrap_err();
            assert_eq!(err, PaymentRejection::NotPayable(status));
        }
        assert_eq!(
            apply_payment(InvoiceStatus::Unpaid, Decimal::from(10), Decimal::ZERO, Decimal::ZERO),
            Err(PaymentRejection::NonPositive)
        );
    }

    #[test]
    fn test_compute_totals() {
        let (tax, total) = compute_totals(Decimal::from(1_000_000), Decimal::new(10, 2));
        assert_eq!(tax, Decimal::from(100_000));
        assert_eq!(total, Decimal::from(1_100_000));

        let (tax, _) = compute_totals(Decimal::new(1005, 2), Decimal::new(10, 2));
        assert_eq!(tax, Decimal::new(101, 2));
    }

    #[test]
    fn test_invoice_number_format() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let number = generate_invoice_number(now);
        assert!(number.starts_with("INV-20250601-"));
        assert_eq!(number.len(), "INV-20250601-".len() + 6);
    }
}
