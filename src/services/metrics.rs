//! Métricas Prometheus
//!
//! Business counters exposed in text format on `GET /metrics`.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::utils::errors::{AppError, AppResult};

pub struct Metrics {
    registry: Registry,
    pub appointments_created: IntCounter,
    pub maintenance_completed: IntCounter,
    pub invoices_generated: IntCounter,
    /// Labelled by `outcome` (IPN response code or `return`)
    pub payment_callbacks: IntCounterVec,
    /// Labelled by `job`
    pub scheduler_runs: IntCounterVec,
    pub scheduler_rows_changed: IntCounterVec,
}

impl Metrics {
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new_custom(Some("evsc".to_string()), None).map_err(metrics_error)?;

        let appointments_created =
            IntCounter::new("appointments_created_total", "Appointments booked").map_err(metrics_error)?;
        let maintenance_completed = IntCounter::new(
            "maintenance_completed_total",
            "Maintenance work orders completed",
        )
        .map_err(metrics_error)?;
        let invoices_generated =
            IntCounter::new("invoices_generated_total", "Invoices issued").map_err(metrics_error)?;
        let payment_callbacks = IntCounterVec::new(
            Opts::new("payment_callbacks_total", "VNPay callbacks by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let scheduler_runs = IntCounterVec::new(
            Opts::new("scheduler_runs_total", "Background job executions"),
            &["job"],
        )
        .map_err(metrics_error)?;
        let scheduler_rows_changed = IntCounterVec::new(
            Opts::new("scheduler_rows_changed_total", "Rows updated by background jobs"),
            &["job"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(appointments_created.clone())).map_err(metrics_error)?;
        registry.register(Box::new(maintenance_completed.clone())).map_err(metrics_error)?;
        registry.register(Box::new(invoices_generated.clone())).map_err(metrics_error)?;
        registry.register(Box::new(payment_callbacks.clone())).map_err(metrics_error)?;
        registry.register(Box::new(scheduler_runs.clone())).map_err(metrics_error)?;
        registry.register(Box::new(scheduler_rows_changed.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            appointments_created,
            maintenance_completed,
            invoices_generated,
            payment_callbacks,
            scheduler_runs,
            scheduler_rows_changed,
        })
    }

    pub fn render(&self) -> AppResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn metrics_error(e: prometheus::Error) -> AppError {
    AppError::Internal(format!("Metrics error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.appointments_created.inc();
        metrics.payment_callbacks.with_label_values(&["00"]).inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("evsc_appointments_created_total 1"));
        assert!(text.contains("evsc_payment_callbacks_total{outcome=\"00\"} 1"));
    }
}
