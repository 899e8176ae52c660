//! Services module
//!
//! Integraciones y lógica transversal: tokens, gateway de pago, email,
//! chat en tiempo real, métricas y tareas programadas.

pub mod auth_service;
pub mod chat_hub;
pub mod email_service;
pub mod metrics;
pub mod scheduler;
pub mod vnpay_service;

pub use auth_service::AuthService;
pub use chat_hub::ChatHub;
pub use email_service::{Email, EmailService};
pub use metrics::Metrics;
pub use scheduler::Scheduler;
pub use vnpay_service::VnpayService;
