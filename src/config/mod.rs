//! Configuración del proyecto
//!
//! Database, cache, JWT, VNPay and SMTP settings read from the environment.

pub mod database;
pub mod environment;

pub use environment::*;
