//! Utilidades del sistema
//!
//! Errores, validación y helpers de JWT.

pub mod errors;
pub mod jwt;
pub mod validation;

pub use errors::{AppError, AppResult};
