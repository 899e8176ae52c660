//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL de `migrations/`.

pub mod appointment;
pub mod audit;
pub mod invoice;
pub mod maintenance;
pub mod message;
pub mod payment;
pub mod role;
pub mod service_type;
pub mod shift;
pub mod user;
pub mod vehicle;
pub mod vehicle_part;
pub mod vehicle_part_category;
pub mod vehicle_type;
pub mod warranty;
