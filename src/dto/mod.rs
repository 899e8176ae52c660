//! Data transfer objects
//!
//! Request bodies (validated with `validator`) and API response shapes.

pub mod appointment_dto;
pub mod auth_dto;
pub mod common_dto;
pub mod invoice_dto;
pub mod maintenance_dto;
pub mod message_dto;
pub mod payment_dto;
pub mod payment_method_dto;
pub mod role_dto;
pub mod service_type_dto;
pub mod shift_dto;
pub mod user_dto;
pub mod vehicle_dto;
pub mod vehicle_part_dto;
pub mod vehicle_type_dto;
pub mod warranty_dto;

pub use common_dto::{ApiResponse, PageQuery, PageResponse};
