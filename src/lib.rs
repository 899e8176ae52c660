//! EV Service Center backend
//!
//! REST + WebSocket API for an electric-vehicle service center: bookings,
//! technician shifts, parts inventory, maintenance work orders, invoicing,
//! VNPay payments, warranty packages and customer chat.

pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
