//! Solicitudes de ingreso a sedes
//!
//! Ciclo de aprobación de solicitudes de ingreso y generación del formato
//! xlsx que se envía por correo cuando una solicitud queda autorizada.

pub mod config;
pub mod database;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use utils::errors::{AppError, AppResult};
