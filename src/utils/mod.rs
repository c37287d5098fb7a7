//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! JWT y paginación.

pub mod errors;
pub mod jwt;
pub mod pagination;
pub mod validation;

pub use errors::{AppError, AppResult};
