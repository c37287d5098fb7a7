//! Modelo de User
//!
//! Usuarios internos que actúan como solicitante, autorizador o personal de
//! seguridad de una solicitud de ingreso.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Usuario con dependencia y cargo resueltos
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub unit_name: String,
    pub position_name: String,
    pub phone_number: String,
    pub email: String,
}
