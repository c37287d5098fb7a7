//! Modelo de Guest (invitados)
//!
//! Un invitado referencia tres compañías (EPS, ARL y empleador) y una ciudad;
//! en el formato se escriben sus nombres, no sus ids.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invitado con los nombres de sus compañías y ciudad resueltos
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct GuestDetail {
    pub id: i64,
    pub document_id: String,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    /// EPS
    pub health_insurer: String,
    /// ARL
    pub risk_insurer: String,
    pub employer: String,
    pub city: String,
}
