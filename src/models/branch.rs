//! Modelo de Branch (sedes y estaciones)

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Tipo de sede - mapea al ENUM branchtypes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "branchtypes", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    Administrative,
    Technical,
    External,
}

/// Branch - mapea a la tabla branches
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Branch {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    #[sqlx(rename = "type")]
    pub branch_type: BranchType,
    pub department_id: i64,
    pub municipality_id: i64,
    pub is_j10: bool,
}

/// Sede con el nombre del municipio resuelto
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BranchDetail {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub branch_type: BranchType,
    pub municipality_name: String,
    pub is_j10: bool,
}
