//! Modelo de solicitudes de ingreso
//!
//! Una solicitud de ingreso es dueña de sus vínculos con invitados y de sus
//! materiales; la sede, los invitados y los usuarios se referencian por id.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use validator::{Validate, ValidationError};

use crate::models::branch::BranchDetail;
use crate::models::guest::GuestDetail;
use crate::models::user::Principal;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::{validate_not_blank, validate_time_window};

/// Estado de la solicitud - mapea al ENUM requeststatus
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "requeststatus", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    AuthPending,
    SecurityPending,
    Approved,
    Refused,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::AuthPending => "auth_pending",
            RequestStatus::SecurityPending => "security_pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Refused => "refused",
        }
    }

    /// Etiqueta visible para los usuarios
    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::AuthPending => "Pendiente por autorizador",
            RequestStatus::SecurityPending => "Pendiente por seguridad",
            RequestStatus::Approved => "Autorizado",
            RequestStatus::Refused => "Rechazado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Refused)
    }

    /// Transiciones permitidas. Mantener el mismo estado siempre es válido.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;

        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (AuthPending, SecurityPending)
                | (AuthPending, Refused)
                | (SecurityPending, Approved)
                | (SecurityPending, Refused)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "auth_pending" => Ok(RequestStatus::AuthPending),
            "security_pending" => Ok(RequestStatus::SecurityPending),
            "approved" => Ok(RequestStatus::Approved),
            "refused" => Ok(RequestStatus::Refused),
            other => {
                let mut error = ValidationError::new("status");
                error.message = Some(format!("estado desconocido '{}'", other).into());
                Err(AppError::Validation(single_error("status", error)))
            }
        }
    }
}

fn single_error(field: &'static str, error: ValidationError) -> validator::ValidationErrors {
    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);
    errors
}

/// Ventana de ingreso ya validada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    entry_date: NaiveDateTime,
    departure_date: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(entry_date: NaiveDateTime, departure_date: NaiveDateTime) -> AppResult<Self> {
        validate_time_window(entry_date, departure_date)
            .map_err(|e| AppError::Validation(single_error("departure_date", e)))?;
        Ok(Self {
            entry_date,
            departure_date,
        })
    }

    pub fn entry_date(&self) -> NaiveDateTime {
        self.entry_date
    }

    pub fn departure_date(&self) -> NaiveDateTime {
        self.departure_date
    }
}

/// EntranceRequest - mapea a la tabla entrance_requests
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct EntranceRequest {
    pub id: i64,
    pub branch_id: i64,
    pub entry_date: NaiveDateTime,
    pub departure_date: NaiveDateTime,
    pub reason: String,
    pub status: RequestStatus,
    pub is_installation: bool,
    pub is_uninstallation: bool,
    pub creator_id: Option<i64>,
    pub authorizer_id: Option<i64>,
    pub security_id: Option<i64>,
}

/// Material o equipo - mapea a la tabla materials
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Material {
    pub id: i64,
    pub entrance_request_id: i64,
    pub model: String,
    pub serial: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
}

/// Material de una solicitud nueva
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MaterialInput {
    #[validate(length(min = 1, max = 200))]
    pub model: String,
    pub serial: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Request para crear una solicitud de ingreso
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_create_window", skip_on_field_errors = false))]
pub struct CreateEntranceRequest {
    pub branch_id: i64,
    #[serde(default)]
    pub guest_ids: Vec<i64>,
    pub entry_date: NaiveDateTime,
    pub departure_date: NaiveDateTime,
    #[validate(custom = "validate_not_blank")]
    pub reason: String,
    #[serde(default)]
    pub is_installation: bool,
    #[serde(default)]
    pub is_uninstallation: bool,
    pub creator_id: i64,
    pub authorizer_id: i64,
    pub security_id: Option<i64>,
    #[serde(default)]
    #[validate]
    pub materials: Vec<MaterialInput>,
}

fn validate_create_window(request: &CreateEntranceRequest) -> Result<(), ValidationError> {
    validate_time_window(request.entry_date, request.departure_date)
}

/// Campos actualizables de una solicitud. Solo estos campos pueden cambiar;
/// `None` deja el valor actual.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EntranceRequestPatch {
    pub branch_id: Option<i64>,
    pub entry_date: Option<NaiveDateTime>,
    pub departure_date: Option<NaiveDateTime>,
    #[validate(custom = "validate_not_blank")]
    pub reason: Option<String>,
    pub status: Option<RequestStatus>,
    pub authorizer_id: Option<i64>,
    pub security_id: Option<i64>,
    pub is_installation: Option<bool>,
    pub is_uninstallation: Option<bool>,
    /// Reemplaza la lista completa de invitados, en este orden
    pub guest_ids: Option<Vec<i64>>,
}

impl EntranceRequestPatch {
    pub fn touches_window(&self) -> bool {
        self.entry_date.is_some() || self.departure_date.is_some()
    }

    /// Ventana resultante de aplicar el parche sobre la solicitud actual
    pub fn resulting_window(&self, current: &EntranceRequest) -> AppResult<TimeWindow> {
        TimeWindow::new(
            self.entry_date.unwrap_or(current.entry_date),
            self.departure_date.unwrap_or(current.departure_date),
        )
    }

    /// Aplica el parche sobre una copia de la solicitud
    pub fn apply_to(&self, request: &EntranceRequest) -> EntranceRequest {
        EntranceRequest {
            id: request.id,
            branch_id: self.branch_id.unwrap_or(request.branch_id),
            entry_date: self.entry_date.unwrap_or(request.entry_date),
            departure_date: self.departure_date.unwrap_or(request.departure_date),
            reason: self.reason.clone().unwrap_or_else(|| request.reason.clone()),
            status: self.status.unwrap_or(request.status),
            is_installation: self.is_installation.unwrap_or(request.is_installation),
            is_uninstallation: self.is_uninstallation.unwrap_or(request.is_uninstallation),
            creator_id: request.creator_id,
            authorizer_id: self.authorizer_id.or(request.authorizer_id),
            security_id: self.security_id.or(request.security_id),
        }
    }
}

/// Filtros para búsqueda de solicitudes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntranceRequestFilter {
    pub status: Option<RequestStatus>,
    pub security_id: Option<i64>,
    pub creator_id: Option<i64>,
    pub authorizer_id: Option<i64>,
}

impl EntranceRequestFilter {
    pub fn matches(&self, request: &EntranceRequest) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self.security_id.map_or(true, |id| request.security_id == Some(id))
            && self.creator_id.map_or(true, |id| request.creator_id == Some(id))
            && self.authorizer_id.map_or(true, |id| request.authorizer_id == Some(id))
    }
}

/// Solicitud completamente hidratada, tal como la consume el formato
#[derive(Debug, Clone, Serialize)]
pub struct EntranceRequestAggregate {
    pub request: EntranceRequest,
    pub branch: BranchDetail,
    /// En el orden en que se vincularon a la solicitud
    pub guests: Vec<GuestDetail>,
    /// En el orden en que se registraron
    pub materials: Vec<Material>,
    pub creator: Option<Principal>,
    pub authorizer: Option<Principal>,
    pub security: Option<Principal>,
}

impl EntranceRequestAggregate {
    pub fn id(&self) -> i64 {
        self.request.id
    }

    /// Destinatarios del formato aprobado: solicitante y autorizador
    pub fn notification_recipients(&self) -> Vec<String> {
        [&self.creator, &self.authorizer]
            .into_iter()
            .flatten()
            .map(|principal| principal.email.clone())
            .collect()
    }
}
