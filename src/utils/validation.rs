//! Utilidades de validación
//!
//! Reglas de negocio que no se expresan con los atributos de `validator`.

use chrono::{Duration, NaiveDateTime};
use validator::ValidationError;

/// Duración máxima de un permiso de ingreso
pub const MAX_PERMIT_DAYS: i64 = 30;

/// Validar la ventana de ingreso: la salida no precede al ingreso y el
/// permiso no supera `MAX_PERMIT_DAYS`
pub fn validate_time_window(
    entry_date: NaiveDateTime,
    departure_date: NaiveDateTime,
) -> Result<(), ValidationError> {
    if departure_date < entry_date {
        let mut error = ValidationError::new("time_window");
        error.message = Some("La fecha de salida no puede ser anterior a la de ingreso".into());
        error.add_param("entry_date".into(), &entry_date.to_string());
        error.add_param("departure_date".into(), &departure_date.to_string());
        return Err(error);
    }

    if departure_date - entry_date > Duration::days(MAX_PERMIT_DAYS) {
        let mut error = ValidationError::new("max_days");
        error.message = Some("El permiso no puede ser mayor a 30 días".into());
        error.add_param("max_days".into(), &MAX_PERMIT_DAYS);
        return Err(error);
    }

    Ok(())
}

/// Validar que un texto no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}
