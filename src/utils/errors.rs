//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y el código estable que se reporta al llamador.

use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Código estable del error, útil para logs y respuestas
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Io(_) => "IO_ERROR",
            AppError::Document(_) => "DOCUMENT_ERROR",
            AppError::Email(_) => "EMAIL_ERROR",
            AppError::Jwt(_) => "JWT_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());
    error.add_param("field".into(), &field);

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(resource: &str, reason: &str) -> AppError {
    AppError::Conflict(format!("{}: {}", resource, reason))
}

/// Función helper para crear errores de configuración
pub fn config_error(variable: &str, reason: &str) -> AppError {
    AppError::Config(format!("{}: {}", variable, reason))
}

/// Función helper para crear errores internos
pub fn internal_error(message: &str) -> AppError {
    AppError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_carries_field() {
        let error = validation_error("departure_date", "must not precede entry_date");
        match error {
            AppError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("departure_date"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(not_found_error("Branch", 7).code(), "NOT_FOUND");
        assert_eq!(conflict_error("EntranceRequest", "illegal").code(), "CONFLICT");
        assert_eq!(internal_error("boom").code(), "INTERNAL_ERROR");
        assert!(matches!(not_found_error("User", 1), AppError::NotFound(_)));
    }

    #[test]
    fn test_not_found_message() {
        let error = not_found_error("User", 42);
        assert_eq!(error.to_string(), "Not found: User with id '42' not found");
    }
}
