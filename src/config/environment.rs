//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno: base de datos, plantilla
//! del formato de ingreso, JWT y servidor SMTP.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::document_composer::SignatureBlockMode;
use crate::utils::errors::{config_error, AppResult};

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub database_url: String,
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub signature_block_mode: SignatureBlockMode,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub page_limit: i64,
    // SMTP
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from_email: String,
    pub from_email_name: String,
    pub attach_file_types: Vec<String>,
}

impl EnvironmentConfig {
    /// Leer la configuración desde las variables de entorno
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: required("DATABASE_URL")?,
            template_path: PathBuf::from(
                env::var("FORMAT_TEMPLATE_PATH")
                    .unwrap_or_else(|_| "format_templates/PERMISO.xlsx".to_string()),
            ),
            output_dir: PathBuf::from(env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".to_string())),
            signature_block_mode: parsed("SIGNATURE_BLOCK_MODE", SignatureBlockMode::Fixed)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_minutes: parsed("JWT_EXPIRATION_MINUTES", 240)?,
            page_limit: parsed("PAGE_LIMIT", 10)?,
            smtp_server: env::var("SMTP_SERVER").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: parsed("SMTP_PORT", 25)?,
            from_email: env::var("FROM_EMAIL").unwrap_or_default(),
            from_email_name: env::var("FROM_EMAIL_NAME").unwrap_or_default(),
            attach_file_types: parse_list(
                &env::var("ATTACH_FILE_TYPES").unwrap_or_else(|_| "xlsx,pdf".to_string()),
            ),
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Nombre del archivo generado: `output_<id>.xlsx`
pub fn output_file_name(request_id: i64) -> String {
    format!("output_{}.xlsx", request_id)
}

fn required(variable: &str) -> AppResult<String> {
    env::var(variable).map_err(|_| config_error(variable, "must be set"))
}

fn parsed<T: FromStr>(variable: &str, default: T) -> AppResult<T> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| config_error(variable, &format!("invalid value '{}'", raw))),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
