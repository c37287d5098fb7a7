//! Envío del formato aprobado por correo
//!
//! `Mailer` es la costura que usa el flujo de aprobación; `SmtpMailer` es la
//! implementación real sobre lettre.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::environment::EnvironmentConfig;
use crate::utils::errors::{AppError, AppResult};

const SUBJECT: &str = "Permiso de ingreso aprobado";
const BODY: &str = "<p>Estimado usuario, su permiso de ingreso ha sido aprobado.</p>";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Envía un archivo adjunto a una lista de destinatarios
#[async_trait]
pub trait Mailer: Send + Sync {
    /// `Ok(true)` cuando el servidor aceptó el mensaje
    async fn send(&self, file: &Path, recipients: &[String]) -> AppResult<bool>;
}

/// ¿La extensión del archivo está en la lista permitida?
pub fn allowed_file(file: &Path, extensions: &[String]) -> bool {
    file.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .map_or(false, |ext| extensions.iter().any(|allowed| *allowed == ext))
}

fn content_type_for(file: &Path) -> &'static str {
    match file.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_lowercase()).as_deref() {
        Some("xlsx") => XLSX_MIME,
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Configuración SMTP
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub from_email: String,
    pub from_name: String,
    pub attach_file_types: Vec<String>,
}

impl From<&EnvironmentConfig> for SmtpConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            server: config.smtp_server.clone(),
            port: config.smtp_port,
            from_email: config.from_email.clone(),
            from_name: config.from_email_name.clone(),
            attach_file_types: config.attach_file_types.clone(),
        }
    }
}

/// Mailer SMTP sin autenticación, como el relay interno
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Arma el mensaje leyendo el adjunto del disco; se ejecuta fuera del
    /// runtime async.
    fn build_message(&self, file: &Path, recipients: &[String]) -> AppResult<Message> {
        let sender = if self.config.from_name.trim().is_empty() {
            self.config.from_email.clone()
        } else {
            format!("{} <{}>", self.config.from_name, self.config.from_email)
        };
        let from: Mailbox = sender
            .parse()
            .map_err(|e| AppError::Email(format!("Remitente inválido: {}", e)))?;

        let mut builder = Message::builder().from(from).subject(SUBJECT);
        for recipient in recipients {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| AppError::Email(format!("Destinatario inválido '{}': {}", recipient, e)))?;
            builder = builder.to(to);
        }

        let mut content = MultiPart::mixed().singlepart(SinglePart::html(BODY.to_string()));

        if !file.is_file() {
            warn!("⚠️ Adjunto {} omitido: el archivo no existe", file.display());
        } else if allowed_file(file, &self.config.attach_file_types) {
            let bytes = std::fs::read(file)?;
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "formato.xlsx".to_string());
            let content_type = ContentType::parse(content_type_for(file))
                .map_err(|e| AppError::Email(format!("Tipo de contenido inválido: {}", e)))?;
            content = content.singlepart(Attachment::new(name).body(bytes, content_type));
        } else {
            warn!(
                "⚠️ Adjunto {} omitido: extensión no permitida ({:?})",
                file.display(),
                self.config.attach_file_types
            );
        }

        builder
            .multipart(content)
            .map_err(|e| AppError::Email(format!("No se pudo construir el mensaje: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, file: &Path, recipients: &[String]) -> AppResult<bool> {
        if recipients.is_empty() {
            return Err(AppError::Email("Sin destinatarios".to_string()));
        }

        let mailer = self.clone();
        let file: PathBuf = file.to_path_buf();
        let attachment = file.clone();
        let to = recipients.to_vec();

        let sent = tokio::task::spawn_blocking(move || {
            let message = mailer.build_message(&attachment, &to)?;
            let transport = SmtpTransport::builder_dangerous(mailer.config.server.as_str())
                .port(mailer.config.port)
                .build();
            transport
                .send(&message)
                .map_err(|e| AppError::Email(format!("Error SMTP: {}", e)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Tarea de envío interrumpida: {}", e)))??;

        info!(
            "📧 Formato {} enviado a {} destinatarios ({})",
            file.display(),
            recipients.len(),
            sent.code()
        );
        Ok(sent.is_positive())
    }
}
