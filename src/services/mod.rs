//! Services module
//!
//! Este módulo contiene la lógica de negocio: el motor de diseño de la
//! plantilla, la composición del formato, el envío por correo y el flujo de
//! aprobación que los orquesta.

pub mod approval_workflow;
pub mod document_composer;
pub mod email_service;
pub mod layout_engine;

pub use approval_workflow::{ApprovalWorkflow, Assignees, DocumentDispatch, StatusChange};
pub use document_composer::{DocumentComposer, FormatLayout, SignatureBlockMode};
pub use email_service::{Mailer, SmtpConfig, SmtpMailer};
