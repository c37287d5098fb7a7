//! Flujo de aprobación de solicitudes de ingreso
//!
//! Valida y persiste los cambios de una solicitud. Cuando una solicitud entra
//! al estado aprobado genera el formato y lo envía por correo; esa parte es de
//! mejor esfuerzo y nunca revierte la aprobación ya guardada.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use validator::Validate;

use crate::config::environment::EnvironmentConfig;
use crate::models::{
    CreateEntranceRequest, EntranceRequest, EntranceRequestAggregate, EntranceRequestFilter,
    EntranceRequestPatch, RequestStatus,
};
use crate::repositories::RequestStore;
use crate::services::document_composer::DocumentComposer;
use crate::services::email_service::Mailer;
use crate::utils::errors::{conflict_error, internal_error, not_found_error, validation_error, AppResult};
use crate::utils::pagination::{Page, PageRequest};

/// Qué pasó con el formato después de guardar el cambio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentDispatch {
    /// El cambio no llevó la solicitud al estado aprobado
    NotTriggered,
    Sent { document: PathBuf },
    ComposeFailed { reason: String },
    EmailFailed { document: PathBuf, reason: String },
}

/// Resultado de una actualización ya persistida
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous_status: RequestStatus,
    pub request: EntranceRequest,
    pub dispatch: DocumentDispatch,
}

/// Responsables que se asignan junto con un cambio de estado
#[derive(Debug, Clone, Copy, Default)]
pub struct Assignees {
    pub authorizer_id: Option<i64>,
    pub security_id: Option<i64>,
}

/// Servicio del ciclo de vida de las solicitudes
#[derive(Clone)]
pub struct ApprovalWorkflow {
    composer: DocumentComposer,
    mailer: Arc<dyn Mailer>,
    default_page_limit: i64,
}

impl ApprovalWorkflow {
    pub fn new(composer: DocumentComposer, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            composer,
            mailer,
            default_page_limit: PageRequest::default().limit,
        }
    }

    pub fn from_config(config: &EnvironmentConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            default_page_limit: config.page_limit,
            ..Self::new(DocumentComposer::from_config(config), mailer)
        }
    }

    pub fn composer(&self) -> &DocumentComposer {
        &self.composer
    }

    /// Crea una solicitud en estado pendiente por autorizador
    pub async fn create(
        &self,
        store: &dyn RequestStore,
        request: CreateEntranceRequest,
    ) -> AppResult<EntranceRequestAggregate> {
        request.validate()?;

        if store.find_branch(request.branch_id).await?.is_none() {
            return Err(not_found_error("Branch", request.branch_id));
        }
        ensure_principal(store, "Creator", request.creator_id).await?;
        ensure_principal(store, "Authorizer", request.authorizer_id).await?;
        if let Some(security_id) = request.security_id {
            ensure_principal(store, "Security", security_id).await?;
        }
        ensure_guests(store, &request.guest_ids).await?;

        let id = store.insert(&request).await?;
        info!(
            "📝 Solicitud {} creada: sede {}, {} invitados, {} materiales",
            id,
            request.branch_id,
            request.guest_ids.len(),
            request.materials.len()
        );

        store
            .load(id)
            .await?
            .ok_or_else(|| not_found_error("EntranceRequest", id))
    }

    pub async fn get(&self, store: &dyn RequestStore, id: i64) -> AppResult<EntranceRequestAggregate> {
        store
            .load(id)
            .await?
            .ok_or_else(|| not_found_error("EntranceRequest", id))
    }

    /// Lista paginada; sin límite explícito se usa el configurado
    pub async fn list(
        &self,
        store: &dyn RequestStore,
        filter: &EntranceRequestFilter,
        page: Option<PageRequest>,
    ) -> AppResult<Page<EntranceRequest>> {
        let page = page.unwrap_or_else(|| PageRequest::with_default_limit(self.default_page_limit));
        store.list(filter, page).await
    }

    /// Cambia el estado, asignando responsables si se indican
    pub async fn set_status(
        &self,
        store: &dyn RequestStore,
        id: i64,
        status: RequestStatus,
        assignees: Assignees,
    ) -> AppResult<StatusChange> {
        let patch = EntranceRequestPatch {
            status: Some(status),
            authorizer_id: assignees.authorizer_id,
            security_id: assignees.security_id,
            ..EntranceRequestPatch::default()
        };
        self.update(store, id, patch).await
    }

    /// Valida el parche completo, lo guarda y, si la solicitud entra al
    /// estado aprobado, genera y envía el formato.
    ///
    /// Cualquier error de validación deja la solicitud intacta.
    pub async fn update(
        &self,
        store: &dyn RequestStore,
        id: i64,
        patch: EntranceRequestPatch,
    ) -> AppResult<StatusChange> {
        patch.validate()?;

        let current = store
            .find(id)
            .await?
            .ok_or_else(|| not_found_error("EntranceRequest", id))?;

        if let Some(branch_id) = patch.branch_id {
            if store.find_branch(branch_id).await?.is_none() {
                return Err(not_found_error("Branch", branch_id));
            }
        }
        if let Some(authorizer_id) = patch.authorizer_id {
            ensure_principal(store, "Authorizer", authorizer_id).await?;
        }
        if let Some(security_id) = patch.security_id {
            ensure_principal(store, "Security", security_id).await?;
        }
        if let Some(guest_ids) = &patch.guest_ids {
            ensure_guests(store, guest_ids).await?;
        }
        if patch.touches_window() {
            patch.resulting_window(&current)?;
        }

        let next_status = patch.status.unwrap_or(current.status);
        if !current.status.can_transition_to(next_status) {
            return Err(conflict_error(
                "EntranceRequest",
                &format!(
                    "transición no permitida de {} a {}",
                    current.status, next_status
                ),
            ));
        }

        let entering_approved = next_status == RequestStatus::Approved && current.status != RequestStatus::Approved;
        if entering_approved {
            let resulting = patch.apply_to(&current);
            if resulting.authorizer_id.is_none() {
                return Err(validation_error("authorizer_id", "la aprobación requiere autorizador"));
            }
            if resulting.security_id.is_none() {
                return Err(validation_error("security_id", "la aprobación requiere personal de seguridad"));
            }
        }

        let updated = store.apply_patch(id, &patch).await?;
        if current.status != updated.status {
            info!(
                "🔄 Solicitud {}: {} -> {}",
                id,
                current.status.label(),
                updated.status.label()
            );
        }

        let dispatch = if entering_approved {
            self.dispatch_document(store, id).await
        } else {
            DocumentDispatch::NotTriggered
        };

        Ok(StatusChange {
            previous_status: current.status,
            request: updated,
            dispatch,
        })
    }

    /// Genera el formato de la solicitud ya aprobada y lo envía al solicitante
    /// y al autorizador. Los fallos se registran y se reportan, no se propagan.
    async fn dispatch_document(&self, store: &dyn RequestStore, id: i64) -> DocumentDispatch {
        let aggregate = match store.load(id).await {
            Ok(Some(aggregate)) => aggregate,
            Ok(None) => {
                let reason = format!("solicitud {} no encontrada al generar el formato", id);
                error!("❌ {}", reason);
                return DocumentDispatch::ComposeFailed { reason };
            }
            Err(e) => {
                error!("❌ No se pudo cargar la solicitud {}: {}", id, e);
                return DocumentDispatch::ComposeFailed { reason: e.to_string() };
            }
        };

        let recipients = aggregate.notification_recipients();
        let composer = self.composer.clone();
        let composed = tokio::task::spawn_blocking(move || composer.compose_for(&aggregate))
            .await
            .map_err(|e| internal_error(&format!("Composición interrumpida: {}", e)))
            .and_then(|result| result);

        let document = match composed {
            Ok(document) => document,
            Err(e) => {
                error!("❌ Error generando el formato de la solicitud {}: {}", id, e);
                return DocumentDispatch::ComposeFailed { reason: e.to_string() };
            }
        };

        match self.mailer.send(&document, &recipients).await {
            Ok(true) => {
                info!("📧 Formato de la solicitud {} enviado a {:?}", id, recipients);
                DocumentDispatch::Sent { document }
            }
            Ok(false) => {
                warn!("⚠️ El servidor de correo rechazó el formato de la solicitud {}", id);
                DocumentDispatch::EmailFailed {
                    document,
                    reason: "mensaje rechazado".to_string(),
                }
            }
            Err(e) => {
                error!("❌ Error enviando el formato de la solicitud {}: {}", id, e);
                DocumentDispatch::EmailFailed {
                    document,
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn ensure_principal(store: &dyn RequestStore, role: &str, id: i64) -> AppResult<()> {
    match store.find_principal(id).await? {
        Some(_) => Ok(()),
        None => Err(not_found_error(role, id)),
    }
}

async fn ensure_guests(store: &dyn RequestStore, guest_ids: &[i64]) -> AppResult<()> {
    for guest_id in guest_ids {
        if !store.guest_exists(*guest_id).await? {
            return Err(not_found_error("Guest", guest_id));
        }
    }
    Ok(())
}
