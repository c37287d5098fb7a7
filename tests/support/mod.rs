//! Dobles de prueba: store en memoria, mailer que registra envíos y una
//! plantilla xlsx mínima con la forma del formato real.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use entrance_permits::models::{
    Branch, BranchDetail, BranchType, CreateEntranceRequest, EntranceRequest, EntranceRequestAggregate,
    EntranceRequestFilter, EntranceRequestPatch, GuestDetail, Material, MaterialInput, Principal,
    RequestStatus,
};
use entrance_permits::repositories::RequestStore;
use entrance_permits::services::Mailer;
use entrance_permits::utils::errors::{not_found_error, AppError, AppResult};
use entrance_permits::utils::pagination::{Page, PageRequest};

pub const CREATOR_ID: i64 = 1;
pub const AUTHORIZER_ID: i64 = 2;
pub const SECURITY_ID: i64 = 3;
pub const BRANCH_ID: i64 = 10;

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    branches: HashMap<i64, BranchDetail>,
    principals: HashMap<i64, Principal>,
    guests: HashMap<i64, GuestDetail>,
    requests: HashMap<i64, EntranceRequest>,
    guest_links: HashMap<i64, Vec<i64>>,
    materials: Vec<Material>,
}

/// Store en memoria con la misma semántica que el de PostgreSQL
#[derive(Default)]
pub struct InMemoryRequestStore {
    state: Mutex<StoreState>,
}

impl InMemoryRequestStore {
    /// Sede técnica, tres usuarios y tres invitados
    pub fn seeded() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.branches.insert(
                BRANCH_ID,
                BranchDetail {
                    id: BRANCH_ID,
                    code: "BOG01".to_string(),
                    name: "Central Norte".to_string(),
                    address: Some("Calle 100 # 10-20".to_string()),
                    branch_type: BranchType::Technical,
                    municipality_name: "Bogotá".to_string(),
                    is_j10: false,
                },
            );
            for (id, name) in [
                (CREATOR_ID, "Ana Pérez"),
                (AUTHORIZER_ID, "Luis Gómez"),
                (SECURITY_ID, "Marta Ruiz"),
            ] {
                state.principals.insert(
                    id,
                    Principal {
                        id,
                        name: name.to_string(),
                        unit_name: "Operaciones".to_string(),
                        position_name: "Ingeniero".to_string(),
                        phone_number: format!("30000000{:02}", id),
                        email: format!("user{}@empresa.co", id),
                    },
                );
            }
            for id in 100..103 {
                state.guests.insert(
                    id,
                    GuestDetail {
                        id,
                        document_id: format!("79{}", id),
                        name: format!("Invitado {}", id),
                        phone_number: "3110000000".to_string(),
                        email: format!("guest{}@contratista.co", id),
                        health_insurer: "Sura EPS".to_string(),
                        risk_insurer: "Positiva".to_string(),
                        employer: "Contratista SAS".to_string(),
                        city: "Bogotá".to_string(),
                    },
                );
            }
        }
        store
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn status_of(&self, id: i64) -> Option<RequestStatus> {
        self.state.lock().unwrap().requests.get(&id).map(|r| r.status)
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn load(&self, id: i64) -> AppResult<Option<EntranceRequestAggregate>> {
        let state = self.state.lock().unwrap();
        let Some(request) = state.requests.get(&id).cloned() else {
            return Ok(None);
        };

        let branch = state
            .branches
            .get(&request.branch_id)
            .cloned()
            .ok_or_else(|| not_found_error("Branch", request.branch_id))?;
        let guests = state
            .guest_links
            .get(&id)
            .map(|ids| ids.iter().filter_map(|g| state.guests.get(g).cloned()).collect())
            .unwrap_or_default();
        let materials = state
            .materials
            .iter()
            .filter(|m| m.entrance_request_id == id)
            .cloned()
            .collect();
        let principal = |id: Option<i64>| id.and_then(|id| state.principals.get(&id).cloned());

        Ok(Some(EntranceRequestAggregate {
            creator: principal(request.creator_id),
            authorizer: principal(request.authorizer_id),
            security: principal(request.security_id),
            request,
            branch,
            guests,
            materials,
        }))
    }

    async fn find(&self, id: i64) -> AppResult<Option<EntranceRequest>> {
        Ok(self.state.lock().unwrap().requests.get(&id).cloned())
    }

    async fn find_branch(&self, id: i64) -> AppResult<Option<Branch>> {
        Ok(self.state.lock().unwrap().branches.get(&id).map(|detail| Branch {
            id: detail.id,
            code: detail.code.clone(),
            name: detail.name.clone(),
            address: detail.address.clone(),
            branch_type: detail.branch_type,
            department_id: 1,
            municipality_id: 1,
            is_j10: detail.is_j10,
        }))
    }

    async fn find_principal(&self, id: i64) -> AppResult<Option<Principal>> {
        Ok(self.state.lock().unwrap().principals.get(&id).cloned())
    }

    async fn guest_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.state.lock().unwrap().guests.contains_key(&id))
    }

    async fn insert(&self, request: &CreateEntranceRequest) -> AppResult<i64> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;

        state.requests.insert(
            id,
            EntranceRequest {
                id,
                branch_id: request.branch_id,
                entry_date: request.entry_date,
                departure_date: request.departure_date,
                reason: request.reason.clone(),
                status: RequestStatus::AuthPending,
                is_installation: request.is_installation,
                is_uninstallation: request.is_uninstallation,
                creator_id: Some(request.creator_id),
                authorizer_id: Some(request.authorizer_id),
                security_id: request.security_id,
            },
        );
        state.guest_links.insert(id, request.guest_ids.clone());

        let first_material = state.materials.len() as i64 + 1;
        for (offset, material) in request.materials.iter().enumerate() {
            state.materials.push(Material {
                id: first_material + offset as i64,
                entrance_request_id: id,
                model: material.model.clone(),
                serial: material.serial.clone(),
                description: material.description.clone(),
                quantity: material.quantity,
            });
        }

        Ok(id)
    }

    async fn apply_patch(&self, id: i64, patch: &EntranceRequestPatch) -> AppResult<EntranceRequest> {
        let mut state = self.state.lock().unwrap();
        let current = state
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error("EntranceRequest", id))?;

        let updated = patch.apply_to(&current);
        state.requests.insert(id, updated.clone());
        if let Some(guest_ids) = &patch.guest_ids {
            state.guest_links.insert(id, guest_ids.clone());
        }
        Ok(updated)
    }

    async fn list(
        &self,
        filter: &EntranceRequestFilter,
        page: PageRequest,
    ) -> AppResult<Page<EntranceRequest>> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<EntranceRequest> = state
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.entry_date.cmp(&a.entry_date).then(b.id.cmp(&a.id)));
        Ok(Page::from_vec(matching, page))
    }
}

/// Mailer que guarda cada envío en memoria
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(PathBuf, Vec<String>)>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, file: &Path, recipients: &[String]) -> AppResult<bool> {
        if self.failing {
            return Err(AppError::Email("servidor SMTP no disponible".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((file.to_path_buf(), recipients.to_vec()));
        Ok(true)
    }
}

/// Escribe una plantilla mínima con la fila modelo de invitados (15) y la
/// de equipos (22), y etiquetas en el bloque de firmas (28 a 31)
pub fn write_template(path: &Path) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_active_sheet_mut();
    sheet.get_cell_mut((2, 2)).set_value("FORMATO DE INGRESO");
    sheet.get_cell_mut((2, 14)).set_value("NOMBRE");
    sheet.get_cell_mut((2, 15)).get_style_mut().get_font_mut().set_bold(true);
    sheet.get_cell_mut((16, 15)).set_value("");
    sheet.add_merge_cells("B15:C15");
    sheet.get_cell_mut((2, 21)).set_value("CANTIDAD");
    sheet.add_merge_cells("E22:I22");
    sheet.get_cell_mut((1, 28)).set_value("Nombre");
    sheet.get_cell_mut((1, 29)).set_value("Dependencia");
    sheet.get_cell_mut((1, 30)).set_value("Cargo");
    sheet.get_cell_mut((1, 31)).set_value("Teléfono");
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

pub fn cell_text(path: &Path, column: u32, row: u32) -> String {
    let book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
    book.get_active_sheet()
        .get_cell((column, row))
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}

/// Solicitud válida con los invitados indicados y dos equipos
pub fn new_request(guest_ids: Vec<i64>) -> CreateEntranceRequest {
    CreateEntranceRequest {
        branch_id: BRANCH_ID,
        guest_ids,
        entry_date: at(1, 8),
        departure_date: at(1, 17),
        reason: "Cambio de equipos de transmisión".to_string(),
        is_installation: true,
        is_uninstallation: false,
        creator_id: CREATOR_ID,
        authorizer_id: AUTHORIZER_ID,
        security_id: None,
        materials: vec![
            MaterialInput {
                model: "Router X1".to_string(),
                serial: Some("SN-001".to_string()),
                description: Some("Router de borde".to_string()),
                quantity: 1,
            },
            MaterialInput {
                model: "Switch S2".to_string(),
                serial: None,
                description: None,
                quantity: 2,
            },
        ],
    }
}
