//! Repositorios
//!
//! `RequestStore` es el único punto de acceso a datos que usan los servicios.
//! Cada operación recibe el store explícitamente; no hay sesión global.

pub mod entrance_repository;

use async_trait::async_trait;

use crate::models::{
    Branch, CreateEntranceRequest, EntranceRequest, EntranceRequestAggregate, EntranceRequestFilter,
    EntranceRequestPatch, Principal,
};
use crate::utils::errors::AppResult;
use crate::utils::pagination::{Page, PageRequest};

pub use entrance_repository::PgRequestStore;

/// Acceso a solicitudes de ingreso y a las entidades que referencian
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Solicitud completamente hidratada (sede, invitados, materiales y usuarios)
    async fn load(&self, id: i64) -> AppResult<Option<EntranceRequestAggregate>>;

    /// Fila de la solicitud sin relaciones
    async fn find(&self, id: i64) -> AppResult<Option<EntranceRequest>>;

    async fn find_branch(&self, id: i64) -> AppResult<Option<Branch>>;

    async fn find_principal(&self, id: i64) -> AppResult<Option<Principal>>;

    async fn guest_exists(&self, id: i64) -> AppResult<bool>;

    /// Inserta la solicitud, sus invitados y materiales. Retorna el id nuevo.
    async fn insert(&self, request: &CreateEntranceRequest) -> AppResult<i64>;

    /// Aplica el parche en una sola transacción y retorna la fila resultante
    async fn apply_patch(&self, id: i64, patch: &EntranceRequestPatch) -> AppResult<EntranceRequest>;

    async fn list(
        &self,
        filter: &EntranceRequestFilter,
        page: PageRequest,
    ) -> AppResult<Page<EntranceRequest>>;
}
