//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema PostgreSQL
//! de solicitudes de ingreso.

pub mod branch;
pub mod entrance;
pub mod guest;
pub mod user;

pub use branch::{Branch, BranchDetail, BranchType};
pub use entrance::{
    CreateEntranceRequest, EntranceRequest, EntranceRequestAggregate, EntranceRequestFilter,
    EntranceRequestPatch, Material, MaterialInput, RequestStatus, TimeWindow,
};
pub use guest::GuestDetail;
pub use user::Principal;
