//! Paginación por offset/limit

use serde::{Deserialize, Serialize};

/// Límite máximo de elementos por página
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Parámetros de paginación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Normaliza los valores: offset no negativo, limit entre 1 y `MAX_PAGE_LIMIT`
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn with_default_limit(default_limit: i64) -> Self {
        Self::new(0, default_limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 10)
    }
}

/// Respuesta paginada
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub total: i64,
    pub items: Vec<T>,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            total,
            items,
            offset: request.offset,
            limit: request.limit,
        }
    }

    /// Pagina una colección que ya está en memoria
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(request.offset as usize)
            .take(request.limit as usize)
            .collect();
        Self::new(items, total, request)
    }
}
