use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::{
    Branch, BranchDetail, CreateEntranceRequest, EntranceRequest, EntranceRequestAggregate,
    EntranceRequestFilter, EntranceRequestPatch, GuestDetail, Material, Principal,
};
use crate::repositories::RequestStore;
use crate::utils::errors::{not_found_error, AppResult};
use crate::utils::pagination::{Page, PageRequest};

const REQUEST_COLUMNS: &str = "id, branch_id, entry_date, departure_date, reason, status, \
     is_installation, is_uninstallation, creator_id, authorizer_id, security_id";

/// Implementación PostgreSQL del store de solicitudes
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_branch_detail(&self, id: i64) -> AppResult<Option<BranchDetail>> {
        let branch = sqlx::query_as::<_, BranchDetail>(
            r#"
            SELECT b.id, b.code, b.name, b.address, b.type AS branch_type,
                   m.name AS municipality_name, b.is_j10
            FROM branches b
            JOIN municipalities m ON m.id = b.municipality_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    async fn find_guests(&self, request_id: i64) -> AppResult<Vec<GuestDetail>> {
        let guests = sqlx::query_as::<_, GuestDetail>(
            r#"
            SELECT g.id, g.document_id, g.name, g.phone_number, g.email,
                   eps.name AS health_insurer, arl.name AS risk_insurer,
                   emp.name AS employer, c.name AS city
            FROM entrance_requests_guests l
            JOIN guests g ON g.id = l.guest_id
            JOIN companies eps ON eps.id = g.eps_id
            JOIN companies arl ON arl.id = g.arl_id
            JOIN companies emp ON emp.id = g.company_id
            JOIN cities c ON c.id = g.city_id
            WHERE l.entrance_request_id = $1
            ORDER BY l.id
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(guests)
    }

    async fn find_materials(&self, request_id: i64) -> AppResult<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(
            r#"
            SELECT id, entrance_request_id, model, serial, description, quantity
            FROM materials
            WHERE entrance_request_id = $1
            ORDER BY id
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(materials)
    }

    async fn find_optional_principal(&self, id: Option<i64>) -> AppResult<Option<Principal>> {
        match id {
            Some(id) => self.find_principal(id).await,
            None => Ok(None),
        }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EntranceRequestFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(security_id) = filter.security_id {
        builder.push(" AND security_id = ").push_bind(security_id);
    }
    if let Some(creator_id) = filter.creator_id {
        builder.push(" AND creator_id = ").push_bind(creator_id);
    }
    if let Some(authorizer_id) = filter.authorizer_id {
        builder.push(" AND authorizer_id = ").push_bind(authorizer_id);
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn load(&self, id: i64) -> AppResult<Option<EntranceRequestAggregate>> {
        let Some(request) = self.find(id).await? else {
            return Ok(None);
        };

        let branch = self
            .find_branch_detail(request.branch_id)
            .await?
            .ok_or_else(|| not_found_error("Branch", request.branch_id))?;
        let guests = self.find_guests(id).await?;
        let materials = self.find_materials(id).await?;
        let creator = self.find_optional_principal(request.creator_id).await?;
        let authorizer = self.find_optional_principal(request.authorizer_id).await?;
        let security = self.find_optional_principal(request.security_id).await?;

        Ok(Some(EntranceRequestAggregate {
            request,
            branch,
            guests,
            materials,
            creator,
            authorizer,
            security,
        }))
    }

    async fn find(&self, id: i64) -> AppResult<Option<EntranceRequest>> {
        let request = sqlx::query_as::<_, EntranceRequest>(&format!(
            "SELECT {} FROM entrance_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_branch(&self, id: i64) -> AppResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, code, name, address, type, department_id, municipality_id, is_j10
            FROM branches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    async fn find_principal(&self, id: i64) -> AppResult<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            r#"
            SELECT u.id, u.name, un.name AS unit_name, p.name AS position_name,
                   u.phone_number, u.email
            FROM users u
            JOIN units un ON un.id = u.unit_id
            JOIN positions p ON p.id = u.position_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn guest_exists(&self, id: i64) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM guests WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }

    async fn insert(&self, request: &CreateEntranceRequest) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO entrance_requests (
                branch_id, entry_date, departure_date, reason, status,
                is_installation, is_uninstallation, creator_id, authorizer_id, security_id
            )
            VALUES ($1, $2, $3, $4, 'auth_pending', $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(request.branch_id)
        .bind(request.entry_date)
        .bind(request.departure_date)
        .bind(&request.reason)
        .bind(request.is_installation)
        .bind(request.is_uninstallation)
        .bind(request.creator_id)
        .bind(request.authorizer_id)
        .bind(request.security_id)
        .fetch_one(&mut *tx)
        .await?;

        for guest_id in &request.guest_ids {
            sqlx::query(
                "INSERT INTO entrance_requests_guests (entrance_request_id, guest_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(guest_id)
            .execute(&mut *tx)
            .await?;
        }

        for material in &request.materials {
            sqlx::query(
                r#"
                INSERT INTO materials (entrance_request_id, model, serial, description, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(&material.model)
            .bind(&material.serial)
            .bind(&material.description)
            .bind(material.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn apply_patch(&self, id: i64, patch: &EntranceRequestPatch) -> AppResult<EntranceRequest> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, EntranceRequest>(&format!(
            r#"
            UPDATE entrance_requests
            SET branch_id = COALESCE($2, branch_id),
                entry_date = COALESCE($3, entry_date),
                departure_date = COALESCE($4, departure_date),
                reason = COALESCE($5, reason),
                status = COALESCE($6, status),
                authorizer_id = COALESCE($7, authorizer_id),
                security_id = COALESCE($8, security_id),
                is_installation = COALESCE($9, is_installation),
                is_uninstallation = COALESCE($10, is_uninstallation)
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(patch.branch_id)
        .bind(patch.entry_date)
        .bind(patch.departure_date)
        .bind(&patch.reason)
        .bind(patch.status)
        .bind(patch.authorizer_id)
        .bind(patch.security_id)
        .bind(patch.is_installation)
        .bind(patch.is_uninstallation)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found_error("EntranceRequest", id))?;

        if let Some(guest_ids) = &patch.guest_ids {
            sqlx::query("DELETE FROM entrance_requests_guests WHERE entrance_request_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for guest_id in guest_ids {
                sqlx::query(
                    "INSERT INTO entrance_requests_guests (entrance_request_id, guest_id) VALUES ($1, $2)",
                )
                .bind(id)
                .bind(guest_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn list(
        &self,
        filter: &EntranceRequestFilter,
        page: PageRequest,
    ) -> AppResult<Page<EntranceRequest>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM entrance_requests");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM entrance_requests",
            REQUEST_COLUMNS
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY entry_date DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let items = query
            .build_query_as::<EntranceRequest>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }
}
