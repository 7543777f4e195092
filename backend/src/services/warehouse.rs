//! Warehouse service

use serde::Deserialize;
use shared::{validate_name, validate_warehouse_code, PaginatedResponse, Pagination, Warehouse};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

const WAREHOUSE_COLUMNS: &str = "id, code, name, location, is_active, created_at, updated_at";

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub code: String,
    pub name: String,
    pub location: Option<String>,
}

/// Input for updating a warehouse; the code is immutable
#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Query parameters for listing warehouses
#[derive(Debug, Deserialize, Validate, Default)]
pub struct WarehouseQuery {
    pub is_active: Option<bool>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse
    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        let code = input.code.trim().to_uppercase();
        validate_warehouse_code(&code).map_err(|e| AppError::validation("code", e))?;
        validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            INSERT INTO warehouses (code, name, location)
            VALUES ($1, $2, $3)
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(&input.location)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "code"))?;

        tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse created");
        Ok(warehouse)
    }

    /// Get a warehouse by ID
    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Update a warehouse
    pub async fn update_warehouse(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        let existing = self.get_warehouse(warehouse_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|e| AppError::validation("name", e))?;
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let location = input.location.or(existing.location);

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            UPDATE warehouses SET name = $2, location = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(warehouse_id)
        .bind(&name)
        .bind(&location)
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse)
    }

    /// Deactivate a warehouse; stock can no longer be received into it
    pub async fn deactivate_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            UPDATE warehouses SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse deactivated");
        Ok(warehouse)
    }

    /// List warehouses ordered by code
    pub async fn list_warehouses(
        &self,
        query: WarehouseQuery,
    ) -> AppResult<PaginatedResponse<Warehouse>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouses WHERE ($1::boolean IS NULL OR is_active = $1)",
        )
        .bind(query.is_active)
        .fetch_one(&self.db)
        .await?;

        let warehouses = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            SELECT {WAREHOUSE_COLUMNS}
            FROM warehouses
            WHERE ($1::boolean IS NULL OR is_active = $1)
            ORDER BY code
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(query.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(warehouses, pagination, total.max(0) as u64))
    }
}
