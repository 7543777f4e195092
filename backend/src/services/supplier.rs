//! Supplier service

use serde::Deserialize;
use shared::{validate_email, validate_name, PaginatedResponse, Pagination, Supplier};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_name, email, phone, is_active, created_at, updated_at";

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Query parameters for listing suppliers
#[derive(Debug, Deserialize, Validate, Default)]
pub struct SupplierQuery {
    #[validate(length(max = 120))]
    pub search: Option<String>,
    pub is_active: Option<bool>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier
    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;
        if let Some(ref email) = input.email {
            validate_email(email).map_err(|e| AppError::validation("email", e))?;
        }

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (name, contact_name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(&input.contact_name)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// Get a supplier by ID
    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Update a supplier
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get_supplier(supplier_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|e| AppError::validation("name", e))?;
        }
        if let Some(ref email) = input.email {
            validate_email(email).map_err(|e| AppError::validation("email", e))?;
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let contact_name = input.contact_name.or(existing.contact_name);
        let email = input.email.or(existing.email);
        let phone = input.phone.or(existing.phone);

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $2, contact_name = $3, email = $4, phone = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(supplier_id)
        .bind(&name)
        .bind(&contact_name)
        .bind(&email)
        .bind(&phone)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Deactivate a supplier
    pub async fn deactivate_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        tracing::info!(supplier_id = %supplier.id, "Supplier deactivated");
        Ok(supplier)
    }

    /// List suppliers ordered by name
    pub async fn list_suppliers(
        &self,
        query: SupplierQuery,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let filter = r#"
            WHERE ($1::text IS NULL OR name ILIKE $1 OR contact_name ILIKE $1)
              AND ($2::boolean IS NULL OR is_active = $2)
        "#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM suppliers {filter}"))
                .bind(&search)
                .bind(query.is_active)
                .fetch_one(&self.db)
                .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS}
            FROM suppliers
            {filter}
            ORDER BY name, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&search)
        .bind(query.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(suppliers, pagination, total.max(0) as u64))
    }
}
