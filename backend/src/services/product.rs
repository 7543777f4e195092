//! Product catalog service

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    check_threshold, validate_name, validate_sku, PaginatedResponse, Pagination, Product,
    SortDirection,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

const PRODUCT_COLUMNS: &str = "id, sku, name, description, unit, min_stock, \
                               preferred_supplier_id, is_active, created_at, updated_at";

/// Product service for managing the catalog
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub min_stock: Decimal,
    pub preferred_supplier_id: Option<Uuid>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub min_stock: Option<Decimal>,
    pub preferred_supplier_id: Option<Uuid>,
}

/// Sortable product fields
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortField {
    #[default]
    Name,
    Sku,
    CreatedAt,
}

impl ProductSortField {
    fn column(&self) -> &'static str {
        match self {
            ProductSortField::Name => "name",
            ProductSortField::Sku => "sku",
            ProductSortField::CreatedAt => "created_at",
        }
    }
}

/// Query parameters for listing products
#[derive(Debug, Deserialize, Validate, Default)]
pub struct ProductQuery {
    /// Case-insensitive match on name or SKU
    #[validate(length(max = 120))]
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub sort: ProductSortField,
    #[serde(default = "ascending")]
    pub direction: SortDirection,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

fn ascending() -> SortDirection {
    SortDirection::Asc
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        let sku = input.sku.trim().to_uppercase();
        validate_sku(&sku).map_err(|e| AppError::validation("sku", e))?;
        validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;
        check_threshold(input.min_stock)?;
        if let Some(supplier_id) = input.preferred_supplier_id {
            self.ensure_supplier(supplier_id).await?;
        }

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (sku, name, description, unit, min_stock, preferred_supplier_id)
            VALUES ($1, $2, $3, COALESCE($4, 'unit'), $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&sku)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.unit)
        .bind(input.min_stock)
        .bind(input.preferred_supplier_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "sku"))?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Update a product.
    ///
    /// The product's minimum is the default for new ledger rows; existing rows
    /// keep their own threshold.
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get_product(product_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|e| AppError::validation("name", e))?;
        }
        if let Some(min_stock) = input.min_stock {
            check_threshold(min_stock)?;
        }
        if let Some(supplier_id) = input.preferred_supplier_id {
            self.ensure_supplier(supplier_id).await?;
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let unit = input.unit.unwrap_or(existing.unit);
        let min_stock = input.min_stock.unwrap_or(existing.min_stock);
        let preferred_supplier_id = input
            .preferred_supplier_id
            .or(existing.preferred_supplier_id);

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, unit = $4, min_stock = $5,
                preferred_supplier_id = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(&name)
        .bind(&description)
        .bind(&unit)
        .bind(min_stock)
        .bind(preferred_supplier_id)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// Deactivate a product; its ledger and alert history stay intact
    pub async fn deactivate_product(&self, product_id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product deactivated");
        Ok(product)
    }

    /// List products
    pub async fn list_products(&self, query: ProductQuery) -> AppResult<PaginatedResponse<Product>> {
        query.validate()?;
        let pagination = Pagination::from_query(query.page, query.per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let filter = r#"
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::boolean IS NULL OR is_active = $2)
              AND ($3::uuid IS NULL OR preferred_supplier_id = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM products {filter}"))
            .bind(&search)
            .bind(query.is_active)
            .bind(query.supplier_id)
            .fetch_one(&self.db)
            .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            {filter}
            ORDER BY {} {}, id
            LIMIT $4 OFFSET $5
            "#,
            query.sort.column(),
            query.direction.as_sql()
        ))
        .bind(&search)
        .bind(query.is_active)
        .bind(query.supplier_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(products, pagination, total.max(0) as u64))
    }

    async fn ensure_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(supplier_id)
                .fetch_one(&self.db)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Supplier".to_string()))
        }
    }
}
