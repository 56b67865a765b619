//! Product repository
//!
//! Database operations for the catalog. Listings and partial updates run the
//! statements produced by [`crate::db::query`].

use crate::config::DatabaseDriver;
use crate::db::query::{
    build_list_query, build_update_query, search_key, SqlValue, PRODUCT_COLUMNS,
};
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{NewProduct, Product, ProductPatch, ProductQuery};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Product repository trait
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// List products matching the query, in the requested order
    async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>>;

    /// Get product by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Insert a product
    async fn create(&self, product: &NewProduct) -> Result<Product>;

    /// Apply a partial update and return the updated row, or `None` if the
    /// product does not exist. An empty patch just re-reads the row.
    async fn update(&self, id: i64, patch: &ProductPatch) -> Result<Option<Product>>;

    /// Delete a product; returns false if it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based product repository implementation
pub struct SqlxProductRepository {
    pool: DynDatabasePool,
}

impl SqlxProductRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProductRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_products_sqlite(sqlite_pool(&self.pool)?, query).await,
            DatabaseDriver::Mysql => list_products_mysql(mysql_pool(&self.pool)?, query).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_product_sqlite(sqlite_pool(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_product_mysql(mysql_pool(&self.pool)?, id).await,
        }
    }

    async fn create(&self, product: &NewProduct) -> Result<Product> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_product_sqlite(sqlite_pool(&self.pool)?, product).await
            }
            DatabaseDriver::Mysql => create_product_mysql(mysql_pool(&self.pool)?, product).await,
        }
    }

    async fn update(&self, id: i64, patch: &ProductPatch) -> Result<Option<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_product_sqlite(sqlite_pool(&self.pool)?, id, patch).await
            }
            DatabaseDriver::Mysql => {
                update_product_mysql(mysql_pool(&self.pool)?, id, patch).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_product_sqlite(sqlite_pool(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_product_mysql(mysql_pool(&self.pool)?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in binds {
        query = match value {
            SqlValue::Text(text) => query.bind(text.as_str()),
            SqlValue::Real(real) => query.bind(*real),
            SqlValue::Integer(int) => query.bind(*int),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

async fn list_products_sqlite(pool: &SqlitePool, query: &ProductQuery) -> Result<Vec<Product>> {
    let built = build_list_query(query);
    let rows = bind_sqlite(sqlx::query(&built.sql), &built.binds)
        .fetch_all(pool)
        .await
        .context("Failed to list products")?;

    rows.iter().map(row_to_product_sqlite).collect()
}

async fn get_product_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by ID")?;

    row.as_ref().map(row_to_product_sqlite).transpose()
}

async fn create_product_sqlite(pool: &SqlitePool, product: &NewProduct) -> Result<Product> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO products
            (name, name_search, description, price, image, category, count_in_stock,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.name)
    .bind(search_key(&product.name))
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.image)
    .bind(product.category.as_str())
    .bind(product.count_in_stock)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    Ok(inserted_product(result.last_insert_rowid(), product, now))
}

async fn update_product_sqlite(
    pool: &SqlitePool,
    id: i64,
    patch: &ProductPatch,
) -> Result<Option<Product>> {
    if let Some(built) = build_update_query(id, patch, Utc::now()) {
        let result = bind_sqlite(sqlx::query(&built.sql), &built.binds)
            .execute(pool)
            .await
            .context("Failed to update product")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
    }

    get_product_sqlite(pool, id).await
}

async fn delete_product_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_product_sqlite(row: &SqliteRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        category: row.try_get("category")?,
        count_in_stock: row.try_get("count_in_stock")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    binds: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in binds {
        query = match value {
            SqlValue::Text(text) => query.bind(text.as_str()),
            SqlValue::Real(real) => query.bind(*real),
            SqlValue::Integer(int) => query.bind(*int),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

async fn list_products_mysql(pool: &MySqlPool, query: &ProductQuery) -> Result<Vec<Product>> {
    let built = build_list_query(query);
    let rows = bind_mysql(sqlx::query(&built.sql), &built.binds)
        .fetch_all(pool)
        .await
        .context("Failed to list products")?;

    rows.iter().map(row_to_product_mysql).collect()
}

async fn get_product_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by ID")?;

    row.as_ref().map(row_to_product_mysql).transpose()
}

async fn create_product_mysql(pool: &MySqlPool, product: &NewProduct) -> Result<Product> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO products
            (name, name_search, description, price, image, category, count_in_stock,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.name)
    .bind(search_key(&product.name))
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.image)
    .bind(product.category.as_str())
    .bind(product.count_in_stock)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    Ok(inserted_product(result.last_insert_id() as i64, product, now))
}

async fn update_product_mysql(
    pool: &MySqlPool,
    id: i64,
    patch: &ProductPatch,
) -> Result<Option<Product>> {
    // updated_at always changes, so a matched row is always reported as affected
    if let Some(built) = build_update_query(id, patch, Utc::now()) {
        let result = bind_mysql(sqlx::query(&built.sql), &built.binds)
            .execute(pool)
            .await
            .context("Failed to update product")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
    }

    get_product_mysql(pool, id).await
}

async fn delete_product_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_product_mysql(row: &MySqlRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        category: row.try_get("category")?,
        count_in_stock: row.try_get("count_in_stock")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn inserted_product(id: i64, product: &NewProduct, now: chrono::DateTime<Utc>) -> Product {
    Product {
        id,
        name: product.name.clone(),
        description: product.description.clone(),
        price: product.price,
        image: product.image.clone(),
        category: product.category.to_string(),
        count_in_stock: product.count_in_stock,
        created_at: now,
        updated_at: now,
    }
}
