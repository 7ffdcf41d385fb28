use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Product, UpdateProduct};

const COLUMNS: &str = "id, name, brand, category, size, unit, image_url, description, created_at";

pub async fn insert(pool: &PgPool, product: &Product) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO products (id, name, brand, category, size, unit, image_url, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.brand)
    .bind(&product.category)
    .bind(product.size)
    .bind(&product.unit)
    .bind(&product.image_url)
    .bind(&product.description)
    .bind(product.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_id(pool: &PgPool, product_id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
        .bind(product_id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_by_category(
    pool: &PgPool,
    category: &str,
) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE LOWER(category) = LOWER($1) ORDER BY name ASC"
    ))
    .bind(category)
    .fetch_all(pool)
    .await
}

pub async fn fetch_by_brand(pool: &PgPool, brand: &str) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE LOWER(brand) = LOWER($1) ORDER BY name ASC"
    ))
    .bind(brand)
    .fetch_all(pool)
    .await
}

pub async fn search_by_name(pool: &PgPool, query: &str) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE name ILIKE $1 ORDER BY name ASC"
    ))
    .bind(format!("%{query}%"))
    .fetch_all(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    product_id: Uuid,
    changes: &UpdateProduct,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = COALESCE($1, name),
            brand = COALESCE($2, brand),
            category = COALESCE($3, category),
            size = COALESCE($4, size),
            unit = COALESCE($5, unit),
            image_url = COALESCE($6, image_url),
            description = COALESCE($7, description)
        WHERE id = $8
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.brand)
    .bind(&changes.category)
    .bind(changes.size)
    .bind(&changes.unit)
    .bind(&changes.image_url)
    .bind(&changes.description)
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, product_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
