use std::collections::BTreeMap;

use anyhow::{Context, Result};
use mj_catalog::{Category, FilterOptions, Product, ProductDraft, ProductFilter, Section};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::{ilike_pattern, is_foreign_key_violation};

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, department, section, manufacturer, category,
    price_cents, stock, image_url, sold_out, featured, position
"#;

pub(crate) fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        department: row.try_get("department")?,
        section: Section::parse(&row.try_get::<String, _>("section")?)?,
        manufacturer: row.try_get("manufacturer")?,
        category: Category::parse(&row.try_get::<String, _>("category")?)?,
        price_cents: row.try_get("price_cents")?,
        stock: row.try_get("stock")?,
        image_url: row.try_get("image_url")?,
        sold_out: row.try_get("sold_out")?,
        featured: row.try_get("featured")?,
        position: row.try_get("position")?,
    })
}

fn products_from_rows(rows: &[PgRow]) -> Result<Vec<Product>> {
    rows.iter().map(product_from_row).collect()
}

/// Storefront listing. Mirrors [`ProductFilter::matches`] in SQL.
pub async fn list_products(pool: &PgPool, filter: &ProductFilter) -> Result<Vec<Product>> {
    let (min_cents, max_cents) = match filter.price_bucket {
        Some(b) => {
            let (lo, hi) = b.bounds_cents();
            (Some(lo), hi)
        }
        None => (None, None),
    };
    let manufacturer = filter.manufacturer.as_deref().filter(|m| !m.is_empty());

    let sql = format!(
        r#"
        select {PRODUCT_COLUMNS}
        from products
        where ($1::text is null
               or name ilike $1 or description ilike $1 or manufacturer ilike $1)
          and ($2::text is null or section = $2)
          and ($3::text is null or category = $3)
          and ($4::text is null or manufacturer = $4)
          and ($5::bigint is null or price_cents >= $5)
          and ($6::bigint is null or price_cents < $6)
          and (not $7 or stock > 0)
        order by position asc, id asc
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(filter.query_term().map(ilike_pattern))
        .bind(filter.section.map(|s| s.as_str()))
        .bind(filter.category.map(|c| c.as_str()))
        .bind(manufacturer)
        .bind(min_cents)
        .bind(max_cents)
        .bind(filter.in_stock_only)
        .fetch_all(pool)
        .await
        .context("list_products failed")?;

    products_from_rows(&rows)
}

/// Home page carousel: in-stock products, featured ones first, otherwise random.
pub async fn featured_products(pool: &PgPool, limit: i64) -> Result<Vec<Product>> {
    let sql = format!(
        r#"
        select {PRODUCT_COLUMNS}
        from products
        where stock > 0
        order by featured desc, random()
        limit $1
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("featured_products failed")?;

    products_from_rows(&rows)
}

pub async fn fetch_product(pool: &PgPool, product_id: i64) -> Result<Option<Product>> {
    let sql = format!("select {PRODUCT_COLUMNS} from products where id = $1");
    let row = sqlx::query(&sql)
        .bind(product_id)
        .fetch_optional(pool)
        .await
        .context("fetch_product failed")?;

    row.as_ref().map(product_from_row).transpose()
}

/// Same category, in stock, excluding the product itself, random order.
pub async fn related_products(pool: &PgPool, product_id: i64, limit: i64) -> Result<Vec<Product>> {
    let sql = format!(
        r#"
        select {PRODUCT_COLUMNS}
        from products
        where category = (select category from products where id = $1)
          and id <> $1
          and stock > 0
        order by random()
        limit $2
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(product_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("related_products failed")?;

    products_from_rows(&rows)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryListing {
    /// "CORTE_Y_PODA" -> "CORTE Y PODA"
    pub title: String,
    pub products: Vec<Product>,
}

/// Products of a category slug. When the slug matches no category products
/// it is tried as a section.
pub async fn products_by_category(pool: &PgPool, slug: &str) -> Result<CategoryListing> {
    let key = slug.trim().to_ascii_uppercase();
    let by_category = format!(
        "select {PRODUCT_COLUMNS} from products where category = $1 order by position asc, id asc"
    );
    let mut rows = sqlx::query(&by_category)
        .bind(&key)
        .fetch_all(pool)
        .await
        .context("products_by_category (category) failed")?;

    if rows.is_empty() {
        let by_section = format!(
            "select {PRODUCT_COLUMNS} from products where section = $1 order by position asc, id asc"
        );
        rows = sqlx::query(&by_section)
            .bind(&key)
            .fetch_all(pool)
            .await
            .context("products_by_category (section) failed")?;
    }

    Ok(CategoryListing {
        title: key.replace('_', " "),
        products: products_from_rows(&rows)?,
    })
}

pub async fn filter_options(pool: &PgPool) -> Result<FilterOptions> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        select distinct manufacturer
        from products
        where manufacturer <> ''
        order by manufacturer
        "#,
    )
    .fetch_all(pool)
    .await
    .context("filter_options failed")?;

    Ok(FilterOptions::from_manufacturers(
        rows.into_iter().map(|(m,)| m),
    ))
}

/// Insert a validated draft at the end of the manual ordering.
pub async fn insert_product(pool: &PgPool, draft: &ProductDraft) -> Result<Product> {
    let sql = format!(
        r#"
        insert into products (
          name, description, department, section, manufacturer, category,
          price_cents, stock, image_url, sold_out, featured, position
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
          (select coalesce(max(position), -1) + 1 from products)
        )
        returning {PRODUCT_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(draft.name.trim())
        .bind(&draft.description)
        .bind(&draft.department)
        .bind(draft.section.as_str())
        .bind(&draft.manufacturer)
        .bind(draft.category.as_str())
        .bind(draft.price_cents)
        .bind(draft.stock)
        .bind(&draft.image_url)
        .bind(draft.sold_out)
        .bind(draft.featured)
        .fetch_one(pool)
        .await
        .context("insert_product failed")?;

    product_from_row(&row)
}

/// Overwrite a product from a validated draft. `None` when the id is unknown.
pub async fn update_product(
    pool: &PgPool,
    product_id: i64,
    draft: &ProductDraft,
) -> Result<Option<Product>> {
    let sql = format!(
        r#"
        update products
        set name = $2,
            description = $3,
            department = $4,
            section = $5,
            manufacturer = $6,
            category = $7,
            price_cents = $8,
            stock = $9,
            image_url = $10,
            sold_out = $11,
            featured = $12,
            updated_at_utc = now()
        where id = $1
        returning {PRODUCT_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(product_id)
        .bind(draft.name.trim())
        .bind(&draft.description)
        .bind(&draft.department)
        .bind(draft.section.as_str())
        .bind(&draft.manufacturer)
        .bind(draft.category.as_str())
        .bind(draft.price_cents)
        .bind(draft.stock)
        .bind(&draft.image_url)
        .bind(draft.sold_out)
        .bind(draft.featured)
        .fetch_optional(pool)
        .await
        .context("update_product failed")?;

    row.as_ref().map(product_from_row).transpose()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Order lines still point at the row.
    Referenced,
}

pub async fn delete_product(pool: &PgPool, product_id: i64) -> Result<DeleteOutcome> {
    let res = sqlx::query("delete from products where id = $1")
        .bind(product_id)
        .execute(pool)
        .await;

    match res {
        Ok(r) if r.rows_affected() == 0 => Ok(DeleteOutcome::NotFound),
        Ok(_) => Ok(DeleteOutcome::Deleted),
        Err(e) if is_foreign_key_violation(&e) => Ok(DeleteOutcome::Referenced),
        Err(e) => Err(anyhow::Error::new(e).context("delete_product failed")),
    }
}

/// Manual ordering: `position` becomes the index in `ids`. Unknown ids are
/// ignored. Returns the number of rows updated.
pub async fn reorder_products(pool: &PgPool, ids: &[i64]) -> Result<u64> {
    let res = sqlx::query(
        r#"
        update products p
        set position = (o.ord - 1)::int,
            updated_at_utc = now()
        from unnest($1::bigint[]) with ordinality as o(id, ord)
        where p.id = o.id
        "#,
    )
    .bind(ids)
    .execute(pool)
    .await
    .context("reorder_products failed")?;

    Ok(res.rows_affected())
}

/// Current stock per product id, for storefront polling. Unknown ids are absent.
pub async fn stock_levels(pool: &PgPool, ids: &[i64]) -> Result<BTreeMap<i64, i32>> {
    if ids.is_empty() {
        return Ok(BTreeMap::new());
    }
    let rows: Vec<(i64, i32)> =
        sqlx::query_as("select id, stock from products where id = any($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
            .context("stock_levels failed")?;

    Ok(rows.into_iter().collect())
}
