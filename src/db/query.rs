//! Product query builder
//!
//! Turns a [`ProductQuery`] or a [`ProductPatch`] into one parameterized
//! statement plus its ordered bind values. User text only ever travels as a
//! bind value; the SQL text is assembled from fixed fragments.
//!
//! The placeholders are `?`, which both SQLite and MySQL accept.

use chrono::{DateTime, Utc};

use crate::models::{ProductPatch, ProductQuery, ProductSort};

/// Columns selected for every product read
pub const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image, category, count_in_stock, created_at, updated_at";

/// Escape character used in LIKE patterns
const LIKE_ESCAPE: char = '!';

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Real(f64),
    Integer(i64),
    Timestamp(DateTime<Utc>),
}

/// SQL text with its bind values in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

impl BuiltQuery {
    fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Build the SELECT for a product listing.
pub fn build_list_query(query: &ProductQuery) -> BuiltQuery {
    let mut sql = format!("SELECT {} FROM products WHERE 1=1", PRODUCT_COLUMNS);
    let mut binds = Vec::new();

    if let Some(search) = &query.search {
        sql.push_str(" AND name_search LIKE ? ESCAPE '!'");
        binds.push(SqlValue::Text(format!(
            "%{}%",
            escape_like(&search_key(search))
        )));
    }

    if let Some(category) = &query.category {
        sql.push_str(" AND category = ?");
        binds.push(SqlValue::Text(category.clone()));
    }

    sql.push_str(match query.sort {
        ProductSort::PriceAsc => " ORDER BY price ASC, id ASC",
        ProductSort::PriceDesc => " ORDER BY price DESC, id ASC",
        ProductSort::Newest => " ORDER BY created_at DESC, id DESC",
    });

    let built = BuiltQuery { sql, binds };
    debug_assert_eq!(built.placeholder_count(), built.binds.len());
    built
}

/// Build the UPDATE for a partial product change.
///
/// Only present fields are assigned; `updated_at` is always refreshed.
/// Returns `None` for an empty patch.
pub fn build_update_query(id: i64, patch: &ProductPatch, now: DateTime<Utc>) -> Option<BuiltQuery> {
    if patch.is_empty() {
        return None;
    }

    let mut assignments: Vec<&'static str> = Vec::new();
    let mut binds = Vec::new();

    if let Some(name) = &patch.name {
        assignments.push("name = ?");
        binds.push(SqlValue::Text(name.clone()));
        assignments.push("name_search = ?");
        binds.push(SqlValue::Text(search_key(name)));
    }
    if let Some(description) = &patch.description {
        assignments.push("description = ?");
        binds.push(SqlValue::Text(description.clone()));
    }
    if let Some(price) = patch.price {
        assignments.push("price = ?");
        binds.push(SqlValue::Real(price));
    }
    if let Some(image) = &patch.image {
        assignments.push("image = ?");
        binds.push(SqlValue::Text(image.clone()));
    }
    if let Some(category) = &patch.category {
        assignments.push("category = ?");
        binds.push(SqlValue::Text(category.clone()));
    }
    if let Some(count) = patch.count_in_stock {
        assignments.push("count_in_stock = ?");
        binds.push(SqlValue::Integer(count));
    }

    assignments.push("updated_at = ?");
    binds.push(SqlValue::Timestamp(now));
    binds.push(SqlValue::Integer(id));

    let built = BuiltQuery {
        sql: format!("UPDATE products SET {} WHERE id = ?", assignments.join(", ")),
        binds,
    };
    debug_assert_eq!(built.placeholder_count(), built.binds.len());
    Some(built)
}

/// Case-folded form of a product name, stored in `name_search`.
///
/// Folding happens here rather than in SQL because SQLite's `LOWER` only
/// handles ASCII.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Escape LIKE wildcards so the text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
