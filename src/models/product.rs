//! Product model
//!
//! Catalog entities, the known category set, and the inputs used to list,
//! create and patch products.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Unit price; always finite and non-negative once stored
    pub price: f64,
    /// Image URL
    pub image: String,
    /// Category name in canonical casing
    pub category: String,
    pub count_in_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The categories the shop filters by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductCategory {
    Electronics,
    Fashion,
    Home,
    Fitness,
    Accessories,
}

impl ProductCategory {
    /// Every category, in display order
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::Electronics,
        ProductCategory::Fashion,
        ProductCategory::Home,
        ProductCategory::Fitness,
        ProductCategory::Accessories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Electronics => "Electronics",
            ProductCategory::Fashion => "Fashion",
            ProductCategory::Home => "Home",
            ProductCategory::Fitness => "Fitness",
            ProductCategory::Accessories => "Accessories",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = anyhow::Error;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("Invalid product category: {}", s))
    }
}

/// Input for creating a product.
///
/// Fields are optional so that missing values surface as validation errors
/// rather than body parse failures.
#[derive(Debug, Clone, Default)]
pub struct CreateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub count_in_stock: Option<i64>,
}

/// A validated product ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub category: ProductCategory,
    pub count_in_stock: i64,
}

/// A partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub count_in_stock: Option<i64>,
}

impl ProductPatch {
    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image.is_none()
            && self.category.is_none()
            && self.count_in_stock.is_none()
    }
}

/// Ordering of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    /// Newest first
    #[default]
    Newest,
}

impl ProductSort {
    /// Parse the `sort` query parameter. Unknown values mean newest first.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some("price-asc") => ProductSort::PriceAsc,
            Some("price-desc") => ProductSort::PriceDesc,
            _ => ProductSort::Newest,
        }
    }
}

/// Filters for listing products.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// Case-insensitive substring of the product name
    pub search: Option<String>,
    /// Exact category name
    pub category: Option<String>,
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Build a query from raw request parameters.
    ///
    /// Blank search text and a blank or `all` category are dropped.
    pub fn from_params(search: Option<&str>, category: Option<&str>, sort: Option<&str>) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string);

        Self {
            search,
            category,
            sort: ProductSort::from_param(sort),
        }
    }
}
