//! Product service
//!
//! Catalog reads for everyone and validated writes for administrators.
//! Authorization happens in the HTTP layer; this service only checks the
//! shape of the data.

use crate::db::repositories::ProductRepository;
use crate::models::{
    CreateProductInput, NewProduct, Product, ProductCategory, ProductPatch, ProductQuery,
};
use std::sync::Arc;

/// Error types for product service operations
#[derive(Debug, thiserror::Error)]
pub enum ProductServiceError {
    /// Product not found
    #[error("Product not found")]
    NotFound(i64),

    /// Validation error
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Product service for catalog management
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    /// List products matching the query; no pagination.
    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, ProductServiceError> {
        Ok(self.repo.list(query).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Product, ProductServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(ProductServiceError::NotFound(id))
    }

    /// Validate and insert a product.
    ///
    /// Name, description, image, category and price are required;
    /// `count_in_stock` defaults to 0.
    pub async fn create(&self, input: CreateProductInput) -> Result<Product, ProductServiceError> {
        let product = validate_create_input(input)?;
        let created = self.repo.create(&product).await?;
        tracing::info!("Created product {} ({})", created.id, created.name);
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an empty patch or an invalid present field
    /// - `NotFound` if the product does not exist
    pub async fn update(&self, id: i64, patch: ProductPatch) -> Result<Product, ProductServiceError> {
        let patch = validate_patch(patch)?;
        let updated = self
            .repo
            .update(id, &patch)
            .await?
            .ok_or(ProductServiceError::NotFound(id))?;
        tracing::info!("Updated product {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProductServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ProductServiceError::NotFound(id));
        }
        tracing::info!("Deleted product {}", id);
        Ok(())
    }
}

fn required_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_create_input(input: CreateProductInput) -> Result<NewProduct, ProductServiceError> {
    let missing =
        || ProductServiceError::ValidationError("Please provide all required fields".to_string());

    let name = required_text(input.name).ok_or_else(missing)?;
    let description = required_text(input.description).ok_or_else(missing)?;
    let image = required_text(input.image).ok_or_else(missing)?;
    let category = required_text(input.category).ok_or_else(missing)?;
    let price = input.price.ok_or_else(missing)?;
    let count_in_stock = input.count_in_stock.unwrap_or(0);

    Ok(NewProduct {
        name,
        description,
        price: validate_price(price)?,
        image,
        category: parse_category(&category)?,
        count_in_stock: validate_stock(count_in_stock)?,
    })
}

/// Check present fields and canonicalize the category.
fn validate_patch(patch: ProductPatch) -> Result<ProductPatch, ProductServiceError> {
    if patch.is_empty() {
        return Err(ProductServiceError::ValidationError(
            "No fields to update".to_string(),
        ));
    }

    let not_blank = |field: &str, value: Option<String>| match value {
        Some(v) if v.trim().is_empty() => Err(ProductServiceError::ValidationError(format!(
            "{} cannot be empty",
            field
        ))),
        other => Ok(other.map(|v| v.trim().to_string())),
    };

    Ok(ProductPatch {
        name: not_blank("Name", patch.name)?,
        description: not_blank("Description", patch.description)?,
        price: patch.price.map(validate_price).transpose()?,
        image: not_blank("Image", patch.image)?,
        category: patch
            .category
            .map(|c| parse_category(&c).map(|c| c.to_string()))
            .transpose()?,
        count_in_stock: patch.count_in_stock.map(validate_stock).transpose()?,
    })
}

fn validate_price(price: f64) -> Result<f64, ProductServiceError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ProductServiceError::ValidationError(
            "Price must be a non-negative number".to_string(),
        ));
    }
    Ok(price)
}

fn validate_stock(count: i64) -> Result<i64, ProductServiceError> {
    if count < 0 {
        return Err(ProductServiceError::ValidationError(
            "Stock count cannot be negative".to_string(),
        ));
    }
    Ok(count)
}

fn parse_category(value: &str) -> Result<ProductCategory, ProductServiceError> {
    value.parse().map_err(|_| {
        let known: Vec<&str> = ProductCategory::ALL.iter().map(|c| c.as_str()).collect();
        ProductServiceError::ValidationError(format!(
            "Invalid category '{}'. Expected one of: {}",
            value,
            known.join(", ")
        ))
    })
}
