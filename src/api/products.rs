//! Product API endpoints
//!
//! Public:
//! - GET /api/products - List with optional `search`, `category`, `sort`
//! - GET /api/products/categories - Known categories
//! - GET /api/products/{id} - One product
//!
//! Admin (bearer token with the admin flag):
//! - POST /api/products
//! - PUT /api/products/{id}
//! - DELETE /api/products/{id}

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, JsonBody};
use crate::models::{CreateProductInput, Product, ProductCategory, ProductPatch, ProductQuery};
use crate::services::product::ProductServiceError;

/// Query parameters for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

/// Body of create and update requests.
///
/// Every field is optional; create enforces the required ones and update
/// applies only those present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "count_in_stock")]
    pub count_in_stock: Option<i64>,
}

impl From<ProductRequest> for CreateProductInput {
    fn from(req: ProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price,
            image: req.image,
            category: req.category,
            count_in_stock: req.count_in_stock,
        }
    }
}

impl From<ProductRequest> for ProductPatch {
    fn from(req: ProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price,
            image: req.image,
            category: req.category,
            count_in_stock: req.count_in_stock,
        }
    }
}

/// Product id from the path. Anything that is not an integer names no
/// product, so it is a 404 rather than a bad request.
pub struct ProductId(pub i64);

impl<S> FromRequestParts<S> for ProductId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("Product not found"))?;
        Ok(Self(id))
    }
}

/// Response body for a delete
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public product routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/categories", get(list_categories))
        .route("/products/{id}", get(get_product))
}

/// Product routes behind `require_auth` + `require_admin`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/products", axum::routing::post(create_product))
        .route(
            "/products/{id}",
            axum::routing::put(update_product).delete(delete_product),
        )
}

/// GET /api/products
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = ProductQuery::from_params(
        params.search.as_deref(),
        params.category.as_deref(),
        params.sort.as_deref(),
    );

    let products = state
        .product_service
        .list(&query)
        .await
        .map_err(|e| product_error(e, "Failed to get products"))?;

    Ok(Json(products))
}

/// GET /api/products/categories
async fn list_categories() -> Json<Vec<&'static str>> {
    Json(ProductCategory::ALL.iter().map(|c| c.as_str()).collect())
}

/// GET /api/products/{id}
async fn get_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .product_service
        .get(id)
        .await
        .map_err(|e| product_error(e, "Failed to get product"))?;

    Ok(Json(product))
}

/// POST /api/products
async fn create_product(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state
        .product_service
        .create(body.into())
        .await
        .map_err(|e| product_error(e, "Failed to create product"))?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
async fn update_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
    JsonBody(body): JsonBody<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .product_service
        .update(id, body.into())
        .await
        .map_err(|e| product_error(e, "Failed to update product"))?;

    Ok(Json(product))
}

/// DELETE /api/products/{id}
async fn delete_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .product_service
        .delete(id)
        .await
        .map_err(|e| product_error(e, "Failed to delete product"))?;

    Ok(Json(MessageResponse {
        message: "Product deleted successfully".to_string(),
    }))
}

fn product_error(err: ProductServiceError, internal_message: &str) -> ApiError {
    match err {
        ProductServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
        ProductServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        ProductServiceError::InternalError(e) => ApiError::internal(internal_message, e),
    }
}
