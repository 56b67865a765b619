//! Data models
//!
//! Database entities and the inputs the services accept.

mod product;
mod user;

pub use product::{
    CreateProductInput, NewProduct, Product, ProductCategory, ProductPatch, ProductQuery,
    ProductSort,
};
pub use user::{normalize_email, User};
