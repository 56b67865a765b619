//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod product;
pub mod user;

pub use product::{ProductRepository, SqlxProductRepository};
pub use user::{SqlxUserRepository, UserRepository};
