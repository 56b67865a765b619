//! Services layer - Business logic
//!
//! Services validate input, enforce business rules and coordinate the
//! repositories. They know nothing about HTTP.

pub mod password;
pub mod product;
pub mod token;
pub mod user;

pub use password::{hash_password, verify_password};
pub use product::{ProductService, ProductServiceError};
pub use token::{generate_secret, TokenClaims, TokenCodec, TokenError};
pub use user::{AuthSession, LoginInput, RegisterInput, UserService, UserServiceError};
