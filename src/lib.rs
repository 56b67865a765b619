//! Shopfront - A lightweight storefront backend
//!
//! Product catalog browsing, account registration and login with signed
//! bearer tokens, and admin product management over a JSON HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
