//! # Recipe API Server Library
//!
//! This library provides the core functionality for the recipe API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with API errors
//! - `routes`: API route handlers
//! - `startup`: Database readiness and superuser bootstrap

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod startup;
