//! Core types and services for shop-mcp.
//!
//! This crate owns the store registry that maps aliases to credentials and
//! cached GraphQL clients, and the loader that resolves store configuration
//! from files, environment variables, or CLI flags.

pub mod client;
pub mod config;
pub mod models;
pub mod registry;
