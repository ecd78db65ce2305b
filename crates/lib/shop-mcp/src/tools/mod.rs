//! MCP tool modules.
//!
//! Tools are grouped by resource: store discovery, products, customers,
//! orders, and contextual help.

pub mod customers;
pub mod orders;
pub mod products;
pub mod stores;
mod context;
