//! # PriceLens Core
//!
//! Domain types, traits, and error definitions shared by every PriceLens
//! crate. This crate has **zero framework dependencies**: it defines the two
//! seams the query pipeline talks through, and the concrete clients live in
//! their own crates.
//!
//! ## Seams
//!
//! - [`Provider`]: a language-completion backend (OpenAI-compatible, mocks)
//! - [`PriceCatalog`]: a paginated, filterable price list (AWS, static)
//!
//! Both are object-safe async traits so the pipeline can hold them as
//! `Arc<dyn ...>` and tests can swap in scripted doubles.

pub mod catalog;
pub mod error;
pub mod message;
pub mod provider;
pub mod retry;

// Re-export key types at crate root for ergonomics
pub use catalog::{CatalogFilter, CatalogPage, CatalogQuery, PriceCatalog};
pub use error::{CatalogError, ErrorKind, ProviderError};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use retry::{RetryPolicy, Retryable};
