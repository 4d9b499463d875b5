//! Language-completion provider implementations for PriceLens.
//!
//! All providers implement the `pricelens_core::Provider` trait.
//! [`build_from_config`] assembles the configured provider with its retry
//! policy applied.

pub mod factory;
pub mod openai_compat;
pub mod retry;

pub use factory::{build_from_config, model_for};
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryingProvider;
