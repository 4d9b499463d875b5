//! Query interpretation and price resolution for PriceLens.
//!
//! A query flows through four stages:
//!
//! 1. **Extract** candidate parameters with a forced function call
//! 2. **Normalize** each token into a catalog identifier
//! 3. **Resolve** the parameters against the price catalog, every page
//! 4. **Compose** an answer in the query's language
//!
//! [`QueryPipeline`] runs the stages and turns every failure into a
//! [`QueryOutcome`] the caller can return as-is.

pub mod composer;
pub mod error;
pub mod extractor;
pub mod language;
pub mod normalizer;
pub mod params;
pub mod pipeline;
pub mod record;
pub mod resolver;

pub use composer::{Composer, FallbackComposer, LlmComposer, TemplateComposer};
pub use error::{BuildError, ExtractionMalformed, QueryError};
pub use extractor::{Extraction, ParameterExtractor};
pub use language::Language;
pub use normalizer::{MissReason, NormalizationMiss, normalize};
pub use params::{ParamKey, ParameterSet, Service};
pub use pipeline::{QueryOutcome, QueryPipeline, QueryStatus};
pub use record::{PricingRecord, QueryResult};
pub use resolver::PricingResolver;
