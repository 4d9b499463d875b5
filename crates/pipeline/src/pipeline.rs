//! The query pipeline: extract, resolve, compose.

use crate::composer::{Composer, FallbackComposer, LlmComposer, TemplateComposer};
use crate::error::{BuildError, QueryError};
use crate::extractor::ParameterExtractor;
use crate::language::Language;
use crate::params::ParameterSet;
use crate::record::QueryResult;
use crate::resolver::PricingResolver;
use pricelens_core::catalog::PriceCatalog;
use pricelens_core::error::ErrorKind;
use pricelens_core::provider::Provider;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Answered,
    NoMatch,
    NeedsClarification,
    Unavailable,
}

/// A finished query: the result plus how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    #[serde(flatten)]
    pub result: QueryResult,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl QueryOutcome {
    fn finished(result: QueryResult, status: QueryStatus) -> Self {
        Self {
            result,
            status,
            error: None,
        }
    }

    fn unavailable(query: &str, params: ParameterSet, error: &QueryError) -> Self {
        let message = TemplateComposer::unavailable(Language::detect(query));
        Self {
            result: QueryResult::new(query, params, Vec::new(), message),
            status: QueryStatus::Unavailable,
            error: Some(error.kind()),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == QueryStatus::Unavailable
    }
}

/// Runs one query at a time through the four stages. Shared across requests.
pub struct QueryPipeline {
    extractor: ParameterExtractor,
    resolver: PricingResolver,
    composer: Arc<dyn Composer>,
}

impl QueryPipeline {
    pub fn new(
        extractor: ParameterExtractor,
        resolver: PricingResolver,
        composer: Arc<dyn Composer>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            composer,
        }
    }

    /// Assemble a pipeline from collaborators.
    ///
    /// With `compose_with_llm`, answers are phrased by the completion
    /// capability and fall back to the template; otherwise the template is
    /// used throughout.
    pub fn from_parts(
        provider: Arc<dyn Provider>,
        catalog: Arc<dyn PriceCatalog>,
        model: impl Into<String>,
        compose_with_llm: bool,
    ) -> Self {
        let model = model.into();
        let composer = composer_for(&provider, &model, 0.3, 512, compose_with_llm);

        Self::new(
            ParameterExtractor::new(provider, model),
            PricingResolver::new(catalog),
            composer,
        )
    }

    /// Build the configured provider, catalog, and composer.
    pub fn from_config(config: &pricelens_config::AppConfig) -> Result<Self, BuildError> {
        let provider = pricelens_providers::build_from_config(config)?;
        let catalog = pricelens_catalog::build_from_config(&config.catalog)?;
        let model = pricelens_providers::model_for(config);

        let composer = composer_for(
            &provider,
            &model,
            config.temperature,
            config.max_tokens,
            config.completion.compose_with_llm,
        );

        info!(
            provider = provider.name(),
            catalog = catalog.name(),
            model = %model,
            composer = composer.name(),
            "Query pipeline ready"
        );

        Ok(Self::new(
            ParameterExtractor::new(provider, model),
            PricingResolver::new(catalog),
            composer,
        ))
    }

    /// Answer `query`. Failures end up in the outcome, never as a panic or
    /// a half-built result.
    pub async fn run(&self, query: &str) -> QueryOutcome {
        let span = info_span!("query", query_id = %uuid::Uuid::new_v4());
        self.run_inner(query).instrument(span).await
    }

    async fn run_inner(&self, query: &str) -> QueryOutcome {
        info!(query_chars = query.chars().count(), "Query received");

        let extraction = match self.extractor.extract(query).await {
            Ok(extraction) => extraction,
            Err(e) => {
                let err = QueryError::ExtractionUnavailable(e);
                error!(kind = %err.kind(), error = %err, "Query failed");
                return QueryOutcome::unavailable(query, ParameterSet::new(), &err);
            }
        };
        let params = extraction.params;

        if params.is_unspecified() {
            info!(status = "needs_clarification", "Nothing recognized in query");
            let response = TemplateComposer::clarification(Language::detect(query));
            return QueryOutcome::finished(
                QueryResult::new(query, params, Vec::new(), response),
                QueryStatus::NeedsClarification,
            );
        }

        let records = match self.resolver.resolve(&params).await {
            Ok(records) => records,
            Err(e) => {
                let err = QueryError::CatalogUnavailable(e);
                error!(kind = %err.kind(), error = %err, "Query failed");
                return QueryOutcome::unavailable(query, params, &err);
            }
        };

        let response = match self.composer.compose(query, &params, &records).await {
            Ok(text) => text,
            Err(e) => {
                error!(composer = self.composer.name(), error = %e, "Composer failed");
                TemplateComposer::render(query, &params, &records)
            }
        };

        let status = if records.is_empty() {
            info!(kind = %ErrorKind::NoMatch, "No matching prices");
            QueryStatus::NoMatch
        } else {
            QueryStatus::Answered
        };
        info!(status = ?status, records = records.len(), "Query answered");

        QueryOutcome::finished(QueryResult::new(query, params, records, response), status)
    }
}

fn composer_for(
    provider: &Arc<dyn Provider>,
    model: &str,
    temperature: f32,
    max_tokens: u32,
    with_llm: bool,
) -> Arc<dyn Composer> {
    if with_llm {
        Arc::new(FallbackComposer::new(Arc::new(LlmComposer::new(
            provider.clone(),
            model,
            temperature,
            max_tokens,
        ))))
    } else {
        Arc::new(TemplateComposer)
    }
}
