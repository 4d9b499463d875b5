//! Response composition.
//!
//! [`TemplateComposer`] renders deterministic messages in the query's
//! language. [`LlmComposer`] asks the completion capability to phrase an
//! answer grounded on the resolved records. [`FallbackComposer`] puts the two
//! together: the completion call only runs when there are records to phrase,
//! and any failure or blank reply falls back to the template.

use crate::language::Language;
use crate::params::ParameterSet;
use crate::record::{PricingRecord, lowest_price};
use async_trait::async_trait;
use pricelens_core::error::ProviderError;
use pricelens_core::message::Message;
use pricelens_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Records included in the grounding context, cheapest first.
const MAX_GROUNDING_RECORDS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("completion failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("completion returned no text")]
    Blank,
}

/// Produces the answer text for a resolved query.
#[async_trait]
pub trait Composer: Send + Sync {
    fn name(&self) -> &str;

    async fn compose(
        &self,
        query: &str,
        params: &ParameterSet,
        records: &[PricingRecord],
    ) -> Result<String, ComposeError>;
}

/// Deterministic, localized messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateComposer;

impl TemplateComposer {
    pub fn render(query: &str, params: &ParameterSet, records: &[PricingRecord]) -> String {
        let language = Language::detect(query);
        if params.is_unspecified() {
            Self::clarification(language)
        } else if records.is_empty() {
            Self::no_match(language, params)
        } else {
            Self::answer(language, params, records)
        }
    }

    pub fn clarification(language: Language) -> String {
        match language {
            Language::English => "Please clarify your question. Include a region, an instance type or an operating system, for example \"Tokyo Linux t2.micro price\".".into(),
            Language::TraditionalChinese => "請提供更多資訊，例如區域、執行個體類型或作業系統（如「東京 linux t2.micro 價格」）。".into(),
            Language::Japanese => "リージョン、インスタンスタイプ、OS のいずれかを指定してください（例：「東京 Linux t2.micro 料金」）。".into(),
        }
    }

    pub fn no_match(language: Language, params: &ParameterSet) -> String {
        let filters = describe(language, params);
        match language {
            Language::English => format!("No pricing found for that combination ({filters})."),
            Language::TraditionalChinese => format!("找不到符合條件（{filters}）的價格資料。"),
            Language::Japanese => format!("条件（{filters}）に一致する料金が見つかりませんでした。"),
        }
    }

    pub fn unavailable(language: Language) -> String {
        match language {
            Language::English => "The pricing service is temporarily unavailable. Please try again.".into(),
            Language::TraditionalChinese => "價格服務暫時無法使用，請稍後再試。".into(),
            Language::Japanese => "料金サービスは一時的に利用できません。しばらくしてから再度お試しください。".into(),
        }
    }

    /// Summary naming the lowest (or sole) on-demand price.
    pub fn answer(language: Language, params: &ParameterSet, records: &[PricingRecord]) -> String {
        let Some((record, price)) = lowest_price(records) else {
            return Self::no_match(language, params);
        };
        let price = price.normalize().to_string();
        let rate = rate(language, &price, record);
        let PricingRecord {
            instance_type: it,
            operating_system: os,
            region,
            ..
        } = record;

        if records.len() == 1 {
            return match language {
                Language::English => {
                    format!("The on-demand price for {it} ({os}) in {region} is {rate}.")
                }
                Language::TraditionalChinese => {
                    format!("{region} 的 {it}（{os}）隨需價格為{rate}。")
                }
                Language::Japanese => {
                    format!("{region} の {it}（{os}）のオンデマンド料金は{rate}です。")
                }
            };
        }

        let n = records.len();
        let filters = describe(language, params);
        match language {
            Language::English => format!(
                "Found {n} on-demand prices matching {filters}. The lowest is {it} ({os}) in {region} at {rate}."
            ),
            Language::TraditionalChinese => format!(
                "共找到 {n} 筆符合（{filters}）的隨需價格，最低為 {region} 的 {it}（{os}），{rate}。"
            ),
            Language::Japanese => format!(
                "条件（{filters}）に一致するオンデマンド料金が {n} 件見つかりました。最安値は {region} の {it}（{os}）で、{rate}です。"
            ),
        }
    }
}

#[async_trait]
impl Composer for TemplateComposer {
    fn name(&self) -> &str {
        "template"
    }

    async fn compose(
        &self,
        query: &str,
        params: &ParameterSet,
        records: &[PricingRecord],
    ) -> Result<String, ComposeError> {
        Ok(Self::render(query, params, records))
    }
}

fn describe(language: Language, params: &ParameterSet) -> String {
    let separator = match language {
        Language::English => ", ",
        Language::TraditionalChinese | Language::Japanese => "、",
    };
    params
        .recognized()
        .into_iter()
        .map(|(_, value)| value)
        .collect::<Vec<_>>()
        .join(separator)
}

fn rate(language: Language, price: &str, record: &PricingRecord) -> String {
    let hourly = record.unit.ends_with("per Hour");
    let currency = record.currency();
    match language {
        Language::TraditionalChinese if hourly => format!("每小時 {price} {currency}"),
        Language::Japanese if hourly => format!("1時間あたり {price} {currency}"),
        Language::TraditionalChinese | Language::Japanese => format!(" {price} {}", record.unit),
        Language::English => format!("{price} {}", record.unit),
    }
}

/// Phrases the answer through a grounded completion call.
pub struct LlmComposer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmComposer {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    fn system_prompt(language: Language) -> String {
        format!(
            "You answer AWS EC2 pricing questions using only the pricing data provided. \
             Reply in {}. Name the region, instance type and operating system, and state the \
             lowest on-demand hourly price. Never invent prices.",
            language.name()
        )
    }

    fn grounding(query: &str, params: &ParameterSet, records: &[PricingRecord]) -> String {
        let mut cheapest: Vec<&PricingRecord> = records.iter().collect();
        cheapest.sort_by_key(|r| r.price());
        cheapest.truncate(MAX_GROUNDING_RECORDS);

        let context = serde_json::json!({
            "parameters": params,
            "total_records": records.len(),
            "pricing_data": cheapest,
        });
        format!("Question: {query}\nPricing data: {context}")
    }
}

#[async_trait]
impl Composer for LlmComposer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn compose(
        &self,
        query: &str,
        params: &ParameterSet,
        records: &[PricingRecord],
    ) -> Result<String, ComposeError> {
        let language = Language::detect(query);
        let request = ProviderRequest::text(
            self.model.clone(),
            vec![
                Message::system(Self::system_prompt(language)),
                Message::user(Self::grounding(query, params, records)),
            ],
            self.temperature,
        )
        .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        let text = response.message.content.trim();
        if text.is_empty() {
            return Err(ComposeError::Blank);
        }
        Ok(text.to_string())
    }
}

/// Uses `primary` when there are records, the template otherwise or on failure.
pub struct FallbackComposer {
    primary: Arc<dyn Composer>,
}

impl FallbackComposer {
    pub fn new(primary: Arc<dyn Composer>) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl Composer for FallbackComposer {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn compose(
        &self,
        query: &str,
        params: &ParameterSet,
        records: &[PricingRecord],
    ) -> Result<String, ComposeError> {
        if records.is_empty() {
            return Ok(TemplateComposer::render(query, params, records));
        }

        match self.primary.compose(query, params, records).await {
            Ok(text) => {
                debug!(composer = self.primary.name(), "Composed response");
                Ok(text)
            }
            Err(e) => {
                warn!(composer = self.primary.name(), error = %e, "Falling back to template response");
                Ok(TemplateComposer::render(query, params, records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricelens_core::provider::ProviderResponse;
    use std::sync::Mutex;

    fn record(instance_type: &str, price: &str) -> PricingRecord {
        PricingRecord {
            instance_type: instance_type.into(),
            operating_system: "Linux".into(),
            region: "ap-northeast-1".into(),
            on_demand_price: price.into(),
            unit: "USD per Hour".into(),
        }
    }

    fn tokyo_linux() -> ParameterSet {
        ParameterSet::new()
            .with_region("Tokyo")
            .and_then(|p| p.with_os("linux"))
            .unwrap()
    }

    /// Replies with fixed text, or fails, and counts calls.
    struct CannedProvider {
        reply: Result<String, ProviderError>,
        calls: Mutex<Vec<ProviderRequest>>,
    }

    impl CannedProvider {
        fn new(reply: Result<&str, ProviderError>) -> Self {
            Self {
                reply: reply.map(String::from),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.lock().unwrap().push(request);
            self.reply.clone().map(|text| ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model: "test".into(),
            })
        }
    }

    #[test]
    fn single_record_answer() {
        let text = TemplateComposer::render(
            "Tokyo linux t2.micro price",
            &tokyo_linux(),
            &[record("t2.micro", "0.0152000000")],
        );
        assert_eq!(
            text,
            "The on-demand price for t2.micro (Linux) in ap-northeast-1 is 0.0152 USD per Hour."
        );
    }

    #[test]
    fn lowest_of_many_in_chinese() {
        let text = TemplateComposer::render(
            "東京 linux 價格為多少",
            &tokyo_linux(),
            &[record("t3.small", "0.0272"), record("t3.nano", "0.0068")],
        );
        assert!(text.contains("共找到 2 筆"));
        assert!(text.contains("t3.nano"));
        assert!(text.contains("每小時 0.0068 USD"));
    }

    #[test]
    fn japanese_answer() {
        let text = TemplateComposer::render(
            "東京のLinuxの料金は？",
            &tokyo_linux(),
            &[record("t2.micro", "0.0152")],
        );
        assert!(text.contains("オンデマンド料金"));
        assert!(text.contains("1時間あたり 0.0152 USD"));
    }

    #[test]
    fn no_match_names_the_filters() {
        let text = TemplateComposer::render("Tokyo linux", &tokyo_linux(), &[]);
        assert_eq!(text, "No pricing found for that combination (ap-northeast-1, Linux).");
    }

    #[test]
    fn nothing_recognized_asks_for_clarification() {
        let text = TemplateComposer::render("xyz nonsense gibberish", &ParameterSet::new(), &[]);
        assert!(text.starts_with("Please clarify"));
    }

    #[test]
    fn grounding_lists_cheapest_first() {
        let records: Vec<_> = (1..=30)
            .rev()
            .map(|i| record(&format!("m5.{i}xlarge"), &format!("0.{i:02}")))
            .collect();
        let grounding = LlmComposer::grounding("q", &tokyo_linux(), &records);
        assert!(grounding.contains("\"total_records\":30"));
        assert!(grounding.contains("m5.1xlarge"));
        assert!(!grounding.contains("m5.30xlarge"));
    }

    #[tokio::test]
    async fn llm_text_is_used() {
        let provider = Arc::new(CannedProvider::new(Ok("  It costs 0.0152 USD.  ")));
        let composer = FallbackComposer::new(Arc::new(LlmComposer::new(
            provider.clone(),
            "m",
            0.3,
            256,
        )));

        let text = composer
            .compose("q", &tokyo_linux(), &[record("t2.micro", "0.0152")])
            .await
            .unwrap();
        assert_eq!(text, "It costs 0.0152 USD.");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].max_tokens, Some(256));
        assert!(calls[0].tools.is_empty());
    }

    #[tokio::test]
    async fn blank_llm_reply_falls_back() {
        let provider = Arc::new(CannedProvider::new(Ok("   ")));
        let composer = FallbackComposer::new(Arc::new(LlmComposer::new(provider, "m", 0.3, 64)));
        let text = composer
            .compose("Tokyo", &tokyo_linux(), &[record("t2.micro", "0.0152")])
            .await
            .unwrap();
        assert!(text.starts_with("The on-demand price"));
    }

    #[tokio::test]
    async fn failed_llm_falls_back() {
        let provider = Arc::new(CannedProvider::new(Err(ProviderError::Timeout("30s".into()))));
        let composer = FallbackComposer::new(Arc::new(LlmComposer::new(provider, "m", 0.3, 64)));
        let text = composer
            .compose("Tokyo", &tokyo_linux(), &[record("t2.micro", "0.0152")])
            .await
            .unwrap();
        assert!(text.contains("0.0152 USD per Hour"));
    }

    #[tokio::test]
    async fn llm_not_called_without_records() {
        let provider = Arc::new(CannedProvider::new(Ok("should not be used")));
        let composer = FallbackComposer::new(Arc::new(LlmComposer::new(
            provider.clone(),
            "m",
            0.3,
            64,
        )));
        let text = composer.compose("Tokyo", &tokyo_linux(), &[]).await.unwrap();
        assert!(text.starts_with("No pricing found"));
        assert_eq!(provider.call_count(), 0);
    }
}
