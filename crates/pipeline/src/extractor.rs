//! Parameter extraction through a forced function call.
//!
//! The completion capability is asked to call `get_aws_price` with the four
//! parameter keys. Its arguments arrive as untyped JSON and are validated key
//! by key: each value goes through the normalizer, and whatever fails is
//! dropped rather than failing the query.

use crate::error::ExtractionMalformed;
use crate::normalizer::{self, NormalizationMiss};
use crate::params::{ParamKey, ParameterSet};
use pricelens_core::error::ProviderError;
use pricelens_core::message::Message;
use pricelens_core::provider::{Provider, ProviderRequest, ToolDefinition};
use std::sync::Arc;
use tracing::{debug, warn};

/// The function the completion capability is forced to call.
pub const TOOL_NAME: &str = "get_aws_price";

const SYSTEM_PROMPT: &str = "You extract AWS EC2 pricing parameters from questions written in \
any language. Always call get_aws_price. Use an AWS region code for region, the API name for \
instance_type (for example t2.micro), and one of the listed values for os. Leave out anything \
the question does not mention.";

/// What extraction produced, including the tokens it had to drop.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub params: ParameterSet,
    pub misses: Vec<NormalizationMiss>,
    pub malformed: Option<ExtractionMalformed>,
}

/// Turns free text into a [`ParameterSet`].
pub struct ParameterExtractor {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ParameterExtractor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Extract parameters from `query`.
    ///
    /// Only an unreachable completion capability is an error. Malformed
    /// output is recovered as an empty set, reported in the `Extraction`.
    pub async fn extract(&self, query: &str) -> Result<Extraction, ProviderError> {
        if query.trim().is_empty() {
            return Ok(Extraction::default());
        }

        let request = ProviderRequest::text(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(query)],
            0.0,
        )
        .forcing(tool_definition());

        let response = self.provider.complete(request).await?;

        let Some(call) = response
            .message
            .tool_calls
            .iter()
            .find(|c| c.name == TOOL_NAME)
        else {
            let malformed = ExtractionMalformed::NoToolCall(TOOL_NAME.into());
            warn!(kind = %malformed.kind(), "{malformed}");
            return Ok(Extraction {
                malformed: Some(malformed),
                ..Extraction::default()
            });
        };

        match validate_arguments(&call.arguments) {
            Ok(extraction) => {
                debug!(
                    params = ?extraction.params,
                    dropped = extraction.misses.len(),
                    "Extracted parameters"
                );
                Ok(extraction)
            }
            Err(malformed) => {
                warn!(kind = %malformed.kind(), "{malformed}");
                Ok(Extraction {
                    malformed: Some(malformed),
                    ..Extraction::default()
                })
            }
        }
    }
}

/// Validate raw tool-call arguments into a parameter set.
pub fn validate_arguments(arguments: &str) -> Result<Extraction, ExtractionMalformed> {
    let value: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| ExtractionMalformed::InvalidJson(e.to_string()))?;
    let serde_json::Value::Object(fields) = value else {
        return Err(ExtractionMalformed::NotAnObject(value.to_string()));
    };

    let mut params = ParameterSet::new();
    let mut misses = Vec::new();

    for key in ParamKey::ALL {
        let Some(raw) = fields.get(key.as_str()) else {
            continue;
        };
        let token = match raw {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => continue,
            other => other.to_string(),
        };

        match params.clone().with(key, &token) {
            Ok(updated) => params = updated,
            Err(miss) => {
                warn!(
                    kind = %miss.kind(),
                    key = %miss.key,
                    token = %miss.token,
                    reason = %miss.reason,
                    "Dropping parameter"
                );
                misses.push(miss);
            }
        }
    }

    for name in fields.keys() {
        if ParamKey::from_name(name).is_none() {
            debug!(key = %name, "Ignoring unrecognized argument");
        }
    }

    Ok(Extraction {
        params,
        misses,
        malformed: None,
    })
}

/// The `get_aws_price` function schema, constrained to the vocabulary.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.into(),
        description: "Get the on-demand price of an AWS EC2 instance configuration".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "service": {
                    "type": "string",
                    "enum": ["EC2"],
                    "description": "AWS service; always EC2"
                },
                "region": {
                    "type": "string",
                    "enum": normalizer::region_codes(),
                    "description": "AWS region code, e.g. ap-northeast-1 for Tokyo"
                },
                "instance_type": {
                    "type": "string",
                    "description": "EC2 instance type in API syntax, e.g. t2.micro"
                },
                "os": {
                    "type": "string",
                    "enum": normalizer::os_names(),
                    "description": "Operating system"
                }
            },
            "required": ["service"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::MissReason;
    use async_trait::async_trait;
    use pricelens_core::message::MessageToolCall;
    use pricelens_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// Answers every request with a fixed tool call, recording requests.
    struct ToolCallProvider {
        arguments: Option<String>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ToolCallProvider {
        fn new(arguments: Option<&str>) -> Self {
            Self {
                arguments: arguments.map(String::from),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ToolCallProvider {
        fn name(&self) -> &str {
            "tool-call"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            let mut message = Message::assistant("");
            if let Some(arguments) = &self.arguments {
                message.tool_calls.push(MessageToolCall {
                    id: "call_1".into(),
                    name: TOOL_NAME.into(),
                    arguments: arguments.clone(),
                });
            }
            Ok(ProviderResponse {
                message,
                usage: None,
                model: "test".into(),
            })
        }
    }

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Timeout("30s".into()))
        }
    }

    #[test]
    fn valid_arguments() {
        let extraction = validate_arguments(
            r#"{"service":"EC2","region":"東京","instance_type":"t2.micro","os":"linux"}"#,
        )
        .unwrap();
        assert_eq!(extraction.params.region(), Some("ap-northeast-1"));
        assert_eq!(extraction.params.instance_type(), Some("t2.micro"));
        assert_eq!(extraction.params.os(), Some("Linux"));
        assert!(extraction.misses.is_empty());
    }

    #[test]
    fn failing_keys_are_dropped() {
        let extraction = validate_arguments(
            r#"{"region":"Atlantis","instance_type":"huge","os":"Windows","extra":1}"#,
        )
        .unwrap();
        assert!(extraction.params.region().is_none());
        assert!(extraction.params.instance_type().is_none());
        assert_eq!(extraction.params.os(), Some("Windows"));
        assert_eq!(extraction.misses.len(), 2);
        assert_eq!(extraction.misses[0].key, ParamKey::Region);
        assert_eq!(extraction.misses[1].reason, MissReason::InvalidSyntax);
    }

    #[test]
    fn unknown_service_keeps_default() {
        let extraction = validate_arguments(r#"{"service":"S3","region":"Tokyo"}"#).unwrap();
        assert_eq!(extraction.params.service().as_str(), "EC2");
        assert_eq!(extraction.misses.len(), 1);
    }

    #[test]
    fn non_string_values() {
        let extraction = validate_arguments(r#"{"region":null,"os":42}"#).unwrap();
        assert!(extraction.params.is_unspecified());
        assert_eq!(extraction.misses.len(), 1);
    }

    #[test]
    fn malformed_arguments() {
        assert!(matches!(
            validate_arguments("not json"),
            Err(ExtractionMalformed::InvalidJson(_))
        ));
        assert!(matches!(
            validate_arguments(r#"["Tokyo"]"#),
            Err(ExtractionMalformed::NotAnObject(_))
        ));
    }

    #[test]
    fn schema_lists_canonical_vocabulary() {
        let tool = tool_definition();
        let props = &tool.parameters["properties"];
        let regions = props["region"]["enum"].as_array().unwrap();
        assert!(regions.iter().any(|r| r == "ap-northeast-1"));
        assert!(!regions.iter().any(|r| r == "tokyo"));
        assert_eq!(props["os"]["enum"].as_array().unwrap().len(), 6);
        assert_eq!(
            props.as_object().unwrap().len(),
            4,
            "schema exposes exactly the four keys"
        );
    }

    #[tokio::test]
    async fn forces_the_price_tool() {
        let provider = Arc::new(ToolCallProvider::new(Some(r#"{"region":"Tokyo"}"#)));
        let extractor = ParameterExtractor::new(provider.clone(), "gpt-test");

        let extraction = extractor.extract("Tokyo price").await.unwrap();
        assert_eq!(extraction.params.region(), Some("ap-northeast-1"));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_choice.as_deref(), Some(TOOL_NAME));
        assert_eq!(requests[0].model, "gpt-test");
    }

    #[tokio::test]
    async fn missing_tool_call_is_recovered() {
        let extractor = ParameterExtractor::new(Arc::new(ToolCallProvider::new(None)), "m");
        let extraction = extractor.extract("hello").await.unwrap();
        assert!(extraction.params.is_unspecified());
        assert!(matches!(
            extraction.malformed,
            Some(ExtractionMalformed::NoToolCall(_))
        ));
    }

    #[tokio::test]
    async fn blank_query_is_not_sent() {
        let provider = Arc::new(ToolCallProvider::new(Some("{}")));
        let extractor = ParameterExtractor::new(provider.clone(), "m");
        let extraction = extractor.extract("   ").await.unwrap();
        assert!(extraction.params.is_unspecified());
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let extractor = ParameterExtractor::new(Arc::new(DownProvider), "m");
        assert!(matches!(
            extractor.extract("Tokyo").await,
            Err(ProviderError::Timeout(_))
        ));
    }
}
