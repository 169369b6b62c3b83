//! Agent runner - one generation call from template to typed output.
//!
//! The runner resolves the mode's template, assembles the prompt exactly
//! once, and replays the identical segment list on every retry so the
//! provider-side prompt cache hits. Retry budgets come from the output mode:
//! reasoning modes replay up to three times, extraction modes once.
//!
//! A schema-valid payload carrying the wrong mode tag is a contract bug and
//! fails immediately without retry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::generation::{GenerationOutput, ModelRates, OutputMode, TokenUsage};
use crate::domain::prompt::{assemble, AssemblyInput};
use crate::ports::{
    AiProvider, CompletionRequest, DeltaStream, PromptTemplates, RequestMetadata,
};

/// Generation tuning shared by all calls.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Template store environment label (`production`, `latest`, ...).
    pub template_label: String,
    /// Billing rates for the configured model.
    pub rates: ModelRates,
    /// Maximum output tokens per call.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            template_label: "production".to_string(),
            rates: ModelRates::per_million(3.0, 0.3, 15.0),
            max_tokens: Some(4096),
            temperature: Some(0.2),
        }
    }
}

/// Outcome of one completed generation call.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    /// Parsed, mode-checked output.
    pub output: GenerationOutput,
    /// Usage summed across every attempt, including failed ones.
    pub usage: TokenUsage,
    /// Dollar cost of `usage`, rounded to six decimals.
    pub cost: f64,
}

/// Runs typed generation calls against the AI provider.
#[derive(Clone)]
pub struct AgentRunner {
    provider: Arc<dyn AiProvider>,
    templates: Arc<dyn PromptTemplates>,
    settings: GenerationSettings,
}

impl AgentRunner {
    /// Creates a runner.
    pub fn new(
        provider: Arc<dyn AiProvider>,
        templates: Arc<dyn PromptTemplates>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            templates,
            settings,
        }
    }

    /// Executes one generation call expecting `mode` output.
    ///
    /// `cache_key` must be stable for the target entity across retries and
    /// re-deliveries; it doubles as the provider's prompt cache key and the
    /// cost-tracking correlation key.
    pub async fn run(
        &self,
        mode: OutputMode,
        input: &AssemblyInput,
        params: &HashMap<String, String>,
        cache_key: &str,
        user_id: &UserId,
    ) -> Result<GenerationRun, DomainError> {
        let request = self.build_request(mode, input, params, cache_key, user_id).await?;

        let mut usage = TokenUsage::zero();
        let mut attempts = 0u32;
        let max_retries = mode.max_retries();

        loop {
            attempts += 1;
            // Same segments every attempt; only the attempt counter moves.
            match self.provider.complete(request.clone()).await {
                Ok(response) => {
                    usage.add(response.usage);
                    match parse_output(&response.content) {
                        Ok(output) if output.mode() == mode => {
                            let cost = self.settings.rates.cost(&usage);
                            tracing::info!(
                                %mode,
                                cache_key,
                                user_id = %user_id,
                                attempts,
                                input_tokens = usage.input_tokens,
                                cache_read_tokens = usage.cache_read_tokens,
                                output_tokens = usage.output_tokens,
                                cost,
                                "generation complete"
                            );
                            return Ok(GenerationRun {
                                output,
                                usage,
                                cost,
                            });
                        }
                        Ok(output) => {
                            // Wrong variant under a valid tag: contract bug,
                            // replaying the same prompt will not change it.
                            return Err(DomainError::new(
                                ErrorCode::UnexpectedOutputType,
                                format!("expected {} output, got {}", mode, output.mode()),
                            ));
                        }
                        Err(parse_err) => {
                            if attempts > max_retries {
                                return Err(DomainError::new(
                                    ErrorCode::GenerationFailed,
                                    format!(
                                        "output did not parse after {} attempts: {}",
                                        attempts, parse_err
                                    ),
                                ));
                            }
                            tracing::warn!(attempt = attempts, error = %parse_err, "unparseable output, replaying prompt");
                        }
                    }
                }
                Err(err) => {
                    if !err.is_retryable() || attempts > max_retries {
                        return Err(DomainError::upstream(err.to_string()));
                    }
                    tracing::warn!(attempt = attempts, error = %err, "provider error, replaying prompt");
                }
            }
        }
    }

    /// Executes one generation call as a delta stream.
    ///
    /// The prompt is assembled once; connection-level failures retry within
    /// the mode's budget, mid-stream failures surface to the consumer.
    pub async fn run_stream(
        &self,
        mode: OutputMode,
        input: &AssemblyInput,
        params: &HashMap<String, String>,
        cache_key: &str,
        user_id: &UserId,
    ) -> Result<DeltaStream, DomainError> {
        let request = self.build_request(mode, input, params, cache_key, user_id).await?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.provider.stream_complete(request.clone()).await {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    if !err.is_retryable() || attempts > mode.max_retries() {
                        return Err(DomainError::upstream(err.to_string()));
                    }
                    tracing::warn!(attempt = attempts, error = %err, "stream open failed, replaying prompt");
                }
            }
        }
    }

    async fn build_request(
        &self,
        mode: OutputMode,
        input: &AssemblyInput,
        params: &HashMap<String, String>,
        cache_key: &str,
        user_id: &UserId,
    ) -> Result<CompletionRequest, DomainError> {
        let template = self
            .templates
            .resolve(mode.template_name(), &self.settings.template_label, params)
            .await
            .map_err(|e| DomainError::upstream(e.to_string()))?;

        let segments = assemble(input, &template);

        Ok(CompletionRequest {
            segments,
            cache_key: cache_key.to_string(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            metadata: RequestMetadata {
                user_id: user_id.clone(),
                session_key: cache_key.to_string(),
            },
        })
    }
}

/// Parses model output into the tagged union, tolerating a fenced code block
/// around the JSON.
fn parse_output(content: &str) -> Result<GenerationOutput, serde_json::Error> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    serde_json::from_str(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAiProvider;
    use crate::adapters::templates::YamlTemplateStore;
    use crate::ports::AiError;

    const TEMPLATES: &str = r#"
generate-quiz-items:
  production:
    version: 1
    text: "Write quiz items about {topic}."
summarize-quiz:
  production:
    version: 1
    text: "Summarize the quiz."
attempt-feedback:
  production:
    version: 1
    text: "Write feedback."
"#;

    fn runner(provider: Arc<MockAiProvider>) -> AgentRunner {
        let templates = Arc::new(YamlTemplateStore::from_str(TEMPLATES).unwrap());
        AgentRunner::new(provider, templates, GenerationSettings::default())
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn quiz_json() -> String {
        r#"{"mode":"quiz","items":[{"id":"i1","question":"Q?","options":["a","b"],"correct_idx":0,"rationale":null}]}"#
            .to_string()
    }

    fn topic_params() -> HashMap<String, String> {
        HashMap::from([("topic".to_string(), "rivers".to_string())])
    }

    #[tokio::test]
    async fn successful_run_parses_and_prices() {
        let provider = Arc::new(MockAiProvider::new());
        provider
            .push_reply(quiz_json(), TokenUsage::new(1_000_000, 0, 100_000))
            .await;

        let run = runner(provider.clone())
            .run(
                OutputMode::Quiz,
                &AssemblyInput::default(),
                &topic_params(),
                "quiz-q1",
                &user(),
            )
            .await
            .unwrap();

        assert!(matches!(run.output, GenerationOutput::Quiz(_)));
        // $3/M non-cached + $15/M output on the default rates.
        assert_eq!(run.cost, 4.5);
        assert_eq!(provider.requests().await[0].cache_key, "quiz-q1");
    }

    #[tokio::test]
    async fn retries_replay_identical_segments() {
        let provider = Arc::new(MockAiProvider::new());
        provider
            .push_failure(AiError::Unavailable("503".into()))
            .await;
        provider.push_reply("not json", TokenUsage::new(10, 0, 5)).await;
        provider
            .push_reply(quiz_json(), TokenUsage::new(10, 8, 5))
            .await;

        let run = runner(provider.clone())
            .run(
                OutputMode::Quiz,
                &AssemblyInput::default(),
                &topic_params(),
                "quiz-q1",
                &user(),
            )
            .await
            .unwrap();

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].segments, requests[1].segments);
        assert_eq!(requests[1].segments, requests[2].segments);
        // Usage accumulates across the parse failure and the success.
        assert_eq!(run.usage, TokenUsage::new(20, 8, 10));
    }

    #[tokio::test]
    async fn extraction_mode_fails_fast() {
        let provider = Arc::new(MockAiProvider::new());
        provider.push_reply("garbage", TokenUsage::zero()).await;
        provider.push_reply("garbage", TokenUsage::zero()).await;
        provider.push_reply("garbage", TokenUsage::zero()).await;

        let err = runner(provider.clone())
            .run(
                OutputMode::Summary,
                &AssemblyInput::default(),
                &HashMap::new(),
                "quiz-q1",
                &user(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationFailed);
        // One attempt plus one retry.
        assert_eq!(provider.call_count().await, 2);
    }

    #[tokio::test]
    async fn wrong_mode_tag_is_not_retried() {
        let provider = Arc::new(MockAiProvider::new());
        provider
            .push_reply(
                r#"{"mode":"summary","summary":"s","keywords":[]}"#,
                TokenUsage::zero(),
            )
            .await;

        let err = runner(provider.clone())
            .run(
                OutputMode::Feedback,
                &AssemblyInput::default(),
                &HashMap::new(),
                "attempt-a1",
                &user(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedOutputType);
        assert_eq!(provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn non_retryable_provider_error_surfaces() {
        let provider = Arc::new(MockAiProvider::new());
        provider.push_failure(AiError::AuthenticationFailed).await;

        let err = runner(provider.clone())
            .run(
                OutputMode::Quiz,
                &AssemblyInput::default(),
                &topic_params(),
                "quiz-q1",
                &user(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
        assert_eq!(provider.call_count().await, 1);
    }

    #[test]
    fn fenced_output_parses() {
        let fenced = format!("```json\n{}\n```", r#"{"mode":"trim","condensed":"c"}"#);
        let output = parse_output(&fenced).unwrap();
        assert!(matches!(output, GenerationOutput::Trim(_)));
    }

    #[tokio::test]
    async fn missing_template_parameter_fails_before_any_call() {
        let provider = Arc::new(MockAiProvider::new());
        let err = runner(provider.clone())
            .run(
                OutputMode::Quiz,
                &AssemblyInput::default(),
                &HashMap::new(),
                "quiz-q1",
                &user(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamUnavailable);
        assert_eq!(provider.call_count().await, 0);
    }
}
