//! Confidence evaluation: is the retrieved evidence enough?
//!
//! The evaluator gates the branch between direct synthesis and the web
//! search fallback, so it must run before either. Scoring is deterministic:
//! the scalar threshold gate never calls the model, and the semantic verdict
//! call only happens once the scalar gate has passed.

use crate::config::Prompts;
use crate::error::{Result, SvarError};
use crate::evidence::EvidenceSet;
use crate::llm::{ChatModel, PromptMessage};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The evaluator's judgment of the retrieved evidence.
#[derive(Debug, Clone)]
pub struct ConfidenceAssessment {
    /// Whether the evidence supports answering without external search.
    pub sufficient: bool,
    /// Score in [0, 1], the top relevance of the evidence.
    pub score: f32,
    /// Human-readable reason for the judgment.
    pub reason: String,
}

impl ConfidenceAssessment {
    fn insufficient(score: f32, reason: impl Into<String>) -> Self {
        Self {
            sufficient: false,
            score,
            reason: reason.into(),
        }
    }

    fn sufficient(score: f32, reason: impl Into<String>) -> Self {
        Self {
            sufficient: true,
            score,
            reason: reason.into(),
        }
    }
}

/// Capability trait for sufficiency evaluation, so tests can inject stubs.
#[async_trait]
pub trait SufficiencyEvaluator: Send + Sync {
    /// Judge whether the evidence can support an accurate answer.
    async fn evaluate(&self, query_text: &str, evidence: &EvidenceSet)
        -> Result<ConfidenceAssessment>;
}

/// Semantic verdict returned by the model.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Verdict {
    Yes,
    No,
    Partial,
}

#[derive(Debug, Deserialize)]
struct VerdictResponse {
    verdict: Verdict,
}

/// Production evaluator: scalar threshold gate plus an LLM verdict call.
pub struct LlmEvaluator {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
    threshold: f32,
    timeout: Duration,
}

impl LlmEvaluator {
    /// Create an evaluator with the given verdict model and threshold.
    pub fn new(model: Arc<dyn ChatModel>, threshold: f32, timeout: Duration) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            threshold,
            timeout,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    async fn semantic_verdict(&self, query_text: &str, evidence: &EvidenceSet) -> Result<Verdict> {
        let context = evidence
            .items()
            .iter()
            .map(|item| item.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query_text.to_string());
        vars.insert("context".to_string(), context);

        let messages = vec![
            PromptMessage::system(
                self.prompts
                    .render_with_custom(&self.prompts.sufficiency.system, &vars),
            ),
            PromptMessage::user(
                self.prompts
                    .render_with_custom(&self.prompts.sufficiency.user, &vars),
            ),
        ];

        let raw = self.model.complete(&messages, true).await?;
        let parsed: VerdictResponse = serde_json::from_str(raw.trim())
            .map_err(|e| SvarError::Evaluation(format!("Malformed verdict: {}", e)))?;
        Ok(parsed.verdict)
    }
}

#[async_trait]
impl SufficiencyEvaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        query_text: &str,
        evidence: &EvidenceSet,
    ) -> Result<ConfidenceAssessment> {
        if evidence.is_empty() {
            return Ok(ConfidenceAssessment::insufficient(
                0.0,
                "no evidence retrieved",
            ));
        }

        let top_score = evidence.top_score();
        if top_score < self.threshold {
            debug!(top_score, threshold = self.threshold, "Below relevance threshold");
            return Ok(ConfidenceAssessment::insufficient(
                top_score,
                format!(
                    "top relevance {:.2} below threshold {:.2}",
                    top_score, self.threshold
                ),
            ));
        }

        // Scalar gate passed; ask the model whether the evidence actually
        // answers the question.
        let verdict =
            match tokio::time::timeout(self.timeout, self.semantic_verdict(query_text, evidence))
                .await
            {
                Ok(Ok(v)) => v,
                Ok(Err(e)) => {
                    warn!("Sufficiency verdict failed, falling back to web search: {}", e);
                    return Ok(ConfidenceAssessment::insufficient(
                        top_score,
                        "verdict call failed",
                    ));
                }
                Err(_) => {
                    warn!("Sufficiency verdict timed out, falling back to web search");
                    return Ok(ConfidenceAssessment::insufficient(
                        top_score,
                        "verdict call timed out",
                    ));
                }
            };

        debug!(?verdict, top_score, "Sufficiency verdict");

        match verdict {
            Verdict::Yes => Ok(ConfidenceAssessment::sufficient(
                top_score,
                "evidence judged sufficient",
            )),
            Verdict::Partial => Ok(ConfidenceAssessment::insufficient(
                top_score,
                "evidence judged partial",
            )),
            Verdict::No => Ok(ConfidenceAssessment::insufficient(
                top_score,
                "evidence judged irrelevant",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;
    use crate::evidence::{EvidenceItem, EvidenceOrigin};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubModel {
        response: String,
        calls: AtomicUsize,
    }

    impl StubModel {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for StubModel {
        async fn complete(&self, _messages: &[PromptMessage], _json: bool) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _messages: &[PromptMessage], _json: bool) -> Result<String> {
            Err(SvarError::OpenAI("down".to_string()))
        }
    }

    fn evidence_with_score(score: f32) -> EvidenceSet {
        let mut set = EvidenceSet::new();
        set.push(EvidenceItem::new(
            "some content",
            "seg-1",
            EvidenceOrigin::Indexed,
            score,
        ));
        set
    }

    #[tokio::test]
    async fn test_empty_evidence_is_insufficient_without_model_call() {
        let model = Arc::new(StubModel::new(r#"{"verdict": "yes"}"#));
        let evaluator = LlmEvaluator::new(model.clone(), 0.5, Duration::from_secs(1));

        let assessment = evaluator.evaluate("q", &EvidenceSet::new()).await.unwrap();
        assert!(!assessment.sufficient);
        assert_eq!(assessment.score, 0.0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_below_threshold_skips_verdict_call() {
        let model = Arc::new(StubModel::new(r#"{"verdict": "yes"}"#));
        let evaluator = LlmEvaluator::new(model.clone(), 0.5, Duration::from_secs(1));

        let assessment = evaluator
            .evaluate("q", &evidence_with_score(0.1))
            .await
            .unwrap();
        assert!(!assessment.sufficient);
        assert!((assessment.score - 0.1).abs() < f32::EPSILON);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_yes_verdict_is_sufficient() {
        let model = Arc::new(StubModel::new(r#"{"verdict": "yes"}"#));
        let evaluator = LlmEvaluator::new(model, 0.5, Duration::from_secs(1));

        let assessment = evaluator
            .evaluate("q", &evidence_with_score(0.9))
            .await
            .unwrap();
        assert!(assessment.sufficient);
        assert!((assessment.score - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_partial_verdict_is_insufficient() {
        let model = Arc::new(StubModel::new(r#"{"verdict": "partial"}"#));
        let evaluator = LlmEvaluator::new(model, 0.5, Duration::from_secs(1));

        let assessment = evaluator
            .evaluate("q", &evidence_with_score(0.9))
            .await
            .unwrap();
        assert!(!assessment.sufficient);
    }

    #[tokio::test]
    async fn test_malformed_verdict_degrades_to_insufficient() {
        let model = Arc::new(StubModel::new("definitely not json"));
        let evaluator = LlmEvaluator::new(model.clone(), 0.5, Duration::from_secs(1));

        let assessment = evaluator
            .evaluate("q", &evidence_with_score(0.9))
            .await
            .unwrap();
        assert!(!assessment.sufficient);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_prompt_variables_reach_the_verdict_call() {
        struct CapturingModel {
            seen: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait]
        impl ChatModel for CapturingModel {
            async fn complete(&self, messages: &[PromptMessage], _json: bool) -> Result<String> {
                let mut seen = self.seen.lock().unwrap();
                seen.extend(messages.iter().map(|m| m.content.clone()));
                Ok(r#"{"verdict": "yes"}"#.to_string())
            }
        }

        let model = Arc::new(CapturingModel {
            seen: std::sync::Mutex::new(Vec::new()),
        });

        let mut prompts = crate::config::Prompts::default();
        prompts.sufficiency.system = "You judge questions about {{domain}}.".to_string();
        prompts
            .variables
            .insert("domain".to_string(), "leadership talks".to_string());

        let evaluator = LlmEvaluator::new(model.clone(), 0.5, Duration::from_secs(1))
            .with_prompts(prompts);

        let assessment = evaluator
            .evaluate("q", &evidence_with_score(0.9))
            .await
            .unwrap();
        assert!(assessment.sufficient);

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].contains("leadership talks"));
    }

    #[tokio::test]
    async fn test_verdict_failure_degrades_to_insufficient() {
        let evaluator = LlmEvaluator::new(Arc::new(FailingModel), 0.5, Duration::from_secs(1));

        let assessment = evaluator
            .evaluate("q", &evidence_with_score(0.9))
            .await
            .unwrap();
        assert!(!assessment.sufficient);
        assert!((assessment.score - 0.9).abs() < f32::EPSILON);
    }
}
