//! Grounded answer synthesis.
//!
//! One generation call per invocation: the query, a bounded window of
//! conversation history, and the assembled evidence tagged with source
//! identifiers go in; a JSON answer with citations and confidence comes
//! back. The call is retried once with backoff; a second failure is fatal
//! to the query.

use crate::config::Prompts;
use crate::conversation::ConversationHistory;
use crate::error::{Result, SvarError};
use crate::evaluate::ConfidenceAssessment;
use crate::evidence::{EvidenceOrigin, EvidenceSet};
use crate::llm::{ChatModel, PromptMessage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Confidence assigned when no evidence was available at all.
pub const MIN_CONFIDENCE: f32 = 0.1;

/// Which retrieval paths contributed to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOrigin {
    /// All evidence came from the vector index.
    Indexed,
    /// All evidence came from web search.
    Web,
    /// Evidence from both paths.
    Mixed,
    /// No evidence was available; best-effort answer.
    None,
}

impl AnswerOrigin {
    fn from_evidence(evidence: &EvidenceSet) -> Self {
        let indexed = evidence.has_origin(EvidenceOrigin::Indexed);
        let web = evidence.has_origin(EvidenceOrigin::Web);
        match (indexed, web) {
            (true, true) => AnswerOrigin::Mixed,
            (true, false) => AnswerOrigin::Indexed,
            (false, true) => AnswerOrigin::Web,
            (false, false) => AnswerOrigin::None,
        }
    }
}

impl std::fmt::Display for AnswerOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerOrigin::Indexed => write!(f, "indexed"),
            AnswerOrigin::Web => write!(f, "web"),
            AnswerOrigin::Mixed => write!(f, "mixed"),
            AnswerOrigin::None => write!(f, "none"),
        }
    }
}

/// The terminal artifact of the synthesis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text.
    pub text: String,
    /// Source identifiers cited by the answer; always a subset of the
    /// evidence sources for the run.
    pub citations: Vec<String>,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Which retrieval paths the evidence came from.
    pub origin: AnswerOrigin,
}

/// Raw shape of the model's JSON output.
#[derive(Debug, Deserialize)]
struct RawAnswer {
    answer: String,
    #[serde(default)]
    citations: Vec<String>,
    confidence: Option<f32>,
}

/// Generates grounded answers from query, history, and evidence.
pub struct Synthesizer {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
    history_window: usize,
    timeout: Duration,
    retry_backoff: Duration,
}

impl Synthesizer {
    /// Create a synthesizer over the given model.
    pub fn new(
        model: Arc<dyn ChatModel>,
        history_window: usize,
        timeout: Duration,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            model,
            prompts: Prompts::default(),
            history_window,
            timeout,
            retry_backoff,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Synthesize a grounded answer.
    ///
    /// Never fails on empty evidence: a best-effort answer with
    /// `origin = none` and minimum confidence is produced instead. A second
    /// generation failure surfaces [`SvarError::Synthesis`].
    #[instrument(skip(self, history, evidence, assessment), fields(query = %query_text))]
    pub async fn synthesize(
        &self,
        query_text: &str,
        history: &ConversationHistory,
        evidence: &EvidenceSet,
        assessment: &ConfidenceAssessment,
    ) -> Result<Answer> {
        let messages = self.build_messages(query_text, history, evidence);
        let raw = self.generate_with_retry(&messages).await?;

        let origin = AnswerOrigin::from_evidence(evidence);
        let fallback_confidence = if evidence.is_empty() {
            MIN_CONFIDENCE
        } else {
            assessment.score
        };

        let answer = match serde_json::from_str::<RawAnswer>(raw.trim()) {
            Ok(parsed) => {
                let citations = filter_citations(parsed.citations, evidence);
                let confidence = if evidence.is_empty() {
                    MIN_CONFIDENCE
                } else {
                    parsed
                        .confidence
                        .map(|c| c.clamp(0.0, 1.0))
                        .unwrap_or(fallback_confidence)
                };
                Answer {
                    text: parsed.answer,
                    citations,
                    confidence,
                    origin,
                }
            }
            Err(e) => {
                // Degraded but not failed: keep the raw text as the answer.
                warn!("Model output was not valid JSON ({}), using raw text", e);
                Answer {
                    text: raw,
                    citations: Vec::new(),
                    confidence: fallback_confidence,
                    origin,
                }
            }
        };

        info!(
            origin = %answer.origin,
            confidence = answer.confidence,
            citations = answer.citations.len(),
            "Synthesized answer"
        );

        Ok(answer)
    }

    /// Assemble the chat messages for the generation call.
    fn build_messages(
        &self,
        query_text: &str,
        history: &ConversationHistory,
        evidence: &EvidenceSet,
    ) -> Vec<PromptMessage> {
        let context = if evidence.is_empty() {
            "(no evidence available; answer from general knowledge and say that \
             the library did not cover this)"
                .to_string()
        } else {
            format_evidence(evidence)
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query_text.to_string());
        vars.insert("context".to_string(), context);

        let mut messages = vec![PromptMessage::system(
            self.prompts
                .render_with_custom(&self.prompts.answer.system, &vars),
        )];

        for turn in history.recent(self.history_window) {
            messages.push(PromptMessage::from_turn(turn.role, turn.text.clone()));
        }

        messages.push(PromptMessage::user(
            self.prompts
                .render_with_custom(&self.prompts.answer.user, &vars),
        ));

        messages
    }

    /// Call the model with one retry and exponential backoff.
    async fn generate_with_retry(&self, messages: &[PromptMessage]) -> Result<String> {
        let mut backoff = self.retry_backoff;

        for attempt in 0..2 {
            match tokio::time::timeout(self.timeout, self.model.complete(messages, true)).await {
                Ok(Ok(raw)) => return Ok(raw),
                Ok(Err(e)) => {
                    if attempt == 0 {
                        warn!("Generation attempt failed, retrying in {:?}: {}", backoff, e);
                    } else {
                        return Err(SvarError::Synthesis(format!(
                            "Generation failed after retry: {}",
                            e
                        )));
                    }
                }
                Err(_) => {
                    if attempt == 0 {
                        warn!(
                            "Generation timed out after {:?}, retrying in {:?}",
                            self.timeout, backoff
                        );
                    } else {
                        return Err(SvarError::Synthesis(format!(
                            "Generation timed out twice (limit {:?})",
                            self.timeout
                        )));
                    }
                }
            }

            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        unreachable!("retry loop returns on second attempt")
    }
}

/// Format evidence blocks with source tags for the prompt.
fn format_evidence(evidence: &EvidenceSet) -> String {
    evidence
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "---\n[S{}] source: {}\n{}\n---",
                i + 1,
                item.source,
                item.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Keep only citations that trace back to supplied evidence.
///
/// Accepts either raw source identifiers or the positional tags (`S1`,
/// `[S2]`) models sometimes echo back; anything else is dropped.
fn filter_citations(raw: Vec<String>, evidence: &EvidenceSet) -> Vec<String> {
    let sources = evidence.sources();
    let mut citations = Vec::new();

    for citation in raw {
        let trimmed = citation.trim().trim_matches(['[', ']']);

        let resolved = if let Some(source) = sources.iter().find(|s| **s == trimmed) {
            Some(source.to_string())
        } else {
            trimmed
                .strip_prefix(['S', 's'])
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| sources.get(i))
                .map(|s| s.to_string())
        };

        if let Some(source) = resolved {
            if !citations.contains(&source) {
                citations.push(source);
            }
        } else {
            debug!("Dropping citation '{}' not present in evidence", citation);
        }
    }

    citations
}
