//! Workflow orchestrator: the per-query state machine.
//!
//! Sequences retrieval, sufficiency evaluation, the conditional web search
//! fallback, and answer synthesis. Each `ask` call owns exactly one
//! [`WorkflowState`]; nothing is shared across concurrent queries except the
//! read-only components themselves. Cancelling the future at any await point
//! drops the state without delivering a partial answer.

use crate::config::{Prompts, Settings};
use crate::conversation::ConversationHistory;
use crate::error::{Result, SvarError};
use crate::evaluate::{ConfidenceAssessment, LlmEvaluator, SufficiencyEvaluator};
use crate::evidence::EvidenceSet;
use crate::llm::OpenAiChat;
use crate::retrieval::{HttpVectorIndex, Retriever};
use crate::search::{HttpSearchProvider, WebSearcher};
use crate::speech::{AudioArtifact, OpenAiSpeech, SpeechRenderer};
use crate::synthesis::{Answer, Synthesizer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// A single user question.
#[derive(Debug, Clone)]
pub struct Query {
    /// Raw question text.
    pub text: String,
    /// Target response language (BCP 47 tag), if any.
    pub language: Option<String>,
    /// Session identifier, if the caller tracks sessions.
    pub session_id: Option<Uuid>,
}

impl Query {
    /// Create a query with just the question text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            session_id: None,
        }
    }

    /// Set the target response language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the session identifier.
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Pipeline stage for one workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieving,
    Evaluating,
    SynthesizingDirect,
    Searching,
    SynthesizingWithWeb,
    Done,
    Failed,
}

/// Mutable record threaded through the pipeline for a single query.
///
/// Exclusively owned by one in-flight `ask` call; created on entry and
/// dropped on completion or cancellation.
#[derive(Debug)]
struct WorkflowState {
    query: Query,
    stage: Stage,
    evidence: EvidenceSet,
    assessment: Option<ConfidenceAssessment>,
    answer: Option<Answer>,
}

impl WorkflowState {
    fn new(query: Query) -> Self {
        Self {
            query,
            stage: Stage::Retrieving,
            evidence: EvidenceSet::new(),
            assessment: None,
            answer: None,
        }
    }
}

/// The answer-synthesis workflow.
///
/// Components are shared, read-only, and safe for concurrent `ask` calls;
/// all per-query state lives in the call itself.
pub struct Workflow {
    retriever: Retriever,
    evaluator: Arc<dyn SufficiencyEvaluator>,
    searcher: WebSearcher,
    synthesizer: Synthesizer,
    speech: Arc<dyn SpeechRenderer>,
    default_language: Option<String>,
}

impl Workflow {
    /// Create a workflow with production components from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let index = Arc::new(HttpVectorIndex::new(&settings.index.endpoint)?);
        let retriever = Retriever::new(
            index,
            settings.index.top_k,
            Duration::from_secs(settings.index.timeout_seconds),
        );

        let verdict_model = Arc::new(OpenAiChat::new(&settings.evaluator.model, 0.0));
        let evaluator = Arc::new(
            LlmEvaluator::new(
                verdict_model,
                settings.evaluator.threshold,
                Duration::from_secs(settings.evaluator.timeout_seconds),
            )
            .with_prompts(prompts.clone()),
        );

        let provider = Arc::new(HttpSearchProvider::new(
            &settings.search.endpoint,
            settings.search.api_key.as_deref(),
        )?);
        let searcher = WebSearcher::new(
            provider,
            settings.search.max_results,
            Duration::from_secs(settings.search.timeout_seconds),
        );

        let answer_model = Arc::new(OpenAiChat::new(
            &settings.synthesis.model,
            settings.synthesis.temperature,
        ));
        let synthesizer = Synthesizer::new(
            answer_model,
            settings.synthesis.history_window,
            Duration::from_secs(settings.synthesis.timeout_seconds),
            Duration::from_millis(settings.synthesis.retry_backoff_ms),
        )
        .with_prompts(prompts.clone());

        let speech = Arc::new(OpenAiSpeech::new(
            &settings.speech.model,
            &settings.speech.voice,
            Duration::from_secs(settings.speech.timeout_seconds),
        ));

        Ok(Self {
            retriever,
            evaluator,
            searcher,
            synthesizer,
            speech,
            default_language: settings.general.language.clone(),
        })
    }

    /// Create a workflow with custom components (for tests or embedding).
    pub fn with_components(
        retriever: Retriever,
        evaluator: Arc<dyn SufficiencyEvaluator>,
        searcher: WebSearcher,
        synthesizer: Synthesizer,
        speech: Arc<dyn SpeechRenderer>,
    ) -> Self {
        Self {
            retriever,
            evaluator,
            searcher,
            synthesizer,
            speech,
            default_language: None,
        }
    }

    /// Answer a question grounded in the indexed library, falling back to
    /// web search when the index is insufficient.
    ///
    /// This is the only question entry point. History is read, never
    /// mutated; appending the new turns is the caller's job.
    #[instrument(skip(self, history), fields(query = %query.text))]
    pub async fn ask(&self, query: Query, history: &ConversationHistory) -> Result<Answer> {
        if query.text.trim().is_empty() {
            return Err(SvarError::InvalidInput("Question is empty".to_string()));
        }

        let mut state = WorkflowState::new(query);
        if state.query.language.is_none() {
            state.query.language = self.default_language.clone();
        }

        loop {
            state.stage = match state.stage {
                Stage::Retrieving => {
                    state.evidence = self
                        .retriever
                        .retrieve(&state.query.text, state.query.language.as_deref())
                        .await;
                    debug!(evidence = state.evidence.len(), "Retrieval complete");
                    Stage::Evaluating
                }

                Stage::Evaluating => {
                    // Branching must never happen before the assessment exists.
                    let assessment = match self
                        .evaluator
                        .evaluate(&state.query.text, &state.evidence)
                        .await
                    {
                        Ok(a) => a,
                        Err(e) => {
                            // Evaluator trouble is recoverable: treat the
                            // evidence as insufficient and fall back.
                            debug!("Evaluator failed ({}), treating evidence as insufficient", e);
                            ConfidenceAssessment {
                                sufficient: false,
                                score: state.evidence.top_score(),
                                reason: format!("evaluator failed: {}", e),
                            }
                        }
                    };

                    info!(
                        sufficient = assessment.sufficient,
                        score = assessment.score,
                        reason = %assessment.reason,
                        "Evidence evaluated"
                    );

                    let next = if assessment.sufficient {
                        Stage::SynthesizingDirect
                    } else {
                        Stage::Searching
                    };
                    state.assessment = Some(assessment);
                    next
                }

                Stage::Searching => {
                    let web_evidence = self.searcher.search(&state.query.text).await;
                    debug!(web = web_evidence.len(), "Web search complete");
                    state.evidence.extend(web_evidence.into_items());
                    Stage::SynthesizingWithWeb
                }

                Stage::SynthesizingDirect | Stage::SynthesizingWithWeb => {
                    let assessment = state.assessment.as_ref().ok_or_else(|| {
                        SvarError::Synthesis("evaluation must precede synthesis".to_string())
                    })?;

                    match self
                        .synthesizer
                        .synthesize(&state.query.text, history, &state.evidence, assessment)
                        .await
                    {
                        Ok(answer) => {
                            state.answer = Some(answer);
                            Stage::Done
                        }
                        Err(e) => {
                            state.stage = Stage::Failed;
                            error!("Workflow failed during synthesis: {}", e);
                            return Err(e);
                        }
                    }
                }

                Stage::Done => {
                    return state.answer.take().ok_or_else(|| {
                        SvarError::Synthesis("workflow finished without an answer".to_string())
                    });
                }

                Stage::Failed => {
                    return Err(SvarError::Synthesis(
                        "workflow already failed".to_string(),
                    ));
                }
            };
        }
    }

    /// Render an already-produced answer as speech.
    ///
    /// On demand, never part of `ask`. Failure withholds the audio but the
    /// answer remains complete and valid.
    pub async fn speak(
        &self,
        answer: &Answer,
        language: Option<&str>,
    ) -> Result<AudioArtifact> {
        let language = language.or(self.default_language.as_deref());
        self.speech.render(&answer.text, language).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::SufficiencyEvaluator;
    use crate::llm::{ChatModel, PromptMessage};
    use crate::retrieval::{IndexHit, IndexQuery, VectorIndex};
    use crate::search::{SearchHit, SearchProvider};
    use crate::synthesis::{AnswerOrigin, MIN_CONFIDENCE};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedIndex(Vec<IndexHit>);

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn query(&self, _request: &IndexQuery) -> Result<Vec<IndexHit>> {
            Ok(self.0.clone())
        }
    }

    struct CountingSearch {
        hits: Vec<SearchHit>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchProvider for CountingSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }
    }

    /// Evaluator stub: sufficient iff top score clears 0.5.
    struct ThresholdEvaluator;

    #[async_trait]
    impl SufficiencyEvaluator for ThresholdEvaluator {
        async fn evaluate(
            &self,
            _query: &str,
            evidence: &EvidenceSet,
        ) -> Result<ConfidenceAssessment> {
            let score = evidence.top_score();
            Ok(ConfidenceAssessment {
                sufficient: !evidence.is_empty() && score >= 0.5,
                score,
                reason: "stub".to_string(),
            })
        }
    }

    struct JsonModel(String);

    #[async_trait]
    impl ChatModel for JsonModel {
        async fn complete(&self, _messages: &[PromptMessage], _json: bool) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl ChatModel for BrokenModel {
        async fn complete(&self, _messages: &[PromptMessage], _json: bool) -> Result<String> {
            Err(SvarError::OpenAI("generation down".to_string()))
        }
    }

    struct BrokenSpeech;

    #[async_trait]
    impl SpeechRenderer for BrokenSpeech {
        async fn render(&self, _text: &str, _language: Option<&str>) -> Result<AudioArtifact> {
            Err(SvarError::Speech("tts down".to_string()))
        }
    }

    fn hit(source: &str, score: f32) -> IndexHit {
        IndexHit {
            content: "the playlist is about leadership lessons".to_string(),
            source_id: source.to_string(),
            score,
        }
    }

    fn web_hit(url: &str) -> SearchHit {
        SearchHit {
            title: "Result".to_string(),
            snippet: "web snippet".to_string(),
            url: url.to_string(),
        }
    }

    fn workflow(
        index_hits: Vec<IndexHit>,
        search_hits: Vec<SearchHit>,
        model_json: &str,
    ) -> (Workflow, Arc<AtomicUsize>) {
        let search_calls = Arc::new(AtomicUsize::new(0));

        let retriever = Retriever::new(
            Arc::new(FixedIndex(index_hits)),
            5,
            Duration::from_secs(1),
        );
        let searcher = WebSearcher::new(
            Arc::new(CountingSearch {
                hits: search_hits,
                calls: search_calls.clone(),
            }),
            3,
            Duration::from_secs(1),
        );
        let synthesizer = Synthesizer::new(
            Arc::new(JsonModel(model_json.to_string())),
            10,
            Duration::from_secs(1),
            Duration::from_millis(1),
        );

        let workflow = Workflow::with_components(
            retriever,
            Arc::new(ThresholdEvaluator),
            searcher,
            synthesizer,
            Arc::new(BrokenSpeech),
        );

        (workflow, search_calls)
    }

    const ANSWER_JSON: &str =
        r#"{"answer": "It is about leadership.", "citations": ["seg-1"], "confidence": 0.85}"#;

    #[tokio::test]
    async fn test_sufficient_evidence_skips_web_search() {
        let (workflow, search_calls) = workflow(vec![hit("seg-1", 0.9)], Vec::new(), ANSWER_JSON);

        let answer = workflow
            .ask(
                Query::new("What is the playlist about?"),
                &ConversationHistory::new(),
            )
            .await
            .unwrap();

        assert_eq!(search_calls.load(Ordering::SeqCst), 0);
        assert_eq!(answer.origin, AnswerOrigin::Indexed);
        assert_eq!(answer.citations, vec!["seg-1"]);
    }

    #[tokio::test]
    async fn test_empty_retrieval_triggers_search_exactly_once() {
        let (workflow, search_calls) = workflow(
            Vec::new(),
            vec![web_hit("https://example.com/a")],
            r#"{"answer": "From the web.", "citations": ["https://example.com/a"], "confidence": 0.6}"#,
        );

        let answer = workflow
            .ask(Query::new("Unrelated current event?"), &ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(answer.origin, AnswerOrigin::Web);
        assert_eq!(answer.citations, vec!["https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_low_score_takes_fallback_path() {
        let (workflow, search_calls) = workflow(
            vec![hit("seg-1", 0.1)],
            vec![web_hit("https://example.com/news")],
            r#"{"answer": "Mixed answer.", "citations": [], "confidence": 0.5}"#,
        );

        let answer = workflow
            .ask(Query::new("Unrelated current event?"), &ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(search_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            answer.origin,
            AnswerOrigin::Web | AnswerOrigin::Mixed
        ));
    }

    #[tokio::test]
    async fn test_both_empty_yields_well_formed_answer() {
        let (workflow, search_calls) = workflow(
            Vec::new(),
            Vec::new(),
            r#"{"answer": "I have nothing on this.", "citations": [], "confidence": 0.9}"#,
        );

        let answer = workflow
            .ask(Query::new("Anything?"), &ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(answer.origin, AnswerOrigin::None);
        assert!((answer.confidence - MIN_CONFIDENCE).abs() < f32::EPSILON);
        assert!(answer.citations.is_empty());
        assert!(!answer.text.is_empty());
    }

    #[tokio::test]
    async fn test_citations_are_subset_of_evidence_sources() {
        let (workflow, _) = workflow(
            vec![hit("seg-1", 0.9), hit("seg-2", 0.8)],
            Vec::new(),
            r#"{"answer": "x", "citations": ["seg-2", "fabricated-source"], "confidence": 0.7}"#,
        );

        let answer = workflow
            .ask(Query::new("q"), &ConversationHistory::new())
            .await
            .unwrap();

        assert_eq!(answer.citations, vec!["seg-2"]);
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_fatal() {
        let retriever = Retriever::new(
            Arc::new(FixedIndex(vec![hit("seg-1", 0.9)])),
            5,
            Duration::from_secs(1),
        );
        let searcher = WebSearcher::new(
            Arc::new(CountingSearch {
                hits: Vec::new(),
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            3,
            Duration::from_secs(1),
        );
        let synthesizer = Synthesizer::new(
            Arc::new(BrokenModel),
            10,
            Duration::from_secs(1),
            Duration::from_millis(1),
        );
        let workflow = Workflow::with_components(
            retriever,
            Arc::new(ThresholdEvaluator),
            searcher,
            synthesizer,
            Arc::new(BrokenSpeech),
        );

        let result = workflow.ask(Query::new("q"), &ConversationHistory::new()).await;
        assert!(matches!(result, Err(SvarError::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_speech_failure_leaves_answer_untouched() {
        let (workflow, _) = workflow(vec![hit("seg-1", 0.9)], Vec::new(), ANSWER_JSON);

        let answer = workflow
            .ask(Query::new("q"), &ConversationHistory::new())
            .await
            .unwrap();
        let before = answer.clone();

        let rendered = workflow.speak(&answer, Some("en")).await;
        assert!(matches!(rendered, Err(SvarError::Speech(_))));

        assert_eq!(answer.text, before.text);
        assert_eq!(answer.citations, before.citations);
        assert!((answer.confidence - before.confidence).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_cancel_mid_retrieval_has_no_side_effects() {
        struct HangingIndex;

        #[async_trait]
        impl VectorIndex for HangingIndex {
            async fn query(&self, _request: &IndexQuery) -> Result<Vec<IndexHit>> {
                std::future::pending().await
            }
        }

        struct CountingModel {
            calls: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl ChatModel for CountingModel {
            async fn complete(&self, _messages: &[PromptMessage], _json: bool) -> Result<String> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(r#"{"answer": "nothing indexed", "citations": [], "confidence": 0.5}"#
                    .to_string())
            }
        }

        let search_calls = Arc::new(AtomicUsize::new(0));
        let model_calls = Arc::new(AtomicUsize::new(0));

        let retriever = Retriever::new(Arc::new(HangingIndex), 5, Duration::from_millis(200));
        let searcher = WebSearcher::new(
            Arc::new(CountingSearch {
                hits: Vec::new(),
                calls: search_calls.clone(),
            }),
            3,
            Duration::from_secs(1),
        );
        let synthesizer = Synthesizer::new(
            Arc::new(CountingModel {
                calls: model_calls.clone(),
            }),
            10,
            Duration::from_secs(1),
            Duration::from_millis(1),
        );
        let workflow = Arc::new(Workflow::with_components(
            retriever,
            Arc::new(ThresholdEvaluator),
            searcher,
            synthesizer,
            Arc::new(BrokenSpeech),
        ));

        // Abort while retrieval is still pending.
        let wf = workflow.clone();
        let handle = tokio::spawn(async move {
            wf.ask(Query::new("q"), &ConversationHistory::new()).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        // No later stage ran, so nothing observable escaped the dropped state.
        assert_eq!(search_calls.load(Ordering::SeqCst), 0);
        assert_eq!(model_calls.load(Ordering::SeqCst), 0);

        // The shared components stay usable for a fresh query.
        let answer = workflow
            .ask(Query::new("again"), &ConversationHistory::new())
            .await
            .unwrap();
        assert_eq!(answer.origin, AnswerOrigin::None);
        assert_eq!(search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(model_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_speak_forwards_requested_language() {
        struct CapturingSpeech {
            languages: std::sync::Mutex<Vec<Option<String>>>,
        }

        #[async_trait]
        impl SpeechRenderer for CapturingSpeech {
            async fn render(&self, text: &str, language: Option<&str>) -> Result<AudioArtifact> {
                let mut languages = self.languages.lock().unwrap();
                languages.push(language.map(|l| l.to_string()));
                Ok(AudioArtifact {
                    bytes: text.as_bytes().to_vec(),
                    format: "mp3".to_string(),
                    voice: "alloy".to_string(),
                    created_at: chrono::Utc::now(),
                })
            }
        }

        let speech = Arc::new(CapturingSpeech {
            languages: std::sync::Mutex::new(Vec::new()),
        });

        let retriever = Retriever::new(
            Arc::new(FixedIndex(vec![hit("seg-1", 0.9)])),
            5,
            Duration::from_secs(1),
        );
        let searcher = WebSearcher::new(
            Arc::new(CountingSearch {
                hits: Vec::new(),
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            3,
            Duration::from_secs(1),
        );
        let synthesizer = Synthesizer::new(
            Arc::new(JsonModel(ANSWER_JSON.to_string())),
            10,
            Duration::from_secs(1),
            Duration::from_millis(1),
        );
        let workflow = Workflow::with_components(
            retriever,
            Arc::new(ThresholdEvaluator),
            searcher,
            synthesizer,
            speech.clone(),
        );

        let answer = workflow
            .ask(Query::new("q"), &ConversationHistory::new())
            .await
            .unwrap();

        workflow.speak(&answer, Some("tr")).await.unwrap();
        workflow.speak(&answer, None).await.unwrap();

        let languages = speech.languages.lock().unwrap();
        assert_eq!(languages[0].as_deref(), Some("tr"));
        assert_eq!(languages[1], None);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let (workflow, search_calls) = workflow(vec![hit("seg-1", 0.9)], Vec::new(), ANSWER_JSON);

        let result = workflow
            .ask(Query::new("   "), &ConversationHistory::new())
            .await;

        assert!(matches!(result, Err(SvarError::InvalidInput(_))));
        assert_eq!(search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_asks_do_not_share_state() {
        let (workflow, _) = workflow(vec![hit("seg-1", 0.9)], Vec::new(), ANSWER_JSON);
        let workflow = Arc::new(workflow);

        let mut handles = Vec::new();
        for i in 0..8 {
            let wf = workflow.clone();
            handles.push(tokio::spawn(async move {
                wf.ask(Query::new(format!("q{}", i)), &ConversationHistory::new())
                    .await
            }));
        }

        for handle in handles {
            let answer = handle.await.unwrap().unwrap();
            assert_eq!(answer.origin, AnswerOrigin::Indexed);
        }
    }
}
