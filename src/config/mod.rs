//! Configuration module for Svar.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, SufficiencyPrompts};
pub use settings::{
    EvaluatorSettings, GeneralSettings, IndexSettings, PromptSettings, SearchSettings, Settings,
    SpeechSettings, SynthesisSettings,
};
