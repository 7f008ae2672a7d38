//! Ask command: one question, one grounded answer.

use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationHistory;
use crate::error::Result;
use crate::workflow::{Query, Workflow};
use std::path::Path;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    language: Option<String>,
    speak: Option<String>,
    settings: Settings,
) -> Result<()> {
    let workflow = Workflow::new(&settings)?;

    let mut query = Query::new(question);
    if let Some(language) = &language {
        query = query.with_language(language.clone());
    }

    let spinner = Output::spinner("Thinking...");
    let result = workflow.ask(query, &ConversationHistory::new()).await;
    spinner.finish_and_clear();

    let answer = match result {
        Ok(answer) => answer,
        Err(e) => {
            Output::error(&format!("Could not answer: {}", e));
            return Err(e);
        }
    };

    Output::answer(&answer);

    if let Some(path) = speak {
        let spinner = Output::spinner("Rendering speech...");
        let rendered = workflow.speak(&answer, language.as_deref()).await;
        spinner.finish_and_clear();

        match rendered {
            Ok(artifact) => {
                artifact.save(Path::new(&path))?;
                Output::success(&format!("Audio written to {}", path));
            }
            Err(e) => {
                // The answer stands; only the audio is withheld.
                Output::warning(&format!("Speech unavailable for this answer: {}", e));
            }
        }
    }

    Ok(())
}
