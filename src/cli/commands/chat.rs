//! Interactive chat command.
//!
//! Maintains the conversation history across turns. The workflow only reads
//! the history; this session owns it and appends the user turn before each
//! ask and the answer text after.

use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationHistory;
use crate::error::Result;
use crate::workflow::{Query, Workflow};
use console::style;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use uuid::Uuid;

/// Run the interactive chat command.
pub async fn run_chat(
    language: Option<String>,
    speak_dir: Option<String>,
    settings: Settings,
) -> Result<()> {
    let workflow = Workflow::new(&settings)?;
    let session_id = Uuid::new_v4();
    let mut history = ConversationHistory::new();

    if let Some(dir) = &speak_dir {
        std::fs::create_dir_all(dir)?;
    }

    println!("\n{}", style("Svar Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut turn = 0usize;

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history = ConversationHistory::new();
            Output::info("Conversation history cleared.");
            continue;
        }

        let mut query = Query::new(input).with_session(session_id);
        if let Some(language) = &language {
            query = query.with_language(language.clone());
        }

        let spinner = Output::spinner("Thinking...");
        let result = workflow.ask(query, &history).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                print!("\n{}", style("Svar:").cyan().bold());
                Output::answer(&answer);
                println!();

                history.push_user(input);
                history.push_assistant(answer.text.clone());
                turn += 1;

                if let Some(dir) = &speak_dir {
                    match workflow.speak(&answer, language.as_deref()).await {
                        Ok(artifact) => {
                            let path = PathBuf::from(dir).join(format!("answer-{:03}.mp3", turn));
                            artifact.save(&path)?;
                            Output::kv("audio", &path.display().to_string());
                        }
                        Err(e) => {
                            Output::warning(&format!("Speech unavailable: {}", e));
                        }
                    }
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
