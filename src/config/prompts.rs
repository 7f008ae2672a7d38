//! Prompt templates for Svar.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory. The sufficiency and answer prompts are deliberately separate
//! contracts: the first is a narrow verdict call, the second is the full
//! grounded generation call.

use super::Settings;
use serde::{Deserialize, Serialize};

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub sufficiency: SufficiencyPrompts,
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for the semantic sufficiency verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SufficiencyPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SufficiencyPrompts {
    fn default() -> Self {
        Self {
            system: r#"You judge whether retrieved excerpts contain enough information to answer a question completely and accurately.

The excerpts come from speech-to-text transcriptions of spoken content, so minor wording errors are expected and do not count against sufficiency.

Respond ONLY with a JSON object of the form {"verdict": "yes"} or {"verdict": "no"} or {"verdict": "partial"}:
- "yes": the excerpts contain the information needed for a complete, accurate answer
- "partial": the excerpts cover some of the question but a complete answer would need more
- "no": the excerpts do not address the question"#
                .to_string(),

            user: r#"Question: {{question}}

Excerpts:
{{context}}

Is the above enough to answer the question completely and accurately?"#
                .to_string(),
        }
    }
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant answering questions about a library of transcribed spoken content. Evidence excerpts are provided with source tags like [S1], [S2].

Guidelines:
- Ground every claim in the provided evidence and cite the sources you used
- The transcribed excerpts come from speech-to-text, so tolerate minor wording errors
- If the evidence does not contain the needed information, say so clearly instead of inventing facts
- Answer in the same language as the question unless told otherwise

Respond ONLY with a JSON object with these fields:
- "answer": the answer text
- "citations": array of the source identifiers (the values after each tag, not the tags) you actually used
- "confidence": your confidence in the answer, 0 to 1"#
                .to_string(),

            user: r#"Question: {{question}}

Evidence:
{{context}}

Answer the question using the evidence above."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = Settings::expand_path(dir);

            let sufficiency_path = custom_path.join("sufficiency.toml");
            if sufficiency_path.exists() {
                let content = std::fs::read_to_string(&sufficiency_path)?;
                prompts.sufficiency = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.sufficiency.system.is_empty());
        assert!(!prompts.answer.system.is_empty());
        assert!(prompts.answer.user.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Question: {{question}}\nContext: {{context}}";
        let mut vars = std::collections::HashMap::new();
        vars.insert("question".to_string(), "What?".to_string());
        vars.insert("context".to_string(), "Nothing.".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Question: What?\nContext: Nothing.");
    }

    #[test]
    fn test_custom_variables_merge() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("domain".to_string(), "leadership talks".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("question".to_string(), "Who?".to_string());

        let result =
            prompts.render_with_custom("{{domain}}: {{question}}", &vars);
        assert_eq!(result, "leadership talks: Who?");
    }
}
