//! Prompt construction for commit message suggestions

use super::SuggestError;
use minijinja::{Environment, UndefinedBehavior, context};

const SYSTEM_TEMPLATE: &str = "\
You are an expert at writing precise, helpful Git commit messages.
Follow the \"Conventional Commits\" style when appropriate.
One short summary line (<= 72 chars), then an empty line, then bullet points if needed.
Use imperative present tense (e.g., \"fix: handle nil pointer in X\").
If the diff is large, summarize purpose + major changes concisely.";

const USER_TEMPLATE: &str = "\
Old message:
\"{{ old_message }}\"

Diff (unified, files & hunks):
{{ diff }}";

/// Rendered system and user messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Renders the fixed instructions and the per-commit payload
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template is valid");
        env.add_template("user", USER_TEMPLATE)
            .expect("user template is valid");
        Self { env }
    }

    /// Build the prompt for one commit. `diff` is sent as given.
    pub fn build(&self, diff: &str, old_message: &str) -> Result<Prompt, SuggestError> {
        let render = |name: &str, ctx: minijinja::Value| {
            self.env
                .get_template(name)
                .and_then(|t| t.render(ctx))
                .map_err(|e| SuggestError::Prompt {
                    message: e.to_string(),
                })
        };

        Ok(Prompt {
            system: render("system", context! {})?,
            user: render("user", context! { old_message, diff })?,
        })
    }
}
