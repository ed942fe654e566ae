//! Prompt templates for the AI features.
//!
//! Templates ship inside the binary (from `config/prompts/`). When
//! `prompts_dir` is configured, a file there with the same name replaces the
//! built-in text. Variables use `{{name}}` syntax.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Flashcards,
    Questions,
    ShortAnswerGrading,
    Analysis,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        PromptKind::Flashcards,
        PromptKind::Questions,
        PromptKind::ShortAnswerGrading,
        PromptKind::Analysis,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            PromptKind::Flashcards => "flashcards.txt",
            PromptKind::Questions => "questions.txt",
            PromptKind::ShortAnswerGrading => "short_answer_grading.txt",
            PromptKind::Analysis => "analysis.txt",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            PromptKind::Flashcards => include_str!("../../config/prompts/flashcards.txt"),
            PromptKind::Questions => include_str!("../../config/prompts/questions.txt"),
            PromptKind::ShortAnswerGrading => {
                include_str!("../../config/prompts/short_answer_grading.txt")
            }
            PromptKind::Analysis => include_str!("../../config/prompts/analysis.txt"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Prompts {
    overrides: HashMap<PromptKind, String>,
}

impl Prompts {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Built-in templates, with any same-named file in `dir` taking over.
    pub fn load(dir: Option<&Path>) -> Self {
        let mut prompts = Self::default();
        let Some(dir) = dir else {
            return prompts;
        };
        for kind in PromptKind::ALL {
            let path = dir.join(kind.file_name());
            match fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => {
                    info!(path = %path.display(), "using prompt override");
                    prompts.overrides.insert(kind, text);
                }
                _ => debug!(path = %path.display(), "no prompt override"),
            }
        }
        prompts
    }

    pub fn template(&self, kind: PromptKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.builtin())
    }

    pub fn render(&self, kind: PromptKind, vars: &[(&str, &str)]) -> String {
        render(self.template(kind), vars)
    }
}

/// Substitutes `{{key}}` placeholders in one pass. Values are inserted
/// verbatim, so placeholders inside them stay untouched. Unknown keys are
/// left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let key = after[..close].trim();
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[open..open + 2 + close + 2]),
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}
