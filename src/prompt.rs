//! Prompt templates and placeholder substitution.
//!
//! A template is plain text with two placeholders, `{context}` and
//! `{question}`; `{{` and `}}` stand for literal braces. Templates are parsed
//! once, when constructed, so a [`PromptTemplate`] can always be rendered.
//! Rendering is single-pass: braces inside the substituted context or
//! question are copied verbatim and never expanded.
//!
//! The two built-in templates live in `prompts/` and are compiled in:
//!
//! | Template | Purpose |
//! |----------|---------|
//! | [`PromptTemplate::basic`] | Bare context + question, no constraints |
//! | [`PromptTemplate::constrained`] | Context-only answers with a fixed refusal sentence |

use anyhow::{Context, Result};
use std::path::Path;

use crate::error::TemplateError;

const BASIC_TEMPLATE: &str = include_str!("../prompts/basic.txt");
const CONSTRAINED_TEMPLATE: &str = include_str!("../prompts/constrained.txt");

/// Sentence the constrained template asks the model to emit when the
/// context does not contain the answer.
pub const REFUSAL_SENTENCE: &str =
    "I cannot find the answer to this question in the provided policy documents.";

/// Separator placed between retrieved chunks in the `{context}` slot.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Question,
}

/// A parsed, validated prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse `text`, requiring both `{context}` and `{question}`.
    pub fn new(name: impl Into<String>, text: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            name: name.into(),
            segments: parse(text)?,
        })
    }

    /// Load a template from a file; the file stem becomes its name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Custom".to_string());
        Self::new(name, &text)
            .with_context(|| format!("Invalid prompt template: {}", path.display()))
    }

    /// The unconstrained baseline template.
    pub fn basic() -> Self {
        Self::builtin("Initial", BASIC_TEMPLATE)
    }

    /// The policy-assistant template with answer constraints and a refusal sentence.
    pub fn constrained() -> Self {
        Self::builtin("Improved", CONSTRAINED_TEMPLATE)
    }

    fn builtin(name: &str, text: &str) -> Self {
        Self::new(name, text).expect("built-in templates contain {context} and {question}")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute `context` (joined by blank lines) and `question`.
    pub fn render(&self, context: &[String], question: &str) -> String {
        let joined = context.join(CONTEXT_SEPARATOR);
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Context => out.push_str(&joined),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }
}

/// Validate `template` and render it in one step.
pub fn format_prompt(
    template: &str,
    context: &[String],
    question: &str,
) -> Result<String, TemplateError> {
    Ok(PromptTemplate::new("inline", template)?.render(context, question))
}

fn parse(text: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(TemplateError::UnbalancedBrace { offset }),
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    if c == '{' {
                        return Err(TemplateError::UnbalancedBrace { offset });
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBrace { offset });
                }

                let segment = match name.as_str() {
                    "context" => Segment::Context,
                    "question" => Segment::Question,
                    _ => return Err(TemplateError::UnknownPlaceholder(name)),
                };
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    if !segments.contains(&Segment::Context) {
        return Err(TemplateError::MissingPlaceholder("context"));
    }
    if !segments.contains(&Segment::Question) {
        return Err(TemplateError::MissingPlaceholder("question"));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtins_parse() {
        assert!(PromptTemplate::new("basic", BASIC_TEMPLATE).is_ok());
        assert!(PromptTemplate::new("constrained", CONSTRAINED_TEMPLATE).is_ok());
        assert_eq!(PromptTemplate::basic().name(), "Initial");
        assert_eq!(PromptTemplate::constrained().name(), "Improved");
    }

    #[test]
    fn test_constrained_carries_refusal_sentence() {
        let rendered = PromptTemplate::constrained().render(&[], "Do you ship to Mars?");
        assert!(rendered.contains(REFUSAL_SENTENCE));
        assert!(rendered.contains("Do you ship to Mars?"));
        assert!(rendered.contains("ONLY"));
    }

    #[test]
    fn test_render_joins_context_with_blank_line() {
        let rendered = format_prompt(
            "C:{context}|Q:{question}",
            &ctx(&["first", "second"]),
            "why?",
        )
        .unwrap();
        assert_eq!(rendered, "C:first\n\nsecond|Q:why?");
    }

    #[test]
    fn test_render_is_pure() {
        let template = PromptTemplate::basic();
        let context = ctx(&["Refunds must be requested within 30 days."]);
        let a = template.render(&context, "What is the time limit?");
        let b = template.render(&context, "What is the time limit?");
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_placeholders() {
        assert_eq!(
            format_prompt("Question: {question}", &[], "q"),
            Err(TemplateError::MissingPlaceholder("context"))
        );
        assert_eq!(
            format_prompt("Context: {context}", &[], "q"),
            Err(TemplateError::MissingPlaceholder("question"))
        );
    }

    #[test]
    fn test_unknown_and_unbalanced() {
        assert_eq!(
            format_prompt("{context} {question} {persona}", &[], "q"),
            Err(TemplateError::UnknownPlaceholder("persona".to_string()))
        );
        assert!(matches!(
            format_prompt("{context} {question", &[], "q"),
            Err(TemplateError::UnbalancedBrace { .. })
        ));
        assert_eq!(
            format_prompt("{context} } {question}", &[], "q"),
            Err(TemplateError::UnbalancedBrace { offset: 10 })
        );
    }

    #[test]
    fn test_escaped_braces() {
        let rendered = format_prompt("{{json}} {context} {question}", &ctx(&["c"]), "q").unwrap();
        assert_eq!(rendered, "{json} c q");
    }

    #[test]
    fn test_substituted_text_not_reexpanded() {
        let rendered = format_prompt(
            "{context}\n{question}",
            &ctx(&["see {question} above"]),
            "{context}",
        )
        .unwrap();
        assert_eq!(rendered, "see {question} above\n{context}");
    }

    #[test]
    fn test_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("terse.txt");
        std::fs::write(&path, "Use: {context}\nQ: {question}\n").unwrap();
        let template = PromptTemplate::from_file(&path).unwrap();
        assert_eq!(template.name(), "terse");

        std::fs::write(&path, "no placeholders here").unwrap();
        assert!(PromptTemplate::from_file(&path).is_err());
    }
}
