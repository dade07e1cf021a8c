//! Interactive question loop.
//!
//! Reads one line at a time. `exit` or `quit` (any case) ends the session,
//! `switch` toggles between the primary and baseline prompt templates, blank
//! lines are skipped, and anything else is asked as a question. A failing
//! question prints the error and the loop continues.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::pipeline::RagPipeline;
use crate::prompt::PromptTemplate;

/// Characters of each retrieved chunk shown after an answer.
const PREVIEW_CHARS: usize = 100;

/// The two templates the shell toggles between.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub primary: PromptTemplate,
    pub baseline: PromptTemplate,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            primary: PromptTemplate::constrained(),
            baseline: PromptTemplate::basic(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Exit,
    Switch,
    Skip,
    Ask(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "exit" | "quit" => Command::Exit,
        "switch" => Command::Switch,
        "" => Command::Skip,
        _ => Command::Ask(trimmed),
    }
}

/// First [`PREVIEW_CHARS`] characters of `chunk` on one line.
pub fn preview(chunk: &str) -> String {
    chunk
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', " ")
}

/// Run the loop until `exit`/`quit` or end of input.
pub async fn run_chat<R, W>(
    pipeline: &RagPipeline,
    prompts: &PromptSet,
    mut input: R,
    out: &mut W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "\n--- Policy Assistant Ready ---")?;
    writeln!(out, "Type 'exit' to quit.")?;
    writeln!(
        out,
        "Type 'switch' to toggle between {} and {} prompts.",
        prompts.baseline.name(),
        prompts.primary.name()
    )?;

    let mut use_primary = true;
    let mut line = String::new();

    loop {
        let current = if use_primary {
            &prompts.primary
        } else {
            &prompts.baseline
        };
        write!(out, "\n({} Prompt) Enter your question: ", current.name())?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        match parse_command(&line) {
            Command::Exit => break,
            Command::Skip => continue,
            Command::Switch => {
                use_primary = !use_primary;
                let now = if use_primary {
                    &prompts.primary
                } else {
                    &prompts.baseline
                };
                writeln!(out, "Switched to {} Prompt.", now.name())?;
            }
            Command::Ask(question) => {
                writeln!(out, "\nThinking...")?;
                match pipeline.query(question, current).await {
                    Ok(result) => {
                        writeln!(out, "\n--- Answer ---")?;
                        writeln!(out, "{}", result.answer)?;
                        writeln!(out, "\n--- Retrieved Context Sources ---")?;
                        for (i, chunk) in result.context.iter().enumerate() {
                            writeln!(out, "[{}] ...{}...", i + 1, preview(chunk))?;
                        }
                    }
                    Err(e) => writeln!(out, "An error occurred: {:#}", e)?,
                }
            }
        }
    }

    Ok(())
}
