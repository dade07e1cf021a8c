//! Scripted evaluation with manual scoring.
//!
//! Runs a fixed battery of policy questions through the pipeline, shows the
//! expected key information next to each answer, and reads a 1–3 score per
//! answer from the operator. Anything other than 1, 2, or 3 scores zero.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::time::Instant;

use crate::pipeline::RagPipeline;
use crate::prompt::PromptTemplate;

pub const MAX_SCORE: u32 = 3;

/// One question in the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalCase {
    pub question: &'static str,
    pub kind: &'static str,
    pub expected: &'static str,
}

pub const EVAL_CASES: [EvalCase; 8] = [
    EvalCase {
        question: "What is the time limit for refunds?",
        kind: "Answerable",
        expected: "30 days",
    },
    EvalCase {
        question: "Can I cancel my order if it has already shipped?",
        kind: "Answerable",
        expected: "No, must wait to receive item and follow Refund Policy",
    },
    EvalCase {
        question: "Do you ship to France?",
        kind: "Answerable (Negative)",
        expected: "No, only Canada, UK, and Australia",
    },
    EvalCase {
        question: "What is the restocking fee for late cancellations?",
        kind: "Answerable",
        expected: "10%",
    },
    EvalCase {
        question: "How do I contact support for a missing refund?",
        kind: "Answerable",
        expected: "support@example.com",
    },
    EvalCase {
        question: "Can I return a gift card?",
        kind: "Answerable",
        expected: "No, non-refundable",
    },
    EvalCase {
        question: "What is the company's policy on remote work?",
        kind: "Unanswerable",
        expected: "I cannot find the answer / Not in policy",
    },
    EvalCase {
        question: "Can I get a refund if I bought the item 35 days ago?",
        kind: "Answerable (Inference)",
        expected: "No, limit is 30 days",
    },
];

/// The answer and operator score for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutcome {
    pub question: String,
    pub answer: String,
    /// `None` when the operator's input was not 1, 2, or 3.
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalSummary {
    pub outcomes: Vec<EvalOutcome>,
}

impl EvalSummary {
    pub fn total(&self) -> u32 {
        self.outcomes.iter().filter_map(|o| o.score).sum()
    }

    pub fn max(&self) -> u32 {
        self.outcomes.len() as u32 * MAX_SCORE
    }
}

/// Parse an operator score; only `1`, `2`, and `3` are accepted.
pub fn parse_score(input: &str) -> Option<u32> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|s| (1..=MAX_SCORE).contains(s))
}

/// Run `cases`, reading one score line per answer from `input`.
pub async fn run_eval<R, W>(
    pipeline: &RagPipeline,
    template: &PromptTemplate,
    cases: &[EvalCase],
    mut input: R,
    out: &mut W,
) -> Result<EvalSummary>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "\n--- Starting Evaluation ---")?;
    writeln!(out, "Model: {}", pipeline.resolved_model().await)?;
    writeln!(out, "Prompt: {}", template.name())?;

    let mut summary = EvalSummary::default();
    let mut line = String::new();

    for (i, case) in cases.iter().enumerate() {
        writeln!(out, "\nQuestion {}: {}", i + 1, case.question)?;
        writeln!(out, "Type: {}", case.kind)?;
        writeln!(out, "Expected Info: {}", case.expected)?;

        let started = Instant::now();
        let result = pipeline.query(case.question, template).await?;
        let elapsed = started.elapsed();

        writeln!(out, "Answer:\n{}", result.answer)?;
        writeln!(out, "Time: {:.2}s", elapsed.as_secs_f64())?;
        write!(out, "Score (1=Bad, 2=OK, 3=Good): ")?;
        out.flush()?;

        line.clear();
        input.read_line(&mut line)?;
        let score = parse_score(&line);
        if score.is_none() {
            writeln!(out, "(not scored)")?;
        }

        summary.outcomes.push(EvalOutcome {
            question: case.question.to_string(),
            answer: result.answer,
            score,
        });
    }

    writeln!(out, "\n--- Evaluation Summary ---")?;
    for outcome in &summary.outcomes {
        writeln!(out, "Q: {}", outcome.question)?;
        match outcome.score {
            Some(score) => writeln!(out, "Score: {}", score)?,
            None => writeln!(out, "Score: -")?,
        }
    }
    writeln!(out, "\nTotal Score: {}/{}", summary.total(), summary.max())?;

    Ok(summary)
}
