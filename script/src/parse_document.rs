use anyhow::Context;
use bank_utils::parser::{self, ParseContext, ParsedDocument};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::source;

#[derive(clap::Args, Clone, Debug)]
pub struct ParseArgs {
    /// Exam paper (.txt or .docx)
    #[arg(long)]
    pub file: PathBuf,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub year: u16,
    /// Number of questions the paper should hold
    #[arg(long, default_value_t = 40)]
    pub expected: u32,
    /// Where to write the parsed questions as JSON
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub document: ParsedDocument,
    pub missing: Vec<u32>,
}

#[tracing::instrument(skip_all, fields(file = %args.file.display()), err(Debug))]
pub fn parse_file(args: &ParseArgs) -> anyhow::Result<ParseOutcome> {
    let text = source::read_text(&args.file)?;
    let ctx = ParseContext {
        subject: args.subject.clone(),
        year: args.year,
    };
    let document = parser::parse_document(&text, &ctx);
    let missing = parser::missing_numbers(&document.questions, args.expected);

    if missing.is_empty() {
        info!(num = document.questions.len(), "all questions parsed");
    } else {
        warn!(
            num = document.questions.len(),
            expected = args.expected,
            ?missing,
            "questions missing from parse"
        );
    }

    let outcome = ParseOutcome { document, missing };
    if let Some(out) = &args.out {
        let file = std::fs::File::create(out)
            .with_context(|| format!("unable to create {}", out.display()))?;
        serde_json::to_writer_pretty(file, &outcome)?;
        info!(path = %out.display(), "parsed questions written");
    }
    Ok(outcome)
}
