use anyhow::Context;
use bank_utils::{
    normalize::AnswerFallback,
    parser::ParseContext,
    pipeline::{ImportContext, ImportSummary, plan_import},
    store::{DocumentStore, fetch_all_as},
    writer::BatchWriter,
};
use clap::ValueEnum;
use schema::{QuestionCollection, collections};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::{source, store::write_with_progress};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FallbackArg {
    /// Default a missing answer to option A
    FirstOption,
    /// Store the question inactive for review
    #[default]
    ManualReview,
}

impl From<FallbackArg> for AnswerFallback {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::FirstOption => AnswerFallback::FirstOption,
            FallbackArg::ManualReview => AnswerFallback::ManualReview,
        }
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct ImportArgs {
    /// Question bank (.json) or exam paper (.txt, .docx)
    #[arg(long)]
    pub file: PathBuf,
    /// Answer key (.json); overrides answers found in the input
    #[arg(long)]
    pub answers: Option<PathBuf>,
    #[arg(long)]
    pub subject: String,
    #[arg(long, default_value = "BECE")]
    pub exam_type: String,
    #[arg(long)]
    pub year: u16,
    #[arg(long, value_enum, default_value_t)]
    pub answer_fallback: FallbackArg,
    /// Plan and report without writing
    #[arg(long)]
    pub dry_run: bool,
}

/// Parses the input, repairs every record, builds collections and upserts
/// the lot under deterministic ids.
#[tracing::instrument(skip_all, fields(file = %args.file.display()), err(Debug))]
pub async fn import_questions<S: DocumentStore>(
    store: &S,
    writer: &BatchWriter,
    args: &ImportArgs,
) -> anyhow::Result<ImportSummary> {
    let parse_ctx = ParseContext {
        subject: args.subject.clone(),
        year: args.year,
    };
    let (document, mut answers) = source::load_document(&args.file, &parse_ctx)?;
    if let Some(path) = &args.answers {
        let key = source::load_answer_key(path)?;
        info!(num = key.len(), "loaded answer key");
        answers.0.extend(key.0);
    }

    let ctx = ImportContext {
        subject: args.subject.clone(),
        exam_type: args.exam_type.clone(),
        year: args.year,
        answer_fallback: args.answer_fallback.into(),
    };
    let mut plan = plan_import(&document, &answers, &ctx)?;

    let stored: Vec<QuestionCollection> =
        fetch_all_as(store, collections::QUESTION_COLLECTIONS)
            .await
            .context("unable to read stored collections")?;
    plan.merge_stored_collections(&stored);

    let summary = plan.summary();
    for id in &summary.manual_review {
        warn!(id = %id, "stored inactive for manual review");
    }
    if args.dry_run {
        info!(
            questions = summary.questions,
            collections = summary.collections,
            "dry run, nothing written"
        );
        return Ok(summary);
    }

    let ops = plan.writes()?;
    let written = write_with_progress(store, writer, &ops).await?;
    info!(
        num = written.written,
        chunks = written.chunks,
        active = summary.active,
        "import complete"
    );
    Ok(summary)
}
