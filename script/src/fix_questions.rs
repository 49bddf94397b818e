use bank_utils::{
    aggregate::{collection_write, slug},
    normalize::{AnswerFallback, IssueKind, Triage, repair},
    store::{DocumentStore, WriteOp, fetch_all_as},
    writer::BatchWriter,
};
use indicatif::ProgressBar;
use schema::{Question, QuestionCollection, collections};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::{import_questions::FallbackArg, store::write_with_progress};

#[derive(clap::Args, Clone, Debug)]
pub struct FixArgs {
    /// Only fix questions of this subject
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long, value_enum, default_value_t)]
    pub answer_fallback: FallbackArg,
    /// Write the fixes; without it the job only reports
    #[arg(long)]
    pub apply: bool,
    /// Directory for the JSON report
    #[arg(long, default_value = "reports")]
    pub report_dir: std::path::PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReviewEntry {
    pub id: String,
    pub issues: Vec<IssueKind>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixReport {
    pub examined: usize,
    pub valid: usize,
    pub auto_fixed: Vec<String>,
    pub deleted: Vec<String>,
    pub manual_review: Vec<ManualReviewEntry>,
    /// Collections that referenced a deleted placeholder.
    pub pruned_collections: Vec<String>,
    pub applied: bool,
}

/// Repairs stored questions in place. Placeholders are deleted and dropped
/// from every collection that lists them; anything ambiguous is only
/// reported.
#[tracing::instrument(skip_all, fields(apply), err(Debug))]
pub async fn fix_questions<S: DocumentStore>(
    store: &S,
    writer: &BatchWriter,
    subject: Option<&str>,
    fallback: AnswerFallback,
    apply: bool,
) -> anyhow::Result<FixReport> {
    let wanted = subject.map(slug);
    let questions: Vec<Question> = fetch_all_as(store, collections::QUESTIONS).await?;
    let questions: Vec<Question> = questions
        .into_iter()
        .filter(|q| wanted.as_deref().is_none_or(|w| slug(&q.subject) == w))
        .collect();

    let mut report = FixReport {
        examined: questions.len(),
        applied: apply,
        ..Default::default()
    };
    let mut ops = vec![];
    let mut deletes = vec![];

    let pb = ProgressBar::new(questions.len() as u64);
    for question in &questions {
        let repaired = repair(question, fallback);
        match repaired.triage {
            Triage::Valid => report.valid += 1,
            Triage::AutoFixed => {
                info!(id = %question.id, changes = ?repaired.changes, "auto-fixed");
                ops.push(WriteOp::upsert(
                    collections::QUESTIONS,
                    &question.id,
                    &repaired.question,
                )?);
                report.auto_fixed.push(question.id.clone());
            }
            Triage::Delete => {
                info!(id = %question.id, "placeholder");
                deletes.push(WriteOp::delete(collections::QUESTIONS, &question.id));
                report.deleted.push(question.id.clone());
            }
            Triage::ManualReview => {
                warn!(id = %question.id, issues = ?repaired.issues, "needs manual review");
                report.manual_review.push(ManualReviewEntry {
                    id: question.id.clone(),
                    issues: repaired.issues,
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Questions repaired");

    if !report.deleted.is_empty() {
        let deleted: HashSet<&str> = report.deleted.iter().map(String::as_str).collect();
        let stored: Vec<QuestionCollection> =
            fetch_all_as(store, collections::QUESTION_COLLECTIONS).await?;
        for mut collection in stored {
            let before = collection.question_ids.len();
            collection
                .question_ids
                .retain(|id| !deleted.contains(id.as_str()));
            if collection.question_ids.len() == before {
                continue;
            }
            collection.question_count = collection.question_ids.len();
            ops.push(collection_write(&collection)?);
            report.pruned_collections.push(collection.id);
        }
    }

    // Placeholders are deleted after the prunes, so a run that failed
    // part-way still finds them and prunes again
    ops.extend(deletes);

    info!(
        examined = report.examined,
        valid = report.valid,
        auto_fixed = report.auto_fixed.len(),
        deleted = report.deleted.len(),
        manual_review = report.manual_review.len(),
        "fix planned"
    );

    if !apply {
        info!(num = ops.len(), "pass --apply to write");
        return Ok(report);
    }
    write_with_progress(store, writer, &ops).await?;
    Ok(report)
}
