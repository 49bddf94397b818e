use bank_utils::{
    aggregate::{Grouping, build_collections, collection_write, slug},
    store::{DocumentStore, WriteOp, fetch_all_as},
    writer::BatchWriter,
};
use clap::ValueEnum;
use schema::{Question, QuestionCollection, collections};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::store::write_with_progress;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GroupingArg {
    /// `{examType}_{subject}_{year}_{type}`
    Exam,
    /// `{subject}_topic_{slug}`
    Topic,
}

impl From<GroupingArg> for Grouping {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Exam => Grouping::Exam,
            GroupingArg::Topic => Grouping::Topic,
        }
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct RebuildArgs {
    #[arg(long, value_enum)]
    pub grouping: GroupingArg,
    /// Only rebuild collections of this subject
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub questions: usize,
    pub built: Vec<String>,
    /// Stored collections of the same grouping with no members left.
    pub removed: Vec<String>,
}

/// Rebuilds every collection of one grouping from the active questions,
/// replacing stored ones and deleting those that no longer have members.
#[tracing::instrument(skip_all, fields(grouping = ?grouping), err(Debug))]
pub async fn rebuild_collections<S: DocumentStore>(
    store: &S,
    writer: &BatchWriter,
    grouping: Grouping,
    subject: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<RebuildSummary> {
    let wanted = subject.map(slug);
    let in_scope = |s: &str| wanted.as_deref().is_none_or(|w| slug(s) == w);

    let questions: Vec<Question> = fetch_all_as(store, collections::QUESTIONS).await?;
    let questions: Vec<Question> = questions
        .into_iter()
        .filter(|q| q.is_active && in_scope(&q.subject))
        .collect();
    let built = build_collections(&questions, grouping)?;

    let built_ids: HashSet<&str> = built.iter().map(|c| c.id.as_str()).collect();
    let stored: Vec<QuestionCollection> =
        fetch_all_as(store, collections::QUESTION_COLLECTIONS).await?;
    let removed: Vec<String> = stored
        .iter()
        .filter(|c| grouping.owns(c) && in_scope(&c.subject))
        .filter(|c| !built_ids.contains(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect();

    let summary = RebuildSummary {
        questions: questions.len(),
        built: built.iter().map(|c| c.id.clone()).collect(),
        removed,
    };
    info!(
        num = summary.built.len(),
        removed = summary.removed.len(),
        questions = summary.questions,
        "collections rebuilt"
    );
    if dry_run {
        return Ok(summary);
    }

    let mut ops = built
        .iter()
        .map(collection_write)
        .collect::<Result<Vec<_>, _>>()?;
    ops.extend(
        summary
            .removed
            .iter()
            .map(|id| WriteOp::delete(collections::QUESTION_COLLECTIONS, id)),
    );
    write_with_progress(store, writer, &ops).await?;
    Ok(summary)
}
