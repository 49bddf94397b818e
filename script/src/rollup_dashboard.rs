use bank_utils::{
    rollup::{class_aggregates, student_summaries},
    store::{DocumentStore, WriteOp, fetch_all_as},
    writer::BatchWriter,
};
use bson::Document;
use schema::{QuizAttempt, TeacherAssignment, UserProfile, collections};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::store::write_with_progress;

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupSummary {
    pub students: usize,
    pub classes: usize,
    pub removed: usize,
}

/// Recomputes every student summary and class aggregate and removes stored
/// roll-ups that no longer have a source.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn rollup_dashboard<S: DocumentStore>(
    store: &S,
    writer: &BatchWriter,
) -> anyhow::Result<RollupSummary> {
    let attempts: Vec<QuizAttempt> = fetch_all_as(store, collections::QUIZ_ATTEMPTS).await?;
    let users: Vec<UserProfile> = fetch_all_as(store, collections::USERS).await?;
    let assignments: Vec<TeacherAssignment> =
        fetch_all_as(store, collections::TEACHER_ASSIGNMENTS).await?;
    info!(
        attempts = attempts.len(),
        users = users.len(),
        assignments = assignments.len(),
        "loaded dashboard sources"
    );

    let summaries = student_summaries(&attempts, &users);
    let aggregates = class_aggregates(&summaries, &assignments);

    let mut ops = vec![];
    for summary in &summaries {
        ops.push(WriteOp::upsert(collections::STUDENT_SUMMARIES, &summary.id, summary)?);
    }
    for aggregate in &aggregates {
        ops.push(WriteOp::upsert(collections::CLASS_AGGREGATES, &aggregate.id, aggregate)?);
    }

    let mut removed = 0;
    for (collection, fresh) in [
        (
            collections::STUDENT_SUMMARIES,
            summaries.iter().map(|s| s.id.as_str()).collect::<HashSet<_>>(),
        ),
        (
            collections::CLASS_AGGREGATES,
            aggregates.iter().map(|a| a.id.as_str()).collect::<HashSet<_>>(),
        ),
    ] {
        for document in store.fetch_all(collection).await? {
            let Some(id) = stored_id(&document) else {
                continue;
            };
            if !fresh.contains(id) {
                ops.push(WriteOp::delete(collection, id));
                removed += 1;
            }
        }
    }

    write_with_progress(store, writer, &ops).await?;
    let summary = RollupSummary {
        students: summaries.len(),
        classes: aggregates.len(),
        removed,
    };
    info!(
        students = summary.students,
        classes = summary.classes,
        removed = summary.removed,
        "dashboard roll-ups written"
    );
    Ok(summary)
}

fn stored_id(document: &Document) -> Option<&str> {
    document.get_str("_id").ok()
}
