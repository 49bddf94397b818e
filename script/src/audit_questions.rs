use bank_utils::{
    aggregate::{check_count, slug},
    normalize::{IssueKind, validate},
    store::{DocumentStore, fetch_all_as},
};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use schema::{Question, QuestionCollection, collections};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionIssues {
    pub id: String,
    pub subject: String,
    pub year: u16,
    pub issues: Vec<IssueKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionIssues {
    pub id: String,
    pub count_mismatch: bool,
    /// Member ids with no stored question.
    pub dangling_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub valid: usize,
    pub issue_counts: BTreeMap<IssueKind, usize>,
    pub questions: Vec<QuestionIssues>,
    pub collections: Vec<CollectionIssues>,
}

/// Validates every stored question (optionally one subject) and every
/// collection's count and membership. Reads only.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn audit_questions<S: DocumentStore>(
    store: &S,
    subject: Option<&str>,
) -> anyhow::Result<AuditReport> {
    let wanted = subject.map(slug);
    let in_scope = |s: &str| wanted.as_deref().is_none_or(|w| slug(s) == w);

    let questions: Vec<Question> = fetch_all_as(store, collections::QUESTIONS).await?;
    let questions: Vec<Question> = questions
        .into_iter()
        .filter(|q| in_scope(&q.subject))
        .collect();
    info!(num = questions.len(), "auditing questions");

    let mut report = AuditReport {
        generated_at: Utc::now(),
        total: questions.len(),
        valid: 0,
        issue_counts: BTreeMap::new(),
        questions: vec![],
        collections: vec![],
    };

    let pb = ProgressBar::new(questions.len() as u64);
    for question in &questions {
        let issues = validate(question);
        if issues.is_empty() {
            report.valid += 1;
        } else {
            for issue in &issues {
                *report.issue_counts.entry(*issue).or_default() += 1;
            }
            report.questions.push(QuestionIssues {
                id: question.id.clone(),
                subject: question.subject.clone(),
                year: question.year,
                issues,
            });
        }
        pb.inc(1);
    }
    pb.finish_with_message("Questions checked");

    let stored_ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
    let stored_collections: Vec<QuestionCollection> =
        fetch_all_as(store, collections::QUESTION_COLLECTIONS).await?;
    for collection in stored_collections.iter().filter(|c| in_scope(&c.subject)) {
        let count_mismatch = check_count(collection).is_err();
        let dangling_ids: Vec<String> = collection
            .question_ids
            .iter()
            .filter(|id| !stored_ids.contains(id.as_str()))
            .cloned()
            .collect();
        if count_mismatch || !dangling_ids.is_empty() {
            warn!(
                id = %collection.id,
                count_mismatch,
                dangling = dangling_ids.len(),
                "collection issues"
            );
            report.collections.push(CollectionIssues {
                id: collection.id.clone(),
                count_mismatch,
                dangling_ids,
            });
        }
    }

    info!(
        total = report.total,
        valid = report.valid,
        with_issues = report.questions.len(),
        collections_with_issues = report.collections.len(),
        "audit complete"
    );
    Ok(report)
}
