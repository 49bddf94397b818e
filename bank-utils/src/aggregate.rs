//! Grouping questions into collection documents and keeping those documents
//! balanced.
use std::collections::{BTreeMap, HashSet};

use schema::{Question, QuestionCollection, collections};

use crate::{error::Error, store::WriteOp};

/// Groups records by `key_fn`, preserving input order within each group.
/// Records whose key is `None` are left out.
pub fn group_by<T, K, F>(records: impl IntoIterator<Item = T>, key_fn: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(&record) {
            groups.entry(key).or_default().push(record);
        }
    }
    groups
}

/// Lowercase, alphanumeric runs joined by `-`.
pub fn slug(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// `{examType}_{subject}_{year}_{type}`
    Exam,
    /// `{subject}_topic_{slug}`
    Topic,
}

impl Grouping {
    pub fn key(&self, question: &Question) -> Option<String> {
        match self {
            Grouping::Exam => Some(format!(
                "{}_{}_{}_{}",
                slug(&question.exam_type),
                slug(&question.subject),
                question.year,
                question.question_type.as_str()
            )),
            Grouping::Topic => {
                let topic = question.topic.as_deref().filter(|t| !t.trim().is_empty())?;
                Some(topic_collection_id(&question.subject, topic))
            }
        }
    }

    /// Whether a stored collection was built by this grouping.
    pub fn owns(&self, collection: &QuestionCollection) -> bool {
        match self {
            Grouping::Exam => collection.topic.is_none() && collection.year.is_some(),
            Grouping::Topic => collection.topic.is_some(),
        }
    }
}

pub fn topic_collection_id(subject: &str, topic: &str) -> String {
    format!("{}_topic_{}", slug(subject), slug(topic))
}

/// Builds one collection per group, members ordered by section then
/// question number.
pub fn build_collections(
    questions: &[Question],
    grouping: Grouping,
) -> Result<Vec<QuestionCollection>, Error> {
    group_by(questions.iter(), |q| grouping.key(q))
        .into_iter()
        .map(|(key, members)| build_collection_document(&key, grouping, &members))
        .collect()
}

pub fn build_collection_document(
    key: &str,
    grouping: Grouping,
    records: &[&Question],
) -> Result<QuestionCollection, Error> {
    let first = records
        .first()
        .ok_or_else(|| Error::Input(format!("collection {key} has no questions")))?;

    let mut members: Vec<&Question> = records.to_vec();
    members.sort_by(|a, b| {
        (a.section.as_deref(), a.question_number).cmp(&(b.section.as_deref(), b.question_number))
    });
    let question_ids: Vec<String> = members.iter().map(|q| q.id.clone()).collect();

    let collection = match grouping {
        Grouping::Exam => QuestionCollection {
            id: key.to_string(),
            name: format!(
                "{} {} {} ({})",
                first.exam_type,
                first.subject,
                first.year,
                first.question_type.as_str().replace('_', " ")
            ),
            subject: first.subject.clone(),
            exam_type: Some(first.exam_type.clone()),
            year: Some(first.year),
            question_type: Some(first.question_type),
            topic: None,
            question_count: question_ids.len(),
            question_ids,
            is_active: true,
        },
        Grouping::Topic => {
            let topic = first.topic.clone().unwrap_or_default();
            QuestionCollection {
                id: key.to_string(),
                name: format!("{}: {}", first.subject, topic),
                subject: first.subject.clone(),
                exam_type: None,
                year: None,
                question_type: None,
                topic: Some(topic),
                question_count: question_ids.len(),
                question_ids,
                is_active: true,
            }
        }
    };
    check_count(&collection)?;
    Ok(collection)
}

pub fn check_count(collection: &QuestionCollection) -> Result<(), Error> {
    if collection.question_count != collection.question_ids.len() {
        return Err(Error::CountMismatch {
            id: collection.id.clone(),
            count: collection.question_count,
            len: collection.question_ids.len(),
        });
    }
    Ok(())
}

/// Upsert for a collection document, refused when its count is stale.
pub fn collection_write(collection: &QuestionCollection) -> Result<WriteOp, Error> {
    check_count(collection)?;
    WriteOp::upsert(collections::QUESTION_COLLECTIONS, &collection.id, collection)
}

/// Appends `unclassified` ids to `targets` round-robin, visiting targets from
/// smallest to largest as they stood before the first append. Ids already in
/// any target are skipped, so a repeated run adds nothing.
///
/// Returns how many ids each target received, in `targets` order.
pub fn redistribute(
    unclassified: &[String],
    targets: &mut [QuestionCollection],
) -> Result<Vec<usize>, Error> {
    let mut appended = vec![0; targets.len()];
    let mut present: HashSet<String> = targets
        .iter()
        .flat_map(|t| t.question_ids.iter().cloned())
        .collect();
    let pending: Vec<&String> = unclassified
        .iter()
        .filter(|id| present.insert((*id).clone()))
        .collect();
    if pending.is_empty() {
        return Ok(appended);
    }
    if targets.is_empty() {
        return Err(Error::Input(
            "no target collections to redistribute into".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..targets.len()).collect();
    order.sort_by(|&a, &b| {
        (targets[a].question_count, &targets[a].id).cmp(&(targets[b].question_count, &targets[b].id))
    });

    for (id, &target) in pending.into_iter().zip(order.iter().cycle()) {
        let collection = &mut targets[target];
        collection.question_ids.push(id.clone());
        collection.question_count = collection.question_ids.len();
        check_count(collection)?;
        appended[target] += 1;
    }
    Ok(appended)
}
