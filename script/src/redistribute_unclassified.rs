use bank_utils::{
    aggregate::{Grouping, collection_write, redistribute, slug, topic_collection_id},
    store::{DocumentStore, WriteOp, fetch_all_as},
    writer::BatchWriter,
};
use schema::{Question, QuestionCollection, collections};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

use crate::store::write_with_progress;

#[derive(clap::Args, Clone, Debug)]
pub struct RedistributeArgs {
    #[arg(long)]
    pub subject: String,
    /// Topic whose collection is merged away
    #[arg(long, default_value = "Unclassified")]
    pub unclassified_topic: String,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedistributeSummary {
    /// Collection id to the number of ids it received.
    pub appended: BTreeMap<String, usize>,
    pub retagged_questions: usize,
    pub removed: Option<String>,
}

/// Moves the members of the subject's unclassified topic collection into its
/// other topic collections, smallest first, retags the moved questions and
/// deletes the unclassified collection last. A run that failed part-way is
/// finished by running it again.
#[tracing::instrument(skip_all, fields(subject = %args.subject), err(Debug))]
pub async fn redistribute_unclassified<S: DocumentStore>(
    store: &S,
    writer: &BatchWriter,
    args: &RedistributeArgs,
) -> anyhow::Result<RedistributeSummary> {
    let source_id = topic_collection_id(&args.subject, &args.unclassified_topic);
    let subject = slug(&args.subject);

    let stored: Vec<QuestionCollection> =
        fetch_all_as(store, collections::QUESTION_COLLECTIONS).await?;
    let (sources, mut targets): (Vec<_>, Vec<_>) = stored
        .into_iter()
        .filter(|c| Grouping::Topic.owns(c) && slug(&c.subject) == subject)
        .partition(|c| c.id == source_id);

    let Some(source) = sources.into_iter().next() else {
        warn!(id = %source_id, "no unclassified collection, nothing to redistribute");
        return Ok(RedistributeSummary::default());
    };
    info!(
        num = source.question_ids.len(),
        targets = targets.len(),
        "redistributing"
    );

    let appended = redistribute(&source.question_ids, &mut targets)?;

    let mut summary = RedistributeSummary {
        removed: Some(source.id.clone()),
        ..Default::default()
    };
    let mut collection_ops = vec![];
    for (target, &count) in targets.iter().zip(&appended) {
        if count == 0 {
            continue;
        }
        summary.appended.insert(target.id.clone(), count);
        collection_ops.push(collection_write(target)?);
    }

    // Every source id's topic is wherever it sits now, so a run resumed after
    // the collections were written still retags the moved questions
    let mut new_topics: HashMap<&str, &str> = HashMap::new();
    for target in &targets {
        let topic = target.topic.as_deref().unwrap_or_default();
        for id in &target.question_ids {
            new_topics.entry(id.as_str()).or_insert(topic);
        }
    }
    let moved: HashSet<&str> = source.question_ids.iter().map(String::as_str).collect();

    let mut ops = vec![];
    let questions: Vec<Question> = fetch_all_as(store, collections::QUESTIONS).await?;
    for mut question in questions {
        if !moved.contains(question.id.as_str()) {
            continue;
        }
        let Some(&topic) = new_topics.get(question.id.as_str()) else {
            continue;
        };
        if question.topic.as_deref() == Some(topic) {
            continue;
        }
        question.topic = Some(topic.to_string());
        ops.push(WriteOp::upsert(collections::QUESTIONS, &question.id, &question)?);
        summary.retagged_questions += 1;
    }
    // Questions, then collections; the source goes last
    ops.extend(collection_ops);
    ops.push(WriteOp::delete(collections::QUESTION_COLLECTIONS, &source.id));

    info!(
        collections = summary.appended.len(),
        retagged = summary.retagged_questions,
        "redistribution planned"
    );
    if args.dry_run {
        return Ok(summary);
    }
    write_with_progress(store, writer, &ops).await?;
    Ok(summary)
}
