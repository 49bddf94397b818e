//! The document-store seam. Jobs receive a store explicitly instead of
//! reaching for a process-wide client, so they run unchanged against
//! [`MemoryStore`] in tests.
use bson::{Bson, Document};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Replace the document with `_id == id`, inserting it if absent.
    Upsert {
        collection: String,
        id: String,
        document: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl WriteOp {
    pub fn upsert<T: Serialize>(collection: &str, id: &str, value: &T) -> Result<Self, Error> {
        Ok(WriteOp::Upsert {
            collection: collection.to_string(),
            id: id.to_string(),
            document: document_with_id(id, value)?,
        })
    }

    pub fn delete(collection: &str, id: &str) -> Self {
        WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Upsert { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Upsert { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

fn document_with_id<T: Serialize>(id: &str, value: &T) -> Result<Document, Error> {
    let mut document = bson::to_document(value)?;
    document.insert("_id", id);
    Ok(document)
}

#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Applies every operation of the batch, or none of them. A rejected
    /// batch must leave the store as it was before the call.
    async fn commit(&self, batch: &[WriteOp]) -> Result<(), Error>;

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, Error>;
}

/// Fetches a collection and deserializes it, skipping documents that do not
/// fit `T`.
pub async fn fetch_all_as<T, S>(store: &S, collection: &str) -> Result<Vec<T>, Error>
where
    T: DeserializeOwned,
    S: DocumentStore,
{
    let documents = store.fetch_all(collection).await?;
    let items = documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("_id").map(Bson::to_string);
            match bson::from_document(document) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(collection, ?id, error = %e, "unable to deserialize document");
                    None
                }
            }
        })
        .collect();
    Ok(items)
}

/// In-process store keeping documents per collection, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Document>>>,
    commits: Mutex<Vec<usize>>,
    fail_on_commit: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `n`th commit (zero-based) is rejected.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on_commit: Some(n),
            ..Self::default()
        }
    }

    /// Sizes of the commits attempted so far, including a rejected one.
    pub fn commit_sizes(&self) -> Vec<usize> {
        lock(&self.commits).clone()
    }

    pub fn count(&self, collection: &str) -> usize {
        lock(&self.collections)
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        lock(&self.collections)
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Every collection with its documents, for whole-state comparisons.
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, Document>> {
        lock(&self.collections).clone()
    }

    pub fn insert<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> Result<(), Error> {
        let document = document_with_id(id, value)?;
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DocumentStore for MemoryStore {
    async fn commit(&self, batch: &[WriteOp]) -> Result<(), Error> {
        let attempt = {
            let mut commits = lock(&self.commits);
            commits.push(batch.len());
            commits.len() - 1
        };
        if self.fail_on_commit == Some(attempt) {
            return Err(Error::Store(format!("commit {attempt} rejected")));
        }

        let mut collections = lock(&self.collections);
        for op in batch {
            match op {
                WriteOp::Upsert {
                    collection,
                    id,
                    document,
                } => {
                    collections
                        .entry(collection.clone())
                        .or_default()
                        .insert(id.clone(), document.clone());
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(collection) {
                        docs.remove(id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, Error> {
        Ok(lock(&self.collections)
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
