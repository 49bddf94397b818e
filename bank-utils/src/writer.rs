use bson::Bson;

use crate::{
    error::Error,
    store::{DocumentStore, WriteOp},
};

/// Largest batch the document store accepts in one commit.
pub const MAX_BATCH_LIMIT: usize = 500;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub chunks: usize,
    pub written: usize,
}

/// Progress of a single committed chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCommitted {
    pub index: usize,
    pub size: usize,
    pub total_chunks: usize,
}

/// Writes operations in chunks of at most `limit`, one commit per chunk.
///
/// Chunks are committed strictly in order. The first rejected chunk stops
/// the run and is itself not applied; chunks before it stay committed and a
/// re-run upserts them again under the same ids.
#[derive(Clone, Copy, Debug)]
pub struct BatchWriter {
    limit: usize,
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self {
            limit: MAX_BATCH_LIMIT,
        }
    }
}

impl BatchWriter {
    pub fn new(limit: usize) -> Result<Self, Error> {
        if limit == 0 || limit > MAX_BATCH_LIMIT {
            return Err(Error::InvalidBatchLimit {
                limit,
                max: MAX_BATCH_LIMIT,
            });
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn write_all<S: DocumentStore>(
        &self,
        store: &S,
        ops: &[WriteOp],
    ) -> Result<WriteSummary, Error> {
        self.write_all_with_progress(store, ops, |_| {}).await
    }

    #[tracing::instrument(skip_all, fields(ops = ops.len(), limit = self.limit), err(Debug))]
    pub async fn write_all_with_progress<S, F>(
        &self,
        store: &S,
        ops: &[WriteOp],
        mut on_chunk: F,
    ) -> Result<WriteSummary, Error>
    where
        S: DocumentStore,
        F: FnMut(ChunkCommitted),
    {
        let total_chunks = ops.len().div_ceil(self.limit);
        let mut summary = WriteSummary::default();

        for (index, chunk) in ops.chunks(self.limit).enumerate() {
            verify_collection_counts(chunk)?;

            let first_id = chunk.first().map(WriteOp::id).unwrap_or_default();
            let last_id = chunk.last().map(WriteOp::id).unwrap_or_default();

            if let Err(e) = store.commit(chunk).await {
                tracing::error!(
                    chunk = index,
                    first_id,
                    last_id,
                    committed = summary.written,
                    error = %e,
                    "batch commit failed, aborting remaining chunks"
                );
                return Err(Error::BatchCommit {
                    chunk: index,
                    first_id: first_id.to_string(),
                    last_id: last_id.to_string(),
                    source: Box::new(e),
                });
            }

            summary.chunks += 1;
            summary.written += chunk.len();
            tracing::debug!(chunk = index, size = chunk.len(), first_id, last_id, "committed chunk");
            on_chunk(ChunkCommitted {
                index,
                size: chunk.len(),
                total_chunks,
            });
        }

        tracing::info!(chunks = summary.chunks, written = summary.written, "write complete");
        Ok(summary)
    }
}

/// Any document carrying both `questionIds` and `questionCount` must have
/// them agree before it is written. A count that is not a whole,
/// non-negative number never agrees.
fn verify_collection_counts(chunk: &[WriteOp]) -> Result<(), Error> {
    for op in chunk {
        let WriteOp::Upsert { id, document, .. } = op else {
            continue;
        };
        let Ok(ids) = document.get_array("questionIds") else {
            continue;
        };
        let Some(value) = document.get("questionCount") else {
            continue;
        };
        let len = ids.len();
        let Some(count) = whole_count(value) else {
            return Err(Error::Input(format!(
                "{id}: questionCount {value} is not a count of {len} ids"
            )));
        };
        if count != len {
            return Err(Error::CountMismatch {
                id: id.clone(),
                count,
                len,
            });
        }
    }
    Ok(())
}

fn whole_count(value: &Bson) -> Option<usize> {
    match value {
        Bson::Int32(n) => usize::try_from(*n).ok(),
        Bson::Int64(n) => usize::try_from(*n).ok(),
        Bson::Double(n) if n.is_finite() && n.fract() == 0.0 && *n >= 0.0 => Some(*n as usize),
        _ => None,
    }
}
