use bank_utils::{
    Error,
    store::{DocumentStore, WriteOp},
    writer::{BatchWriter, WriteSummary},
};
use indicatif::ProgressBar;
use mongodb::{
    Client, Namespace,
    bson::{Document, doc},
    options::{DeleteOneModel, ReplaceOneModel, WriteModel},
};
use schema::db::{database, find_all, get_collection};

/// MongoDB-backed store. Each commit is one ordered `bulkWrite` inside a
/// transaction, so a rejected chunk leaves nothing behind. Transactions need
/// a replica set or sharded cluster.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    pub fn new(client: Client) -> Self {
        let database = database(&client).name().to_string();
        Self { client, database }
    }

    pub async fn connect(uri: &str) -> Result<Self, Error> {
        let client = schema::db::client(uri).await?;
        Ok(Self::new(client))
    }

    fn write_model(&self, op: &WriteOp) -> WriteModel {
        let namespace = Namespace::new(self.database.as_str(), op.collection());
        match op {
            WriteOp::Upsert { id, document, .. } => WriteModel::ReplaceOne(
                ReplaceOneModel::builder()
                    .namespace(namespace)
                    .filter(doc! { "_id": id.as_str() })
                    .replacement(document.clone())
                    .upsert(true)
                    .build(),
            ),
            WriteOp::Delete { id, .. } => WriteModel::DeleteOne(
                DeleteOneModel::builder()
                    .namespace(namespace)
                    .filter(doc! { "_id": id.as_str() })
                    .build(),
            ),
        }
    }
}

impl DocumentStore for MongoStore {
    async fn commit(&self, batch: &[WriteOp]) -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }
        let models: Vec<WriteModel> = batch.iter().map(|op| self.write_model(op)).collect();

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let res = match self.client.bulk_write(models).session(&mut session).await {
            Ok(res) => res,
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!(error = %abort, "failed to abort transaction");
                }
                return Err(e.into());
            }
        };
        session.commit_transaction().await?;
        tracing::debug!(
            upserted = res.upserted_count,
            modified = res.modified_count,
            deleted = res.deleted_count,
            "bulk write"
        );
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, Error> {
        let collection = get_collection::<Document>(&self.client, collection);
        Ok(find_all(&collection, doc! {}).await?)
    }
}

/// Writes `ops` through `writer`, ticking a progress bar per committed chunk.
pub async fn write_with_progress<S: DocumentStore>(
    store: &S,
    writer: &BatchWriter,
    ops: &[WriteOp],
) -> Result<WriteSummary, Error> {
    let pb = ProgressBar::new(ops.len() as u64);
    let summary = writer
        .write_all_with_progress(store, ops, |chunk| pb.inc(chunk.size as u64))
        .await?;
    pb.finish_with_message("Documents written");
    Ok(summary)
}
