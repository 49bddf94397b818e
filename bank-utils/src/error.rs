#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("batch {chunk} ({first_id}..={last_id}) failed to commit: {source}")]
    BatchCommit {
        chunk: usize,
        first_id: String,
        last_id: String,
        #[source]
        source: Box<Error>,
    },
    #[error("collection {id} has questionCount {count} but {len} question ids")]
    CountMismatch { id: String, count: usize, len: usize },
    #[error("batch limit must be between 1 and {max}, got {limit}")]
    InvalidBatchLimit { limit: usize, max: usize },
    #[error("{0}")]
    Input(String),
    #[error("{0}")]
    Store(String),
    // Froms
    #[error("{0}")]
    MongoDB(#[from] mongodb::error::Error),
    #[error("{0}")]
    BsonSerialization(#[from] bson::ser::Error),
    #[error("{0}")]
    BsonDeserialization(#[from] bson::de::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
