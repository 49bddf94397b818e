use futures_util::TryStreamExt;
use mongodb::{
    Client, Collection, Database,
    bson::{Document, doc},
    options::ClientOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;

/// Used when the connection URI does not name a database.
pub const DEFAULT_DATABASE: &str = "exam_prep";

pub fn database(client: &Client) -> Database {
    client
        .default_database()
        .unwrap_or_else(|| client.database(DEFAULT_DATABASE))
}

pub fn get_collection<T>(client: &Client, collection_name: &str) -> Collection<T>
where
    T: Send + Sync,
{
    database(client).collection::<T>(collection_name)
}

pub async fn client(uri: &str) -> mongodb::error::Result<Client> {
    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.app_name = Some(env!("CARGO_CRATE_NAME").to_string());

    let client = Client::with_options(client_options)?;

    // Fail fast on bad credentials or an unreachable cluster
    database(&client).run_command(doc! {"ping": 1}).await?;

    Ok(client)
}

#[instrument(skip_all, fields(collection = collection.name(), query = %filter))]
pub async fn find_all<T>(collection: &Collection<T>, filter: Document) -> mongodb::error::Result<Vec<T>>
where
    T: DeserializeOwned + Serialize + Send + Sync,
{
    let items: Vec<T> = collection.find(filter).await?.try_collect().await?;
    tracing::debug!(num = items.len(), "fetched documents");
    Ok(items)
}
