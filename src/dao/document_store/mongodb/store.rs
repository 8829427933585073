use std::sync::Arc;

use async_stream::stream;
use futures::{TryStreamExt, future::BoxFuture, stream::BoxStream};
use mongodb::{
    Client, Collection, Database,
    bson::{Bson, Document, doc},
    options::IndexOptions,
};
use serde_json::Value;
use tokio::{sync::RwLock, time::sleep};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    document_store::{DocumentStore, Fields},
    storage::{StorageError, StorageResult},
};

/// Indexes created at connection time so the equality queries used by the
/// engine (teams per venue, rounds per venue, answers per round) stay cheap.
const INDEXES: &[(&str, &str)] = &[
    ("teams", "venue_id"),
    ("rounds", "venue_id"),
    ("rounds", "state"),
    ("answers", "round_id"),
];

struct MongoState {
    client: Client,
    database: Database,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let client = {
            let guard = self.state.read().await;
            guard.client.clone()
        };

        client
            .database(&self.config.database_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// [`DocumentStore`] backed by MongoDB collections of string-keyed documents.
///
/// Watch streams poll at a fixed interval instead of relying on change
/// streams, which would require a replica set.
#[derive(Clone)]
pub struct MongoDocumentStore {
    inner: Arc<MongoInner>,
}

impl MongoDocumentStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        for (collection_name, field) in INDEXES {
            let collection = database.collection::<Document>(collection_name);
            let index = mongodb::IndexModel::builder()
                .keys(doc! { *field: 1 })
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection_name}_{field}_idx")))
                        .build(),
                )
                .build();

            collection
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: collection_name,
                    index: field,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self, name: &str) -> Collection<Document> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<Document>(name)
    }

    async fn read_doc(&self, collection: &'static str, id: &str) -> MongoResult<Option<Fields>> {
        let handle = self.collection(collection).await;
        let document = handle
            .find_one(doc! { "_id": id })
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })?;
        Ok(document.map(document_to_fields))
    }

    async fn read_query(
        &self,
        collection: &'static str,
        field: &'static str,
        value: &Value,
    ) -> MongoResult<Vec<Fields>> {
        let handle = self.collection(collection).await;
        let documents: Vec<Document> = handle
            .find(doc! { field: json_to_bson(value) })
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })?;
        Ok(documents.into_iter().map(document_to_fields).collect())
    }
}

impl DocumentStore for MongoDocumentStore {
    fn get(
        &self,
        collection: &'static str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Fields>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.read_doc(collection, &id).await.map_err(Into::into) })
    }

    fn set(
        &self,
        collection: &'static str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let document = fields_to_document(&id, fields);
            let handle = store.collection(collection).await;
            handle
                .replace_one(doc! { "_id": &id }, &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write { collection, source })?;
            Ok(())
        })
    }

    fn update(
        &self,
        collection: &'static str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let handle = store.collection(collection).await;
            let result = handle
                .update_one(doc! { "_id": &id }, doc! { "$set": merge_document(fields) })
                .await
                .map_err(|source| MongoDaoError::Write { collection, source })?;
            if result.matched_count == 0 {
                return Err(StorageError::not_found(collection, id));
            }
            Ok(())
        })
    }

    fn update_where_eq(
        &self,
        collection: &'static str,
        id: &str,
        guard_field: &'static str,
        guard: Value,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let handle = store.collection(collection).await;
            // A null guard matches both an explicit null and an absent field,
            // which is exactly the "no current round" shape.
            let filter = doc! { "_id": &id, guard_field: json_to_bson(&guard) };
            let result = handle
                .update_one(filter, doc! { "$set": merge_document(fields) })
                .await
                .map_err(|source| MongoDaoError::Write { collection, source })?;
            Ok(result.matched_count > 0)
        })
    }

    fn add(
        &self,
        collection: &'static str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move {
            let id = Uuid::new_v4().simple().to_string();
            let document = fields_to_document(&id, fields);
            let handle = store.collection(collection).await;
            handle
                .insert_one(&document)
                .await
                .map_err(|source| MongoDaoError::Write { collection, source })?;
            Ok(id)
        })
    }

    fn query_eq(
        &self,
        collection: &'static str,
        field: &'static str,
        value: Value,
    ) -> BoxFuture<'static, StorageResult<Vec<Fields>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read_query(collection, field, &value)
                .await
                .map_err(Into::into)
        })
    }

    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Fields>>> {
        let store = self.clone();
        Box::pin(async move {
            let handle = store.collection(collection).await;
            let documents: Vec<Document> = handle
                .find(doc! {})
                .await
                .map_err(|source| MongoDaoError::Read { collection, source })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Read { collection, source })?;
            Ok(documents.into_iter().map(document_to_fields).collect())
        })
    }

    fn watch_doc(&self, collection: &'static str, id: &str) -> BoxStream<'static, Option<Fields>> {
        let store = self.clone();
        let id = id.to_owned();
        let interval = store.inner.config.poll_interval;
        Box::pin(stream! {
            let mut last: Option<Option<Fields>> = None;
            loop {
                if let Ok(current) = store.read_doc(collection, &id).await {
                    if last.as_ref() != Some(&current) {
                        last = Some(current.clone());
                        yield current;
                    }
                }
                sleep(interval).await;
            }
        })
    }

    fn watch_query_eq(
        &self,
        collection: &'static str,
        field: &'static str,
        value: Value,
    ) -> BoxStream<'static, Vec<Fields>> {
        let store = self.clone();
        let interval = store.inner.config.poll_interval;
        Box::pin(stream! {
            let mut last: Option<Vec<Fields>> = None;
            loop {
                if let Ok(rows) = store.read_query(collection, field, &value).await {
                    if last.as_ref() != Some(&rows) {
                        last = Some(rows.clone());
                        yield rows;
                    }
                }
                sleep(interval).await;
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

/// Build the persisted document: `_id` is the primary key, while the adapter
/// contract keeps the identity visible as a regular `id` field too.
fn fields_to_document(id: &str, fields: Fields) -> Document {
    let mut document = Document::new();
    document.insert("_id", id);
    for (key, value) in &fields {
        document.insert(key, json_to_bson(value));
    }
    document.insert("id", id);
    document
}

fn merge_document(fields: Fields) -> Document {
    let mut document = Document::new();
    for (key, value) in &fields {
        document.insert(key, json_to_bson(value));
    }
    document
}

fn document_to_fields(mut document: Document) -> Fields {
    document.remove("_id");
    let mut fields = Fields::new();
    for (key, value) in document {
        fields.insert(key, bson_to_json(value));
    }
    fields
}

fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        Value::Object(map) => {
            let mut document = Document::new();
            for (key, value) in map {
                document.insert(key, json_to_bson(value));
            }
            Bson::Document(document)
        }
    }
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i64::from(i)),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(d) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => {
            let mut map = Fields::new();
            for (key, value) in document {
                map.insert(key, bson_to_json(value));
            }
            Value::Object(map)
        }
        Bson::DateTime(dt) => Value::from(dt.timestamp_millis()),
        other => Value::String(other.to_string()),
    }
}
