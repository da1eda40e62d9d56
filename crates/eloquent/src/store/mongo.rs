//! MongoDB store backend.
//!
//! `MongoProvider` owns one pooled driver `Client`. Connections handed out
//! share that pool, so acquiring and releasing them is cheap; `shutdown`
//! closes the pool.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use futures::{StreamExt, TryStreamExt};
use mongodb::{options::ClientOptions, Client, Collection};

use common::StoreConfig;

use crate::error::{StoreError, StoreResult};
use crate::options::FindOptions;
use crate::store::{CollectionHandle, Connection, ConnectionProvider, DocumentCursor};

/// Connection provider backed by the MongoDB driver.
#[derive(Clone)]
pub struct MongoProvider {
    client: Client,
    database: String,
}

impl std::fmt::Debug for MongoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoProvider")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl MongoProvider {
    /// Validate `config` and build the driver client.
    ///
    /// The driver connects lazily; no network traffic happens here.
    pub async fn connect_with(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let options = ClientOptions::parse(config.connection_uri()).await?;
        let client = Client::with_options(options)?;
        tracing::info!(
            database = %config.database,
            host = %config.host,
            port = config.port,
            "MongoDB client initialised"
        );

        Ok(Self {
            client,
            database: config.database.clone(),
        })
    }

    /// Close the connection pool.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        tracing::info!("MongoDB client shut down");
    }
}

#[async_trait]
impl ConnectionProvider for MongoProvider {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn connect(&self) -> StoreResult<Arc<dyn Connection>> {
        Ok(Arc::new(MongoConnection {
            client: self.client.clone(),
        }))
    }

    async fn disconnect(&self, connection: Arc<dyn Connection>) -> StoreResult<()> {
        // Handles share the pool owned by the provider.
        drop(connection);
        Ok(())
    }
}

struct MongoConnection {
    client: Client,
}

impl Connection for MongoConnection {
    fn collection(&self, database: &str, collection: &str) -> Arc<dyn CollectionHandle> {
        Arc::new(MongoCollection {
            inner: self.client.database(database).collection::<Document>(collection),
        })
    }
}

struct MongoCollection {
    inner: Collection<Document>,
}

fn object_id(id: Bson) -> StoreResult<ObjectId> {
    match id {
        Bson::ObjectId(oid) => Ok(oid),
        other => Err(StoreError::UnexpectedId(other.to_string())),
    }
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    async fn find(&self, filter: Document, options: FindOptions) -> StoreResult<DocumentCursor> {
        let cursor = self
            .inner
            .find(filter, mongodb::options::FindOptions::from(options))
            .await?;
        Ok(cursor.map_err(StoreError::from).boxed())
    }

    async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.inner.find_one(filter, None).await?)
    }

    async fn insert_one(&self, document: Document) -> StoreResult<ObjectId> {
        let result = self.inner.insert_one(document, None).await?;
        object_id(result.inserted_id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<Vec<ObjectId>> {
        let result = self.inner.insert_many(documents, None).await?;

        let mut inserted: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        inserted.sort_by_key(|(index, _)| *index);
        inserted.into_iter().map(|(_, id)| object_id(id)).collect()
    }

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<u64> {
        let result = self.inner.update_one(filter, update, None).await?;
        Ok(result.modified_count)
    }

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<u64> {
        let result = self.inner.update_many(filter, update, None).await?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, filter: Document) -> StoreResult<u64> {
        let result = self.inner.delete_one(filter, None).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: Document) -> StoreResult<u64> {
        let result = self.inner.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }

    async fn count_documents(&self, filter: Document) -> StoreResult<u64> {
        Ok(self.inner.count_documents(filter, None).await?)
    }

    async fn estimated_document_count(&self) -> StoreResult<u64> {
        Ok(self.inner.estimated_document_count(None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ConfigError;

    #[tokio::test]
    async fn test_missing_database_is_a_configuration_error() {
        let config = StoreConfig::new("", "localhost", 27017);

        let result = MongoProvider::connect_with(&config).await;

        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigError::Missing("MONGODB_NAME")))
        ));
    }

    #[tokio::test]
    async fn test_zero_port_is_a_configuration_error() {
        let config = StoreConfig::new("app", "localhost", 0);

        let result = MongoProvider::connect_with(&config).await;

        assert!(matches!(
            result,
            Err(StoreError::Configuration(ConfigError::Invalid { key: "MONGODB_PORT", .. }))
        ));
    }

    #[tokio::test]
    async fn test_valid_config_builds_a_lazy_client() {
        let config = StoreConfig::new("app", "localhost", 27017);

        let provider = MongoProvider::connect_with(&config).await.unwrap();

        assert_eq!(provider.database_name(), "app");
    }
}
