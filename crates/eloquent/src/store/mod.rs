//! Store collaborators.
//!
//! - [`ConnectionProvider`] hands out connections and takes them back
//! - [`Connection`] resolves a collection within a database
//! - [`CollectionHandle`] exposes the store primitives the repository uses
//!
//! Backends: [`memory`] (always available) and [`mongo`] (feature `mongodb`).

use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use futures::stream::BoxStream;

use crate::error::StoreResult;
use crate::options::FindOptions;

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

/// Stream of raw documents produced by a find.
pub type DocumentCursor = BoxStream<'static, StoreResult<Document>>;

/// Store primitives on one collection.
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    async fn find(&self, filter: Document, options: FindOptions) -> StoreResult<DocumentCursor>;

    async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>>;

    /// Insert one document, returning its key
    async fn insert_one(&self, document: Document) -> StoreResult<ObjectId>;

    /// Insert a batch, returning keys in input order
    async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<Vec<ObjectId>>;

    /// Apply `update` to the first match, returning the modified count
    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<u64>;

    /// Apply `update` to every match, returning the modified count
    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<u64>;

    async fn delete_one(&self, filter: Document) -> StoreResult<u64>;

    async fn delete_many(&self, filter: Document) -> StoreResult<u64>;

    /// Exact count of documents matching `filter`
    async fn count_documents(&self, filter: Document) -> StoreResult<u64>;

    /// Metadata-based count of the whole collection
    async fn estimated_document_count(&self) -> StoreResult<u64>;
}

/// A live connection to the store.
pub trait Connection: Send + Sync {
    /// Resolve `collection` within `database`.
    fn collection(&self, database: &str, collection: &str) -> Arc<dyn CollectionHandle>;
}

/// Supplies connections on demand.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Database repositories are scoped to.
    fn database_name(&self) -> &str;

    /// Acquire a connection.
    async fn connect(&self) -> StoreResult<Arc<dyn Connection>>;

    /// Release a connection acquired from this provider.
    async fn disconnect(&self, connection: Arc<dyn Connection>) -> StoreResult<()>;
}
