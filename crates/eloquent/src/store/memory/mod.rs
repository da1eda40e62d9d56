//! In-memory store backend.
//!
//! Keeps documents per `database.collection` in insertion order. Intended for
//! tests and prototyping; it counts store calls and open connections and can
//! be switched unavailable to simulate an outage.

mod matcher;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::options::FindOptions;
use crate::record::ID_FIELD;
use crate::store::{CollectionHandle, Connection, ConnectionProvider, DocumentCursor};

#[derive(Default)]
struct MemoryState {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    store_calls: AtomicUsize,
    connections_opened: AtomicUsize,
    open_connections: AtomicUsize,
    unavailable: AtomicBool,
}

/// Connection provider backed by process memory.
#[derive(Clone)]
pub struct MemoryProvider {
    database: String,
    state: Arc<MemoryState>,
}

impl MemoryProvider {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: Arc::new(MemoryState::default()),
        }
    }

    /// Number of store primitives invoked so far.
    pub fn store_calls(&self) -> usize {
        self.state.store_calls.load(Ordering::SeqCst)
    }

    /// Number of connections ever acquired.
    pub fn connections_opened(&self) -> usize {
        self.state.connections_opened.load(Ordering::SeqCst)
    }

    /// Connections acquired and not yet released.
    pub fn open_connections(&self) -> usize {
        self.state.open_connections.load(Ordering::SeqCst)
    }

    /// Make every store primitive fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn connect(&self) -> StoreResult<Arc<dyn Connection>> {
        self.state.connections_opened.fetch_add(1, Ordering::SeqCst);
        self.state.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryConnection {
            state: Arc::clone(&self.state),
        }))
    }

    async fn disconnect(&self, connection: Arc<dyn Connection>) -> StoreResult<()> {
        drop(connection);
        self.state.open_connections.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryConnection {
    state: Arc<MemoryState>,
}

impl Connection for MemoryConnection {
    fn collection(&self, database: &str, collection: &str) -> Arc<dyn CollectionHandle> {
        Arc::new(MemoryCollection {
            key: format!("{}.{}", database, collection),
            state: Arc::clone(&self.state),
        })
    }
}

struct MemoryCollection {
    key: String,
    state: Arc<MemoryState>,
}

impl MemoryCollection {
    /// Record a primitive call and fail if the store is down.
    fn enter(&self) -> StoreResult<()> {
        self.state.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::backend("memory store is unavailable"));
        }
        Ok(())
    }

    async fn matching(&self, filter: &Document) -> StoreResult<Vec<Document>> {
        let collections = self.state.collections.read().await;
        let mut found = Vec::new();
        for document in collections.get(&self.key).into_iter().flatten() {
            if matcher::matches(document, filter)? {
                found.push(document.clone());
            }
        }
        Ok(found)
    }

    async fn update(&self, filter: Document, update: Document, many: bool) -> StoreResult<u64> {
        let mut collections = self.state.collections.write().await;
        let Some(documents) = collections.get_mut(&self.key) else {
            return Ok(0);
        };

        let mut modified = 0;
        for document in documents.iter_mut() {
            if !matcher::matches(document, &filter)? {
                continue;
            }
            if matcher::apply_update(document, &update)? {
                modified += 1;
            }
            if !many {
                break;
            }
        }
        Ok(modified)
    }

    async fn delete(&self, filter: Document, many: bool) -> StoreResult<u64> {
        let mut collections = self.state.collections.write().await;
        let Some(documents) = collections.get_mut(&self.key) else {
            return Ok(0);
        };

        let mut hits = Vec::with_capacity(documents.len());
        for document in documents.iter() {
            hits.push(matcher::matches(document, &filter)?);
        }
        if !many {
            if let Some(first) = hits.iter().position(|hit| *hit) {
                documents.remove(first);
                return Ok(1);
            }
            return Ok(0);
        }

        let before = documents.len();
        let mut hits = hits.into_iter();
        documents.retain(|_| !hits.next().unwrap_or(false));
        Ok((before - documents.len()) as u64)
    }
}

/// Ensure `document` has an `ObjectId` key and return it.
fn assign_id(document: &mut Document) -> StoreResult<ObjectId> {
    match document.get(ID_FIELD) {
        None | Some(Bson::Null) => {
            let id = ObjectId::new();
            document.insert(ID_FIELD, id);
            Ok(id)
        }
        Some(Bson::ObjectId(id)) => Ok(*id),
        Some(other) => Err(StoreError::UnexpectedId(other.to_string())),
    }
}

fn existing_ids(documents: Option<&Vec<Document>>) -> HashSet<ObjectId> {
    documents
        .into_iter()
        .flatten()
        .filter_map(|d| d.get_object_id(ID_FIELD).ok())
        .collect()
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    async fn find(&self, filter: Document, options: FindOptions) -> StoreResult<DocumentCursor> {
        self.enter()?;
        let mut documents = self.matching(&filter).await?;

        if let Some(spec) = &options.sort {
            matcher::sort(&mut documents, spec);
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = match options.limit {
            Some(n) if n != 0 => n.unsigned_abs() as usize,
            _ => usize::MAX,
        };

        let window: Vec<StoreResult<Document>> =
            documents.into_iter().skip(skip).take(limit).map(Ok).collect();
        Ok(stream::iter(window).boxed())
    }

    async fn find_one(&self, filter: Document) -> StoreResult<Option<Document>> {
        self.enter()?;
        Ok(self.matching(&filter).await?.into_iter().next())
    }

    async fn insert_one(&self, mut document: Document) -> StoreResult<ObjectId> {
        self.enter()?;
        let id = assign_id(&mut document)?;

        let mut collections = self.state.collections.write().await;
        if existing_ids(collections.get(&self.key)).contains(&id) {
            return Err(StoreError::DuplicateKey(id.to_hex()));
        }
        collections.entry(self.key.clone()).or_default().push(document);
        Ok(id)
    }

    async fn insert_many(&self, mut documents: Vec<Document>) -> StoreResult<Vec<ObjectId>> {
        self.enter()?;
        let ids = documents
            .iter_mut()
            .map(assign_id)
            .collect::<StoreResult<Vec<_>>>()?;

        let mut collections = self.state.collections.write().await;
        let mut seen = existing_ids(collections.get(&self.key));
        for id in &ids {
            if !seen.insert(*id) {
                return Err(StoreError::DuplicateKey(id.to_hex()));
            }
        }

        collections.entry(self.key.clone()).or_default().extend(documents);
        Ok(ids)
    }

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<u64> {
        self.enter()?;
        self.update(filter, update, false).await
    }

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<u64> {
        self.enter()?;
        self.update(filter, update, true).await
    }

    async fn delete_one(&self, filter: Document) -> StoreResult<u64> {
        self.enter()?;
        self.delete(filter, false).await
    }

    async fn delete_many(&self, filter: Document) -> StoreResult<u64> {
        self.enter()?;
        self.delete(filter, true).await
    }

    async fn count_documents(&self, filter: Document) -> StoreResult<u64> {
        self.enter()?;
        Ok(self.matching(&filter).await?.len() as u64)
    }

    async fn estimated_document_count(&self) -> StoreResult<u64> {
        self.enter()?;
        let collections = self.state.collections.read().await;
        Ok(collections.get(&self.key).map_or(0, |d| d.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use futures::TryStreamExt;

    async fn users() -> (MemoryProvider, Arc<dyn CollectionHandle>) {
        let provider = MemoryProvider::new("test");
        let connection = provider.connect().await.unwrap();
        let collection = connection.collection("test", "users");
        (provider, collection)
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let (_, users) = users().await;

        let id = users.insert_one(doc! { "name": "c6" }).await.unwrap();
        let found = users.find_one(doc! { "_id": id }).await.unwrap().unwrap();

        assert_eq!(found.get_str("name").unwrap(), "c6");
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let (_, users) = users().await;
        let id = users.insert_one(doc! { "name": "first" }).await.unwrap();

        let result = users
            .insert_many(vec![doc! { "name": "second" }, doc! { "_id": id, "name": "dup" }])
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateKey(_))));
        assert_eq!(users.estimated_document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_applies_sort_skip_limit() {
        let (_, users) = users().await;
        let docs = (1..=5).map(|i| doc! { "n": i }).collect();
        users.insert_many(docs).await.unwrap();

        let options = FindOptions::new().sort(doc! { "n": -1 }).skip(1).limit(2);
        let cursor = users.find(doc! {}, options).await.unwrap();
        let found: Vec<Document> = cursor.try_collect().await.unwrap();

        let order: Vec<i32> = found.iter().map(|d| d.get_i32("n").unwrap()).collect();
        assert_eq!(order, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_delete_many_removes_matches() {
        let (_, users) = users().await;
        let docs = (1..=6).map(|i| doc! { "n": i }).collect();
        users.insert_many(docs).await.unwrap();

        let deleted = users.delete_many(doc! { "n": { "$gt": 2 } }).await.unwrap();

        assert_eq!(deleted, 4);
        assert_eq!(users.count_documents(doc! {}).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_collections_are_scoped_by_database() {
        let provider = MemoryProvider::new("a");
        let connection = provider.connect().await.unwrap();
        connection
            .collection("a", "users")
            .insert_one(doc! { "n": 1 })
            .await
            .unwrap();

        let other = connection.collection("b", "users");
        assert_eq!(other.estimated_document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_calls() {
        let (provider, users) = users().await;
        provider.set_unavailable(true);

        let result = users.count_documents(doc! {}).await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(provider.store_calls(), 1);
    }

    #[tokio::test]
    async fn test_connection_accounting() {
        let provider = MemoryProvider::new("test");
        let connection = provider.connect().await.unwrap();
        assert_eq!(provider.open_connections(), 1);

        provider.disconnect(connection).await.unwrap();
        assert_eq!(provider.open_connections(), 0);
        assert_eq!(provider.connections_opened(), 1);
    }
}
