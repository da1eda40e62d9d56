//! Generic repository.
//!
//! Every operation acquires a connection from the provider, resolves the
//! collection, runs its store calls, decodes the results and releases the
//! connection. Identifier decoding happens before any of that.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::{doc, Document};
use futures::TryStreamExt;

use crate::error::{CallSite, Operation, RepositoryError, RepositoryResult, StoreError, StoreResult};
use crate::identifier;
use crate::options::FindOptions;
use crate::pagination::{PageWindow, Pagination, DEFAULT_PAGE_SORT_FIELD};
use crate::record::{self, Record};
use crate::store::{CollectionHandle, ConnectionProvider, DocumentCursor};

/// Repository for records of type `T` stored in one collection.
///
/// Holds no per-request state; share it behind an `Arc` across tasks.
pub struct Repository<T> {
    provider: Arc<dyn ConnectionProvider>,
    database: String,
    collection: String,
    page_sort: Document,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            database: self.database.clone(),
            collection: self.collection.clone(),
            page_sort: self.page_sort.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("page_sort", &self.page_sort)
            .finish_non_exhaustive()
    }
}

impl<T: Record> Repository<T> {
    /// Bind `collection` in the provider's database.
    pub fn new(provider: Arc<dyn ConnectionProvider>, collection: impl Into<String>) -> Self {
        let database = provider.database_name().to_string();
        Self {
            provider,
            database,
            collection: collection.into(),
            page_sort: doc! { DEFAULT_PAGE_SORT_FIELD: -1 },
            _record: PhantomData,
        }
    }

    /// Override the order used by [`paginate`](Self::paginate).
    pub fn with_page_sort(mut self, sort: Document) -> Self {
        self.page_sort = sort;
        self
    }

    /// Every record, in store order unless `options` sorts.
    pub async fn all(&self, options: impl Into<Option<FindOptions>>) -> RepositoryResult<Vec<T>> {
        let site = CallSite::new(Operation::All);
        let options = options.into().unwrap_or_default();

        let records = self
            .run(site, |collection| async move {
                let cursor = collection.find(Document::new(), options).await?;
                decode_all::<T>(cursor).await
            })
            .await?;

        tracing::debug!(collection = %self.collection, count = records.len(), "all");
        Ok(records)
    }

    /// Record with identifier `id`.
    pub async fn find(&self, id: &str) -> RepositoryResult<T> {
        let site = CallSite::new(Operation::Find);
        let oid = self.decode_id(site, id)?;

        let found = self
            .run(site, |collection| async move {
                collection
                    .find_one(record::id_filter(oid))
                    .await?
                    .map(record::from_document::<T>)
                    .transpose()
            })
            .await?;

        found.ok_or_else(|| RepositoryError::not_found(&self.collection, id, site))
    }

    /// Records matching `filter`; no match is an empty vector.
    pub async fn find_multiple(
        &self,
        filter: Document,
        options: impl Into<Option<FindOptions>>,
    ) -> RepositoryResult<Vec<T>> {
        let site = CallSite::new(Operation::FindMultiple);
        let options = options.into().unwrap_or_default();

        let records = self
            .run(site, |collection| async move {
                let cursor = collection.find(filter, options).await?;
                decode_all::<T>(cursor).await
            })
            .await?;

        tracing::debug!(collection = %self.collection, count = records.len(), "find_multiple");
        Ok(records)
    }

    /// Persist one record and return its identifier.
    ///
    /// The record is not modified; an identifier it already carries is kept.
    pub async fn insert(&self, record: &T) -> RepositoryResult<String> {
        let site = CallSite::new(Operation::Insert);
        if let Some(id) = record.id() {
            self.decode_id(site, id)?;
        }
        let document = record::to_document(record).map_err(|e| self.classify(site, e))?;

        let id = self
            .run(site, |collection| async move { collection.insert_one(document).await })
            .await?;

        let id = identifier::encode(&id);
        tracing::debug!(collection = %self.collection, id = %id, "insert");
        Ok(id)
    }

    /// Persist a batch in one store call and return identifiers in input
    /// order. Nothing is returned on failure.
    pub async fn insert_multiple(&self, records: &[T]) -> RepositoryResult<Vec<String>> {
        let site = CallSite::new(Operation::InsertMultiple);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            if let Some(id) = record.id() {
                self.decode_id(site, id)?;
            }
            documents.push(record::to_document(record).map_err(|e| self.classify(site, e))?);
        }

        let ids = self
            .run(site, |collection| async move { collection.insert_many(documents).await })
            .await?;

        tracing::debug!(collection = %self.collection, count = ids.len(), "insert_multiple");
        Ok(ids.iter().map(identifier::encode).collect())
    }

    /// Delete the record with identifier `id`; returns 0 or 1.
    pub async fn delete(&self, id: &str) -> RepositoryResult<u64> {
        let site = CallSite::new(Operation::Delete);
        let oid = self.decode_id(site, id)?;

        let deleted = self
            .run(site, |collection| async move {
                collection.delete_one(record::id_filter(oid)).await
            })
            .await?;

        tracing::debug!(collection = %self.collection, id, deleted, "delete");
        Ok(deleted)
    }

    /// Delete every record matching `filter`.
    pub async fn delete_multiple(&self, filter: Document) -> RepositoryResult<u64> {
        let site = CallSite::new(Operation::DeleteMultiple);

        let deleted = self
            .run(site, |collection| async move { collection.delete_many(filter).await })
            .await?;

        tracing::debug!(collection = %self.collection, deleted, "delete_multiple");
        Ok(deleted)
    }

    /// Merge the set fields of `data` into the record with identifier `id`.
    ///
    /// Returns the number of records modified. A payload with no set fields
    /// modifies nothing and makes no store call.
    pub async fn update(&self, id: &str, data: &T) -> RepositoryResult<u64> {
        let site = CallSite::new(Operation::Update);
        let oid = self.decode_id(site, id)?;
        let Some(update) = record::merge_patch(data).map_err(|e| self.classify(site, e))? else {
            return Ok(0);
        };

        let modified = self
            .run(site, |collection| async move {
                collection.update_one(record::id_filter(oid), update).await
            })
            .await?;

        tracing::debug!(collection = %self.collection, id, modified, "update");
        Ok(modified)
    }

    /// Merge the set fields of `data` into every record matching `filter`.
    pub async fn update_multiple(&self, filter: Document, data: &T) -> RepositoryResult<u64> {
        let site = CallSite::new(Operation::UpdateMultiple);
        let Some(update) = record::merge_patch(data).map_err(|e| self.classify(site, e))? else {
            return Ok(0);
        };

        let modified = self
            .run(site, |collection| async move {
                collection.update_many(filter, update).await
            })
            .await?;

        tracing::debug!(collection = %self.collection, modified, "update_multiple");
        Ok(modified)
    }

    /// Count records.
    ///
    /// Without a filter (or with an empty one) this is the store's estimated
    /// count; pass an explicit always-true filter for an exact total.
    pub async fn count(&self, filter: impl Into<Option<Document>>) -> RepositoryResult<u64> {
        let site = CallSite::new(Operation::Count);
        let filter = filter.into();

        let total = self
            .run(site, |collection| async move { count_in(collection.as_ref(), filter).await })
            .await?;

        tracing::debug!(collection = %self.collection, total, "count");
        Ok(total)
    }

    /// Page `page` of size `limit` over the records matching `filter`.
    ///
    /// `limit < 1` becomes 10 and `page < 1` becomes 1. The count and the
    /// window fetch share one connection; when the count is 0 nothing is
    /// fetched.
    pub async fn paginate(
        &self,
        limit: i64,
        page: i64,
        filter: impl Into<Option<Document>>,
    ) -> RepositoryResult<Pagination<T>> {
        let site = CallSite::new(Operation::Paginate);
        let filter = filter.into();
        let sort = self.page_sort.clone();

        let (window, data) = self
            .run(site, |collection| async move {
                let total = count_in(collection.as_ref(), filter.clone()).await?;
                let window = PageWindow::compute(total, limit, page);
                if !window.has_items() {
                    return Ok((window, Vec::new()));
                }

                let options = FindOptions::new()
                    .sort(sort)
                    .skip(window.skip())
                    .limit(i64::try_from(window.per_page).unwrap_or(i64::MAX));
                let cursor = collection.find(filter.unwrap_or_default(), options).await?;
                let data = decode_all::<T>(cursor).await?;
                Ok::<_, StoreError>((window, data))
            })
            .await?;

        tracing::debug!(
            collection = %self.collection,
            total = window.total,
            page = window.current_page,
            last_page = window.last_page,
            "paginate"
        );
        Ok(Pagination::new(window, data))
    }

    /// Acquire, resolve, run, release; classify any failure.
    async fn run<R, F, Fut>(&self, site: CallSite, op: F) -> RepositoryResult<R>
    where
        F: FnOnce(Arc<dyn CollectionHandle>) -> Fut,
        Fut: Future<Output = StoreResult<R>>,
    {
        let connection = self
            .provider
            .connect()
            .await
            .map_err(|e| self.classify(site, e))?;
        let collection = connection.collection(&self.database, &self.collection);

        let result = op(collection).await;

        if let Err(e) = self.provider.disconnect(connection).await {
            tracing::warn!(
                collection = %self.collection,
                error = %e,
                "failed to release connection"
            );
        }

        result.map_err(|e| self.classify(site, e))
    }

    fn decode_id(&self, site: CallSite, id: &str) -> RepositoryResult<bson::oid::ObjectId> {
        identifier::decode(id).map_err(|e| {
            let err = RepositoryError::invalid_identifier(&self.collection, site, e);
            tracing::debug!(error = %err, "rejected identifier");
            err
        })
    }

    fn classify(&self, site: CallSite, source: StoreError) -> RepositoryError {
        let err = RepositoryError::classify(&self.collection, site, source);
        tracing::warn!(error = %err, "store operation failed");
        err
    }
}

/// Estimated count for an absent or empty filter, exact count otherwise.
async fn count_in(collection: &dyn CollectionHandle, filter: Option<Document>) -> StoreResult<u64> {
    match filter {
        Some(filter) if !filter.is_empty() => collection.count_documents(filter).await,
        _ => collection.estimated_document_count().await,
    }
}

async fn decode_all<T: Record>(cursor: DocumentCursor) -> StoreResult<Vec<T>> {
    let documents: Vec<Document> = cursor.try_collect().await?;
    documents.into_iter().map(record::from_document).collect()
}
