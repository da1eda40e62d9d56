//! Eloquent - a generic repository over a document store.
//!
//! One [`Repository<T>`] is bound to a record type and a collection name and
//! exposes CRUD, filtered queries, counting and pagination. Connection
//! handling, identifier encoding, result decoding and error classification
//! are done here so application code never touches the driver directly.
//!
//! # Layers
//!
//! - **identifier**: external hex id <-> native `ObjectId`
//! - **record**: the `Record` trait and document conversion
//! - **store**: connection provider, collection accessor and store primitives,
//!   with MongoDB and in-memory backends
//! - **pagination**: page window calculation and the `Pagination` value
//! - **error**: error taxonomy and classification
//! - **repository**: the generic repository
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use eloquent::{bson::doc, store::memory::MemoryProvider, Repository};
//!
//! let provider = Arc::new(MemoryProvider::new("app"));
//! let users: Repository<User> = Repository::new(provider, "users");
//!
//! let id = users.insert(&user).await?;
//! let page = users.paginate(10, 1, doc! { "age": { "$gte": 30 } }).await?;
//! ```

pub mod error;
pub mod identifier;
pub mod options;
pub mod pagination;
pub mod record;
pub mod repository;
pub mod store;

pub use bson;

pub use error::{CallSite, Operation, RepositoryError, RepositoryResult, StoreError, StoreResult};
pub use identifier::InvalidIdentifier;
pub use options::{FindOptions, SortOrder};
pub use pagination::{PageWindow, Pagination};
pub use record::Record;
pub use repository::Repository;
pub use store::{CollectionHandle, Connection, ConnectionProvider, DocumentCursor};
