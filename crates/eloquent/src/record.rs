//! Record trait and document conversion.
//!
//! A record exposes its identity through [`Record::id`] as the external hex
//! string. On the way into the store that string becomes the `ObjectId` under
//! `_id`; on the way out the `ObjectId` is handed back through
//! [`Record::set_id`], so record types never see the native key.

use bson::{Bson, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreResult;
use crate::identifier;

/// Name of the identity field in stored documents.
pub const ID_FIELD: &str = "_id";

/// An application record persisted by a [`Repository`](crate::Repository).
///
/// The stored `_id` is built from [`id`](Record::id) and written back with
/// [`set_id`](Record::set_id) when a record is read, whatever the serialized
/// shape of the identity field. Name that field `_id`
/// (`#[serde(rename = "_id")]`) or skip it (`#[serde(skip)]`); any other name
/// is also stored as an ordinary field.
///
/// Fields that are `None` should be skipped when serializing
/// (`#[serde(skip_serializing_if = "Option::is_none")]`); null fields are
/// dropped from update payloads either way.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// External identifier, if the record has been persisted.
    fn id(&self) -> Option<&str>;

    /// Set the external identifier of a record read from the store.
    fn set_id(&mut self, id: String);
}

/// Serialize a record for insertion.
///
/// `_id` is the decoded [`Record::id`], or absent so the store assigns one.
/// Callers validate the identifier beforehand.
pub(crate) fn to_document<T: Record>(record: &T) -> StoreResult<Document> {
    let mut document = bson::to_document(record)?;

    document.remove(ID_FIELD);
    if let Some(oid) = record.id().and_then(|hex| identifier::decode(hex).ok()) {
        document.insert(ID_FIELD, oid);
    }

    Ok(document)
}

/// Decode a stored document into a record.
pub(crate) fn from_document<T: Record>(mut document: Document) -> StoreResult<T> {
    let id = match document.remove(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => Some(identifier::encode(&oid)),
        Some(Bson::String(hex)) => Some(hex),
        _ => None,
    };

    let mut record: T = bson::from_document(document)?;
    if let Some(id) = id {
        record.set_id(id);
    }
    Ok(record)
}

/// Build a merge-patch update from the explicitly set fields of `record`.
///
/// Returns `None` when nothing would be written.
pub(crate) fn merge_patch<T: Record>(record: &T) -> StoreResult<Option<Document>> {
    let fields: Document = bson::to_document(record)?
        .into_iter()
        .filter(|(key, value)| key != ID_FIELD && !matches!(value, Bson::Null))
        .collect();

    if fields.is_empty() {
        return Ok(None);
    }

    let mut update = Document::new();
    update.insert("$set", fields);
    Ok(Some(update))
}

/// Filter matching a single document by native key.
pub(crate) fn id_filter(id: bson::oid::ObjectId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, id);
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        title: Option<String>,
        pages: Option<i32>,
    }

    impl Record for Note {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[test]
    fn test_to_document_converts_hex_id() {
        let oid = ObjectId::new();
        let note = Note {
            id: Some(oid.to_hex()),
            title: Some("draft".into()),
            pages: None,
        };

        let document = to_document(&note).unwrap();
        assert_eq!(document.get_object_id(ID_FIELD).unwrap(), oid);
    }

    #[test]
    fn test_to_document_omits_missing_id() {
        let note = Note {
            id: None,
            title: Some("draft".into()),
            pages: Some(3),
        };

        let document = to_document(&note).unwrap();
        assert!(!document.contains_key(ID_FIELD));
    }

    #[test]
    fn test_from_document_exposes_hex_id() {
        let oid = ObjectId::new();
        let note: Note = from_document(doc! { "_id": oid, "title": "final", "pages": 12 }).unwrap();

        assert_eq!(note.id.as_deref(), Some(oid.to_hex().as_str()));
        assert_eq!(note.pages, Some(12));
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Label {
        #[serde(skip)]
        key: Option<String>,
        text: String,
    }

    impl Record for Label {
        fn id(&self) -> Option<&str> {
            self.key.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.key = Some(id);
        }
    }

    #[test]
    fn test_identity_travels_through_record_accessors() {
        let oid = ObjectId::new();
        let label = Label {
            key: Some(oid.to_hex()),
            text: "urgent".into(),
        };

        let document = to_document(&label).unwrap();
        assert_eq!(document.get_object_id(ID_FIELD).unwrap(), oid);
        assert!(!document.contains_key("key"));

        let label: Label = from_document(document).unwrap();
        assert_eq!(label.key, Some(oid.to_hex()));
        assert_eq!(label.text, "urgent");
    }

    #[test]
    fn test_from_document_reports_shape_mismatch() {
        let result: StoreResult<Note> = from_document(doc! { "title": 42 });
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_patch_keeps_only_set_fields() {
        let note = Note {
            id: Some(ObjectId::new().to_hex()),
            title: None,
            pages: Some(2),
        };

        let update = merge_patch(&note).unwrap().unwrap();
        assert_eq!(update, doc! { "$set": { "pages": 2 } });
    }

    #[test]
    fn test_merge_patch_empty_payload() {
        let note = Note {
            id: None,
            title: None,
            pages: None,
        };

        assert_eq!(merge_patch(&note).unwrap(), None);
    }
}
