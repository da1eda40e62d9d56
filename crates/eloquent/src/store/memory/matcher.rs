//! Filter evaluation, sorting and `$set` updates over in-memory documents.
//!
//! Supports field equality (array fields match any element), the comparison
//! operators `$eq $ne $gt $gte $lt $lte $in $nin $exists`, the logical
//! operators `$and $or`, and dotted field paths.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::error::{StoreError, StoreResult};
use crate::record::ID_FIELD;

/// Whether `document` satisfies `filter`.
pub(crate) fn matches(document: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(StoreError::unsupported(format!("query operator {}", op)));
            }
            path => field_matches(lookup(document, path), condition)?,
        };

        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'a>(key: &str, condition: &'a Bson) -> StoreResult<Vec<&'a Document>> {
    let array = condition
        .as_array()
        .ok_or_else(|| StoreError::backend(format!("{} expects an array", key)))?;

    array
        .iter()
        .map(|clause| {
            clause
                .as_document()
                .ok_or_else(|| StoreError::backend(format!("{} expects documents", key)))
        })
        .collect()
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    let operators = match condition {
        Bson::Document(inner) if inner.keys().next().is_some_and(|k| k.starts_with('$')) => inner,
        _ => return Ok(equals(value, condition)),
    };

    for (op, argument) in operators {
        let satisfied = match op.as_str() {
            "$eq" => equals(value, argument),
            "$ne" => !equals(value, argument),
            "$gt" => ordered(value, argument, |o| o == Ordering::Greater),
            "$gte" => ordered(value, argument, |o| o != Ordering::Less),
            "$lt" => ordered(value, argument, |o| o == Ordering::Less),
            "$lte" => ordered(value, argument, |o| o != Ordering::Greater),
            "$in" => members(op, argument)?.iter().any(|candidate| equals(value, candidate)),
            "$nin" => !members(op, argument)?.iter().any(|candidate| equals(value, candidate)),
            "$exists" => value.is_some() == truthy(argument),
            other => {
                return Err(StoreError::unsupported(format!("query operator {}", other)));
            }
        };

        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

fn members<'a>(op: &str, argument: &'a Bson) -> StoreResult<&'a Vec<Bson>> {
    argument
        .as_array()
        .ok_or_else(|| StoreError::backend(format!("{} expects an array", op)))
}

fn truthy(argument: &Bson) -> bool {
    match argument {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

/// Equality with array fields matching any element and missing fields
/// matching null.
fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(Bson::Array(items)) if !matches!(target, Bson::Array(_)) => {
            items.iter().any(|item| same(item, target))
        }
        Some(value) => same(value, target),
    }
}

fn ordered(value: Option<&Bson>, target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| compare(item, target).is_some_and(&accept)),
        Some(value) => compare(value, target).is_some_and(accept),
        None => false,
    }
}

fn same(a: &Bson, b: &Bson) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Ordering between two values of the same kind; numbers compare across
/// representations.
pub(crate) fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 1,
        Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 2,
        Some(Bson::String(_)) => 3,
        Some(Bson::Document(_)) => 4,
        Some(Bson::Array(_)) => 5,
        Some(Bson::Binary(_)) => 6,
        Some(Bson::ObjectId(_)) => 7,
        Some(Bson::Boolean(_)) => 8,
        Some(Bson::DateTime(_)) => 9,
        Some(_) => 10,
    }
}

fn sort_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b))),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Stable sort by a `{ field: 1 | -1, ... }` specification.
pub(crate) fn sort(documents: &mut [Document], spec: &Document) {
    documents.sort_by(|a, b| {
        for (field, direction) in spec {
            let ordering = sort_values(lookup(a, field), lookup(b, field));
            let ordering = if as_f64(direction).is_some_and(|d| d < 0.0) {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Apply a `{ "$set": { ... } }` update. Returns whether anything changed.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> StoreResult<bool> {
    let mut changed = false;

    for (op, fields) in update {
        if op != "$set" {
            return Err(StoreError::unsupported(format!("update operator {}", op)));
        }
        let fields = fields
            .as_document()
            .ok_or_else(|| StoreError::backend("$set expects a document"))?;

        for (path, value) in fields {
            if path == ID_FIELD {
                return Err(StoreError::unsupported("modifying _id"));
            }
            if lookup(document, path) != Some(value) {
                assign(document, path, value.clone());
                changed = true;
            }
        }
    }

    Ok(changed)
}

/// Resolve a dotted path.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

fn assign(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                assign(inner, rest, value);
            }
        }
    }
}
