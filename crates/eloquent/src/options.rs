//! Query options for multi-document reads.

use bson::{Bson, Document};

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Sort, skip and limit applied to a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort specification in store form, e.g. `{ "created_at": -1 }`
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sort specification.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Append one field to the sort specification.
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort
            .get_or_insert_with(Document::new)
            .insert(field.into(), Bson::Int32(order.as_i32()));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(feature = "mongodb")]
impl From<FindOptions> for mongodb::options::FindOptions {
    fn from(options: FindOptions) -> Self {
        let mut converted = mongodb::options::FindOptions::default();
        converted.sort = options.sort;
        converted.skip = options.skip;
        converted.limit = options.limit;
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_sort_by_accumulates_fields_in_order() {
        let options = FindOptions::new()
            .sort_by("created_at", SortOrder::Descending)
            .sort_by("name", SortOrder::Ascending);

        assert_eq!(options.sort, Some(doc! { "created_at": -1, "name": 1 }));
    }

    #[test]
    fn test_window_options() {
        let options = FindOptions::new().skip(6).limit(3);

        assert_eq!(options.skip, Some(6));
        assert_eq!(options.limit, Some(3));
        assert_eq!(options.sort, None);
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn test_driver_options_carry_sort_and_window() {
        let options = FindOptions::new()
            .sort_by("created_at", SortOrder::Descending)
            .skip(6)
            .limit(3);

        let converted = mongodb::options::FindOptions::from(options);

        assert_eq!(converted.sort, Some(doc! { "created_at": -1 }));
        assert_eq!(converted.skip, Some(6));
        assert_eq!(converted.limit, Some(3));
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn test_driver_options_default_to_unset() {
        let converted = mongodb::options::FindOptions::from(FindOptions::new());

        assert_eq!(converted.sort, None);
        assert_eq!(converted.skip, None);
        assert_eq!(converted.limit, None);
    }
}
