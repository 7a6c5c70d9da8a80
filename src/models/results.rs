//! Result envelopes returned by the service layer.

use crate::models::CrmObject;
use serde::Serialize;

/// A list of results plus any non-fatal warnings (e.g. a clamped page size).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectList<T> {
    pub results: Vec<T>,
    pub total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> ObjectList<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            total: results.len(),
            results,
            warnings: Vec::new(),
        }
    }

    /// Record the server-side match count, which may exceed the page returned.
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total.max(self.results.len());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// Objects attached to one deal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealObjects<T> {
    pub deal_id: String,
    #[serde(flatten)]
    pub list: ObjectList<T>,
}

/// Tasks for a record picked by lookup, with the record that was picked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTasks<T> {
    pub record: CrmObject,
    #[serde(flatten)]
    pub list: ObjectList<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_never_below_returned_count() {
        let list = ObjectList::new(vec![1, 2, 3]).with_total(250);
        assert_eq!(list.total, 250);
        assert_eq!(list.results.len(), 3);

        let list = ObjectList::new(vec![1, 2, 3]).with_total(0);
        assert_eq!(list.total, 3);
    }
}
