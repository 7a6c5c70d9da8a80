//! Client-side ordering for result sets the API does not sort reliably.

use crate::models::properties::meeting;
use crate::models::{CrmObject, SortDirection};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

pub struct SortFallback;

impl SortFallback {
    /// Sort meetings on `hs_meeting_start_time`.
    pub fn sort_by_start_time(objects: &mut Vec<CrmObject>, direction: SortDirection) {
        Self::sort_by_timestamp_property(objects, meeting::START_TIME, direction);
    }

    /// Stable sort on a timestamp property. Objects whose value is missing or
    /// unparseable go last whichever way the sort runs.
    pub fn sort_by_timestamp_property(
        objects: &mut Vec<CrmObject>,
        property: &str,
        direction: SortDirection,
    ) {
        let mut keyed: Vec<(Option<DateTime<Utc>>, CrmObject)> = objects
            .drain(..)
            .map(|object| (object.timestamp_property(property), object))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| compare_keys(a.as_ref(), b.as_ref(), direction));

        objects.extend(keyed.into_iter().map(|(_, object)| object));
    }
}

fn compare_keys(
    a: Option<&DateTime<Utc>>,
    b: Option<&DateTime<Utc>>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.cmp(b),
            SortDirection::Descending => b.cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::properties::common;
    use crate::models::ObjectType;

    fn meeting_at(id: &str, start: Option<&str>) -> CrmObject {
        let object = CrmObject::new(id, ObjectType::Meeting);
        match start {
            Some(start) => object.with_property(meeting::START_TIME, start),
            None => object.with_null_property(meeting::START_TIME),
        }
    }

    fn ids(objects: &[CrmObject]) -> Vec<&str> {
        objects.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_missing_values_sort_last_descending() {
        let mut meetings = vec![
            meeting_at("null", None),
            meeting_at("march", Some("2024-03-01")),
            meeting_at("january", Some("2024-01-01")),
        ];
        SortFallback::sort_by_start_time(&mut meetings, SortDirection::Descending);
        assert_eq!(ids(&meetings), vec!["march", "january", "null"]);
    }

    #[test]
    fn test_missing_values_sort_last_ascending() {
        let mut meetings = vec![
            meeting_at("garbage", Some("next tuesday")),
            meeting_at("march", Some("2024-03-01T00:00:00Z")),
            meeting_at("january", Some("1704067200000")),
        ];
        SortFallback::sort_by_start_time(&mut meetings, SortDirection::Ascending);
        assert_eq!(ids(&meetings), vec!["january", "march", "garbage"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut meetings = vec![
            meeting_at("a", Some("2024-02-01")),
            meeting_at("b", None),
            meeting_at("c", Some("2024-02-01")),
            meeting_at("d", None),
        ];
        SortFallback::sort_by_start_time(&mut meetings, SortDirection::Descending);
        assert_eq!(ids(&meetings), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_sort_notes_by_timestamp() {
        let mut notes = vec![
            CrmObject::new("old", ObjectType::Note).with_property(common::TIMESTAMP, "2023-05-01"),
            CrmObject::new("new", ObjectType::Note).with_property(common::TIMESTAMP, "2024-05-01"),
        ];
        SortFallback::sort_by_timestamp_property(&mut notes, common::TIMESTAMP, SortDirection::Descending);
        assert_eq!(ids(&notes), vec!["new", "old"]);
    }
}
