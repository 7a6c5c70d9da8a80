//! Search request model for `POST /crm/v3/objects/<type>/search`.
//!
//! Filters inside a [`FilterGroup`] are AND-ed, groups are OR-ed. The same
//! structures can be evaluated locally against a [`CrmObject`], which is how
//! server-side queries are checked against their client-side equivalents.

use crate::domain::dates::parse_remote_timestamp;
use crate::models::{CrmObject, ObjectType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Prefix for filters on associated record ids, e.g. `associations.contact`.
pub const ASSOCIATION_PREFIX: &str = "associations.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Eq,
    Neq,
    In,
    ContainsToken,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub property_name: String,
    pub operator: FilterOperator,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Only used by `IN`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl SearchFilter {
    fn single(property: &str, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            property_name: property.to_string(),
            operator,
            value: Some(value.into()),
            values: None,
        }
    }

    pub fn eq(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::Eq, value)
    }

    pub fn neq(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::Neq, value)
    }

    pub fn is_in(property: &str, values: Vec<String>) -> Self {
        Self {
            property_name: property.to_string(),
            operator: FilterOperator::In,
            value: None,
            values: Some(values),
        }
    }

    pub fn contains_token(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::ContainsToken, value)
    }

    pub fn lt(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::Lt, value)
    }

    pub fn lte(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::Lte, value)
    }

    pub fn gt(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::Gt, value)
    }

    pub fn gte(property: &str, value: impl Into<String>) -> Self {
        Self::single(property, FilterOperator::Gte, value)
    }

    /// Filter on the ids of records associated with the searched object.
    pub fn associated_with(target: ObjectType, id: impl Into<String>) -> Self {
        Self::eq(&format!("{}{}", ASSOCIATION_PREFIX, target.singular()), id)
    }

    /// Evaluate this filter against an object the way the search API would.
    pub fn matches(&self, object: &CrmObject) -> bool {
        if let Some(target) = self
            .property_name
            .strip_prefix(ASSOCIATION_PREFIX)
            .and_then(ObjectType::from_api_name)
        {
            return self.matches_association(object.associated_ids(target));
        }

        let actual = object.property(&self.property_name);
        match self.operator {
            FilterOperator::Eq => actual.is_some() && actual == self.value.as_deref(),
            // A missing value is "not equal" to anything
            FilterOperator::Neq => actual.is_none() || actual != self.value.as_deref(),
            FilterOperator::In => match (actual, &self.values) {
                (Some(actual), Some(values)) => values.iter().any(|v| v == actual),
                _ => false,
            },
            FilterOperator::ContainsToken => match (actual, self.value.as_deref()) {
                (Some(actual), Some(needle)) => contains_tokens(actual, needle),
                _ => false,
            },
            FilterOperator::Lt | FilterOperator::Lte | FilterOperator::Gt | FilterOperator::Gte => {
                let ordering = match (actual, self.value.as_deref()) {
                    (Some(actual), Some(expected)) => compare_values(actual, expected),
                    _ => return false,
                };
                match self.operator {
                    FilterOperator::Lt => ordering == Ordering::Less,
                    FilterOperator::Lte => ordering != Ordering::Greater,
                    FilterOperator::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }
            }
        }
    }

    fn matches_association(&self, ids: &[String]) -> bool {
        match self.operator {
            FilterOperator::Eq => self
                .value
                .as_deref()
                .is_some_and(|v| ids.iter().any(|id| id == v)),
            FilterOperator::Neq => self
                .value
                .as_deref()
                .map_or(true, |v| ids.iter().all(|id| id != v)),
            FilterOperator::In => self
                .values
                .as_ref()
                .is_some_and(|values| ids.iter().any(|id| values.contains(id))),
            _ => false,
        }
    }
}

/// Timestamps compare as instants, numbers as numbers, anything else as text.
fn compare_values(actual: &str, expected: &str) -> Ordering {
    if let (Some(a), Some(b)) = (parse_remote_timestamp(actual), parse_remote_timestamp(expected)) {
        return a.cmp(&b);
    }
    if let (Ok(a), Ok(b)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        if let Some(ordering) = a.partial_cmp(&b) {
            return ordering;
        }
    }
    actual.cmp(expected)
}

/// Case-insensitive token match. Every whitespace-separated needle token must
/// match one token of the haystack; `*` at either end acts as a wildcard.
fn contains_tokens(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let tokens: Vec<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let needle = needle.to_lowercase();
    let mut wanted = needle.split_whitespace().peekable();
    if wanted.peek().is_none() {
        return false;
    }

    wanted.all(|part| {
        let starts = part.starts_with('*');
        let ends = part.ends_with('*');
        let core = part.trim_matches('*');
        if core.is_empty() {
            return true;
        }
        tokens.iter().any(|token| match (starts, ends) {
            (true, true) => token.contains(core),
            (true, false) => token.ends_with(core),
            (false, true) => token.starts_with(core),
            (false, false) => *token == core,
        })
    })
}

/// Filters combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<SearchFilter>,
}

impl FilterGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn matches(&self, object: &CrmObject) -> bool {
        self.filters.iter().all(|f| f.matches(object))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[serde(alias = "ascending", alias = "asc", alias = "ASC")]
    Ascending,
    #[default]
    #[serde(alias = "descending", alias = "desc", alias = "DESC")]
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub property_name: String,
    pub direction: SortDirection,
}

/// Body of a search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_groups: Vec<FilterGroup>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<SortSpec>,

    pub limit: u32,

    pub properties: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filter_groups: Vec::new(),
            sorts: Vec::new(),
            limit: 10,
            properties: Vec::new(),
            after: None,
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        if !group.filters.is_empty() {
            self.filter_groups.push(group);
        }
        self
    }

    pub fn sort_by(mut self, property: &str, direction: SortDirection) -> Self {
        self.sorts.push(SortSpec {
            property_name: property.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn properties(mut self, properties: Vec<String>) -> Self {
        self.properties = properties;
        self
    }

    pub fn after(mut self, after: Option<String>) -> Self {
        self.after = after;
        self
    }

    /// OR over the groups; a request without groups matches everything.
    pub fn matches(&self, object: &CrmObject) -> bool {
        self.filter_groups.is_empty() || self.filter_groups.iter().any(|g| g.matches(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::properties::{common, task};
    use serde_json::json;

    fn task_fixture() -> CrmObject {
        CrmObject::new("10", ObjectType::Task)
            .with_property(task::SUBJECT, "Send Q3 pricing proposal")
            .with_property(task::STATUS, "NOT_STARTED")
            .with_property(common::TIMESTAMP, "2024-01-10T09:00:00Z")
            .with_association(ObjectType::Contact, "501")
    }

    #[test]
    fn test_request_wire_shape() {
        let request = SearchRequest::new()
            .with_group(
                FilterGroup::new()
                    .and(SearchFilter::neq(task::STATUS, "COMPLETED"))
                    .and(SearchFilter::is_in(
                        common::OBJECT_ID,
                        vec!["1".to_string(), "2".to_string()],
                    )),
            )
            .with_group(FilterGroup::new())
            .sort_by(common::TIMESTAMP, SortDirection::Ascending)
            .limit(25)
            .properties(vec![task::SUBJECT.to_string()]);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "filterGroups": [{"filters": [
                    {"propertyName": "hs_task_status", "operator": "NEQ", "value": "COMPLETED"},
                    {"propertyName": "hs_object_id", "operator": "IN", "values": ["1", "2"]}
                ]}],
                "sorts": [{"propertyName": "hs_timestamp", "direction": "ASCENDING"}],
                "limit": 25,
                "properties": ["hs_task_subject"]
            })
        );
    }

    #[test]
    fn test_contains_token_operator_name() {
        let filter = SearchFilter::contains_token("hs_meeting_body", "pricing");
        assert_eq!(
            serde_json::to_value(&filter).unwrap()["operator"],
            "CONTAINS_TOKEN"
        );
    }

    #[test]
    fn test_local_matching() {
        let task = task_fixture();

        assert!(SearchFilter::eq(task::STATUS, "NOT_STARTED").matches(&task));
        assert!(!SearchFilter::eq(task::PRIORITY, "HIGH").matches(&task));
        assert!(SearchFilter::neq(task::PRIORITY, "HIGH").matches(&task));
        assert!(SearchFilter::contains_token(task::SUBJECT, "PRICING").matches(&task));
        assert!(SearchFilter::contains_token(task::SUBJECT, "propos*").matches(&task));
        assert!(!SearchFilter::contains_token(task::SUBJECT, "price").matches(&task));
        assert!(SearchFilter::lt(common::TIMESTAMP, "1704931200000").matches(&task)); // 2024-01-11
        assert!(SearchFilter::gte(common::TIMESTAMP, "2024-01-10T09:00:00.000Z").matches(&task));
        assert!(SearchFilter::gt(common::TIMESTAMP, "2024-01-10").matches(&task));
        assert!(!SearchFilter::lte(task::PRIORITY, "2024-01-10").matches(&task));
    }

    #[test]
    fn test_association_filters() {
        let task = task_fixture();
        assert!(SearchFilter::associated_with(ObjectType::Contact, "501").matches(&task));
        assert!(!SearchFilter::associated_with(ObjectType::Contact, "502").matches(&task));
        assert!(!SearchFilter::associated_with(ObjectType::Deal, "501").matches(&task));
        assert_eq!(
            SearchFilter::associated_with(ObjectType::Deal, "9").property_name,
            "associations.deal"
        );
    }

    #[test]
    fn test_groups_are_ored() {
        let task = task_fixture();
        let request = SearchRequest::new()
            .with_group(FilterGroup::new().and(SearchFilter::eq(task::STATUS, "COMPLETED")))
            .with_group(FilterGroup::new().and(SearchFilter::contains_token(task::SUBJECT, "q3")));
        assert!(request.matches(&task));
        assert!(SearchRequest::new().matches(&task));
    }

    #[test]
    fn test_sort_direction_parsing() {
        let dir: SortDirection = serde_json::from_str("\"ASCENDING\"").unwrap();
        assert_eq!(dir, SortDirection::Ascending);
        let dir: SortDirection = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(dir, SortDirection::Descending);
        assert_eq!(SortDirection::default(), SortDirection::Descending);
    }
}
