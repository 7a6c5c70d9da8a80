//! Resolution of a human-supplied id, email or name to one CRM record.
//!
//! Lookups run in priority order:
//! - id: direct fetch
//! - email: exact match on the type's email property
//! - name: token match on the type's name properties, every page read
//!
//! When several records match, the most recently updated one wins and ties go
//! to the lexicographically smallest id.

use crate::client::{CrmClient, MAX_PAGE_SIZE};
use crate::error::{CrmApiError, CrmResult, OperationContext};
use crate::models::properties::{contact, deal, meeting, task};
use crate::models::{CrmObject, FilterGroup, ObjectType, SearchFilter, SearchRequest};
use std::collections::HashMap;

/// Most pages a name lookup reads before settling on what it has.
pub const MAX_NAME_PAGES: usize = 10;

/// What the caller knows about the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupQuery {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl LookupQuery {
    pub fn new(id: Option<String>, email: Option<String>, name: Option<String>) -> Self {
        Self { id, email, name }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    fn id(&self) -> Option<&str> {
        non_blank(&self.id)
    }

    fn email(&self) -> Option<&str> {
        non_blank(&self.email)
    }

    fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// The type's email property, if it has one.
pub fn email_property(object_type: ObjectType) -> Option<&'static str> {
    match object_type {
        ObjectType::Contact => Some(contact::EMAIL),
        _ => None,
    }
}

/// Search groups for a name lookup, OR-ed by the API.
pub fn name_filter_groups(object_type: ObjectType, name: &str) -> Vec<FilterGroup> {
    let name = name.trim();
    match object_type {
        ObjectType::Contact => {
            let mut groups = vec![
                FilterGroup::new().and(SearchFilter::contains_token(contact::FIRST_NAME, name)),
                FilterGroup::new().and(SearchFilter::contains_token(contact::LAST_NAME, name)),
            ];
            let words: Vec<&str> = name.split_whitespace().collect();
            if let [first, .., last] = words.as_slice() {
                groups.push(
                    FilterGroup::new()
                        .and(SearchFilter::contains_token(contact::FIRST_NAME, *first))
                        .and(SearchFilter::contains_token(contact::LAST_NAME, *last)),
                );
            }
            groups
        }
        ObjectType::Deal => vec![FilterGroup::new().and(SearchFilter::contains_token(deal::NAME, name))],
        ObjectType::Meeting => {
            vec![FilterGroup::new().and(SearchFilter::contains_token(meeting::TITLE, name))]
        }
        ObjectType::Task => {
            vec![FilterGroup::new().and(SearchFilter::contains_token(task::SUBJECT, name))]
        }
        ObjectType::Note => vec![FilterGroup::new().and(SearchFilter::contains_token(
            crate::models::properties::note::BODY,
            name,
        ))],
    }
}

/// Most recently updated candidate; ties go to the smallest id.
pub fn select_most_recent(candidates: impl IntoIterator<Item = CrmObject>) -> Option<CrmObject> {
    candidates.into_iter().max_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then_with(|| b.id.cmp(&a.id))
    })
}

/// Resolves lookups for one object type.
#[derive(Clone)]
pub struct FuzzyMatchResolver {
    client: CrmClient,
    object_type: ObjectType,
}

impl FuzzyMatchResolver {
    pub fn new(client: CrmClient, object_type: ObjectType) -> Self {
        Self {
            client,
            object_type,
        }
    }

    pub async fn resolve(&self, query: &LookupQuery) -> CrmResult<CrmObject> {
        let properties = self.object_type.default_properties();

        if let Some(id) = query.id() {
            tracing::debug!("Resolving {} by id {}", self.object_type, id);
            return self.client.get_object(self.object_type, id, &properties).await;
        }

        if let Some(email) = query.email() {
            return self.resolve_by_email(email, properties).await;
        }

        if let Some(name) = query.name() {
            return self.resolve_by_name(name, properties).await;
        }

        Err(self.not_found("No id, email or name supplied"))
    }

    async fn resolve_by_email(&self, email: &str, properties: Vec<String>) -> CrmResult<CrmObject> {
        let property = email_property(self.object_type).ok_or_else(|| {
            CrmApiError::validation(format!("{} cannot be looked up by email", self.object_type))
                .with_context(self.context())
        })?;

        let request = SearchRequest::new()
            .with_group(FilterGroup::new().and(SearchFilter::eq(property, email)))
            .limit(MAX_PAGE_SIZE)
            .properties(properties);
        let page = self.client.search(self.object_type, request).await?;

        let candidates = dedupe(page.results);
        tracing::debug!("{} candidate(s) for email {}", candidates.len(), email);
        select_most_recent(candidates)
            .ok_or_else(|| self.not_found(&format!("No {} found with email {}", self.object_type.singular(), email)))
    }

    async fn resolve_by_name(&self, name: &str, properties: Vec<String>) -> CrmResult<CrmObject> {
        let mut request = SearchRequest::new()
            .limit(MAX_PAGE_SIZE)
            .properties(properties);
        for group in name_filter_groups(self.object_type, name) {
            request = request.with_group(group);
        }

        let page = self
            .client
            .search_all(self.object_type, request, MAX_NAME_PAGES)
            .await?;

        let candidates = dedupe(page.results);
        tracing::debug!("{} candidate(s) for name '{}'", candidates.len(), name);
        select_most_recent(candidates)
            .ok_or_else(|| self.not_found(&format!("No {} found matching '{}'", self.object_type.singular(), name)))
    }

    fn context(&self) -> OperationContext {
        OperationContext::new("resolve", self.object_type)
    }

    fn not_found(&self, message: &str) -> CrmApiError {
        CrmApiError::not_found(message).with_context(self.context())
    }
}

/// One candidate per id, keeping the most recently updated copy.
fn dedupe(objects: Vec<CrmObject>) -> Vec<CrmObject> {
    let mut by_id: HashMap<String, CrmObject> = HashMap::with_capacity(objects.len());
    for object in objects {
        match by_id.get(&object.id) {
            Some(existing) if existing.updated_at >= object.updated_at => {}
            _ => {
                by_id.insert(object.id.clone(), object);
            }
        }
    }
    by_id.into_values().collect()
}
