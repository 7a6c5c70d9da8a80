//! Task service layer.
//!
//! Task creation, updates and listings. Every listing is annotated with
//! overdue fields; the overdue listing is also enriched with the names of
//! linked deals and contacts.

use crate::associations::AssociationResolver;
use crate::client::CrmClient;
use crate::domain::{AnnotatedTask, DateConverter, OverdueCalculator, TaskStatus};
use crate::error::{CrmApiError, CrmResult, OperationContext};
use crate::matching::{FuzzyMatchResolver, LookupQuery};
use crate::models::properties::{common, contact, deal, task};
use crate::models::{
    AssociationTarget, CrmObject, FilterGroup, LinkedRecord, LinkedRecords, ObjectList,
    ObjectType, RecordTasks, SearchFilter, SearchRequest, SortDirection,
};
use crate::services::{default_limit, require_non_blank, system_clock, Clock};
use async_trait::async_trait;
use futures::future::try_join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_api_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CreateTaskParams {
    pub title: String,
    /// HubSpot owner id the task is assigned to
    pub assigned_to_user_id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Due date, ISO-8601
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub deal_id: Option<String>,
    /// CALL, EMAIL or TODO
    #[serde(default)]
    pub task_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTasksParams {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub deal_id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Earliest due date, ISO-8601
    #[serde(default)]
    pub due_date_start: Option<String>,
    /// Latest due date, ISO-8601
    #[serde(default)]
    pub due_date_end: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for GetTasksParams {
    fn default() -> Self {
        Self {
            owner_id: None,
            contact_id: None,
            deal_id: None,
            status: None,
            due_date_start: None,
            due_date_end: None,
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct UpdateTaskParams {
    pub task_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to_user_id: Option<String>,
    /// Due date, ISO-8601
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CompleteTaskParams {
    pub task_id: String,
    /// Replaces the task body
    #[serde(default)]
    pub completion_notes: Option<String>,
    /// Additional properties to set alongside completion
    #[serde(default)]
    pub update_properties: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct OverdueTasksParams {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DealTasksParams {
    #[serde(default)]
    pub deal_id: Option<String>,
    /// Used when no id is given; the most recently updated match wins
    #[serde(default)]
    pub deal_name: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ContactTasksParams {
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Used when neither id nor email is given
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[async_trait]
pub trait TaskService: Send + Sync {
    async fn create_task(&self, params: CreateTaskParams) -> CrmResult<CrmObject>;

    async fn get_tasks(&self, params: GetTasksParams) -> CrmResult<ObjectList<AnnotatedTask>>;

    async fn get_task_details(
        &self,
        task_id: &str,
        properties: Option<Vec<String>>,
    ) -> CrmResult<AnnotatedTask>;

    async fn update_task(&self, params: UpdateTaskParams) -> CrmResult<CrmObject>;

    async fn complete_task(&self, params: CompleteTaskParams) -> CrmResult<CrmObject>;

    async fn get_overdue_tasks(
        &self,
        params: OverdueTasksParams,
    ) -> CrmResult<ObjectList<AnnotatedTask>>;

    async fn get_tasks_for_deal(
        &self,
        params: DealTasksParams,
    ) -> CrmResult<RecordTasks<AnnotatedTask>>;

    async fn get_tasks_for_contact(
        &self,
        params: ContactTasksParams,
    ) -> CrmResult<RecordTasks<AnnotatedTask>>;
}

pub struct TaskServiceImpl {
    client: CrmClient,
    associations: AssociationResolver,
    deals: FuzzyMatchResolver,
    contacts: FuzzyMatchResolver,
    clock: Clock,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn unique_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.to_string()))
        .cloned()
        .collect()
}

fn contact_display_name(record: &CrmObject) -> String {
    let name = [record.property(contact::FIRST_NAME), record.property(contact::LAST_NAME)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if name.trim().is_empty() {
        record
            .property(contact::EMAIL)
            .unwrap_or(record.id.as_str())
            .to_string()
    } else {
        name
    }
}

impl TaskServiceImpl {
    pub fn new(client: CrmClient) -> Self {
        Self {
            associations: AssociationResolver::new(client.clone()),
            deals: FuzzyMatchResolver::new(client.clone(), ObjectType::Deal),
            contacts: FuzzyMatchResolver::new(client.clone(), ObjectType::Contact),
            client,
            clock: system_clock,
        }
    }

    /// Replace the clock used for overdue evaluation.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn due_date_ms(value: &str, context: &OperationContext) -> CrmResult<String> {
        DateConverter::to_remote_units(value)
            .map(|ms| ms.to_string())
            .map_err(|e| e.with_context(context.clone()))
    }

    /// Search tasks ordered by due date and annotate them.
    async fn search_tasks(
        &self,
        group: FilterGroup,
        limit: u32,
    ) -> CrmResult<ObjectList<AnnotatedTask>> {
        let request = SearchRequest::new()
            .with_group(group)
            .sort_by(common::TIMESTAMP, SortDirection::Ascending)
            .limit(limit)
            .properties(ObjectType::Task.default_properties());

        let page = self.client.search(ObjectType::Task, request).await?;
        let tasks = OverdueCalculator::annotate_all(page.results, (self.clock)());
        Ok(ObjectList::new(tasks)
            .with_total(page.total)
            .with_warnings(page.warnings))
    }

    /// Tasks associated with a record, open ones only unless asked otherwise.
    async fn tasks_for_record(
        &self,
        record: CrmObject,
        include_completed: bool,
        limit: u32,
    ) -> CrmResult<RecordTasks<AnnotatedTask>> {
        let mut group = FilterGroup::new()
            .and(SearchFilter::associated_with(record.object_type, record.id.as_str()));
        if !include_completed {
            group = group.and(SearchFilter::neq(task::STATUS, TaskStatus::Completed.as_api_str()));
        }

        let list = self.search_tasks(group, limit).await?;
        tracing::info!(
            "Found {} task(s) for {} {}",
            list.results.len(),
            record.object_type.singular(),
            record.id
        );
        Ok(RecordTasks { record, list })
    }

    /// Attach linked deal names and contact names/emails to each task.
    async fn attach_linked_records(&self, tasks: &mut [AnnotatedTask]) -> CrmResult<()> {
        let lookups = tasks.iter().map(|annotated| {
            let task_id = annotated.task.id.clone();
            async move {
                futures::try_join!(
                    self.associations
                        .list_associated(ObjectType::Task, &task_id, ObjectType::Deal),
                    self.associations
                        .list_associated(ObjectType::Task, &task_id, ObjectType::Contact),
                )
            }
        });
        let links: Vec<(Vec<String>, Vec<String>)> = try_join_all(lookups).await?;

        let deal_ids = unique_ids(links.iter().flat_map(|(deals, _)| deals.iter()));
        let contact_ids = unique_ids(links.iter().flat_map(|(_, contacts)| contacts.iter()));
        let deal_properties = vec![deal::NAME.to_string()];
        let contact_properties = vec![
            contact::FIRST_NAME.to_string(),
            contact::LAST_NAME.to_string(),
            contact::EMAIL.to_string(),
        ];

        let (deals, contacts) = futures::try_join!(
            self.associations
                .batch_read_associated(ObjectType::Deal, &deal_ids, &deal_properties),
            self.associations.batch_read_associated(
                ObjectType::Contact,
                &contact_ids,
                &contact_properties
            ),
        )?;

        let deals: HashMap<String, LinkedRecord> = deals
            .into_iter()
            .map(|d| {
                let record = LinkedRecord {
                    id: d.id.clone(),
                    name: d.property(deal::NAME).unwrap_or_default().to_string(),
                    email: None,
                };
                (d.id, record)
            })
            .collect();
        let contacts: HashMap<String, LinkedRecord> = contacts
            .into_iter()
            .map(|c| {
                let record = LinkedRecord {
                    id: c.id.clone(),
                    name: contact_display_name(&c),
                    email: c.property(contact::EMAIL).map(str::to_string),
                };
                (c.id, record)
            })
            .collect();

        for (annotated, (deal_ids, contact_ids)) in tasks.iter_mut().zip(links) {
            annotated.linked = Some(LinkedRecords {
                deals: deal_ids.iter().filter_map(|id| deals.get(id).cloned()).collect(),
                contacts: contact_ids
                    .iter()
                    .filter_map(|id| contacts.get(id).cloned())
                    .collect(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskService for TaskServiceImpl {
    async fn create_task(&self, params: CreateTaskParams) -> CrmResult<CrmObject> {
        let context = OperationContext::new("create", ObjectType::Task);
        require_non_blank(&params.title, "Task title", &context)?;
        require_non_blank(&params.assigned_to_user_id, "Assignee", &context)?;

        let mut properties = BTreeMap::new();
        properties.insert(task::SUBJECT.to_string(), params.title.trim().to_string());
        properties.insert(
            task::STATUS.to_string(),
            TaskStatus::NotStarted.as_api_str().to_string(),
        );
        properties.insert(
            common::OWNER_ID.to_string(),
            params.assigned_to_user_id.trim().to_string(),
        );
        if let Some(description) = non_blank(&params.description) {
            properties.insert(task::BODY.to_string(), description.to_string());
        }
        if let Some(priority) = params.priority {
            properties.insert(task::PRIORITY.to_string(), priority.as_api_str().to_string());
        }
        if let Some(task_type) = non_blank(&params.task_type) {
            properties.insert(task::TYPE.to_string(), task_type.to_uppercase());
        }
        if let Some(due_date) = non_blank(&params.due_date) {
            properties.insert(
                common::TIMESTAMP.to_string(),
                Self::due_date_ms(due_date, &context)?,
            );
        }

        let mut targets = Vec::new();
        if let Some(contact_id) = non_blank(&params.contact_id) {
            targets.push(AssociationTarget::new(ObjectType::Contact, contact_id));
        }
        if let Some(deal_id) = non_blank(&params.deal_id) {
            targets.push(AssociationTarget::new(ObjectType::Deal, deal_id));
        }

        tracing::info!(
            "Creating task '{}' for owner {}",
            params.title.trim(),
            params.assigned_to_user_id.trim()
        );
        self.client
            .create_object(ObjectType::Task, properties, &targets)
            .await
    }

    async fn get_tasks(&self, params: GetTasksParams) -> CrmResult<ObjectList<AnnotatedTask>> {
        let context = OperationContext::new("get", ObjectType::Task);
        let mut group = FilterGroup::new();

        if let Some(owner_id) = non_blank(&params.owner_id) {
            group = group.and(SearchFilter::eq(common::OWNER_ID, owner_id));
        }
        if let Some(status) = params.status {
            group = group.and(SearchFilter::eq(task::STATUS, status.as_api_str()));
        }

        let start = non_blank(&params.due_date_start)
            .map(|d| DateConverter::to_remote_units(d).map_err(|e| e.with_context(context.clone())))
            .transpose()?;
        let end = non_blank(&params.due_date_end)
            .map(|d| DateConverter::to_remote_units(d).map_err(|e| e.with_context(context.clone())))
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(CrmApiError::validation("due_date_start is after due_date_end")
                    .with_context(context));
            }
        }
        if let Some(start) = start {
            group = group.and(SearchFilter::gte(common::TIMESTAMP, start.to_string()));
        }
        if let Some(end) = end {
            group = group.and(SearchFilter::lte(common::TIMESTAMP, end.to_string()));
        }

        if let Some(contact_id) = non_blank(&params.contact_id) {
            group = group.and(SearchFilter::associated_with(ObjectType::Contact, contact_id));
        }
        if let Some(deal_id) = non_blank(&params.deal_id) {
            group = group.and(SearchFilter::associated_with(ObjectType::Deal, deal_id));
        }

        let list = self.search_tasks(group, params.limit).await?;
        tracing::info!("Found {} task(s)", list.results.len());
        Ok(list)
    }

    async fn get_task_details(
        &self,
        task_id: &str,
        properties: Option<Vec<String>>,
    ) -> CrmResult<AnnotatedTask> {
        let properties = properties
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ObjectType::Task.default_properties());
        let task = self
            .client
            .get_object(ObjectType::Task, task_id, &properties)
            .await?;
        Ok(OverdueCalculator::annotate(task, (self.clock)()))
    }

    async fn update_task(&self, params: UpdateTaskParams) -> CrmResult<CrmObject> {
        let context = OperationContext::new("update", ObjectType::Task).with_id(params.task_id.as_str());
        require_non_blank(&params.task_id, "Task id", &context)?;

        let mut properties = BTreeMap::new();
        if let Some(title) = non_blank(&params.title) {
            properties.insert(task::SUBJECT.to_string(), title.to_string());
        }
        if let Some(description) = &params.description {
            properties.insert(task::BODY.to_string(), description.clone());
        }
        if let Some(status) = params.status {
            properties.insert(task::STATUS.to_string(), status.as_api_str().to_string());
        }
        if let Some(priority) = params.priority {
            properties.insert(task::PRIORITY.to_string(), priority.as_api_str().to_string());
        }
        if let Some(owner) = non_blank(&params.assigned_to_user_id) {
            properties.insert(common::OWNER_ID.to_string(), owner.to_string());
        }
        if let Some(task_type) = non_blank(&params.task_type) {
            properties.insert(task::TYPE.to_string(), task_type.to_uppercase());
        }
        if let Some(due_date) = non_blank(&params.due_date) {
            properties.insert(
                common::TIMESTAMP.to_string(),
                Self::due_date_ms(due_date, &context)?,
            );
        }

        if properties.is_empty() {
            return Err(CrmApiError::validation("No fields provided to update").with_context(context));
        }

        self.client
            .update_object(ObjectType::Task, params.task_id.trim(), properties)
            .await
    }

    async fn complete_task(&self, params: CompleteTaskParams) -> CrmResult<CrmObject> {
        let context =
            OperationContext::new("complete", ObjectType::Task).with_id(params.task_id.as_str());
        require_non_blank(&params.task_id, "Task id", &context)?;

        let mut properties = params.update_properties.unwrap_or_default();
        if let Some(status) = properties.get(task::STATUS) {
            if status != TaskStatus::Completed.as_api_str() {
                tracing::warn!("Ignoring status '{}' while completing task", status);
            }
        }
        properties.insert(
            task::STATUS.to_string(),
            TaskStatus::Completed.as_api_str().to_string(),
        );
        if let Some(notes) = non_blank(&params.completion_notes) {
            properties.insert(task::BODY.to_string(), notes.to_string());
        }

        tracing::info!("Completing task {}", params.task_id.trim());
        self.client
            .update_object(ObjectType::Task, params.task_id.trim(), properties)
            .await
    }

    async fn get_overdue_tasks(
        &self,
        params: OverdueTasksParams,
    ) -> CrmResult<ObjectList<AnnotatedTask>> {
        let now = (self.clock)();
        let mut group = OverdueCalculator::server_filter(now);
        if let Some(owner_id) = non_blank(&params.owner_id) {
            group = group.and(SearchFilter::eq(common::OWNER_ID, owner_id));
        }

        let request = SearchRequest::new()
            .with_group(group)
            .sort_by(common::TIMESTAMP, SortDirection::Ascending)
            .limit(params.limit)
            .properties(ObjectType::Task.default_properties());
        let page = self.client.search(ObjectType::Task, request).await?;

        let mut tasks: Vec<AnnotatedTask> = OverdueCalculator::annotate_all(page.results, now)
            .into_iter()
            .filter(|t| t.overdue.is_overdue)
            .collect();
        self.attach_linked_records(&mut tasks).await?;

        tracing::info!("Found {} overdue task(s)", tasks.len());
        Ok(ObjectList::new(tasks)
            .with_total(page.total)
            .with_warnings(page.warnings))
    }

    async fn get_tasks_for_deal(
        &self,
        params: DealTasksParams,
    ) -> CrmResult<RecordTasks<AnnotatedTask>> {
        let query = LookupQuery::new(params.deal_id, None, params.deal_name);
        let deal = self.deals.resolve(&query).await?;
        self.tasks_for_record(deal, params.include_completed, params.limit)
            .await
    }

    async fn get_tasks_for_contact(
        &self,
        params: ContactTasksParams,
    ) -> CrmResult<RecordTasks<AnnotatedTask>> {
        let query = LookupQuery::new(params.contact_id, params.email, params.name);
        let contact = self.contacts.resolve(&query).await?;
        self.tasks_for_record(contact, params.include_completed, params.limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_wire_values() {
        assert_eq!(TaskPriority::High.as_api_str(), "HIGH");
        let parsed: TaskPriority = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(parsed, TaskPriority::Low);
    }

    #[test]
    fn test_contact_display_name() {
        let full = CrmObject::new("1", ObjectType::Contact)
            .with_property(contact::FIRST_NAME, "Jane")
            .with_property(contact::LAST_NAME, "Doe");
        assert_eq!(contact_display_name(&full), "Jane Doe");

        let email_only =
            CrmObject::new("2", ObjectType::Contact).with_property(contact::EMAIL, "j@acme.io");
        assert_eq!(contact_display_name(&email_only), "j@acme.io");
        assert_eq!(contact_display_name(&CrmObject::new("3", ObjectType::Contact)), "3");
    }

    #[test]
    fn test_unique_ids_keeps_first_occurrence() {
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(unique_ids(ids.iter()), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_params_defaults() {
        let params: GetTasksParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit, 100);
        let params: DealTasksParams = serde_json::from_str(r#"{"deal_name": "Acme"}"#).unwrap();
        assert!(!params.include_completed);
        let params: GetTasksParams = serde_json::from_str(r#"{"status": "IN_PROGRESS"}"#).unwrap();
        assert_eq!(params.status, Some(TaskStatus::InProgress));
    }
}
