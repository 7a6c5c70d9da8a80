//! Note service layer.
//!
//! Business logic for note retrieval.

use crate::associations::AssociationResolver;
use crate::client::CrmClient;
use crate::domain::SortFallback;
use crate::error::{CrmResult, OperationContext};
use crate::models::properties::common;
use crate::models::{CrmObject, DealObjects, ObjectList, ObjectType, SortDirection};
use crate::services::{default_limit, require_non_blank, search_by_ids};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DealNotesParams {
    pub deal_id: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

/// Note service trait for business operations.
#[async_trait]
pub trait NoteService: Send + Sync {
    /// Notes attached to a deal, ordered by `hs_timestamp`.
    async fn get_deal_notes(&self, params: DealNotesParams) -> CrmResult<DealObjects<CrmObject>>;
}

/// Default implementation of NoteService.
pub struct NoteServiceImpl {
    client: CrmClient,
    associations: AssociationResolver,
}

impl NoteServiceImpl {
    pub fn new(client: CrmClient) -> Self {
        Self {
            associations: AssociationResolver::new(client.clone()),
            client,
        }
    }
}

#[async_trait]
impl NoteService for NoteServiceImpl {
    async fn get_deal_notes(&self, params: DealNotesParams) -> CrmResult<DealObjects<CrmObject>> {
        let context = OperationContext::new("get deal notes", ObjectType::Deal);
        require_non_blank(&params.deal_id, "Deal id", &context)?;
        let deal_id = params.deal_id.trim();

        let note_ids = self
            .associations
            .list_associated(ObjectType::Deal, deal_id, ObjectType::Note)
            .await?;

        let mut notes = search_by_ids(
            &self.client,
            ObjectType::Note,
            &note_ids,
            &[],
            ObjectType::Note.default_properties(),
        )
        .await?;

        SortFallback::sort_by_timestamp_property(&mut notes, common::TIMESTAMP, params.sort_direction);
        notes.truncate(params.limit as usize);

        tracing::info!("Found {} note(s) for deal {}", notes.len(), deal_id);
        Ok(DealObjects {
            deal_id: deal_id.to_string(),
            list: ObjectList::new(notes),
        })
    }
}
