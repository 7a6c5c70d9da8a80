use crate::associations::registry::{association_type_id, REGISTRY_CATEGORY};
use crate::client::CrmClient;
use crate::error::{CrmApiError, CrmResult};
use crate::models::{AssociationLink, AssociationTarget, CrmObject, ObjectType};
use std::collections::HashSet;

/// Builds association payloads and reads association data.
#[derive(Clone)]
pub struct AssociationResolver {
    client: CrmClient,
}

impl AssociationResolver {
    pub fn new(client: CrmClient) -> Self {
        Self { client }
    }

    /// Link for embedding in a create request. Fails for pairs outside the registry.
    pub fn build_association_payload(
        from_type: ObjectType,
        to_type: ObjectType,
        to_id: &str,
    ) -> CrmResult<AssociationLink> {
        let association_type_id = association_type_id(from_type, to_type)
            .ok_or_else(|| CrmApiError::unregistered_pair(from_type, to_type))?;

        if to_id.trim().is_empty() {
            return Err(CrmApiError::validation(format!(
                "Association target id for {} cannot be empty",
                to_type
            )));
        }

        Ok(AssociationLink {
            from_type,
            from_id: None,
            to_type,
            to_id: to_id.trim().to_string(),
            association_type_id,
            category: REGISTRY_CATEGORY,
        })
    }

    /// All links for a create request, or the first failure.
    pub fn build_payloads(
        from_type: ObjectType,
        targets: &[AssociationTarget],
    ) -> CrmResult<Vec<AssociationLink>> {
        targets
            .iter()
            .map(|t| Self::build_association_payload(from_type, t.to_type, &t.to_id))
            .collect()
    }

    /// Ids of `target` records associated with an object, across all pages,
    /// de-duplicated in first-seen order.
    pub async fn list_associated(
        &self,
        object_type: ObjectType,
        object_id: &str,
        target: ObjectType,
    ) -> CrmResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut after: Option<String> = None;
        let mut cursors = HashSet::new();

        loop {
            let page = self
                .client
                .list_association_page(object_type, object_id, target, after.as_deref())
                .await?;

            for id in page.ids {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }

            match page.next_after {
                Some(next) if cursors.insert(next.clone()) => after = Some(next),
                Some(next) => {
                    tracing::warn!("Association paging cursor {} repeated; stopping", next);
                    break;
                }
                None => break,
            }
        }

        tracing::debug!(
            "{} {} has {} associated {}",
            object_type.singular(),
            object_id,
            ids.len(),
            target
        );
        Ok(ids)
    }

    /// Read the linked records themselves.
    pub async fn batch_read_associated(
        &self,
        target: ObjectType,
        ids: &[String],
        properties: &[String],
    ) -> CrmResult<Vec<CrmObject>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.client.batch_read(target, ids, properties).await
    }
}
