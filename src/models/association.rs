//! Association links between CRM objects.

use crate::models::ObjectType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Who defined the association type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssociationCategory {
    #[serde(rename = "HUBSPOT_DEFINED")]
    Predefined,
    #[serde(rename = "USER_DEFINED")]
    UserDefined,
}

/// A directed relationship between two records.
///
/// `from_id` is empty for links embedded in a create payload, where the source
/// record does not exist yet. Serializes to the API's association input form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "AssociationInput")]
pub struct AssociationLink {
    pub from_type: ObjectType,
    pub from_id: Option<String>,
    pub to_type: ObjectType,
    pub to_id: String,
    pub association_type_id: u32,
    pub category: AssociationCategory,
}

/// `{"to": {"id": ..}, "types": [{"associationCategory": .., "associationTypeId": ..}]}`
#[derive(Debug, Serialize)]
struct AssociationInput {
    to: RecordRef,
    types: Vec<AssociationSpec>,
}

#[derive(Debug, Serialize)]
struct RecordRef {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssociationSpec {
    association_category: AssociationCategory,
    association_type_id: u32,
}

impl From<AssociationLink> for AssociationInput {
    fn from(link: AssociationLink) -> Self {
        Self {
            to: RecordRef { id: link.to_id },
            types: vec![AssociationSpec {
                association_category: link.category,
                association_type_id: link.association_type_id,
            }],
        }
    }
}

/// A record to link a new object to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct AssociationTarget {
    pub to_type: ObjectType,
    pub to_id: String,
}

impl AssociationTarget {
    pub fn new(to_type: ObjectType, to_id: impl Into<String>) -> Self {
        Self {
            to_type,
            to_id: to_id.into(),
        }
    }
}

/// Display summary of a linked deal or contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Deals and contacts linked to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkedRecords {
    pub deals: Vec<LinkedRecord>,
    pub contacts: Vec<LinkedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_wire_form() {
        let link = AssociationLink {
            from_type: ObjectType::Task,
            from_id: None,
            to_type: ObjectType::Deal,
            to_id: "9001".to_string(),
            association_type_id: 216,
            category: AssociationCategory::Predefined,
        };

        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            json!({
                "to": {"id": "9001"},
                "types": [{"associationCategory": "HUBSPOT_DEFINED", "associationTypeId": 216}]
            })
        );
    }

    #[test]
    fn test_link_list_omits_source_fields() {
        let links = vec![AssociationLink {
            from_type: ObjectType::Meeting,
            from_id: Some("77".to_string()),
            to_type: ObjectType::Contact,
            to_id: "501".to_string(),
            association_type_id: 200,
            category: AssociationCategory::UserDefined,
        }];

        assert_eq!(
            serde_json::to_value(&links).unwrap(),
            json!([{
                "to": {"id": "501"},
                "types": [{"associationCategory": "USER_DEFINED", "associationTypeId": 200}]
            }])
        );
    }

    #[test]
    fn test_user_defined_category() {
        assert_eq!(
            serde_json::to_value(AssociationCategory::UserDefined).unwrap(),
            json!("USER_DEFINED")
        );
    }
}
