//! Fixed table of HubSpot-defined association type ids.

use crate::models::{AssociationCategory, ObjectType};

/// `(from, to, association type id)` for every pair this server links.
pub const ASSOCIATION_TYPES: &[(ObjectType, ObjectType, u32)] = &[
    (ObjectType::Meeting, ObjectType::Contact, 200),
    (ObjectType::Task, ObjectType::Contact, 204),
    (ObjectType::Meeting, ObjectType::Deal, 212),
    (ObjectType::Task, ObjectType::Deal, 216),
];

/// Every registered type is HubSpot-defined.
pub const REGISTRY_CATEGORY: AssociationCategory = AssociationCategory::Predefined;

pub fn association_type_id(from: ObjectType, to: ObjectType) -> Option<u32> {
    ASSOCIATION_TYPES
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, id)| *id)
}
