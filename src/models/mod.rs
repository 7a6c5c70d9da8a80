//! Data models for HubSpot CRM objects.
//!
//! This module contains the object snapshot, the property name tables, the
//! search request model, association links, and result envelopes.

pub mod association;
pub mod object;
pub mod properties;
pub mod results;
pub mod search;

pub use association::{
    AssociationCategory, AssociationLink, AssociationTarget, LinkedRecord, LinkedRecords,
};
pub use object::{CrmObject, ObjectType, Properties, RawObject};
pub use results::{DealObjects, ObjectList, RecordTasks};
pub use search::{FilterGroup, FilterOperator, SearchFilter, SearchRequest, SortDirection, SortSpec};
