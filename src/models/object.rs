//! CRM object model: object types, the typed property bag, and object snapshots.

use crate::domain::dates::parse_remote_timestamp;
use crate::models::properties;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The HubSpot object types this server works with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Meeting,
    Task,
    Note,
    Deal,
    Contact,
}

impl ObjectType {
    /// Path segment used by the v3 objects API ("meetings", "tasks", ...).
    pub fn plural(self) -> &'static str {
        match self {
            ObjectType::Meeting => "meetings",
            ObjectType::Task => "tasks",
            ObjectType::Note => "notes",
            ObjectType::Deal => "deals",
            ObjectType::Contact => "contacts",
        }
    }

    /// Path segment used by the v4 associations API ("meeting", "task", ...).
    pub fn singular(self) -> &'static str {
        match self {
            ObjectType::Meeting => "meeting",
            ObjectType::Task => "task",
            ObjectType::Note => "note",
            ObjectType::Deal => "deal",
            ObjectType::Contact => "contact",
        }
    }

    /// Parse either API spelling of an object type.
    pub fn from_api_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "meeting" | "meetings" => Some(ObjectType::Meeting),
            "task" | "tasks" => Some(ObjectType::Task),
            "note" | "notes" => Some(ObjectType::Note),
            "deal" | "deals" => Some(ObjectType::Deal),
            "contact" | "contacts" => Some(ObjectType::Contact),
            _ => None,
        }
    }

    /// Property keys this type declares; anything else lands in the extra bag.
    pub fn known_properties(self) -> &'static [&'static str] {
        match self {
            ObjectType::Meeting => properties::meeting::KNOWN,
            ObjectType::Task => properties::task::KNOWN,
            ObjectType::Note => properties::note::KNOWN,
            ObjectType::Deal => properties::deal::KNOWN,
            ObjectType::Contact => properties::contact::KNOWN,
        }
    }

    /// Known property keys as owned strings, suitable for a request's property list.
    pub fn default_properties(self) -> Vec<String> {
        self.known_properties()
            .iter()
            .map(|p| p.to_string())
            .collect()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Property values for one object.
///
/// Keys declared by the object type are kept apart from unrecognised keys, but
/// both are reachable through [`Properties::get`]. A missing key and a null
/// value read the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    object_type: ObjectType,
    known: BTreeMap<String, Option<String>>,
    extra: BTreeMap<String, Option<String>>,
}

impl Properties {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            known: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        if self.object_type.known_properties().contains(&key.as_str()) {
            self.known.insert(key, value);
        } else {
            self.extra.insert(key, value);
        }
    }

    /// Value of a property, `None` when absent or null.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.known
            .get(key)
            .or_else(|| self.extra.get(key))
            .and_then(|v| v.as_deref())
    }

    /// Properties the object type declares.
    pub fn known(&self) -> &BTreeMap<String, Option<String>> {
        &self.known
    }

    /// Properties outside the declared set.
    pub fn extra(&self) -> &BTreeMap<String, Option<String>> {
        &self.extra
    }

    pub fn len(&self) -> usize {
        self.known.len() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Properties {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.known.iter().chain(self.extra.iter()) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// An immutable snapshot of one CRM record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmObject {
    pub id: String,

    #[serde(rename = "type")]
    pub object_type: ObjectType,

    pub properties: Properties,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Associated record ids keyed by target type, in API order
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub associations: BTreeMap<ObjectType, Vec<String>>,
}

impl CrmObject {
    /// Create an empty snapshot with epoch timestamps.
    pub fn new(id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id: id.into(),
            object_type,
            properties: Properties::new(object_type),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            associations: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key, Some(value.into()));
        self
    }

    pub fn with_null_property(mut self, key: &str) -> Self {
        self.properties.insert(key, None);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_association(mut self, target: ObjectType, id: impl Into<String>) -> Self {
        self.associations.entry(target).or_default().push(id.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    /// Parse a property holding epoch milliseconds or an ISO-8601 string.
    pub fn timestamp_property(&self, key: &str) -> Option<DateTime<Utc>> {
        self.property(key).and_then(parse_remote_timestamp)
    }

    pub fn associated_ids(&self, target: ObjectType) -> &[String] {
        self.associations
            .get(&target)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Convert a wire record into a snapshot of the given type.
    pub fn from_raw(object_type: ObjectType, raw: RawObject) -> Self {
        let mut properties = Properties::new(object_type);
        for (key, value) in raw.properties {
            properties.insert(key, value.as_ref().and_then(json_scalar_to_string));
        }

        let mut associations: BTreeMap<ObjectType, Vec<String>> = BTreeMap::new();
        for (key, list) in raw.associations {
            let Some(target) = ObjectType::from_api_name(&key) else {
                continue;
            };
            let ids = associations.entry(target).or_default();
            for entry in list.results {
                if let Some(id) = json_scalar_to_string(&entry.id) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }

        let created_at = raw
            .created_at
            .as_deref()
            .and_then(parse_remote_timestamp)
            .unwrap_or_default();
        let updated_at = raw
            .updated_at
            .as_deref()
            .and_then(parse_remote_timestamp)
            .unwrap_or(created_at);

        Self {
            id: raw.id,
            object_type,
            properties,
            created_at,
            updated_at,
            associations,
        }
    }
}

/// A record as returned by the v3 objects API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObject {
    pub id: String,

    #[serde(default)]
    pub properties: HashMap<String, Option<serde_json::Value>>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub associations: HashMap<String, RawAssociationList>,
}

/// Embedded association block (`"associations": {"contacts": {"results": [...]}}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssociationList {
    #[serde(default)]
    pub results: Vec<RawAssociationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAssociationRef {
    pub id: serde_json::Value,
}

/// Render a JSON scalar the way HubSpot's string-typed properties would.
pub(crate) fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
