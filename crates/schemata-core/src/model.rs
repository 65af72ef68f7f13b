//! Model snapshots read from the model store
//!
//! These records are owned by the model-management service. The reconciler
//! only reads them, once per cycle, and never writes them back. Serde names
//! follow the stored document layout.

use serde::{Deserialize, Serialize};

/// An object (model) definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    /// Built-in objects live in fixed tables and are never sharded
    #[serde(rename = "ispre", default)]
    pub is_builtin: bool,
}

impl ObjectRecord {
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            is_builtin: false,
        }
    }

    pub fn builtin(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            is_builtin: true,
        }
    }
}

/// Filter applied when listing objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    /// `Some(flag)` keeps only objects whose built-in flag equals `flag`
    pub builtin: Option<bool>,
}

impl ObjectFilter {
    /// Every object
    pub fn all() -> Self {
        Self { builtin: None }
    }

    /// Only user-defined objects
    pub fn user_defined() -> Self {
        Self {
            builtin: Some(false),
        }
    }

    pub fn matches(&self, object: &ObjectRecord) -> bool {
        self.builtin.is_none_or(|flag| flag == object.is_builtin)
    }
}

/// An attribute of an object, projected to the fields the reconciler needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Numeric attribute id referenced by unique keys
    #[serde(rename = "id")]
    pub id: u64,
    /// Physical field name inside instance documents
    #[serde(rename = "bk_property_id")]
    pub property_id: String,
    #[serde(rename = "bk_property_type")]
    pub property_type: String,
}

impl Attribute {
    pub fn new(id: u64, property_id: impl Into<String>, property_type: impl Into<String>) -> Self {
        Self {
            id,
            property_id: property_id.into(),
            property_type: property_type.into(),
        }
    }
}

/// Kind of a unique-constraint key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniqueKeyKind {
    /// References an [`Attribute`] by id
    Property,
    /// A kind this version does not know how to index
    #[serde(other)]
    Unknown,
}

/// One key of a unique constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueKey {
    #[serde(rename = "key_kind")]
    pub kind: UniqueKeyKind,
    /// Attribute id for [`UniqueKeyKind::Property`]
    #[serde(rename = "key_id")]
    pub id: u64,
}

impl UniqueKey {
    pub fn property(attribute_id: u64) -> Self {
        Self {
            kind: UniqueKeyKind::Property,
            id: attribute_id,
        }
    }
}

/// A uniqueness rule over an ordered set of attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub id: u64,
    #[serde(rename = "bk_obj_id")]
    pub object_id: String,
    pub keys: Vec<UniqueKey>,
}

impl UniqueConstraint {
    pub fn new(id: u64, object_id: impl Into<String>, attribute_ids: &[u64]) -> Self {
        Self {
            id,
            object_id: object_id.into(),
            keys: attribute_ids.iter().copied().map(UniqueKey::property).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_filter() {
        let custom = ObjectRecord::new("switch");
        let host = ObjectRecord::builtin("host");

        assert!(ObjectFilter::all().matches(&custom));
        assert!(ObjectFilter::all().matches(&host));
        assert!(ObjectFilter::user_defined().matches(&custom));
        assert!(!ObjectFilter::user_defined().matches(&host));
    }

    #[test]
    fn test_unique_constraint_document_layout() {
        let json = r#"{
            "id": 3,
            "bk_obj_id": "switch",
            "keys": [
                {"key_kind": "property", "key_id": 11},
                {"key_kind": "association", "key_id": 2}
            ]
        }"#;
        let parsed: UniqueConstraint = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.keys[0], UniqueKey::property(11));
        assert_eq!(parsed.keys[1].kind, UniqueKeyKind::Unknown);
    }

    #[test]
    fn test_object_record_defaults_to_user_defined() {
        let parsed: ObjectRecord = serde_json::from_str(r#"{"bk_obj_id":"router"}"#).unwrap();
        assert!(!parsed.is_builtin);
    }
}
