//! Physical table naming
//!
//! Sharded table names are derived from the object id so that any replica
//! can compute them without a lookup.

use std::fmt;

/// Prefix of per-object instance tables
pub const INSTANCE_TABLE_PREFIX: &str = "cc_ObjectBase_";

/// Prefix of per-object association tables
pub const ASSOCIATION_TABLE_PREFIX: &str = "cc_InstAsst_";

// System tables
pub const TABLE_OBJECT_DESCRIPTIONS: &str = "cc_ObjDes";
pub const TABLE_OBJECT_ATTRIBUTES: &str = "cc_ObjAttDes";
pub const TABLE_OBJECT_UNIQUES: &str = "cc_ObjectUnique";
pub const TABLE_HOST_BASE: &str = "cc_HostBase";
pub const TABLE_SET_TEMPLATE_SYNC_STATUS: &str = "cc_SetTemplateSyncStatus";

/// Role of a physical table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Instance table owned by the object
    Instance(String),
    /// Association table owned by the object
    Association(String),
    /// Any other table
    System,
}

impl TableKind {
    /// Classify a table by name
    pub fn classify(name: &str) -> Self {
        if let Some(object_id) = name.strip_prefix(INSTANCE_TABLE_PREFIX)
            && !object_id.is_empty()
        {
            return Self::Instance(object_id.to_string());
        }
        if let Some(object_id) = name.strip_prefix(ASSOCIATION_TABLE_PREFIX)
            && !object_id.is_empty()
        {
            return Self::Association(object_id.to_string());
        }
        Self::System
    }

    /// Owning object id for sharded tables
    pub fn object_id(&self) -> Option<&str> {
        match self {
            Self::Instance(id) | Self::Association(id) => Some(id),
            Self::System => None,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(id) => write!(f, "instance({id})"),
            Self::Association(id) => write!(f, "association({id})"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Instance table name of an object
pub fn instance_table_name(object_id: &str) -> String {
    format!("{INSTANCE_TABLE_PREFIX}{object_id}")
}

/// Association table name of an object
pub fn association_table_name(object_id: &str) -> String {
    format!("{ASSOCIATION_TABLE_PREFIX}{object_id}")
}

/// True if `name` is a per-object instance or association table
pub fn is_sharding_table(name: &str) -> bool {
    TableKind::classify(name) != TableKind::System
}
