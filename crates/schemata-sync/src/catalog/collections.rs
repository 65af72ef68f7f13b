//! Shipped index declarations
//!
//! Deprecated entries predate the managed naming convention. They may only
//! be removed, never added to or changed. New and changed indexes must use
//! the managed prefixes.

use schemata_core::{
    IndexDescriptor, ManagedPrefixes, TABLE_HOST_BASE, TABLE_OBJECT_ATTRIBUTES,
    TABLE_OBJECT_DESCRIPTIONS, TABLE_OBJECT_UNIQUES, TABLE_SET_TEMPLATE_SYNC_STATUS,
};

/// Deprecated and current indexes of one table, as declared
pub struct Declaration {
    pub deprecated: Vec<IndexDescriptor>,
    pub current: Vec<IndexDescriptor>,
}

fn logic(prefixes: &ManagedPrefixes, suffix: &str) -> IndexDescriptor {
    IndexDescriptor::new(format!("{}{}", prefixes.logic, suffix))
}

fn legacy(name: &str) -> IndexDescriptor {
    IndexDescriptor::new(name)
}

/// All shipped system tables
pub fn system_tables(prefixes: &ManagedPrefixes) -> Vec<(&'static str, Declaration)> {
    vec![
        (TABLE_OBJECT_DESCRIPTIONS, object_descriptions(prefixes)),
        (TABLE_OBJECT_ATTRIBUTES, object_attributes(prefixes)),
        (TABLE_OBJECT_UNIQUES, object_uniques(prefixes)),
        (TABLE_HOST_BASE, host_base(prefixes)),
        (TABLE_SET_TEMPLATE_SYNC_STATUS, set_template_sync_status()),
    ]
}

fn object_descriptions(prefixes: &ManagedPrefixes) -> Declaration {
    Declaration {
        deprecated: vec![
            legacy("bk_obj_id_1").asc("bk_obj_id"),
            legacy("bk_supplier_account_1").asc("bk_supplier_account"),
        ],
        current: vec![
            logic(prefixes, "ObjId").asc("bk_obj_id").unique(),
            logic(prefixes, "ObjName").asc("bk_obj_name"),
            logic(prefixes, "ClassificationID").asc("bk_classification_id"),
        ],
    }
}

fn object_attributes(prefixes: &ManagedPrefixes) -> Declaration {
    Declaration {
        deprecated: vec![
            legacy("bk_obj_id_1_bk_property_id_1")
                .asc("bk_obj_id")
                .asc("bk_property_id"),
        ],
        current: vec![
            logic(prefixes, "ObjId_PropertyId")
                .asc("bk_obj_id")
                .asc("bk_property_id")
                .unique(),
            logic(prefixes, "PropertyGroup").asc("bk_property_group"),
        ],
    }
}

fn object_uniques(prefixes: &ManagedPrefixes) -> Declaration {
    Declaration {
        deprecated: vec![],
        current: vec![logic(prefixes, "ObjId").asc("bk_obj_id")],
    }
}

fn host_base(prefixes: &ManagedPrefixes) -> Declaration {
    Declaration {
        deprecated: vec![
            legacy("bk_host_id_1").asc("bk_host_id"),
            legacy("bk_host_innerip_1").asc("bk_host_innerip"),
            legacy("bk_cloud_id_1").asc("bk_cloud_id"),
        ],
        current: vec![
            logic(prefixes, "HostID").asc("bk_host_id").unique(),
            logic(prefixes, "InnerIP").asc("bk_host_innerip"),
            logic(prefixes, "OuterIP").asc("bk_host_outerip"),
            logic(prefixes, "CloudID").asc("bk_cloud_id"),
            logic(prefixes, "LastTime").desc("last_time"),
        ],
    }
}

// Only legacy indexes remain on this table
fn set_template_sync_status() -> Declaration {
    Declaration {
        deprecated: vec![
            legacy("idx_taskID").asc("task_id"),
            legacy("idx_setID").asc("bk_set_id").unique(),
            legacy("idx_createLastTime").asc("last_time").asc("create_time"),
            legacy("idx_status").asc("status"),
        ],
        current: vec![],
    }
}

/// Indexes of every `cc_ObjectBase_{id}` table, before per-object uniques
pub fn instance_family(prefixes: &ManagedPrefixes) -> Declaration {
    Declaration {
        deprecated: vec![],
        current: vec![
            logic(prefixes, "ObjId").asc("bk_obj_id"),
            logic(prefixes, "supplierAccount").asc("bk_supplier_account"),
            logic(prefixes, "InstId").asc("bk_inst_id").unique(),
            logic(prefixes, "InstName").asc("bk_inst_name"),
        ],
    }
}

/// Indexes of every `cc_InstAsst_{id}` table
pub fn association_family(prefixes: &ManagedPrefixes) -> Declaration {
    Declaration {
        deprecated: vec![],
        current: vec![
            logic(prefixes, "ID").asc("id").unique(),
            logic(prefixes, "ObjID_InstID").asc("bk_obj_id").asc("bk_inst_id"),
            logic(prefixes, "AsstObjID_AsstInstID")
                .asc("bk_asst_obj_id")
                .asc("bk_asst_inst_id"),
            logic(prefixes, "ObjAsstID").asc("bk_obj_asst_id"),
        ],
    }
}
