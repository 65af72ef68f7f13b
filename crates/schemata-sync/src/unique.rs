//! Unique-constraint translation
//!
//! Turns the unique constraints declared on an object into the unique
//! indexes its instance table must carry. Each constraint becomes one index
//! named `{unique prefix}{constraint id}` whose keys are the referenced
//! attributes' property ids, in constraint order, all ascending.

use std::collections::HashMap;
use std::sync::Arc;

use schemata_core::{
    Attribute, IndexDescriptor, ManagedPrefixes, ModelStore, UniqueConstraint, UniqueKeyKind,
};
use tracing::debug;

use crate::error::TranslateError;

/// Derives unique index descriptors from model records
#[derive(Clone)]
pub struct UniqueTranslator {
    models: Arc<dyn ModelStore>,
    prefixes: ManagedPrefixes,
}

impl UniqueTranslator {
    pub fn new(models: Arc<dyn ModelStore>, prefixes: ManagedPrefixes) -> Self {
        Self { models, prefixes }
    }

    /// Unique indexes for every constraint of `object_id`
    ///
    /// All or nothing: one bad constraint fails the object.
    pub async fn translate(&self, object_id: &str) -> Result<Vec<IndexDescriptor>, TranslateError> {
        let constraints = self
            .models
            .list_unique_constraints(object_id)
            .await
            .map_err(|source| TranslateError::ListConstraints {
                object_id: object_id.to_string(),
                source,
            })?;
        if constraints.is_empty() {
            return Ok(Vec::new());
        }

        let attributes = self.models.list_attributes(object_id).await.map_err(|source| {
            TranslateError::ListAttributes {
                object_id: object_id.to_string(),
                source,
            }
        })?;
        let by_id: HashMap<u64, &Attribute> =
            attributes.iter().map(|attr| (attr.id, attr)).collect();

        let indexes = constraints
            .iter()
            .map(|constraint| unique_index(&self.prefixes, constraint, &by_id))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(object_id, count = indexes.len(), "resolved unique indexes");
        Ok(indexes)
    }
}

/// Translate one constraint against the object's attributes
pub fn unique_index(
    prefixes: &ManagedPrefixes,
    constraint: &UniqueConstraint,
    attributes: &HashMap<u64, &Attribute>,
) -> Result<IndexDescriptor, TranslateError> {
    if constraint.keys.is_empty() {
        return Err(TranslateError::EmptyConstraint {
            object_id: constraint.object_id.clone(),
            constraint_id: constraint.id,
        });
    }

    let mut index = IndexDescriptor::new(prefixes.unique_index_name(constraint.id)).unique();
    for key in &constraint.keys {
        if key.kind != UniqueKeyKind::Property {
            return Err(TranslateError::UnsupportedKeyKind {
                object_id: constraint.object_id.clone(),
                constraint_id: constraint.id,
                key_id: key.id,
            });
        }
        let attribute =
            attributes
                .get(&key.id)
                .ok_or_else(|| TranslateError::UnresolvedAttribute {
                    object_id: constraint.object_id.clone(),
                    constraint_id: constraint.id,
                    attribute_id: key.id,
                })?;
        if index.keys.iter().any(|k| k.field == attribute.property_id) {
            return Err(TranslateError::DuplicateField {
                object_id: constraint.object_id.clone(),
                constraint_id: constraint.id,
                field: attribute.property_id.clone(),
            });
        }
        index = index.asc(attribute.property_id.as_str());
    }
    Ok(index)
}
