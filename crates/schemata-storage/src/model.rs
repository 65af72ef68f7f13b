//! In-memory model store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use schemata_core::{
    Attribute, ModelStore, ObjectFilter, ObjectRecord, StoreError, UniqueConstraint,
};

/// Queries that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelQuery {
    Objects,
    Attributes,
    UniqueConstraints,
}

/// In-memory implementation of [`ModelStore`]
///
/// Objects are returned in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    objects: RwLock<Vec<ObjectRecord>>,
    attributes: DashMap<String, Vec<Attribute>>,
    uniques: DashMap<String, Vec<UniqueConstraint>>,
    /// Faults keyed by query and object id (empty id for object listing)
    faults: DashMap<(ModelQuery, String), StoreError>,
    /// Number of object listings served, successful or not
    object_queries: AtomicUsize,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object
    pub fn put_object(&self, object: ObjectRecord) {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        match objects.iter_mut().find(|existing| existing.object_id == object.object_id) {
            Some(existing) => *existing = object,
            None => objects.push(object),
        }
    }

    /// Remove an object and everything declared on it
    pub fn remove_object(&self, object_id: &str) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|object| object.object_id != object_id);
        self.attributes.remove(object_id);
        self.uniques.remove(object_id);
    }

    /// Add an attribute to an object
    pub fn put_attribute(&self, object_id: &str, attribute: Attribute) {
        self.attributes.entry(object_id.to_string()).or_default().push(attribute);
    }

    /// Add a unique constraint to its object
    pub fn put_unique(&self, constraint: UniqueConstraint) {
        self.uniques
            .entry(constraint.object_id.clone())
            .or_default()
            .push(constraint);
    }

    /// Make a query fail with `error` until cleared
    ///
    /// `object_id` is ignored for [`ModelQuery::Objects`].
    pub fn inject_fault(&self, query: ModelQuery, object_id: &str, error: StoreError) {
        self.faults.insert(fault_key(query, object_id), error);
    }

    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// Number of `list_objects` calls served so far
    pub fn object_queries(&self) -> usize {
        self.object_queries.load(Ordering::SeqCst)
    }

    fn check_fault(&self, query: ModelQuery, object_id: &str) -> Result<(), StoreError> {
        match self.faults.get(&fault_key(query, object_id)) {
            Some(error) => Err(error.value().clone()),
            None => Ok(()),
        }
    }
}

fn fault_key(query: ModelQuery, object_id: &str) -> (ModelQuery, String) {
    match query {
        ModelQuery::Objects => (query, String::new()),
        _ => (query, object_id.to_string()),
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn list_objects(&self, filter: ObjectFilter) -> Result<Vec<ObjectRecord>, StoreError> {
        self.object_queries.fetch_add(1, Ordering::SeqCst);
        self.check_fault(ModelQuery::Objects, "")?;

        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .iter()
            .filter(|object| filter.matches(object))
            .cloned()
            .collect())
    }

    async fn list_attributes(&self, object_id: &str) -> Result<Vec<Attribute>, StoreError> {
        self.check_fault(ModelQuery::Attributes, object_id)?;
        Ok(self
            .attributes
            .get(object_id)
            .map(|attrs| attrs.value().clone())
            .unwrap_or_default())
    }

    async fn list_unique_constraints(
        &self,
        object_id: &str,
    ) -> Result<Vec<UniqueConstraint>, StoreError> {
        self.check_fault(ModelQuery::UniqueConstraints, object_id)?;
        Ok(self
            .uniques
            .get(object_id)
            .map(|uniques| uniques.value().clone())
            .unwrap_or_default())
    }
}
