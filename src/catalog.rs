//! Resource catalog: the store of resource records and their availability.

use std::collections::{HashMap, hash_map::Entry};

use parking_lot::RwLock;

use crate::{
    availability::Availability,
    error::{LendingError, Result},
    resource::Resource,
};

/// Storage for resource records keyed by id.
///
/// Implementations only keep records; they do not know about reservations.
pub trait Catalog: Send + Sync {
    /// Insert a new resource
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateResource` if the id is already present
    fn add(&self, resource: Resource) -> Result<()>;

    /// Look up a resource by id
    fn get(&self, id: &str) -> Option<Resource>;

    /// Overwrite the availability of an existing resource
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotFound` if the id is absent
    fn set_availability(&self, id: &str, availability: Availability) -> Result<()>;

    /// Delete a resource, returning the removed record
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotFound` if the id is absent
    fn remove(&self, id: &str) -> Result<Resource>;

    /// Ids of every catalogued resource
    fn ids(&self) -> Vec<String>;

    /// Number of catalogued resources
    fn len(&self) -> usize;

    /// Whether the catalog holds no resources
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `HashMap`-backed catalog
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    /// Resource records keyed by id
    resources: RwLock<HashMap<String, Resource>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Catalog for InMemoryCatalog {
    fn add(&self, resource: Resource) -> Result<()> {
        match self.resources.write().entry(resource.id.clone()) {
            Entry::Occupied(_) => Err(LendingError::DuplicateResource(resource.id)),
            Entry::Vacant(slot) => {
                slot.insert(resource);
                Ok(())
            }
        }
    }

    fn get(&self, id: &str) -> Option<Resource> {
        self.resources.read().get(id).cloned()
    }

    fn set_availability(&self, id: &str, availability: Availability) -> Result<()> {
        let mut resources = self.resources.write();
        let resource =
            resources.get_mut(id).ok_or_else(|| LendingError::NotFound(id.to_string()))?;
        resource.availability = availability;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<Resource> {
        self.resources.write().remove(id).ok_or_else(|| LendingError::NotFound(id.to_string()))
    }

    fn ids(&self) -> Vec<String> {
        self.resources.read().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.resources.read().len()
    }
}
