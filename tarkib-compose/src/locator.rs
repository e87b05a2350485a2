//! Lookup of services by simple type name.
//!
//! The [`ServiceLocator`] is a secondary path into the container for
//! callers that only know a service by name (scripting, diagnostics,
//! late-bound plugins). Its [`NameIndex`] is built once from the final
//! registration set, when the composition is built.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use tarkib_container::{DependencyKey, Instance, Resolver, downcast_instance};

use crate::error::{CompositionError, Result};

/// Simple type name to service type, in registration order.
///
/// When two services share a simple name the first registered keeps it.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    names: Vec<String>,
    keys: HashMap<String, DependencyKey>,
}

impl NameIndex {
    pub fn from_keys(keys: impl IntoIterator<Item = DependencyKey>) -> Self {
        let mut index = Self::default();
        for key in keys {
            let name = key.simple_name();
            if index.keys.contains_key(&name) {
                trace!(name = %name, key = %key, "Name already indexed, skipping");
                continue;
            }
            index.keys.insert(name.clone(), key);
            index.names.push(name);
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<&DependencyKey> {
        self.keys.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Outcome of a name lookup.
#[derive(Clone)]
pub enum Lookup {
    Found(Instance),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Lookup::Found(instance) => Some(instance),
            Lookup::NotFound => None,
        }
    }

    /// The found instance as service `S`.
    ///
    /// # Errors
    /// Fails if the instance is not an `S`.
    pub fn downcast<S: ?Sized + Send + Sync + 'static>(self) -> Result<Option<Arc<S>>> {
        match self {
            Lookup::Found(instance) => Ok(Some(downcast_instance(&DependencyKey::of::<S>(), &instance)?)),
            Lookup::NotFound => Ok(None),
        }
    }
}

impl std::fmt::Debug for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Found(_) => f.write_str("Found(..)"),
            Lookup::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Name-indexed view over a resolver.
///
/// Unusable until [`configure`](Self::configure) has run, which happens
/// exactly once.
#[derive(Debug, Default)]
pub struct ServiceLocator {
    index: OnceCell<NameIndex>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the name index.
    ///
    /// # Errors
    /// [`CompositionError::LocatorAlreadyConfigured`] on a second call.
    pub fn configure(&self, index: NameIndex) -> Result<()> {
        let names = index.len();
        self.index
            .set(index)
            .map_err(|_| CompositionError::LocatorAlreadyConfigured)?;
        debug!(names, "Service locator configured");
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.index.get().is_some()
    }

    fn index(&self) -> Result<&NameIndex> {
        self.index.get().ok_or(CompositionError::LocatorUnconfigured)
    }

    /// Resolves the service registered under `name`.
    ///
    /// Unknown names are [`Lookup::NotFound`]; resolution failures are errors.
    pub fn lookup(&self, name: &str, resolver: &dyn Resolver) -> Result<Lookup> {
        let Some(key) = self.index()?.get(name) else {
            trace!(name, "No service with this name");
            return Ok(Lookup::NotFound);
        };

        Ok(Lookup::Found(resolver.resolve_key(key)?))
    }

    /// Typed [`lookup`](Self::lookup).
    pub fn get<S: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
        resolver: &dyn Resolver,
    ) -> Result<Option<Arc<S>>> {
        self.lookup(name, resolver)?.downcast()
    }

    /// The service type registered under `name`, without resolving it.
    pub fn key_of(&self, name: &str) -> Result<Option<DependencyKey>> {
        Ok(self.index()?.get(name).copied())
    }

    /// Every known name, in registration order.
    pub fn member_names(&self) -> Result<Vec<&str>> {
        Ok(self.index()?.names().collect())
    }
}
