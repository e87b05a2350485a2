//! Type catalogs: the ordered set of types a composer can discover.
//!
//! A [`TypeCatalog`] is built by hand with [`TypeCatalog::with`] or taken
//! from the process-wide set of [`TypeRegistration`]s that
//! `#[derive(Service)]` and `#[service_contract]` submit through
//! `inventory`.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use tarkib_container::DependencyKey;

use crate::descriptor::{Describe, TypeDescriptor};

/// A type made discoverable process-wide.
///
/// Submit one with `inventory::submit!`; the derive macros do this for you.
pub struct TypeRegistration {
    /// `module_path!()` of the declaring module.
    pub module_path: &'static str,
    pub describe: fn() -> TypeDescriptor,
}

impl TypeRegistration {
    pub const fn new(module_path: &'static str, describe: fn() -> TypeDescriptor) -> Self {
        Self { module_path, describe }
    }

    /// Name of the crate the type was declared in.
    pub fn crate_name(&self) -> &'static str {
        self.module_path.split("::").next().unwrap_or(self.module_path)
    }
}

inventory::collect!(TypeRegistration);

static GLOBAL: Lazy<Arc<TypeCatalog>> = Lazy::new(|| {
    let catalog = Arc::new(TypeCatalog::from_registrations("global", |_| true));
    debug!(types = catalog.len(), "Global type catalog collected");
    catalog
});

/// An ordered set of [`TypeDescriptor`]s.
///
/// Order is declaration order for hand-built catalogs. Catalogs collected
/// from `inventory` are ordered by module path, then type name.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    name: String,
    types: Vec<Arc<TypeDescriptor>>,
    by_key: HashMap<DependencyKey, usize>,
    by_qualified: HashMap<&'static str, usize>,
}

impl TypeCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            by_key: HashMap::new(),
            by_qualified: HashMap::new(),
        }
    }

    /// Adds a type (builder style).
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.add(descriptor);
        self
    }

    /// Adds a self-describing type (builder style).
    pub fn with_type<T: Describe + ?Sized>(self) -> Self {
        self.with(T::describe())
    }

    /// Adds a type. A type already in the catalog is left untouched.
    ///
    /// Returns `true` if the type was added.
    pub fn add(&mut self, descriptor: TypeDescriptor) -> bool {
        let key = *descriptor.key();
        if self.by_key.contains_key(&key) {
            trace!(catalog = %self.name, key = %key, "Type already in catalog, skipping");
            return false;
        }

        let index = self.types.len();
        self.by_key.insert(key, index);
        self.by_qualified.entry(key.qualified_name()).or_insert(index);
        self.types.push(Arc::new(descriptor));
        true
    }

    /// Every type submitted through `inventory` in this process.
    pub fn global() -> Arc<TypeCatalog> {
        Arc::clone(&GLOBAL)
    }

    /// Types submitted through `inventory` by one crate.
    ///
    /// Accepts a crate name (`my_app` or `my-app`) or any module path
    /// inside it, so `TypeCatalog::of_crate(module_path!())` works from
    /// submodules too.
    pub fn of_crate(crate_name: &str) -> TypeCatalog {
        let crate_name = crate_name
            .split("::")
            .next()
            .unwrap_or(crate_name)
            .trim()
            .replace('-', "_");
        Self::from_registrations(&crate_name, |registration| registration.crate_name() == crate_name)
    }

    fn from_registrations(name: &str, filter: impl Fn(&TypeRegistration) -> bool) -> TypeCatalog {
        let mut described: Vec<(&'static str, TypeDescriptor)> = inventory::iter::<TypeRegistration>
            .into_iter()
            .filter(|registration| filter(registration))
            .map(|registration| (registration.module_path, (registration.describe)()))
            .collect();
        described.sort_by(|(a_path, a), (b_path, b)| {
            a_path
                .cmp(b_path)
                .then_with(|| a.qualified_name().cmp(b.qualified_name()))
        });

        let mut catalog = TypeCatalog::new(name);
        for (_, descriptor) in described {
            catalog.add(descriptor);
        }
        catalog
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Types in catalog order.
    pub fn defined_types(&self) -> &[Arc<TypeDescriptor>] {
        &self.types
    }

    pub fn get(&self, key: &DependencyKey) -> Option<&Arc<TypeDescriptor>> {
        self.by_key.get(key).map(|&index| &self.types[index])
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Exact lookup by path-qualified name.
    pub fn find_qualified(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.by_qualified.get(name).map(|&index| &self.types[index])
    }

    pub fn qualified_names(&self) -> Vec<&'static str> {
        self.types.iter().map(|t| t.qualified_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
