//! # The Container
//!
//! The dependency injection container that the composition layer builds on:
//! a first-wins map from service type to activation, plus lifetime caching.
//!
//! # Architecture
//! ```text
//! ContainerBuilder  ──build()──>  Container
//!                                    │
//!                              create_scope()
//!                                    │
//!                                    ▼
//!                              ScopedContainer
//! ```
//!
//! # Examples
//! ```rust
//! use tarkib_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! let container = Container::builder()
//!     .singleton_with::<dyn Logger>(|_| Ok(Arc::new(ConsoleLogger)))
//!     .transient_with::<UserService>(|resolver| {
//!         let logger: Arc<dyn Logger> = resolver.resolve()?;
//!         Ok(Arc::new(UserService { logger }))
//!     })
//!     .build();
//!
//! let service: Arc<UserService> = container.resolve().expect("Failed to resolve");
//! ```

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tarkib_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace};

use crate::error::{ContainerError, Result, UnsatisfiableDependencyError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::provider::{Provider, ProviderRegistry};
use crate::registry::{
    Instance, Registration, Registry, Resolver, ResolverApi, downcast_instance,
};

/// Per-scope instance cache.
///
/// Each key gets its own cell so the map is never locked while a
/// factory runs.
type ScopeCache = DashMap<DependencyKey, Arc<OnceCell<Instance>>>;

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`].
///
/// Every registration method is first-wins: registering a service type
/// that is already registered is a no-op.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .singleton_value(Arc::new(Config::load()))
///     .scoped_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)))
///     .build();
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    registry: Registry,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self { registry: Registry::new() }
    }

    /// Adds a registration unless its service type is already registered.
    ///
    /// Returns `true` if the registration took effect.
    pub fn try_add(&mut self, registration: Registration) -> bool {
        self.registry.try_add(registration)
    }

    /// Returns `true` if `key` is registered.
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.registry.contains(key)
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Returns the registered service keys in registration order.
    pub fn service_keys(&self) -> Vec<DependencyKey> {
        self.registry.keys().to_vec()
    }

    // ── Singleton: pre-built value ──

    /// Register a pre-built value as a singleton.
    pub fn singleton_value<S: ?Sized + Send + Sync + 'static>(mut self, value: Arc<S>) -> Self {
        self.try_add(Registration::typed::<S>(Lifetime::Singleton, move |_| Ok(value.clone())));
        self
    }

    // ── Factories ──

    /// Register a singleton factory. Called once, on first resolve.
    pub fn singleton_with<S: ?Sized + Send + Sync + 'static>(
        mut self,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<S>> + Send + Sync + 'static,
    ) -> Self {
        self.try_add(Registration::typed::<S>(Lifetime::Singleton, factory));
        self
    }

    /// Register a scoped factory. Called once per scope.
    pub fn scoped_with<S: ?Sized + Send + Sync + 'static>(
        mut self,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<S>> + Send + Sync + 'static,
    ) -> Self {
        self.try_add(Registration::typed::<S>(Lifetime::Scoped, factory));
        self
    }

    /// Register a transient factory. Called on every resolve.
    pub fn transient_with<S: ?Sized + Send + Sync + 'static>(
        mut self,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<S>> + Send + Sync + 'static,
    ) -> Self {
        self.try_add(Registration::typed::<S>(Lifetime::Transient, factory));
        self
    }

    // ── Provider modules ──

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(&mut self);
        self
    }

    // ── Build ──

    /// Freeze the registrations into an immutable, thread-safe container.
    ///
    /// Dependencies are not validated here; an unsatisfiable dependency
    /// surfaces when something that needs it is resolved.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Container {
        info!(registered = self.registry.len(), "Building container");
        Container {
            registry: Arc::new(self.registry),
            root: ScopeCache::new(),
        }
    }
}

impl ProviderRegistry for ContainerBuilder {
    fn try_add(&mut self, registration: Registration) -> bool {
        self.registry.try_add(registration)
    }

    fn contains(&self, key: &DependencyKey) -> bool {
        self.registry.contains(key)
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("registered", &self.registry.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Immutable, thread-safe dependency injection container.
///
/// Created by [`ContainerBuilder::build()`]. Scoped services resolved
/// directly from the container live in its root scope.
pub struct Container {
    registry: Arc<Registry>,
    root: ScopeCache,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Resolve a service by type.
    ///
    /// ```rust,ignore
    /// let printer: Arc<dyn Printer> = container.resolve()?;
    /// ```
    pub fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>> {
        self.resolver().resolve()
    }

    /// Resolve a required service by key.
    ///
    /// # Errors
    /// [`ContainerError::Unsatisfiable`] if the service, or anything it
    /// depends on, is not registered.
    pub fn get_required_service(&self, key: &DependencyKey) -> Result<Instance> {
        self.resolver().resolve_key(key)
    }

    /// Returns `true` if `key` is registered.
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.registry.contains(key)
    }

    /// The lifetime `key` was registered with.
    pub fn lifetime_of(&self, key: &DependencyKey) -> Option<Lifetime> {
        self.registry.get(key).map(|registration| registration.lifetime)
    }

    /// Returns the registered service keys in registration order.
    pub fn service_keys(&self) -> Vec<DependencyKey> {
        self.registry.keys().to_vec()
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Create a scoped child container with its own cache for
    /// [`Lifetime::Scoped`] services.
    pub fn create_scope(&self) -> ScopedContainer<'_> {
        debug!("Creating new scope");
        ScopedContainer {
            parent: self,
            cache: ScopeCache::new(),
        }
    }

    fn resolver(&self) -> ScopeResolver<'_> {
        ScopeResolver {
            registry: &self.registry,
            root: &self.root,
            scope: &self.root,
        }
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        self.resolver().resolve_key(key)
    }

    fn contains(&self, key: &DependencyKey) -> bool {
        self.registry.contains(key)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.registry.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// ScopedContainer
// ═══════════════════════════════════════════

/// A scoped child container.
///
/// Singletons are shared with the parent; scoped services are cached
/// here and dropped together with the scope.
pub struct ScopedContainer<'a> {
    parent: &'a Container,
    cache: ScopeCache,
}

impl ScopedContainer<'_> {
    /// Resolve a service within this scope.
    pub fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>> {
        self.resolver().resolve()
    }

    /// Resolve a required service by key within this scope.
    pub fn get_required_service(&self, key: &DependencyKey) -> Result<Instance> {
        self.resolver().resolve_key(key)
    }

    fn resolver(&self) -> ScopeResolver<'_> {
        ScopeResolver {
            registry: &self.parent.registry,
            root: &self.parent.root,
            scope: &self.cache,
        }
    }
}

impl Resolver for ScopedContainer<'_> {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        self.resolver().resolve_key(key)
    }

    fn contains(&self, key: &DependencyKey) -> bool {
        self.parent.registry.contains(key)
    }
}

impl fmt::Debug for ScopedContainer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedContainer")
            .field("cached", &self.cache.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// ScopeResolver (internal bridge)
// ═══════════════════════════════════════════

/// Resolver handed to factories and activators, bound to one scope.
#[derive(Clone, Copy)]
struct ScopeResolver<'a> {
    registry: &'a Registry,
    root: &'a ScopeCache,
    scope: &'a ScopeCache,
}

impl ScopeResolver<'_> {
    fn unsatisfiable(&self, key: &DependencyKey) -> ContainerError {
        let names: Vec<&str> = self
            .registry
            .keys()
            .iter()
            .filter(|k| *k != key)
            .map(DependencyKey::qualified_name)
            .collect();

        ContainerError::Unsatisfiable(UnsatisfiableDependencyError {
            requested: *key,
            chain: Vec::new(),
            suggestions: suggest_similar(key.qualified_name(), &names, 3),
        })
    }
}

impl Resolver for ScopeResolver<'_> {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        trace!(key = %key, "Resolving");

        let registration = self
            .registry
            .get(key)
            .ok_or_else(|| self.unsatisfiable(key))?;

        match registration.lifetime {
            Lifetime::Singleton => {
                // singleton dependencies come from the root scope
                let root = ScopeResolver { scope: self.root, ..*self };
                registration
                    .singleton
                    .get_or_try_init(|| registration.activation.run(key, &root))
                    .cloned()
            }
            Lifetime::Scoped => {
                let cell = self.scope.entry(*key).or_default().clone();
                cell.get_or_try_init(|| registration.activation.run(key, self))
                    .cloned()
            }
            Lifetime::Transient => registration.activation.run(key, self),
        }
    }

    fn contains(&self, key: &DependencyKey) -> bool {
        self.registry.contains(key)
    }
}

/// Resolve a typed service from an erased [`Instance`] obtained by key.
pub fn expect_service<S: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Result<Arc<S>> {
    downcast_instance(&DependencyKey::of::<S>(), instance)
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, ScopedContainer, expect_service};
    pub use crate::error::{ContainerError, Result};
    pub use crate::key::DependencyKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::registry::{Instance, Registration, Resolver, ResolverApi};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    trait Printer: Send + Sync {
        fn print(&self, msg: &str) -> String;
    }

    struct ConsolePrinter;

    impl Printer for ConsolePrinter {
        fn print(&self, msg: &str) -> String {
            format!("> {msg}")
        }
    }

    #[test]
    fn resolve_singleton_value() {
        let container = Container::builder()
            .singleton_value(Arc::new(42i32))
            .build();

        let a: Arc<i32> = container.resolve().unwrap();
        let b: Arc<i32> = container.resolve().unwrap();
        assert_eq!(*a, 42);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn resolve_trait_object() {
        let container = Container::builder()
            .singleton_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)))
            .build();

        let printer: Arc<dyn Printer> = container.resolve().unwrap();
        assert_eq!(printer.print("hi"), "> hi");
    }

    #[test]
    fn resolve_transient_creates_new_each_time() {
        let counter = Arc::new(AtomicU32::new(0));

        let container = Container::builder()
            .transient_with::<u32>({
                let counter = counter.clone();
                move |_| Ok(Arc::new(counter.fetch_add(1, Ordering::SeqCst)))
            })
            .build();

        let a: Arc<u32> = container.resolve().unwrap();
        let b: Arc<u32> = container.resolve().unwrap();
        let c: Arc<u32> = container.resolve().unwrap();

        assert_eq!((*a, *b, *c), (0, 1, 2));
    }

    #[test]
    fn singleton_factory_called_once() {
        let counter = Arc::new(AtomicU32::new(0));

        let container = Container::builder()
            .singleton_with::<i32>({
                let counter = counter.clone();
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(42))
                }
            })
            .build();

        let _a: Arc<i32> = container.resolve().unwrap();
        let _b: Arc<i32> = container.resolve().unwrap();
        let _c: Arc<i32> = container.create_scope().resolve().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_registration_wins() {
        let container = Container::builder()
            .singleton_value(Arc::new(String::from("first")))
            .singleton_value(Arc::new(String::from("second")))
            .build();

        let value: Arc<String> = container.resolve().unwrap();
        assert_eq!(value.as_str(), "first");
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn resolve_with_dependency() {
        let container = Container::builder()
            .singleton_value(Arc::new(String::from("postgres://localhost")))
            .transient_with::<Vec<u8>>(|r| {
                let url: Arc<String> = r.resolve()?;
                Ok(Arc::new(url.as_bytes().to_vec()))
            })
            .build();

        let bytes: Arc<Vec<u8>> = container.resolve().unwrap();
        assert_eq!(bytes.as_slice(), b"postgres://localhost");
    }

    #[test]
    fn resolve_not_registered() {
        let container = Container::builder().build();

        match container.resolve::<i32>().unwrap_err() {
            ContainerError::Unsatisfiable(e) => {
                assert!(e.requested.type_name().contains("i32"));
                assert!(e.required_by().is_none());
            }
            other => panic!("Expected Unsatisfiable, got: {other:?}"),
        }
    }

    #[test]
    fn unsatisfiable_suggests_similar_names() {
        #[derive(Debug)]
        struct UserService;
        struct UserServices;

        let container = Container::builder()
            .singleton_with::<UserServices>(|_| Ok(Arc::new(UserServices)))
            .build();

        match container.resolve::<UserService>().unwrap_err() {
            ContainerError::Unsatisfiable(e) => {
                assert_eq!(e.suggestions.len(), 1);
                assert!(e.suggestions[0].ends_with("UserServices"));
            }
            other => panic!("Expected Unsatisfiable, got: {other:?}"),
        }
    }

    #[test]
    fn scoped_instances_are_per_scope() {
        let container = Container::builder()
            .scoped_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)))
            .build();

        let scope_a = container.create_scope();
        let scope_b = container.create_scope();

        let a1: Arc<dyn Printer> = scope_a.resolve().unwrap();
        let a2: Arc<dyn Printer> = scope_a.resolve().unwrap();
        let b1: Arc<dyn Printer> = scope_b.resolve().unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b1));
    }

    #[test]
    fn singletons_are_shared_across_scopes() {
        let container = Container::builder()
            .singleton_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)))
            .build();

        let from_root: Arc<dyn Printer> = container.resolve().unwrap();
        let from_scope: Arc<dyn Printer> = container.create_scope().resolve().unwrap();
        assert!(Arc::ptr_eq(&from_root, &from_scope));
    }

    #[test]
    fn erased_resolution_by_key() {
        let container = Container::builder()
            .transient_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)))
            .build();

        let instance = container
            .get_required_service(&DependencyKey::of::<dyn Printer>())
            .unwrap();
        let printer = expect_service::<dyn Printer>(&instance).unwrap();
        assert_eq!(printer.print("x"), "> x");
        assert_eq!(
            container.lifetime_of(&DependencyKey::of::<dyn Printer>()),
            Some(Lifetime::Transient)
        );
    }

    #[test]
    fn debug_display() {
        let container = Container::builder()
            .singleton_value(Arc::new(1i32))
            .singleton_value(Arc::new(String::from("x")))
            .build();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("2"));
    }
}
