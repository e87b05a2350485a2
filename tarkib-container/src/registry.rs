//! Service registry — stores the registration for every service type.
//!
//! The registry maps a service [`DependencyKey`] to the [`Activation`]
//! that produces its instances and the [`Lifetime`] that governs caching.
//! The first registration for a key wins; later ones are ignored.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::error::{ContainerError, Result};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// A type-erased service instance.
///
/// The payload is always an `Arc<S>` where `S` is the service type, which
/// may be unsized (`dyn Trait`). Cloning an instance is cheap.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wraps a typed service into an [`Instance`].
pub fn into_instance<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> Instance {
    Arc::new(service)
}

/// Extracts a typed service from an [`Instance`].
///
/// # Errors
/// Returns [`ContainerError::ConstructionFailed`] if the instance does not
/// hold an `Arc<S>`.
pub fn downcast_instance<S: ?Sized + Send + Sync + 'static>(
    key: &DependencyKey,
    instance: &Instance,
) -> Result<Arc<S>> {
    instance
        .downcast_ref::<Arc<S>>()
        .cloned()
        .ok_or_else(|| ContainerError::type_mismatch(*key, type_name::<Arc<S>>()))
}

/// Type alias for factory functions.
///
/// A factory takes a reference to the [`Resolver`] (to resolve
/// sub-dependencies) and returns an [`Instance`] or an error.
///
/// Factories are shared between threads (`Container` is `Send + Sync`),
/// hence `Arc`.
pub type FactoryFn = Arc<dyn Fn(&dyn Resolver) -> Result<Instance> + Send + Sync>;

/// Trait for resolving dependencies.
///
/// This is what factories and activators receive to resolve their own
/// dependencies. Separated from `Container` so that scopes can hand out
/// resolvers bound to their own cache.
pub trait Resolver: Send + Sync {
    /// Resolves a required service. Fails if nothing is registered for `key`.
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance>;

    /// Returns `true` if a registration exists for `key`.
    fn contains(&self, key: &DependencyKey) -> bool;
}

/// Typed resolution on top of any [`Resolver`].
///
/// ```rust,ignore
/// let printer: Arc<dyn Printer> = resolver.resolve()?;
/// ```
pub trait ResolverApi {
    fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>>;
}

impl<R: Resolver + ?Sized> ResolverApi for R {
    fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>> {
        let key = DependencyKey::of::<S>();
        let instance = self.resolve_key(&key)?;
        downcast_instance(&key, &instance)
    }
}

/// Builds instances of an implementation type without a prepared factory.
///
/// This is the container's default activation: it inspects the type's
/// constructors on every call and resolves their parameters itself.
pub trait Activator: Send + Sync {
    /// The implementation type being activated.
    fn implementation(&self) -> DependencyKey;

    /// Creates an instance and exposes it as `service`.
    fn activate(&self, service: &DependencyKey, resolver: &dyn Resolver) -> Result<Instance>;
}

/// How a registration produces instances.
#[derive(Clone)]
pub enum Activation {
    /// A prepared factory closure.
    Factory(FactoryFn),
    /// Default activation of an implementation type.
    Type(Arc<dyn Activator>),
}

impl Activation {
    pub(crate) fn run(&self, service: &DependencyKey, resolver: &dyn Resolver) -> Result<Instance> {
        match self {
            Activation::Factory(factory) => factory(resolver),
            Activation::Type(activator) => activator.activate(service, resolver),
        }
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Factory(_) => f.write_str("Factory"),
            Activation::Type(activator) => write!(f, "Type({})", activator.implementation()),
        }
    }
}

/// Registration entry for a single service type.
#[derive(Clone)]
pub struct Registration {
    pub key: DependencyKey,
    pub lifetime: Lifetime,
    pub activation: Activation,
    pub(crate) singleton: Arc<OnceCell<Instance>>,
}

impl Registration {
    /// Registers a prepared factory for `key`.
    pub fn factory(key: DependencyKey, lifetime: Lifetime, factory: FactoryFn) -> Self {
        Self::new(key, lifetime, Activation::Factory(factory))
    }

    /// Registers default activation of an implementation type for `key`.
    pub fn activator(key: DependencyKey, lifetime: Lifetime, activator: Arc<dyn Activator>) -> Self {
        Self::new(key, lifetime, Activation::Type(activator))
    }

    /// Registers a typed factory for service `S`.
    pub fn typed<S: ?Sized + Send + Sync + 'static>(
        lifetime: Lifetime,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<S>> + Send + Sync + 'static,
    ) -> Self {
        Self::factory(
            DependencyKey::of::<S>(),
            lifetime,
            Arc::new(move |resolver: &dyn Resolver| factory(resolver).map(into_instance)),
        )
    }

    fn new(key: DependencyKey, lifetime: Lifetime, activation: Activation) -> Self {
        Self {
            key,
            lifetime,
            activation,
            singleton: Arc::new(OnceCell::new()),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("activation", &self.activation)
            .finish()
    }
}

/// Stores all service registrations in registration order.
///
/// The registry is populated while building and becomes immutable once
/// the container is constructed.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: HashMap<DependencyKey, Registration>,
    order: Vec<DependencyKey>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration unless the key is already registered.
    ///
    /// Returns `true` if the registration took effect.
    pub fn try_add(&mut self, registration: Registration) -> bool {
        let key = registration.key;

        if self.registrations.contains_key(&key) {
            trace!(key = %key, "Service already registered, keeping the first registration");
            return false;
        }

        debug!(key = %key, lifetime = %registration.lifetime, activation = ?registration.activation, "Registered service");
        self.order.push(key);
        self.registrations.insert(key, registration);
        true
    }

    /// Looks up a registration by key.
    pub fn get(&self, key: &DependencyKey) -> Option<&Registration> {
        self.registrations.get(key)
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.registrations.contains_key(key)
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the registered service keys in registration order.
    pub fn keys(&self) -> &[DependencyKey] {
        &self.order
    }
}
