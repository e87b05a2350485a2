//! Core container for Tarkib: a first-wins service registry with
//! singleton, scoped and transient lifetimes.

pub mod container;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod registry;

pub use container::prelude;
pub use container::{Container, ContainerBuilder, ScopedContainer};
pub use error::{ContainerError, Result, UnsatisfiableDependencyError};
pub use key::DependencyKey;
pub use lifetime::{Lifetime, ParseLifetimeError};
pub use provider::{Provider, ProviderRegistry};
pub use registry::{
    Activation, Activator, FactoryFn, Instance, Registration, Resolver, ResolverApi,
    downcast_instance, into_instance,
};
