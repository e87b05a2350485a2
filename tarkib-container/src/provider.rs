//! Provider trait — a module of related service registrations.
//!
//! Providers group explicit registrations together so that an
//! application can split its wiring by concern.
//!
//! # Examples
//! ```rust,ignore
//! struct PrintingProvider;
//!
//! impl Provider for PrintingProvider {
//!     fn register(&self, services: &mut dyn ProviderRegistry) {
//!         services.try_add(Registration::typed::<dyn Printer>(Lifetime::Scoped, |_| {
//!             Ok(Arc::new(ConsolePrinter))
//!         }));
//!     }
//! }
//! ```

use crate::key::DependencyKey;
use crate::registry::Registration;

/// A module that registers related services into a container builder.
pub trait Provider: Send + Sync {
    /// Register services. Called once while composing.
    fn register(&self, services: &mut dyn ProviderRegistry);

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers use to register services.
///
/// A subset of the builder API, so providers can be tested against a
/// mock registry.
pub trait ProviderRegistry {
    /// Adds a registration unless the service is already registered.
    /// Returns `true` if it took effect.
    fn try_add(&mut self, registration: Registration) -> bool;

    /// Returns `true` if a registration exists for `key`.
    fn contains(&self, key: &DependencyKey) -> bool;
}
