//! # Tarkib — declarative service composition for Rust
//!
//! Wires an application's dependency graph on top of a lifetime-aware
//! container. Services are declared on the types themselves, in
//! configuration, or explicitly, and each declaration is compiled once
//! into a registration.
//!
//! ```rust
//! use std::sync::Arc;
//! use tarkib::{Composer, ServiceMarker, TypeCatalog, TypeDescriptor};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Default)]
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! let catalog = TypeCatalog::new("app")
//!     .with(TypeDescriptor::interface::<dyn Greeter>()
//!         .with_service(ServiceMarker::singleton().implementation::<English>()))
//!     .with(TypeDescriptor::class::<English>()
//!         .implements::<dyn Greeter>(|this| this)
//!         .constructor(English::default)
//!         .build());
//!
//! let mut composer = Composer::new();
//! composer.add_services(&catalog)?;
//! let greeter = composer.build()?.resolve::<dyn Greeter>()?;
//! assert_eq!(greeter.greet(), "hello");
//! # Ok::<(), tarkib::CompositionError>(())
//! ```

pub use tarkib_compose as compose;
pub use tarkib_container as container;
pub use tarkib_support as support;

pub use tarkib_compose::{
    Arguments, ClassBuilder, CompiledFactory, Composer, Composition, CompositionError, ConfigLoader,
    Constructor, Describe, InjectionPlan, Injector, Lookup, NameIndex, RegistrationEntry,
    ServiceCompiler, ServiceDeclaration, ServiceEntry, ServiceLocator, ServiceMarker,
    ServicesSection, TypeCatalog, TypeDescriptor, TypeKind, TypeRegistration, Visibility,
    Result, parse_lifetime, resolve_qualified, resolve_type,
};
pub use tarkib_container::{
    Container, ContainerBuilder, ContainerError, DependencyKey, Instance, Lifetime, Provider,
    ProviderRegistry, Registration, Resolver, ResolverApi, ScopedContainer,
    UnsatisfiableDependencyError,
};
pub use tarkib_derive::{Injectable, Service, service_contract};

/// Items used by generated code. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use tarkib_compose::__private::*;
}
