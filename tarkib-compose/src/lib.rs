//! Service composition on top of the Tarkib container.
//!
//! Types describe themselves with a [`TypeDescriptor`] (by hand or with
//! `#[derive(Service)]`), declarations come from [`ServiceMarker`]s in a
//! [`TypeCatalog`] or from a [`ServicesSection`] of configuration, and the
//! [`Composer`] compiles each declaration into a container registration:
//!
//! - types without injectable members are activated by the container
//!   directly;
//! - the rest get a [`CompiledFactory`] built once from an
//!   [`InjectionPlan`]: constructor injection, then property injection,
//!   then method injection.
//!
//! After [`Composer::build`] an optional [`ServiceLocator`] resolves
//! services by simple type name.

pub mod catalog;
pub mod compiler;
pub mod composer;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod inject;
pub mod locator;
pub mod resolve;

pub use catalog::{TypeCatalog, TypeRegistration};
pub use compiler::{CompiledFactory, InjectionPlan, RegistrationEntry, ServiceCompiler};
pub use composer::{Composer, Composition, ServiceDeclaration};
pub use config::{CONFIG_ENV_PREFIX, ConfigLoader, SERVICES_SECTION, ServiceEntry, ServicesSection};
pub use descriptor::{
    ClassBuilder, ConstructorInfo, Describe, Erased, MethodInfo, PropertyInfo, ServiceMarker, TypeDescriptor,
    TypeKind, Visibility,
};
pub use error::{CompositionError, Result};
pub use inject::{Arguments, Constructor, Injector};
pub use locator::{Lookup, NameIndex, ServiceLocator};
pub use resolve::{parse_lifetime, resolve_qualified, resolve_type};

/// Items used by generated code. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
