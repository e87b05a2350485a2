//! The composition root.
//!
//! [`Composer`] collects service declarations from type catalogs,
//! configuration and explicit registrations, compiles them and feeds the
//! result to a [`ContainerBuilder`]. [`Composer::build`] freezes everything
//! into a [`Composition`].
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use tarkib_compose::{Composer, ServiceMarker, TypeCatalog, TypeDescriptor};
//!
//! trait Printer: Send + Sync {
//!     fn print(&self) -> &'static str;
//! }
//!
//! #[derive(Default)]
//! struct ConsolePrinter;
//! impl Printer for ConsolePrinter {
//!     fn print(&self) -> &'static str { "console" }
//! }
//!
//! let catalog = TypeCatalog::new("app")
//!     .with(TypeDescriptor::interface::<dyn Printer>()
//!         .with_service(ServiceMarker::singleton().implementation::<ConsolePrinter>()))
//!     .with(TypeDescriptor::class::<ConsolePrinter>()
//!         .implements::<dyn Printer>(|this| this)
//!         .constructor(ConsolePrinter::default)
//!         .build());
//!
//! let mut composer = Composer::new();
//! composer.add_services(&catalog)?.add_service_locator();
//! let composition = composer.build()?;
//!
//! let printer = composition.resolve::<dyn Printer>()?;
//! assert_eq!(printer.print(), "console");
//! assert!(composition.locate("Printer")?.is_found());
//! # Ok::<(), tarkib_compose::CompositionError>(())
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument};

use tarkib_container::{
    Container, ContainerBuilder, DependencyKey, Lifetime, Provider, ScopedContainer,
};

use crate::catalog::TypeCatalog;
use crate::compiler::ServiceCompiler;
use crate::config::ServicesSection;
use crate::descriptor::TypeDescriptor;
use crate::error::{CompositionError, Result};
use crate::locator::{Lookup, NameIndex, ServiceLocator};
use crate::resolve::{parse_lifetime, resolve_qualified, resolve_type, type_suggestions};

/// A declaration as it was registered; handed to registration observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDeclaration {
    pub service: DependencyKey,
    pub implementation: Option<DependencyKey>,
    pub lifetime: Lifetime,
}

/// How configuration names are matched against types.
#[derive(Clone, Copy)]
enum NameLookup {
    /// Qualified name, then simple name.
    Loose,
    /// Qualified name only.
    Qualified,
}

impl NameLookup {
    fn find(self, name: &str, catalog: &TypeCatalog) -> Option<Arc<TypeDescriptor>> {
        match self {
            NameLookup::Loose => resolve_type(name, catalog),
            NameLookup::Qualified => resolve_qualified(name, catalog),
        }
    }
}

/// Builds a [`Composition`].
///
/// Every `add_*` source is processed in order and aborts on its first
/// error; declarations processed before the error stay registered. For
/// each service type the first registration wins.
#[derive(Debug, Default)]
pub struct Composer {
    services: ContainerBuilder,
    compiler: ServiceCompiler,
    locator: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing set of registrations.
    pub fn with_services(services: ContainerBuilder) -> Self {
        Self { services, ..Self::default() }
    }

    /// Compiles and registers one declaration.
    ///
    /// Returns `false` if the service type was already registered.
    pub fn add_service(
        &mut self,
        service: &TypeDescriptor,
        implementation: Option<&Arc<TypeDescriptor>>,
        lifetime: Lifetime,
    ) -> Result<bool> {
        let entry = self.compiler.compile(service, implementation, lifetime)?;
        let added = self.services.try_add(entry.into());
        if !added {
            debug!(service = %service.key(), "Service already registered, keeping the first");
        }
        Ok(added)
    }

    /// Registers every type in `catalog` that carries a service marker.
    #[instrument(skip(self, catalog), fields(catalog = catalog.name()))]
    pub fn add_services(&mut self, catalog: &TypeCatalog) -> Result<&mut Self> {
        let mut added = 0usize;
        for descriptor in catalog.defined_types() {
            let Some(marker) = descriptor.marker() else {
                continue;
            };

            let implementation = marker
                .implementation
                .map(|key| Self::marked_implementation(&key, catalog))
                .transpose()?;

            if self.add_service(descriptor, implementation.as_ref(), marker.lifetime)? {
                added += 1;
            }
        }

        info!(added, "Registered marked services");
        Ok(self)
    }

    /// [`add_services`](Self::add_services) for several catalogs, in order.
    pub fn add_services_from_all<'a>(
        &mut self,
        catalogs: impl IntoIterator<Item = &'a TypeCatalog>,
    ) -> Result<&mut Self> {
        for catalog in catalogs {
            self.add_services(catalog)?;
        }
        Ok(self)
    }

    /// Registers the services declared in `section`, resolving names in
    /// `catalog`.
    pub fn add_services_from_configuration(
        &mut self,
        section: &ServicesSection,
        catalog: &TypeCatalog,
    ) -> Result<&mut Self> {
        self.add_services_from_configuration_with(section, catalog, |_| {})
    }

    /// Like [`add_services_from_configuration`](Self::add_services_from_configuration),
    /// calling `observer` after each declaration is registered.
    #[instrument(skip_all, fields(catalog = catalog.name(), entries = section.len()))]
    pub fn add_services_from_configuration_with(
        &mut self,
        section: &ServicesSection,
        catalog: &TypeCatalog,
        observer: impl FnMut(&ServiceDeclaration),
    ) -> Result<&mut Self> {
        self.add_configured(section, catalog, NameLookup::Loose, observer)
    }

    /// Registers the services declared in `section`, matching path-qualified
    /// names against every type submitted in the process.
    pub fn add_services_from_global_configuration(
        &mut self,
        section: &ServicesSection,
    ) -> Result<&mut Self> {
        self.add_services_from_global_configuration_with(section, |_| {})
    }

    /// Like [`add_services_from_global_configuration`](Self::add_services_from_global_configuration),
    /// calling `observer` after each declaration is registered.
    #[instrument(skip_all, fields(entries = section.len()))]
    pub fn add_services_from_global_configuration_with(
        &mut self,
        section: &ServicesSection,
        observer: impl FnMut(&ServiceDeclaration),
    ) -> Result<&mut Self> {
        let global = TypeCatalog::global();
        self.add_configured(section, &global, NameLookup::Qualified, observer)
    }

    /// Registers services directly on the container builder.
    pub fn configure(&mut self, f: impl FnOnce(ContainerBuilder) -> ContainerBuilder) -> &mut Self {
        self.services = f(std::mem::take(&mut self.services));
        self
    }

    /// Adds a [`Provider`] module.
    pub fn add_provider(&mut self, provider: &dyn Provider) -> &mut Self {
        self.configure(|services| services.add_provider(provider))
    }

    /// Makes the built composition index its services by name.
    pub fn add_service_locator(&mut self) -> &mut Self {
        self.locator = true;
        self
    }

    /// Registrations collected so far.
    pub fn services(&self) -> &ContainerBuilder {
        &self.services
    }

    pub fn compiler(&self) -> &ServiceCompiler {
        &self.compiler
    }

    /// Builds the container and, if requested, configures the locator.
    #[instrument(skip(self), name = "composition_build")]
    pub fn build(self) -> Result<Composition> {
        let container = self.services.build();
        let locator = ServiceLocator::new();
        if self.locator {
            locator.configure(NameIndex::from_keys(container.service_keys()))?;
        }

        info!(services = container.len(), locator = self.locator, "Composition built");
        Ok(Composition { container, locator })
    }

    fn add_configured(
        &mut self,
        section: &ServicesSection,
        catalog: &TypeCatalog,
        lookup: NameLookup,
        mut observer: impl FnMut(&ServiceDeclaration),
    ) -> Result<&mut Self> {
        for (name, entry) in section.entries() {
            let service = lookup.find(name, catalog).ok_or_else(|| {
                CompositionError::UnresolvedServiceType {
                    name: name.to_string(),
                    catalog: catalog.name().to_string(),
                    suggestions: type_suggestions(name, catalog),
                }
            })?;

            let implementation = entry
                .implementation()
                .map(|name| {
                    lookup.find(name, catalog).ok_or_else(|| {
                        CompositionError::UnresolvedImplementationType {
                            name: name.to_string(),
                            catalog: catalog.name().to_string(),
                            suggestions: type_suggestions(name, catalog),
                        }
                    })
                })
                .transpose()?;

            let lifetime = parse_lifetime(entry.mode());
            self.add_service(&service, implementation.as_ref(), lifetime)?;

            observer(&ServiceDeclaration {
                service: *service.key(),
                implementation: implementation.as_ref().map(|i| *i.key()),
                lifetime,
            });
        }
        Ok(self)
    }

    /// The implementation named by a marker: looked up in the declaring
    /// catalog, then among every submitted type.
    fn marked_implementation(key: &DependencyKey, catalog: &TypeCatalog) -> Result<Arc<TypeDescriptor>> {
        catalog
            .get(key)
            .cloned()
            .or_else(|| TypeCatalog::global().get(key).cloned())
            .ok_or_else(|| CompositionError::UnresolvedImplementationType {
                name: key.qualified_name().to_string(),
                catalog: catalog.name().to_string(),
                suggestions: type_suggestions(&key.simple_name(), catalog),
            })
    }
}

/// A built container together with its service locator.
#[derive(Debug)]
pub struct Composition {
    container: Container,
    locator: ServiceLocator,
}

impl Composition {
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn locator(&self) -> &ServiceLocator {
        &self.locator
    }

    /// Resolves service `S` from the root scope.
    pub fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>> {
        Ok(self.container.resolve::<S>()?)
    }

    pub fn create_scope(&self) -> ScopedContainer<'_> {
        self.container.create_scope()
    }

    /// Resolves the service registered under simple type name `name`.
    pub fn locate(&self, name: &str) -> Result<Lookup> {
        self.locator.lookup(name, &self.container)
    }

    /// Typed [`locate`](Self::locate).
    pub fn locate_as<S: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<S>>> {
        self.locator.get::<S>(name, &self.container)
    }

    /// Names the locator knows, in registration order.
    pub fn member_names(&self) -> Result<Vec<&str>> {
        self.locator.member_names()
    }

    pub fn into_container(self) -> Container {
        self.container
    }
}
