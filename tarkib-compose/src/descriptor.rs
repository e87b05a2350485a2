//! Type metadata used in place of runtime reflection.
//!
//! A [`TypeDescriptor`] tells the composition engine everything it needs
//! about a type: its names, which service contracts it can be exposed as,
//! its constructors, the members marked for injection, and an optional
//! [`ServiceMarker`] declaring it as a service.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use tarkib_compose::{ServiceMarker, TypeDescriptor};
//!
//! trait Printer: Send + Sync {}
//!
//! #[derive(Default)]
//! struct ConsolePrinter;
//! impl Printer for ConsolePrinter {}
//!
//! let printer = TypeDescriptor::interface::<dyn Printer>()
//!     .with_service(ServiceMarker::singleton().implementation::<ConsolePrinter>());
//!
//! let console = TypeDescriptor::class::<ConsolePrinter>()
//!     .implements::<dyn Printer>(|this| this)
//!     .constructor(ConsolePrinter::default)
//!     .build();
//!
//! assert_eq!(printer.simple_name(), "Printer");
//! assert!(console.can_be_used_as(printer.key()));
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tarkib_container::{
    Activator, ContainerError, DependencyKey, Instance, Lifetime, Resolver, downcast_instance,
    into_instance,
};

use crate::inject::{Arguments, Constructor, Injector};

type ContainerResult<T> = tarkib_container::Result<T>;

/// An object under construction, before it is exposed as a service.
pub type Erased = Box<dyn Any + Send + Sync>;

pub(crate) type ConstructFn = Arc<dyn Fn(&mut Arguments) -> ContainerResult<Erased> + Send + Sync>;
pub(crate) type AssignFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), Instance) -> ContainerResult<()> + Send + Sync>;
pub(crate) type InjectFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), &mut Arguments) -> ContainerResult<()> + Send + Sync>;
pub(crate) type CastFn = Arc<dyn Fn(Erased) -> ContainerResult<Instance> + Send + Sync>;

/// Whether a type is a service contract or something that can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A trait object used as a service contract.
    Interface,
    /// A concrete type.
    Class,
}

/// Constructor visibility.
///
/// The container's own activation only uses public constructors;
/// compiled factories may use any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    NonPublic,
}

/// Declares a type as a service.
///
/// Attached to the declaring type; `implementation` optionally names the
/// concrete type to build instead of the declaring type itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceMarker {
    pub implementation: Option<DependencyKey>,
    pub lifetime: Lifetime,
}

impl ServiceMarker {
    pub fn new(lifetime: Lifetime) -> Self {
        Self { implementation: None, lifetime }
    }

    pub fn singleton() -> Self {
        Self::new(Lifetime::Singleton)
    }

    pub fn scoped() -> Self {
        Self::new(Lifetime::Scoped)
    }

    pub fn transient() -> Self {
        Self::new(Lifetime::Transient)
    }

    /// Builds `I` whenever the declaring service is requested.
    pub fn implementation<I: ?Sized + 'static>(mut self) -> Self {
        self.implementation = Some(DependencyKey::of::<I>());
        self
    }
}

/// A constructor: its parameter types and an erased call.
#[derive(Clone)]
pub struct ConstructorInfo {
    parameters: Vec<DependencyKey>,
    visibility: Visibility,
    invoke: ConstructFn,
}

impl ConstructorInfo {
    pub fn parameters(&self) -> &[DependencyKey] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub(crate) fn invoke(&self, args: &mut Arguments) -> ContainerResult<Erased> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// A settable member marked for injection.
#[derive(Clone)]
pub struct PropertyInfo {
    name: &'static str,
    service: DependencyKey,
    assign: AssignFn,
}

impl PropertyInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The service type assigned to this member.
    pub fn service(&self) -> DependencyKey {
        self.service
    }

    pub(crate) fn assign(&self, target: &mut (dyn Any + Send + Sync), value: Instance) -> ContainerResult<()> {
        (self.assign)(target, value)
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("service", &self.service)
            .finish()
    }
}

/// A method marked for injection, invoked after construction.
#[derive(Clone)]
pub struct MethodInfo {
    name: &'static str,
    parameters: Vec<DependencyKey>,
    invoke: InjectFn,
}

impl MethodInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &[DependencyKey] {
        &self.parameters
    }

    pub(crate) fn invoke(&self, target: &mut (dyn Any + Send + Sync), args: &mut Arguments) -> ContainerResult<()> {
        (self.invoke)(target, args)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A type that can describe itself.
///
/// Implemented by `#[derive(Service)]`, `#[derive(Injectable)]` and
/// `#[service_contract]`; implement it by hand to keep descriptors next
/// to the type they describe.
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

/// Everything the composition engine knows about one type.
#[derive(Clone)]
pub struct TypeDescriptor {
    key: DependencyKey,
    simple_name: String,
    kind: TypeKind,
    marker: Option<ServiceMarker>,
    casts: Vec<(DependencyKey, CastFn)>,
    constructors: Vec<ConstructorInfo>,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
}

impl TypeDescriptor {
    /// Describes a service contract, usually `dyn Trait`.
    pub fn interface<S: ?Sized + 'static>() -> Self {
        Self::empty(DependencyKey::of::<S>(), TypeKind::Interface)
    }

    /// Starts describing a concrete type.
    pub fn class<T: Send + Sync + 'static>() -> ClassBuilder<T> {
        ClassBuilder::new()
    }

    fn empty(key: DependencyKey, kind: TypeKind) -> Self {
        Self {
            key,
            simple_name: key.simple_name(),
            kind,
            marker: None,
            casts: Vec::new(),
            constructors: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Attaches a service marker.
    pub fn with_service(mut self, marker: ServiceMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn key(&self) -> &DependencyKey {
        &self.key
    }

    /// Path-qualified name, e.g. `app::services::Printer`.
    pub fn qualified_name(&self) -> &'static str {
        self.key.qualified_name()
    }

    /// Last path segment, e.g. `Printer`.
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn marker(&self) -> Option<&ServiceMarker> {
        self.marker.as_ref()
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// `true` if any property or method is marked for injection.
    pub fn has_injectable_members(&self) -> bool {
        !self.properties.is_empty() || !self.methods.is_empty()
    }

    /// Service contracts this type can be exposed as, in declaration order.
    pub fn services(&self) -> impl Iterator<Item = &DependencyKey> {
        self.casts.iter().map(|(key, _)| key)
    }

    /// `true` if an instance of this type can be exposed as `service`.
    pub fn can_be_used_as(&self, service: &DependencyKey) -> bool {
        self.cast_to(service).is_some()
    }

    pub(crate) fn cast_to(&self, service: &DependencyKey) -> Option<&CastFn> {
        self.casts
            .iter()
            .find(|(key, _)| key == service)
            .map(|(_, cast)| cast)
    }

    /// Longest public constructor whose parameters are all registered,
    /// first declared on ties. Falls back to the longest public constructor
    /// so that resolving it reports the missing service.
    fn activation_constructor(&self, resolver: &dyn Resolver) -> Option<&ConstructorInfo> {
        let public = || self.constructors.iter().filter(|ctor| ctor.is_public());

        longest_constructor(
            public().filter(|ctor| ctor.parameters.iter().all(|p| resolver.contains(p))),
        )
        .or_else(|| longest_constructor(public()))
    }
}

/// Constructor with the most parameters; the first declared wins ties.
pub(crate) fn longest_constructor<'a>(
    constructors: impl Iterator<Item = &'a ConstructorInfo>,
) -> Option<&'a ConstructorInfo> {
    constructors.fold(None, |best, candidate| match best {
        Some(current) if current.arity() >= candidate.arity() => Some(current),
        _ => Some(candidate),
    })
}

/// Resolves every key, in order, as arguments for `owner`.
pub(crate) fn resolve_arguments(
    owner: DependencyKey,
    keys: &[DependencyKey],
    resolver: &dyn Resolver,
) -> ContainerResult<Arguments> {
    let values = keys
        .iter()
        .map(|key| resolver.resolve_key(key))
        .collect::<ContainerResult<Vec<_>>>()
        .map_err(|err| err.within(owner))?;
    Ok(Arguments::new(owner, values))
}

/// Default activation, used by direct registrations.
///
/// Runs the constructor selection on every call; no member injection.
impl Activator for TypeDescriptor {
    fn implementation(&self) -> DependencyKey {
        self.key
    }

    fn activate(&self, service: &DependencyKey, resolver: &dyn Resolver) -> ContainerResult<Instance> {
        let ctor = self
            .activation_constructor(resolver)
            .ok_or(ContainerError::NoSuitableConstructor { implementation: self.key })?;

        let mut args = resolve_arguments(self.key, ctor.parameters(), resolver)?;
        let object = ctor.invoke(&mut args)?;

        let cast = self
            .cast_to(service)
            .ok_or_else(|| ContainerError::type_mismatch(*service, self.qualified_name()))?;
        cast(object)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.qualified_name())
            .field("kind", &self.kind)
            .field("marker", &self.marker)
            .field("services", &self.services().collect::<Vec<_>>())
            .field("constructors", &self.constructors)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish()
    }
}

// ═══════════════════════════════════════════
// ClassBuilder
// ═══════════════════════════════════════════

/// Builds the [`TypeDescriptor`] of a concrete type `T`.
///
/// `T` can always be exposed as itself; [`implements`](Self::implements)
/// adds the service contracts it satisfies.
pub struct ClassBuilder<T> {
    descriptor: TypeDescriptor,
    _type: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    fn new() -> Self {
        let builder = Self {
            descriptor: TypeDescriptor::empty(DependencyKey::of::<T>(), TypeKind::Class),
            _type: PhantomData,
        };
        builder.implements::<T>(|this| this)
    }

    /// Declares that `T` can be exposed as service `S`.
    ///
    /// The upcast is usually just `|this| this`.
    pub fn implements<S: ?Sized + Send + Sync + 'static>(mut self, upcast: fn(Arc<T>) -> Arc<S>) -> Self {
        let service = DependencyKey::of::<S>();
        let cast: CastFn = Arc::new(move |object: Erased| {
            let value = object
                .downcast::<T>()
                .map_err(|_| ContainerError::type_mismatch(DependencyKey::of::<T>(), type_name::<T>()))?;
            Ok(into_instance(upcast(Arc::new(*value))))
        });

        match self.descriptor.casts.iter_mut().find(|(key, _)| *key == service) {
            Some(existing) => existing.1 = cast,
            None => self.descriptor.casts.push((service, cast)),
        }
        self
    }

    /// Adds a public constructor.
    pub fn constructor<P, C: Constructor<T, P>>(self, ctor: C) -> Self {
        self.add_constructor(ctor, Visibility::Public)
    }

    /// Adds a constructor that only compiled factories may use.
    pub fn non_public_constructor<P, C: Constructor<T, P>>(self, ctor: C) -> Self {
        self.add_constructor(ctor, Visibility::NonPublic)
    }

    /// Marks a settable member for injection.
    ///
    /// The setter receives the resolved service during initialization,
    /// before any injectable method runs.
    pub fn property<S, F>(mut self, name: &'static str, setter: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<S>) + Send + Sync + 'static,
    {
        let service = DependencyKey::of::<S>();
        let assign: AssignFn = Arc::new(move |target: &mut (dyn Any + Send + Sync), value: Instance| {
            let target = downcast_target::<T>(target)?;
            setter(target, downcast_instance::<S>(&service, &value)?);
            Ok(())
        });

        self.descriptor.properties.push(PropertyInfo { name, service, assign });
        self
    }

    /// Marks a method for injection.
    ///
    /// Methods run after construction and property assignment, in the
    /// order they were added.
    pub fn method<P, I: Injector<T, P>>(mut self, name: &'static str, injector: I) -> Self {
        let parameters = injector.parameters();
        let invoke: InjectFn = Arc::new(move |target: &mut (dyn Any + Send + Sync), args: &mut Arguments| {
            injector.inject(downcast_target::<T>(target)?, args)
        });

        self.descriptor.methods.push(MethodInfo { name, parameters, invoke });
        self
    }

    /// Attaches a service marker.
    pub fn service(mut self, marker: ServiceMarker) -> Self {
        self.descriptor.marker = Some(marker);
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }

    fn add_constructor<P, C: Constructor<T, P>>(mut self, ctor: C, visibility: Visibility) -> Self {
        let parameters = ctor.parameters();
        let invoke: ConstructFn = Arc::new(move |args: &mut Arguments| {
            ctor.construct(args).map(|value| Box::new(value) as Erased)
        });

        self.descriptor.constructors.push(ConstructorInfo { parameters, visibility, invoke });
        self
    }
}

fn downcast_target<T: 'static>(target: &mut (dyn Any + Send + Sync)) -> ContainerResult<&mut T> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| ContainerError::type_mismatch(DependencyKey::of::<T>(), type_name::<T>()))
}
