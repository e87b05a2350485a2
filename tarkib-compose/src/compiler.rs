//! Turns service declarations into container registrations.
//!
//! Types with no injectable members are registered *directly*: the
//! container activates them itself. Everything else gets a
//! [`CompiledFactory`] built once per implementation type from an
//! [`InjectionPlan`], so resolution never re-inspects the type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use tarkib_container::{DependencyKey, FactoryFn, Instance, Lifetime, Registration, Resolver};

use crate::descriptor::{
    CastFn, ConstructorInfo, Erased, MethodInfo, PropertyInfo, TypeDescriptor,
    longest_constructor, resolve_arguments,
};
use crate::error::{CompositionError, Result};

type ContainerResult<T> = tarkib_container::Result<T>;

// ═══════════════════════════════════════════
// InjectionPlan
// ═══════════════════════════════════════════

/// How to build and initialise one implementation type.
///
/// Computed once per type and shared by every factory built for it.
#[derive(Debug)]
pub struct InjectionPlan {
    implementation: DependencyKey,
    constructor: ConstructorInfo,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
}

impl InjectionPlan {
    /// Plans `descriptor`, or `None` if it has no constructor at all.
    ///
    /// Uses the constructor with the most parameters regardless of
    /// visibility; the first declared wins ties.
    fn new(descriptor: &TypeDescriptor) -> Option<Self> {
        let constructor = longest_constructor(descriptor.constructors().iter())?;
        Some(Self {
            implementation: *descriptor.key(),
            constructor: constructor.clone(),
            properties: descriptor.properties().to_vec(),
            methods: descriptor.methods().to_vec(),
        })
    }

    pub fn implementation(&self) -> &DependencyKey {
        &self.implementation
    }

    pub fn constructor_parameters(&self) -> &[DependencyKey] {
        self.constructor.parameters()
    }

    pub fn property_names(&self) -> Vec<&'static str> {
        self.properties.iter().map(PropertyInfo::name).collect()
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods.iter().map(MethodInfo::name).collect()
    }

    /// Whether this plan was built from members matching `descriptor`.
    fn matches(&self, descriptor: &TypeDescriptor) -> bool {
        let constructor = longest_constructor(descriptor.constructors().iter());
        constructor.is_some_and(|c| c.parameters() == self.constructor_parameters())
            && descriptor.properties().iter().map(PropertyInfo::name).eq(self.property_names())
            && descriptor.methods().iter().map(MethodInfo::name).eq(self.method_names())
    }

    /// Constructs, assigns properties, then runs methods in order.
    fn execute(&self, resolver: &dyn Resolver) -> ContainerResult<Erased> {
        let owner = self.implementation;

        let mut args = resolve_arguments(owner, self.constructor.parameters(), resolver)?;
        let mut object = self.constructor.invoke(&mut args)?;

        for property in &self.properties {
            let value = resolver
                .resolve_key(&property.service())
                .map_err(|err| err.within(owner))?;
            property.assign(object.as_mut(), value)?;
        }

        for method in &self.methods {
            let mut args = resolve_arguments(owner, method.parameters(), resolver)?;
            method.invoke(object.as_mut(), &mut args)?;
        }

        Ok(object)
    }
}

// ═══════════════════════════════════════════
// CompiledFactory
// ═══════════════════════════════════════════

/// A reusable construction routine for one `(service, implementation)` pair.
///
/// Stateless; safe to call from many threads at once.
#[derive(Clone)]
pub struct CompiledFactory {
    service: DependencyKey,
    plan: Arc<InjectionPlan>,
    cast: CastFn,
}

impl CompiledFactory {
    pub fn service(&self) -> &DependencyKey {
        &self.service
    }

    pub fn implementation(&self) -> &DependencyKey {
        self.plan.implementation()
    }

    pub fn plan(&self) -> &Arc<InjectionPlan> {
        &self.plan
    }

    /// Builds a fresh instance, exposed as the service type.
    pub fn invoke(&self, resolver: &dyn Resolver) -> ContainerResult<Instance> {
        trace!(service = %self.service, implementation = %self.plan.implementation, "Running compiled factory");
        let object = self.plan.execute(resolver)?;
        (self.cast)(object)
    }

    fn into_factory_fn(self) -> FactoryFn {
        Arc::new(move |resolver: &dyn Resolver| self.invoke(resolver))
    }
}

impl fmt::Debug for CompiledFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFactory")
            .field("service", &self.service)
            .field("plan", &self.plan)
            .finish()
    }
}

// ═══════════════════════════════════════════
// RegistrationEntry
// ═══════════════════════════════════════════

/// What the compiler produces for one declaration.
#[derive(Debug, Clone)]
pub enum RegistrationEntry {
    /// The container activates `implementation` itself.
    Direct {
        service: DependencyKey,
        implementation: Arc<TypeDescriptor>,
        lifetime: Lifetime,
    },
    /// Resolution runs a compiled factory.
    Compiled {
        service: DependencyKey,
        factory: CompiledFactory,
        lifetime: Lifetime,
    },
}

impl RegistrationEntry {
    pub fn service(&self) -> &DependencyKey {
        match self {
            RegistrationEntry::Direct { service, .. } | RegistrationEntry::Compiled { service, .. } => service,
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        match self {
            RegistrationEntry::Direct { lifetime, .. } | RegistrationEntry::Compiled { lifetime, .. } => *lifetime,
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, RegistrationEntry::Compiled { .. })
    }

    pub fn into_registration(self) -> Registration {
        match self {
            RegistrationEntry::Direct { service, implementation, lifetime } => {
                Registration::activator(service, lifetime, implementation)
            }
            RegistrationEntry::Compiled { service, factory, lifetime } => {
                Registration::factory(service, lifetime, factory.into_factory_fn())
            }
        }
    }
}

impl From<RegistrationEntry> for Registration {
    fn from(entry: RegistrationEntry) -> Self {
        entry.into_registration()
    }
}

// ═══════════════════════════════════════════
// ServiceCompiler
// ═══════════════════════════════════════════

/// Compiles declarations, caching one plan per implementation type.
///
/// Whether a type is compiled is decided from the descriptor passed in,
/// never from the cache. A cached plan is reused only while it matches.
#[derive(Default)]
pub struct ServiceCompiler {
    plans: HashMap<DependencyKey, Arc<InjectionPlan>>,
}

impl ServiceCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `(service, implementation, lifetime)`.
    ///
    /// `implementation` defaults to `service` itself.
    ///
    /// # Errors
    /// - [`CompositionError::IncompatibleImplementation`] if the
    ///   implementation cannot be exposed as the service
    /// - [`CompositionError::NoAccessibleConstructor`] if the type to build
    ///   has no constructor
    pub fn compile(
        &mut self,
        service: &TypeDescriptor,
        implementation: Option<&Arc<TypeDescriptor>>,
        lifetime: Lifetime,
    ) -> Result<RegistrationEntry> {
        let service_key = *service.key();
        let target = match implementation {
            Some(implementation) => {
                if !implementation.can_be_used_as(&service_key) {
                    return Err(CompositionError::IncompatibleImplementation {
                        service: service_key,
                        implementation: *implementation.key(),
                    });
                }
                Arc::clone(implementation)
            }
            None => Arc::new(service.clone()),
        };

        if target.constructors().is_empty() {
            return Err(CompositionError::NoAccessibleConstructor { implementation: *target.key() });
        }

        let cast = target
            .cast_to(&service_key)
            .cloned()
            .ok_or(CompositionError::IncompatibleImplementation {
                service: service_key,
                implementation: *target.key(),
            })?;

        let entry = match self.plan_for(&target) {
            None => RegistrationEntry::Direct {
                service: service_key,
                implementation: target,
                lifetime,
            },
            Some(plan) => RegistrationEntry::Compiled {
                service: service_key,
                factory: CompiledFactory { service: service_key, plan, cast },
                lifetime,
            },
        };

        debug!(
            service = %service_key,
            lifetime = %lifetime,
            compiled = entry.is_compiled(),
            "Compiled service declaration"
        );
        Ok(entry)
    }

    /// The plan cached for `implementation`, if it was compiled.
    pub fn cached_plan(&self, implementation: &DependencyKey) -> Option<&Arc<InjectionPlan>> {
        self.plans.get(implementation)
    }

    fn plan_for(&mut self, target: &TypeDescriptor) -> Option<Arc<InjectionPlan>> {
        if !target.has_injectable_members() {
            return None;
        }
        if let Some(plan) = self.plans.get(target.key()).filter(|plan| plan.matches(target)) {
            return Some(Arc::clone(plan));
        }

        trace!(implementation = %target.key(), "Building injection plan");
        let plan = Arc::new(InjectionPlan::new(target)?);
        self.plans.insert(*target.key(), Arc::clone(&plan));
        Some(plan)
    }
}

impl fmt::Debug for ServiceCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCompiler")
            .field("cached", &self.plans.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tarkib_container::{Container, ContainerError};

    trait Printer: Send + Sync {
        fn print(&self) -> String;
    }

    trait Calculator: Send + Sync {
        fn add(&self, a: i32, b: i32) -> i32;
    }

    trait Journal: Send + Sync {
        fn entries(&self) -> Vec<String>;
    }

    #[derive(Default)]
    struct ConsolePrinter;
    impl Printer for ConsolePrinter {
        fn print(&self) -> String {
            "console".into()
        }
    }

    #[derive(Default)]
    struct DefaultCalculator;
    impl Calculator for DefaultCalculator {
        fn add(&self, a: i32, b: i32) -> i32 {
            a + b
        }
    }

    /// Records every step so tests can check ordering.
    struct Report {
        log: Mutex<Vec<String>>,
        printer: Option<Arc<dyn Printer>>,
    }

    impl Report {
        fn empty() -> Self {
            Self { log: Mutex::new(vec!["ctor:0".into()]), printer: None }
        }

        fn with_printer(printer: Arc<dyn Printer>) -> Self {
            Self {
                log: Mutex::new(vec![format!("ctor:1:{}", printer.print())]),
                printer: None,
            }
        }

        fn with_both(_printer: Arc<dyn Printer>, _calculator: Arc<dyn Calculator>) -> Self {
            Self { log: Mutex::new(vec!["ctor:2".into()]), printer: None }
        }

        fn with_both_again(_calculator: Arc<dyn Calculator>, _printer: Arc<dyn Printer>) -> Self {
            Self { log: Mutex::new(vec!["ctor:2b".into()]), printer: None }
        }

        fn record(&self, entry: String) {
            if let Ok(mut log) = self.log.lock() {
                log.push(entry);
            }
        }
    }

    impl Journal for Report {
        fn entries(&self) -> Vec<String> {
            self.log.lock().map(|log| log.clone()).unwrap_or_default()
        }
    }

    fn printer() -> TypeDescriptor {
        TypeDescriptor::class::<ConsolePrinter>()
            .implements::<dyn Printer>(|this| this)
            .constructor(ConsolePrinter::default)
            .build()
    }

    fn journal() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Journal>()
    }

    fn report() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::class::<Report>()
                .implements::<dyn Journal>(|this| this)
                .constructor(Report::empty)
                .constructor(Report::with_printer)
                .non_public_constructor(Report::with_both)
                .constructor(Report::with_both_again)
                .property("printer", |this: &mut Report, printer: Arc<dyn Printer>| {
                    this.record(format!("property:{}", this.printer.is_none()));
                    this.printer = Some(printer);
                })
                .method("first", |this: &mut Report, calculator: Arc<dyn Calculator>| {
                    this.record(format!("first:{}:{}", this.printer.is_some(), calculator.add(1, 2)));
                })
                .method("second", |this: &mut Report| this.record("second".into()))
                .build(),
        )
    }

    fn container_with(entry: RegistrationEntry) -> Container {
        let mut builder = Container::builder()
            .transient_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)))
            .transient_with::<dyn Calculator>(|_| Ok(Arc::new(DefaultCalculator)));
        builder.try_add(entry.into());
        builder.build()
    }

    #[test]
    fn simple_type_is_registered_directly() {
        let mut compiler = ServiceCompiler::new();
        let service = TypeDescriptor::interface::<dyn Printer>();
        let entry = compiler
            .compile(&service, Some(&Arc::new(printer())), Lifetime::Singleton)
            .unwrap();

        assert!(!entry.is_compiled());
        assert_eq!(entry.lifetime(), Lifetime::Singleton);
        assert_eq!(*entry.service(), DependencyKey::of::<dyn Printer>());
        assert!(compiler.cached_plan(&DependencyKey::of::<ConsolePrinter>()).is_none());
    }

    #[test]
    fn type_with_injectable_members_is_compiled() {
        let mut compiler = ServiceCompiler::new();
        let entry = compiler.compile(&journal(), Some(&report()), Lifetime::Transient).unwrap();

        assert!(entry.is_compiled());
        let plan = compiler.cached_plan(&DependencyKey::of::<Report>()).unwrap();
        assert_eq!(plan.property_names(), vec!["printer"]);
        assert_eq!(plan.method_names(), vec!["first", "second"]);
    }

    #[test]
    fn compiled_factory_uses_longest_constructor_first_declared() {
        let mut compiler = ServiceCompiler::new();
        compiler.compile(&journal(), Some(&report()), Lifetime::Transient).unwrap();

        let plan = compiler.cached_plan(&DependencyKey::of::<Report>()).unwrap();
        assert_eq!(
            plan.constructor_parameters(),
            &[DependencyKey::of::<dyn Printer>(), DependencyKey::of::<dyn Calculator>()]
        );
    }

    #[test]
    fn compiled_factory_assigns_properties_before_methods() {
        let mut compiler = ServiceCompiler::new();
        let entry = compiler.compile(&journal(), Some(&report()), Lifetime::Transient).unwrap();
        let container = container_with(entry);

        let journal: Arc<dyn Journal> = container.resolve().unwrap();
        assert_eq!(
            journal.entries(),
            vec!["ctor:2", "property:true", "first:true:3", "second"]
        );
    }

    #[test]
    fn compiled_transient_builds_fresh_instances() {
        let mut compiler = ServiceCompiler::new();
        let entry = compiler.compile(&journal(), Some(&report()), Lifetime::Transient).unwrap();
        let container = container_with(entry);

        let a: Arc<dyn Journal> = container.resolve().unwrap();
        let b: Arc<dyn Journal> = container.resolve().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn plan_is_reused_across_services() {
        let mut compiler = ServiceCompiler::new();
        let report = report();
        compiler.compile(&journal(), Some(&report), Lifetime::Transient).unwrap();
        let first = Arc::clone(compiler.cached_plan(&DependencyKey::of::<Report>()).unwrap());

        let self_service = TypeDescriptor::class::<Report>().build();
        let entry = compiler.compile(&self_service, Some(&report), Lifetime::Scoped).unwrap();

        match entry {
            RegistrationEntry::Compiled { factory, .. } => {
                assert!(Arc::ptr_eq(factory.plan(), &first));
                assert_eq!(*factory.service(), DependencyKey::of::<Report>());
            }
            other => panic!("Expected Compiled, got: {other:?}"),
        }
    }

    #[test]
    fn member_injection_follows_the_current_descriptor() {
        let mut compiler = ServiceCompiler::new();
        let plain = Arc::new(TypeDescriptor::class::<Report>().constructor(Report::empty).build());
        let first = compiler.compile(&plain, None, Lifetime::Transient).unwrap();
        assert!(!first.is_compiled());

        let with_method = Arc::new(
            TypeDescriptor::class::<Report>()
                .constructor(Report::empty)
                .method("second", |this: &mut Report| this.record("second".into()))
                .build(),
        );
        let second = compiler.compile(&with_method, None, Lifetime::Transient).unwrap();
        assert!(second.is_compiled());

        let container = container_with(second);
        let report: Arc<Report> = container.resolve().unwrap();
        assert_eq!(report.entries(), vec!["ctor:0", "second"]);
    }

    #[test]
    fn changed_members_replace_the_cached_plan() {
        let mut compiler = ServiceCompiler::new();
        compiler.compile(&journal(), Some(&report()), Lifetime::Transient).unwrap();

        let fewer = Arc::new(
            TypeDescriptor::class::<Report>()
                .implements::<dyn Journal>(|this| this)
                .constructor(Report::empty)
                .method("second", |this: &mut Report| this.record("second".into()))
                .build(),
        );
        compiler.compile(&journal(), Some(&fewer), Lifetime::Transient).unwrap();

        let plan = compiler.cached_plan(&DependencyKey::of::<Report>()).unwrap();
        assert!(plan.property_names().is_empty());
        assert_eq!(plan.method_names(), vec!["second"]);
        assert!(plan.constructor_parameters().is_empty());
    }

    #[test]
    fn incompatible_implementation_is_rejected() {
        let mut compiler = ServiceCompiler::new();
        let service = TypeDescriptor::interface::<dyn Calculator>();

        match compiler.compile(&service, Some(&Arc::new(printer())), Lifetime::Transient) {
            Err(CompositionError::IncompatibleImplementation { service, implementation }) => {
                assert_eq!(service, DependencyKey::of::<dyn Calculator>());
                assert_eq!(implementation, DependencyKey::of::<ConsolePrinter>());
            }
            other => panic!("Expected IncompatibleImplementation, got: {other:?}"),
        }
    }

    #[test]
    fn interface_without_implementation_has_no_constructor() {
        let mut compiler = ServiceCompiler::new();

        match compiler.compile(&journal(), None, Lifetime::Transient) {
            Err(CompositionError::NoAccessibleConstructor { implementation }) => {
                assert_eq!(implementation, DependencyKey::of::<dyn Journal>());
            }
            other => panic!("Expected NoAccessibleConstructor, got: {other:?}"),
        }
    }

    #[test]
    fn non_public_constructor_is_enough_for_compiled_types() {
        let mut compiler = ServiceCompiler::new();
        let hidden = Arc::new(
            TypeDescriptor::class::<Report>()
                .non_public_constructor(Report::empty)
                .method("second", |this: &mut Report| this.record("second".into()))
                .build(),
        );

        let entry = compiler.compile(&hidden, None, Lifetime::Transient).unwrap();
        let container = container_with(entry);
        let report: Arc<Report> = container.resolve().unwrap();
        assert_eq!(report.entries(), vec!["ctor:0", "second"]);
    }

    #[test]
    fn missing_member_dependency_fails_with_path() {
        let mut compiler = ServiceCompiler::new();
        let entry = compiler.compile(&journal(), Some(&report()), Lifetime::Transient).unwrap();

        let mut builder = Container::builder()
            .transient_with::<dyn Printer>(|_| Ok(Arc::new(ConsolePrinter)));
        builder.try_add(entry.into());
        let container = builder.build();

        match container.resolve::<dyn Journal>() {
            Err(ContainerError::Unsatisfiable(err)) => {
                assert_eq!(err.requested, DependencyKey::of::<dyn Calculator>());
                assert_eq!(err.required_by(), Some(&DependencyKey::of::<Report>()));
            }
            other => panic!("Expected Unsatisfiable, got: {:?}", other.map(|_| ())),
        }
    }
}
