//! Typed injection signatures.
//!
//! Constructors and injectable methods are ordinary Rust functions whose
//! parameters are `Arc<S>` services. [`Constructor`] and [`Injector`] are
//! implemented for every such function up to eight parameters, so
//! describing a type never needs runtime introspection:
//!
//! ```rust,ignore
//! impl UserService {
//!     fn new(printer: Arc<dyn Printer>, calculator: Arc<dyn Calculator>) -> Self { .. }
//!     fn init(&mut self, logger: Arc<dyn Logger>) { .. }
//! }
//!
//! TypeDescriptor::class::<UserService>()
//!     .constructor(UserService::new)
//!     .method("init", UserService::init)
//! ```

use std::sync::Arc;

use tarkib_container::{ContainerError, DependencyKey, Instance, downcast_instance};

type ContainerResult<T> = tarkib_container::Result<T>;

/// Resolved arguments for one constructor or method call, in parameter order.
pub struct Arguments {
    owner: DependencyKey,
    values: std::vec::IntoIter<Instance>,
}

impl Arguments {
    pub(crate) fn new(owner: DependencyKey, values: Vec<Instance>) -> Self {
        Self {
            owner,
            values: values.into_iter(),
        }
    }

    /// Takes the next argument as service `S`.
    ///
    /// # Errors
    /// [`ContainerError::ConstructionFailed`] if the arguments are exhausted
    /// or the next one is not an `Arc<S>`.
    pub fn next<S: ?Sized + Send + Sync + 'static>(&mut self) -> ContainerResult<Arc<S>> {
        let key = DependencyKey::of::<S>();
        let instance = self.values.next().ok_or_else(|| ContainerError::ConstructionFailed {
            key: self.owner,
            source: format!("Missing argument of type {key}").into(),
        })?;
        downcast_instance(&key, &instance)
    }
}

/// A function that builds `T` from resolved services.
///
/// `Params` is a marker tuple (`(Arc<A>, Arc<B>)`) that keeps the
/// per-arity implementations apart; it never has to be named.
pub trait Constructor<T, Params>: Send + Sync + 'static {
    /// Service types of the parameters, in order.
    fn parameters(&self) -> Vec<DependencyKey>;

    fn construct(&self, args: &mut Arguments) -> ContainerResult<T>;
}

/// A function that injects resolved services into an existing `T`.
pub trait Injector<T, Params>: Send + Sync + 'static {
    /// Service types of the parameters after the receiver, in order.
    fn parameters(&self) -> Vec<DependencyKey>;

    fn inject(&self, target: &mut T, args: &mut Arguments) -> ContainerResult<()>;
}

macro_rules! impl_injection_arity {
    ($($param:ident $arg:ident),*) => {
        impl<T, F, $($param),*> Constructor<T, ($(Arc<$param>,)*)> for F
        where
            F: Fn($(Arc<$param>),*) -> T + Send + Sync + 'static,
            $($param: ?Sized + Send + Sync + 'static,)*
        {
            fn parameters(&self) -> Vec<DependencyKey> {
                vec![$(DependencyKey::of::<$param>()),*]
            }

            #[allow(unused_variables)]
            fn construct(&self, args: &mut Arguments) -> ContainerResult<T> {
                $(let $arg = args.next::<$param>()?;)*
                Ok(self($($arg),*))
            }
        }

        impl<T, F, $($param),*> Injector<T, ($(Arc<$param>,)*)> for F
        where
            F: Fn(&mut T, $(Arc<$param>),*) + Send + Sync + 'static,
            $($param: ?Sized + Send + Sync + 'static,)*
        {
            fn parameters(&self) -> Vec<DependencyKey> {
                vec![$(DependencyKey::of::<$param>()),*]
            }

            #[allow(unused_variables)]
            fn inject(&self, target: &mut T, args: &mut Arguments) -> ContainerResult<()> {
                $(let $arg = args.next::<$param>()?;)*
                self(target, $($arg),*);
                Ok(())
            }
        }
    };
}

impl_injection_arity!();
impl_injection_arity!(A1 a1);
impl_injection_arity!(A1 a1, A2 a2);
impl_injection_arity!(A1 a1, A2 a2, A3 a3);
impl_injection_arity!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_injection_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_injection_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_injection_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_injection_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
