//! Procedural macros for Tarkib.
//!
//! * `#[derive(Service)]` - describes a type and declares it as a service
//! * `#[derive(Injectable)]` - describes a type without declaring it
//! * `#[service_contract]` - describes a trait used as a service contract
//!
//! Generated code refers to the `tarkib` facade crate.

use proc_macro::TokenStream;

mod contract;
mod service;

/// Describes a struct and declares it as a service.
///
/// ```ignore
/// #[derive(Service)]
/// #[service(lifetime = "singleton", implements = "dyn Printer", constructor = "Self::new")]
/// #[service(method = "warm_up")]
/// struct ConsolePrinter {
///     #[inject]
///     formatter: Option<Arc<dyn Formatter>>,
/// }
/// ```
///
/// Attributes:
/// * `lifetime = "singleton" | "scoped" | "transient"` - defaults to transient
/// * `implementation = "Path"` - build another type when this one is requested
/// * `implements = "Type"` - a service contract the type satisfies (repeatable)
/// * `constructor = "path"` - a public constructor (repeatable); defaults to `Default::default`
/// * `non_public_constructor = "path"` - a constructor only compiled factories use (repeatable)
/// * `method = "name"` - an injectable method, run after construction (repeatable)
///
/// Fields marked `#[inject]` must be `Option<Arc<T>>`; they are assigned
/// after construction.
#[proc_macro_derive(Service, attributes(service, inject))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    service::derive(input.into(), true).into()
}

/// Describes a struct for the composition engine without declaring it as a
/// service. Takes the same attributes as `#[derive(Service)]`, minus the
/// service declaration itself.
#[proc_macro_derive(Injectable, attributes(service, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    service::derive(input.into(), false).into()
}

/// Describes a trait as a service contract.
///
/// ```ignore
/// #[service_contract(lifetime = "singleton", implementation = "ConsolePrinter")]
/// trait Printer: Send + Sync {
///     fn print(&self, text: &str);
/// }
/// ```
///
/// With arguments the trait is also declared as a service; without, it is
/// only made discoverable.
#[proc_macro_attribute]
pub fn service_contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    contract::expand(attr.into(), item.into()).into()
}
