//! `#[derive(Service)]` and `#[derive(Injectable)]`.

use darling::ast::{Data, Fields};
use darling::util::Ignored;
use darling::{FromDeriveInput, FromField, FromMeta};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, Ident, Path, PathArguments, Type};

/// Service lifetime as written in attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromMeta)]
#[darling(rename_all = "snake_case")]
pub(crate) enum LifetimeArg {
    Singleton,
    Scoped,
    Transient,
}

impl LifetimeArg {
    pub(crate) fn tokens(self) -> TokenStream {
        match self {
            LifetimeArg::Singleton => quote!(::tarkib::Lifetime::Singleton),
            LifetimeArg::Scoped => quote!(::tarkib::Lifetime::Scoped),
            LifetimeArg::Transient => quote!(::tarkib::Lifetime::Transient),
        }
    }
}

/// `ServiceMarker` construction for a lifetime and optional implementation.
pub(crate) fn marker_tokens(lifetime: Option<LifetimeArg>, implementation: Option<&Path>) -> TokenStream {
    let lifetime = lifetime.unwrap_or(LifetimeArg::Transient).tokens();
    let implementation = implementation.map(|path| quote!(.implementation::<#path>()));
    quote!(::tarkib::ServiceMarker::new(#lifetime) #implementation)
}

/// Submits `<#ty as Describe>::describe` to the global catalog.
pub(crate) fn registration_tokens(ty: &TokenStream) -> TokenStream {
    quote! {
        ::tarkib::__private::inventory::submit! {
            ::tarkib::TypeRegistration::new(
                ::core::module_path!(),
                <#ty as ::tarkib::Describe>::describe,
            )
        }
    }
}

#[derive(Debug, FromField)]
#[darling(forward_attrs(inject))]
struct FieldArgs {
    ident: Option<Ident>,
    ty: Type,
    attrs: Vec<syn::Attribute>,
}

impl FieldArgs {
    fn is_injected(&self) -> bool {
        self.attrs.iter().any(|attr| attr.path().is_ident("inject"))
    }
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(service), supports(struct_any))]
struct ServiceArgs {
    ident: Ident,
    generics: syn::Generics,
    data: Data<Ignored, FieldArgs>,
    #[darling(default)]
    lifetime: Option<LifetimeArg>,
    #[darling(default)]
    implementation: Option<Path>,
    #[darling(multiple)]
    implements: Vec<Type>,
    #[darling(multiple, rename = "constructor")]
    constructors: Vec<Path>,
    #[darling(multiple, rename = "non_public_constructor")]
    non_public_constructors: Vec<Path>,
    #[darling(multiple, rename = "method")]
    methods: Vec<Ident>,
}

pub(crate) fn derive(input: TokenStream, declare: bool) -> TokenStream {
    match expand(input, declare) {
        Ok(tokens) => tokens,
        Err(err) => err.write_errors(),
    }
}

fn expand(input: TokenStream, declare: bool) -> darling::Result<TokenStream> {
    let input: syn::DeriveInput = syn::parse2(input)?;
    let args = ServiceArgs::from_derive_input(&input)?;

    if !args.generics.params.is_empty() {
        return Err(darling::Error::custom("services cannot be generic").with_span(&args.generics));
    }

    let ident = &args.ident;
    let fields = match &args.data {
        Data::Struct(fields) => fields,
        Data::Enum(_) => return Err(darling::Error::unsupported_shape("enum").with_span(ident)),
    };

    let implements = args.implements.iter().map(|ty| quote!(.implements::<#ty>(|this| this)));

    let constructors = if args.constructors.is_empty() && args.non_public_constructors.is_empty() {
        vec![quote!(.constructor(<Self as ::core::default::Default>::default))]
    } else {
        args.constructors.iter().map(|path| quote!(.constructor(#path))).collect()
    };
    let non_public = args
        .non_public_constructors
        .iter()
        .map(|path| quote!(.non_public_constructor(#path)));

    let properties = injected_properties(fields)?;

    let methods = args.methods.iter().map(|method| {
        let name = method.to_string();
        quote!(.method(#name, Self::#method))
    });

    let marker = declare.then(|| {
        let marker = marker_tokens(args.lifetime, args.implementation.as_ref());
        quote!(.service(#marker))
    });

    let registration = registration_tokens(&quote!(#ident));

    Ok(quote! {
        const _: () = {
            impl ::tarkib::Describe for #ident {
                fn describe() -> ::tarkib::TypeDescriptor {
                    ::tarkib::TypeDescriptor::class::<Self>()
                        #(#implements)*
                        #(#constructors)*
                        #(#non_public)*
                        #(#properties)*
                        #(#methods)*
                        #marker
                        .build()
                }
            }

            #registration
        };
    })
}

fn injected_properties(fields: &Fields<FieldArgs>) -> darling::Result<Vec<TokenStream>> {
    let mut errors = darling::Error::accumulator();
    let mut properties = Vec::new();

    for field in fields.iter().filter(|field| field.is_injected()) {
        let Some(name) = &field.ident else {
            errors.push(darling::Error::custom("#[inject] needs a named field").with_span(&field.ty));
            continue;
        };

        let Some(service) = injected_service(&field.ty) else {
            errors.push(
                darling::Error::custom("#[inject] fields must be Option<Arc<T>>").with_span(&field.ty),
            );
            continue;
        };

        let label = name.to_string();
        properties.push(quote! {
            .property::<#service, _>(#label, |this: &mut Self, value: ::std::sync::Arc<#service>| {
                this.#name = ::core::option::Option::Some(value);
            })
        });
    }

    errors.finish_with(properties)
}

/// `T` out of `Option<Arc<T>>`.
fn injected_service(ty: &Type) -> Option<&Type> {
    let option = single_argument(ty, "Option")?;
    single_argument(option, "Arc")
}

fn single_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(input: TokenStream, declare: bool) -> String {
        expand(input, declare).unwrap().to_string()
    }

    #[test]
    fn unwraps_injected_field_type() {
        let ty: Type = syn::parse_quote!(Option<std::sync::Arc<dyn Printer>>);
        let inner = injected_service(&ty).unwrap();
        assert_eq!(quote!(#inner).to_string(), quote!(dyn Printer).to_string());

        let plain: Type = syn::parse_quote!(Arc<dyn Printer>);
        assert!(injected_service(&plain).is_none());
    }

    #[test]
    fn defaults_to_default_constructor_and_transient() {
        let output = expanded(
            quote! {
                struct Clock;
            },
            true,
        );

        assert!(output.contains("Default > :: default"));
        assert!(output.contains("Lifetime :: Transient"));
        assert!(output.contains("inventory :: submit"));
    }

    #[test]
    fn expands_contracts_members_and_marker() {
        let output = expanded(
            quote! {
                #[service(lifetime = "singleton", implements = "dyn Printer", constructor = "Self::new")]
                #[service(method = "warm_up")]
                struct ConsolePrinter {
                    #[inject]
                    formatter: Option<Arc<dyn Formatter>>,
                    width: usize,
                }
            },
            true,
        );

        assert!(output.contains("implements :: < dyn Printer >"));
        assert!(output.contains("constructor (Self :: new)"));
        assert!(output.contains("property :: < dyn Formatter , _ > (\"formatter\""));
        assert!(output.contains("method (\"warm_up\" , Self :: warm_up)"));
        assert!(output.contains("Lifetime :: Singleton"));
        assert!(!output.contains("\"width\""));
    }

    #[test]
    fn injectable_has_no_marker() {
        let output = expanded(
            quote! {
                #[service(constructor = "Self::new")]
                struct Report;
            },
            false,
        );

        assert!(!output.contains("ServiceMarker"));
        assert!(output.contains("Describe for Report"));
    }

    #[test]
    fn marker_names_implementation() {
        let output = expanded(
            quote! {
                #[service(lifetime = "scoped", implementation = "SqlStore")]
                struct Store;
            },
            true,
        );

        assert!(output.contains("implementation :: < SqlStore > ()"));
        assert!(output.contains("Lifetime :: Scoped"));
    }

    #[test]
    fn rejects_bad_inject_fields() {
        let result = expand(
            quote! {
                struct Broken {
                    #[inject]
                    printer: Arc<dyn Printer>,
                }
            },
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_generics_and_enums() {
        assert!(expand(quote!(struct Wrapper<T>(T);), true).is_err());
        assert!(expand(quote!(enum Mode { A, B }), true).is_err());
    }

    #[test]
    fn rejects_unknown_lifetime() {
        let result = expand(
            quote! {
                #[service(lifetime = "forever")]
                struct Clock;
            },
            true,
        );
        assert!(result.is_err());
    }
}
