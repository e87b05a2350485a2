//! `#[service_contract]`.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemTrait, Path};

use crate::service::{LifetimeArg, marker_tokens, registration_tokens};

#[derive(Debug, Default, FromMeta)]
struct ContractArgs {
    #[darling(default)]
    lifetime: Option<LifetimeArg>,
    #[darling(default)]
    implementation: Option<Path>,
}

impl ContractArgs {
    fn declares_service(&self) -> bool {
        self.lifetime.is_some() || self.implementation.is_some()
    }
}

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    match try_expand(attr, item.clone()) {
        Ok(tokens) => tokens,
        Err(err) => {
            let errors = err.write_errors();
            quote!(#item #errors)
        }
    }
}

fn try_expand(attr: TokenStream, item: TokenStream) -> darling::Result<TokenStream> {
    let args = ContractArgs::from_list(&NestedMeta::parse_meta_list(attr)?)?;
    let item: ItemTrait = syn::parse2(item)?;

    if !item.generics.params.is_empty() {
        return Err(darling::Error::custom("service contracts cannot be generic").with_span(&item.generics));
    }

    let ident = &item.ident;
    let marker = args.declares_service().then(|| {
        let marker = marker_tokens(args.lifetime, args.implementation.as_ref());
        quote!(.with_service(#marker))
    });
    let registration = registration_tokens(&quote!(dyn #ident));

    Ok(quote! {
        #item

        const _: () = {
            impl ::tarkib::Describe for dyn #ident {
                fn describe() -> ::tarkib::TypeDescriptor {
                    ::tarkib::TypeDescriptor::interface::<dyn #ident>() #marker
                }
            }

            #registration
        };
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer() -> TokenStream {
        quote! {
            trait Printer: Send + Sync {
                fn print(&self);
            }
        }
    }

    #[test]
    fn bare_contract_is_only_described() {
        let output = try_expand(TokenStream::new(), printer()).unwrap().to_string();

        assert!(output.contains("trait Printer"));
        assert!(output.contains("Describe for dyn Printer"));
        assert!(!output.contains("with_service"));
    }

    #[test]
    fn contract_with_arguments_is_declared() {
        let output = try_expand(
            quote!(lifetime = "singleton", implementation = "ConsolePrinter"),
            printer(),
        )
        .unwrap()
        .to_string();

        assert!(output.contains("with_service"));
        assert!(output.contains("Lifetime :: Singleton"));
        assert!(output.contains("implementation :: < ConsolePrinter > ()"));
    }

    #[test]
    fn implementation_alone_defaults_to_transient() {
        let output = try_expand(quote!(implementation = "ConsolePrinter"), printer())
            .unwrap()
            .to_string();
        assert!(output.contains("Lifetime :: Transient"));
    }

    #[test]
    fn keeps_the_trait_when_arguments_are_wrong() {
        let output = expand(quote!(colour = "red"), printer()).to_string();
        assert!(output.contains("trait Printer"));
        assert!(output.contains("compile_error"));
    }

    #[test]
    fn rejects_non_traits() {
        assert!(try_expand(TokenStream::new(), quote!(struct Printer;)).is_err());
    }
}
