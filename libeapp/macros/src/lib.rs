//! A macro that checks the signature of ecall handlers
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

#[macro_use]
extern crate quote;
extern crate syn;
extern crate proc_macro;

use syn::{parse_macro_input, Error, FnArg, ItemFn, ReturnType, Type, Visibility};
use syn::spanned::Spanned;

use proc_macro::TokenStream;

const SIGNATURE: &str = "`#[ecall_handler]` function must have signature `pub fn(u64) -> u32`";

/// An attribute macro that is used to denote an ecall handler.
///
/// Handlers are placed in the enclave's call table and run inside the
/// enclave on behalf of the host. The handler must have the following
/// signature:
///
///    pub fn(u64) -> u32
///
/// The parameter is the single argument word passed by the host. The
/// returned value is delivered to the host as the call result. Restricting
/// results to 'u32' keeps them apart from the negative status codes reserved
/// by the ecall protocol.
///

#[proc_macro_attribute]
pub fn ecall_handler(_args: TokenStream, input: TokenStream) -> TokenStream {

    // See: https://docs.rs/syn/latest/syn
    let func : syn::ItemFn = parse_macro_input!(input as ItemFn);

    // Only doc attributes are allowed currently:
    for attr in &func.attrs {
        if attr.path.leading_colon == None
            || attr.path.segments.len() == 1
        {
            if let Some(path) = attr.path.segments.first() {
                if path.ident == "doc" {
                    continue;
                }
            }
        }

        return Error::new(func.sig.span(),
                          "`#[ecall_handler]` function must not have other attributes")
             .to_compile_error().into();
    }

    if match func.vis {
        Visibility::Public(_) => false,
        _ => true
    }
    || func.sig.abi.is_some()
        || func.sig.asyncness.is_some()
        || func.sig.constness.is_some()
        || func.sig.unsafety.is_some()
        || func.sig.variadic.is_some()
        || func.sig.generics.params.len() > 0
        || func.sig.inputs.len() != 1
        || !func.sig.inputs.iter().all(|arg| match arg {
            FnArg::Typed(pat) => is_type(&pat.ty, "u64"),
            FnArg::Receiver(_) => false,
        })
        || match func.sig.output {
            ReturnType::Default => true,
            ReturnType::Type(_, ref t) => !is_type(t, "u32"),
        } {
            return Error::new(func.sig.span(), SIGNATURE)
                .to_compile_error().into();
        }

    let attrs = func.attrs; // Add comments back to preserve documentation
    let sig   = func.sig;
    let block = func.block;

    let expanded = quote!{
        #(#attrs)*
        pub #sig #block
    };

    // Output tokens to the compiler:
    TokenStream::from(expanded)
}

// 'true' if 't' is the plain path type 'name'
fn is_type(t: &Type, name: &str) -> bool {
    match t {
        Type::Path(tp) => {
            tp.qself.is_none()
                && tp.path.segments.len() == 1
                && tp.path.segments.first().map_or(false, |s| s.ident == name)
        },
        _ => false
    }
}
