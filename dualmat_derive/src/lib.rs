extern crate proc_macro;

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use syn::{
    parse_str, Data, DataStruct, DataUnion, DeriveInput, Field, Fields, Generics, TypeParamBound,
};

use proc_macro::TokenStream as BaseTokenStream;

#[proc_macro_derive(DeviceCopy)]
pub fn derive_device_copy(input: BaseTokenStream) -> BaseTokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(e) => return BaseTokenStream::from(e.to_compile_error()),
    };
    BaseTokenStream::from(impl_device_copy(&ast))
}

fn impl_device_copy(input: &DeriveInput) -> TokenStream {
    let input_type = &input.ident;

    let field_checks = match input.data {
        Data::Struct(ref data_struct) => check_struct(data_struct),
        Data::Union(ref data_union) => check_union(data_union),
        // A zeroed matrix must hold valid values, and an enum need not have a zero discriminant.
        Data::Enum(_) => {
            return syn::Error::new(
                Span::call_site(),
                "DeviceCopy cannot be derived for enums; zeroed memory may not be a valid variant",
            )
            .to_compile_error();
        }
    };

    let verify_fn = Ident::new(
        &format!("__verify_{}_can_implement_DeviceCopy", input_type),
        Span::call_site(),
    );

    let generics = with_device_copy_bound(&input.generics);
    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    quote! {
        unsafe impl #impl_generics ::dualmat_core::DeviceCopy for #input_type #type_generics #where_clause {}

        #[doc(hidden)]
        #[allow(non_snake_case, dead_code, unused_variables)]
        fn #verify_fn #impl_generics(value: &#input_type #type_generics) #where_clause {
            #(#field_checks)*
        }
    }
}

fn with_device_copy_bound(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    let bound: TypeParamBound = parse_str("::dualmat_core::DeviceCopy")
        .expect("DeviceCopy path should parse as a trait bound");

    for type_param in generics.type_params_mut() {
        type_param.bounds.push(bound.clone());
    }

    generics
}

fn check_struct(s: &DataStruct) -> Vec<TokenStream> {
    match s.fields {
        Fields::Named(ref named) => check_fields(named.named.iter()),
        Fields::Unnamed(ref unnamed) => check_fields(unnamed.unnamed.iter()),
        Fields::Unit => vec![],
    }
}

fn check_union(u: &DataUnion) -> Vec<TokenStream> {
    check_fields(u.fields.named.iter())
}

fn check_fields<'a, I: Iterator<Item = &'a Field>>(fields: I) -> Vec<TokenStream> {
    fields
        .map(|field| {
            let field_type = &field.ty;
            quote! {
                {
                    fn assert_impl<T: ::dualmat_core::DeviceCopy>() {}
                    assert_impl::<#field_type>();
                }
            }
        })
        .collect()
}
